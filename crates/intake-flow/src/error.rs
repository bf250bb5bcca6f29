//! Error types for the intake flow.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while advancing the intake dialogue.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}
