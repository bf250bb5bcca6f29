//! Error types for dispatch operations.

use database::DatabaseError;
use intake_flow::FlowError;
use thiserror::Error;

/// Errors that can occur during dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A precondition failed: missing input or a lifecycle state that does
    /// not permit the operation. Nothing was changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Persistence failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The intake flow failed.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),
}
