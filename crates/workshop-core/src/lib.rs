//! Core types and collaborator traits for the workshop intake platform.
//!
//! This crate defines the shared vocabulary used by every other crate in the
//! workspace:
//!
//! - [`InboundMessage`] - an inbound chat message from a driver's phone
//! - [`Classification`], [`Priority`], [`IssueType`] - the classifier contract
//! - [`Classifier`] - trait for the external text-classification service
//! - [`MessageSender`] - trait for the outbound chat transport
//! - [`SupervisorNotifier`] - trait for pushing events to supervisor dashboards
//!
//! Transport, persistence and HTTP concerns live behind these traits; the
//! crates in this workspace only ever talk to the trait objects.
//!
//! # Example
//!
//! ```rust
//! use workshop_core::{InboundMessage, Priority};
//!
//! let msg = InboundMessage::text("+56911112222", "hola");
//! assert!(msg.photos.is_empty());
//! assert_eq!(Priority::Urgent.as_str(), "urgente");
//! ```

mod classify;
mod message;
mod notify;
mod sender;

pub use classify::{
    Classification, Classifier, ClassifierError, DefaultClassifier, FixedClassifier, IssueType,
    Priority,
};
pub use message::InboundMessage;
pub use notify::{EventKind, NoOpNotifier, NotifyError, RequestEvent, SupervisorNotifier};
pub use sender::{LoggingSender, MessageSender, NoOpSender, SendError};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
