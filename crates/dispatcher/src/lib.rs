//! Message dispatch and request lifecycle orchestration.
//!
//! This crate wires the pieces together. The [`Dispatcher`] receives inbound
//! chat messages, drives them through the intake flow, and turns completed
//! intakes into maintenance requests — classifying them, notifying
//! supervisors and confirming to the driver. It also owns the supervisor
//! side of the lifecycle: approval (which books the appointment and opens
//! the work order), rejection, post-rejection editing, and background
//! conversation maintenance.
//!
//! # Architecture
//!
//! ```text
//! Inbound chat message
//!          ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │                      DISPATCHER                          │
//! │                                                          │
//! │  MessageBuffer (short window for late photo attachments) │
//! │         ↓                                                │
//! │  IntakeFlow.process → reply | completed intake           │
//! │         ↓ (completed)                                    │
//! │  create request → classify (best effort)                 │
//! │         → confirm to driver → notify supervisors         │
//! │                                                          │
//! │  approve → schedule appointment (best effort)            │
//! │          → create work order → message driver            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Collaborators (chat transport, classifier, push notifications) are
//! injected as trait objects; see [`workshop_core`]. Every piece of state is
//! constructed explicitly — nothing in this crate is a process-wide
//! singleton, so tests run isolated instances side by side.

mod buffer;
mod dispatcher;
mod error;
mod hub;
mod maintenance;

pub use buffer::MessageBuffer;
pub use dispatcher::{ApprovalOutcome, Dispatcher, DispatcherConfig, InboundOutcome};
pub use error::DispatchError;
pub use hub::{HubNotifier, NotificationHub};
pub use maintenance::{run_maintenance, MaintenanceReport};

// Re-export commonly used types from dependencies
pub use database::request::RequestEdit;
pub use workshop_core::{InboundMessage, RequestEvent};
