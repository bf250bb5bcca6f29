//! Guided conversational intake for vehicle workshop entry.
//!
//! Drivers report issues over chat through a fixed multi-turn dialogue:
//!
//! ```text
//! initial → awaiting_plate → awaiting_problem → confirmation → completed
//! ```
//!
//! [`IntakeFlow::process`] advances one step per inbound message and returns
//! the reply to send back. When the driver confirms, the accumulated fields
//! come back as a [`CompletedIntake`] for the caller to turn into a
//! maintenance request; the flow itself never creates requests, classifies
//! text or sends messages.
//!
//! Cancelling from the confirmation step (or any message after completion)
//! returns the dialogue to `initial` and discards the captured fields.

mod error;
mod flow;
mod messages;
mod parse;

pub use error::FlowError;
pub use flow::{CompletedIntake, FlowResponse, IntakeFlow};
pub use parse::{extract_plate, is_affirmative, is_intake_intent, is_negative};
