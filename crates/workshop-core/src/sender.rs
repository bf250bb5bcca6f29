//! Outbound message sender trait and implementations.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the outbound chat transport.
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport rejected or failed to deliver the message.
    #[error("send failed: {0}")]
    Failed(String),
}

/// Trait for sending chat messages to drivers.
///
/// Abstracted to support different transports (WhatsApp gateway, tests).
/// Sends are fire-and-forget from the caller's perspective: errors are
/// logged, never retried here — retry policy belongs to the transport.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message to a phone number.
    async fn send(&self, phone: &str, text: &str) -> Result<(), SendError>;
}

/// A no-op sender for tests that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send(&self, _phone: &str, _text: &str) -> Result<(), SendError> {
        Ok(())
    }
}

/// A sender that logs every message instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send(&self, phone: &str, text: &str) -> Result<(), SendError> {
        tracing::info!("Sending message to {}: {}", phone, text);
        Ok(())
    }
}
