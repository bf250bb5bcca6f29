//! Inbound message type.

use serde::{Deserialize, Serialize};

/// An inbound chat message from a driver, as handed over by the transport
/// webhook after media download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number in E.164 form (e.g. "+56911112222").
    pub phone: String,
    /// Message text. Empty for photo-only messages.
    pub text: String,
    /// Local references to downloaded photo attachments.
    pub photos: Vec<String>,
}

impl InboundMessage {
    /// Create a text-only message.
    pub fn text(phone: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            text: text.into(),
            photos: Vec::new(),
        }
    }

    /// Create a message with photo attachments.
    pub fn with_photos(
        phone: impl Into<String>,
        text: impl Into<String>,
        photos: Vec<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            text: text.into(),
            photos,
        }
    }

    /// Whether the message carries any attachment.
    pub fn has_photos(&self) -> bool {
        !self.photos.is_empty()
    }
}
