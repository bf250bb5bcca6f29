//! Short-lived buffering of inbound messages.
//!
//! Chat transports deliver photo attachments as separate webhook calls that
//! can arrive a few seconds after the text. The buffer holds one pending
//! message per phone number so late photos can be merged in before the flow
//! runs; after a fixed window the dispatcher flushes whatever accumulated.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct BufferEntry {
    text: String,
    photos: Vec<String>,
}

/// One pending message per phone number.
///
/// An entry is consumed exactly once: [`MessageBuffer::take`] removes it, so
/// a flush that lost the race finds nothing and does nothing.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    entries: Mutex<HashMap<String, BufferEntry>>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a buffer for a text message. Replaces any unconsumed entry for
    /// the same number.
    pub async fn open(&self, phone: &str, text: &str, photos: &[String]) {
        debug!(
            "Buffer opened for {} ({} immediate photos)",
            phone,
            photos.len()
        );
        self.entries.lock().await.insert(
            phone.to_string(),
            BufferEntry {
                text: text.to_string(),
                photos: photos.to_vec(),
            },
        );
    }

    /// Merge late photos into an open buffer.
    ///
    /// Returns `false` when there is no open buffer — orphaned photos with
    /// no message to attach to.
    pub async fn append_photos(&self, phone: &str, photos: &[String]) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(phone) {
            Some(entry) => {
                entry.photos.extend(photos.iter().cloned());
                debug!(
                    "{} photo(s) appended to buffer of {} (total {})",
                    photos.len(),
                    phone,
                    entry.photos.len()
                );
                true
            }
            None => false,
        }
    }

    /// Consume the buffered message for a number, if any.
    pub async fn take(&self, phone: &str) -> Option<(String, Vec<String>)> {
        self.entries
            .lock()
            .await
            .remove(phone)
            .map(|entry| (entry.text, entry.photos))
    }

    /// Number of open buffers.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
