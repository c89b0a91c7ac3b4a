use std::future::Future;
use std::sync::Mutex;

use suito_core::TraceContext;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Message delivery failed: {0}")]
    Delivery(String),
}

/// Sends a plain-text reply to the person who submitted the photo.
pub trait Messenger: Send + Sync {
    fn send(
        &self,
        ctx: &TraceContext,
        recipient: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), MessageError>> + Send;
}

/// Writes replies to the log instead of a chat service.
pub struct LogMessenger;

impl Messenger for LogMessenger {
    async fn send(&self, ctx: &TraceContext, recipient: &str, text: &str) -> Result<(), MessageError> {
        info!(trace_id = %ctx, recipient, text, "reply to user");
        Ok(())
    }
}

/// Keeps every reply in memory, optionally failing all deliveries.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// `(recipient, text)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Messenger for RecordingMessenger {
    async fn send(&self, _ctx: &TraceContext, recipient: &str, text: &str) -> Result<(), MessageError> {
        if self.fail {
            return Err(MessageError::Delivery(format!("recipient {recipient} unreachable")));
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
