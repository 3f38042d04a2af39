//! Pre-programmed transport and exporter doubles for deterministic tests
//! without a chat platform or spreadsheet service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use taskbot_core::events::Keyboard;
use taskbot_core::export::{ExportError, ExportOutcome, SheetExporter};
use taskbot_core::ids::ChatId;
use taskbot_core::task::Task;
use taskbot_core::transport::{ChatTransport, TransportError};

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Clone, Debug)]
pub struct EditedMessage {
    pub chat: ChatId,
    pub message_id: i64,
    pub text: String,
}

/// Records every outbound call; optionally fails all sends.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<SentMessage>>,
    pub edits: Mutex<Vec<EditedMessage>>,
    pub acks: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `send` always fails, for delivery-error paths.
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.fail_sends.store(true, Ordering::Relaxed);
        transport
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::Network("mock send failure".into()));
        }
        self.sent.lock().push(SentMessage {
            chat,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn edit(&self, chat: ChatId, message_id: i64, text: &str) -> Result<(), TransportError> {
        self.edits.lock().push(EditedMessage {
            chat,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn ack(&self, callback_id: &str) -> Result<(), TransportError> {
        self.acks.lock().push(callback_id.to_string());
        Ok(())
    }
}

/// Returns one canned outcome on every call and counts invocations.
pub struct MockExporter {
    response: Result<ExportOutcome, String>,
    calls: AtomicUsize,
}

impl MockExporter {
    pub fn ok(outcome: ExportOutcome) -> Self {
        Self {
            response: Ok(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SheetExporter for MockExporter {
    async fn export(
        &self,
        _tasks: &[Task],
        _owner_label: &str,
    ) -> Result<ExportOutcome, ExportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.response
            .clone()
            .map_err(ExportError::Service)
    }
}
