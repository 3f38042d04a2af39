use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use taskbot_core::events::Event;
use taskbot_core::ids::ChatId;
use taskbot_core::transport::TransportError;
use taskbot_engine::ConversationController;

use crate::client::BotClient;

const POLL_TIMEOUT_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Wire shape of a `getUpdates` entry, reduced to the fields the bot
/// consumes. Unknown update kinds deserialize with both options empty
/// and are skipped.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Long-polling update loop: `getUpdates` → core events → controller.
pub struct UpdatePoller {
    client: Arc<BotClient>,
    controller: Arc<ConversationController>,
    shutdown: CancellationToken,
}

impl UpdatePoller {
    pub fn new(
        client: Arc<BotClient>,
        controller: Arc<ConversationController>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            controller,
            shutdown,
        }
    }

    /// Run until the shutdown token fires. Each event is dispatched on its
    /// own task; the controller serializes events per user, so ordering
    /// within one chat is preserved by the per-user lock, not by this loop.
    pub async fn run(&self) {
        let mut offset: i64 = 0;
        info!("update poller started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("update poller stopping");
                    return;
                }
                batch = self.fetch(offset) => match batch {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            match map_update(update) {
                                Some(event) => {
                                    let controller = Arc::clone(&self.controller);
                                    tokio::spawn(async move {
                                        controller.handle_event(event).await;
                                    });
                                }
                                None => debug!("update carried nothing actionable"),
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "getUpdates failed, backing off");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    async fn fetch(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let payload = self
            .client
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        serde_json::from_value(payload["result"].clone())
            .map_err(|e| TransportError::Api(format!("getUpdates result: {e}")))
    }
}

/// Convert one wire update into a core event, or None when there is
/// nothing actionable (service messages, media without text, callbacks
/// whose origin message has expired).
pub(crate) fn map_update(update: Update) -> Option<Event> {
    if let Some(message) = update.message {
        let text = message.text?;
        let mut event = Event::text(ChatId(message.chat.id), text);
        if let Some(name) = message.from.and_then(|u| u.username) {
            event = event.with_sender(name);
        }
        return Some(event);
    }

    if let Some(callback) = update.callback_query {
        let token = callback.data?;
        let message = callback.message?;
        return Some(Event::button(
            ChatId(message.chat.id),
            callback.id,
            message.message_id,
            token,
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbot_core::events::EventPayload;

    fn parse(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_message_maps_to_text_event() {
        let update = parse(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": { "id": 42 },
                "from": { "username": "alice" },
                "text": "привет"
            }
        }));

        let event = map_update(update).unwrap();
        assert_eq!(event.chat, ChatId(42));
        assert_eq!(event.sender.as_deref(), Some("alice"));
        match event.payload {
            EventPayload::Text(text) => assert_eq!(text, "привет"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn callback_maps_to_button_event() {
        let update = parse(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-77",
                "data": "close_5",
                "message": {
                    "message_id": 900,
                    "chat": { "id": 42 }
                }
            }
        }));

        let event = map_update(update).unwrap();
        assert_eq!(event.chat, ChatId(42));
        match event.payload {
            EventPayload::Button {
                callback_id,
                message_id,
                token,
            } => {
                assert_eq!(callback_id, "cb-77");
                assert_eq!(message_id, 900);
                assert_eq!(token, "close_5");
            }
            other => panic!("expected button payload, got {other:?}"),
        }
    }

    #[test]
    fn textless_message_is_skipped() {
        let update = parse(json!({
            "update_id": 3,
            "message": {
                "message_id": 11,
                "chat": { "id": 42 }
            }
        }));
        assert!(map_update(update).is_none());
    }

    #[test]
    fn callback_without_origin_message_is_skipped() {
        let update = parse(json!({
            "update_id": 4,
            "callback_query": { "id": "cb-1", "data": "close_5" }
        }));
        assert!(map_update(update).is_none());
    }

    #[test]
    fn unknown_update_kind_is_skipped() {
        let update = parse(json!({ "update_id": 5, "edited_message": { "anything": true } }));
        assert!(map_update(update).is_none());
    }
}
