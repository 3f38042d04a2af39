use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::instrument;

use taskbot_core::events::Keyboard;
use taskbot_core::ids::ChatId;
use taskbot_core::transport::{ChatTransport, TransportError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram Bot API client. One instance per bot token; the token never
/// appears in logs or error messages.
pub struct BotClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl BotClient {
    pub fn new(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    /// POST a Bot API method; `ok: false` responses become API errors.
    pub(crate) async fn call(&self, method: &str, body: Value) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if payload["ok"].as_bool() != Some(true) {
            let description = payload["description"].as_str().unwrap_or("unknown error");
            return Err(TransportError::Api(format!("{method}: {description}")));
        }
        Ok(payload)
    }
}

/// Render a keyboard spec to the Bot API `reply_markup` object.
pub(crate) fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Reply(rows) => json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "resize_keyboard": true,
        }),
        Keyboard::Inline(rows) => json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.label, "callback_data": b.token }))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>(),
        }),
        Keyboard::Remove => json!({ "remove_keyboard": true }),
    }
}

#[async_trait]
impl ChatTransport for BotClient {
    #[instrument(skip(self, text, keyboard), fields(chat_id = %chat))]
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": chat.as_i64(), "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(&keyboard);
        }
        self.call("sendMessage", body).await.map(|_| ())
    }

    #[instrument(skip(self, text), fields(chat_id = %chat, message_id))]
    async fn edit(&self, chat: ChatId, message_id: i64, text: &str) -> Result<(), TransportError> {
        self.call(
            "editMessageText",
            json!({ "chat_id": chat.as_i64(), "message_id": message_id, "text": text }),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn ack(&self, callback_id: &str) -> Result<(), TransportError> {
        self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_id }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbot_core::events::InlineButton;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BotClient {
        BotClient::new(SecretString::from("TOKEN".to_string()), server.uri())
    }

    fn ok_body() -> Value {
        json!({ "ok": true, "result": {} })
    }

    #[tokio::test]
    async fn send_posts_well_formed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": 42, "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .send(ChatId(42), "hello", Some(Keyboard::Remove))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn edit_targets_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/editMessageText"))
            .and(body_partial_json(json!({ "chat_id": 7, "message_id": 500 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).edit(ChatId(7), 500, "done").await.unwrap();
    }

    #[tokio::test]
    async fn ack_posts_callback_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/answerCallbackQuery"))
            .and(body_partial_json(json!({ "callback_query_id": "cb-9" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).ack("cb-9").await.unwrap();
    }

    #[tokio::test]
    async fn api_rejection_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "chat not found",
            })))
            .mount(&server)
            .await;

        let err = client(&server).send(ChatId(1), "x", None).await.unwrap_err();
        match err {
            TransportError::Api(detail) => assert!(detail.contains("chat not found")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn reply_keyboard_rendering() {
        let kb = Keyboard::Reply(vec![vec!["A".into(), "B".into()], vec!["C".into()]]);
        let value = reply_markup(&kb);
        assert_eq!(value["keyboard"][0][0]["text"], "A");
        assert_eq!(value["keyboard"][1][0]["text"], "C");
        assert_eq!(value["resize_keyboard"], true);
    }

    #[test]
    fn inline_keyboard_rendering() {
        let kb = Keyboard::Inline(vec![vec![InlineButton::new("Close", "close_1")]]);
        let value = reply_markup(&kb);
        assert_eq!(value["inline_keyboard"][0][0]["text"], "Close");
        assert_eq!(value["inline_keyboard"][0][0]["callback_data"], "close_1");
    }

    #[test]
    fn remove_keyboard_rendering() {
        assert_eq!(reply_markup(&Keyboard::Remove)["remove_keyboard"], true);
    }
}
