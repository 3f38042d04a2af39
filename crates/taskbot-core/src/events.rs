use crate::ids::{ChatId, TaskId};

/// An inbound user interaction, already stripped of transport details.
#[derive(Clone, Debug)]
pub struct Event {
    pub chat: ChatId,
    /// Sender's display name when the platform provides one.
    pub sender: Option<String>,
    pub payload: EventPayload,
}

#[derive(Clone, Debug)]
pub enum EventPayload {
    /// Plain text message (menu labels, wizard input, search queries).
    Text(String),
    /// Inline button press. `callback_id` must be acked regardless of
    /// what the token parses to.
    Button {
        callback_id: String,
        message_id: i64,
        token: String,
    },
}

impl Event {
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            sender: None,
            payload: EventPayload::Text(text.into()),
        }
    }

    pub fn button(
        chat: ChatId,
        callback_id: impl Into<String>,
        message_id: i64,
        token: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            sender: None,
            payload: EventPayload::Button {
                callback_id: callback_id.into(),
                message_id,
                token: token.into(),
            },
        }
    }

    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender = Some(name.into());
        self
    }
}

/// Parsed form of an inline button token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Close(TaskId),
    Delete(TaskId),
    /// "leave the description empty" button on the wizard's last step.
    SkipDescription,
}

impl CallbackAction {
    pub fn token(&self) -> String {
        match self {
            Self::Close(id) => format!("close_{id}"),
            Self::Delete(id) => format!("delete_{id}"),
            Self::SkipDescription => "desc_empty".to_string(),
        }
    }

    pub fn parse(token: &str) -> Result<Self, TokenError> {
        if token == "desc_empty" {
            return Ok(Self::SkipDescription);
        }
        if let Some(raw) = token.strip_prefix("close_") {
            return raw
                .parse::<TaskId>()
                .map(Self::Close)
                .map_err(|_| TokenError(token.to_string()));
        }
        if let Some(raw) = token.strip_prefix("delete_") {
            return raw
                .parse::<TaskId>()
                .map(Self::Delete)
                .map_err(|_| TokenError(token.to_string()));
        }
        Err(TokenError(token.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed callback token: {0}")]
pub struct TokenError(pub String);

/// Keyboard attached to an outbound message. Labels and tokens only;
/// rendering to the wire format is the transport's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Rows of plain reply buttons that echo their label as text.
    Reply(Vec<Vec<String>>),
    /// Rows of inline buttons carrying callback tokens.
    Inline(Vec<Vec<InlineButton>>),
    /// Remove the reply keyboard from the chat.
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub token: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }

    pub fn action(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            token: action.token(),
        }
    }
}
