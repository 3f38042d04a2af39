use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// External chat identifier assigned by the messaging platform.
/// Doubles as the owner key on every task row.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Task row identifier, auto-assigned by the store on insert.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_display() {
        assert_eq!(ChatId(42).to_string(), "42");
        assert_eq!(ChatId(-100123).to_string(), "-100123");
    }

    #[test]
    fn task_id_parses_from_token_suffix() {
        let id: TaskId = "17".parse().unwrap();
        assert_eq!(id, TaskId(17));
        assert!("abc".parse::<TaskId>().is_err());
    }

    #[test]
    fn serde_transparent() {
        let json = serde_json::to_string(&ChatId(7)).unwrap();
        assert_eq!(json, "7");
        let back: ChatId = serde_json::from_str("7").unwrap();
        assert_eq!(back, ChatId(7));
    }
}
