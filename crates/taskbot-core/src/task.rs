use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, TaskId};

/// Fixed category set. Stored as the snake_case token, shown to users
/// through the Russian display label.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Development,
    Testing,
    Analytics,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Development,
        Category::Testing,
        Category::Analytics,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Analytics => "analytics",
            Self::Other => "other",
        }
    }

    /// Display label shown in menus and task cards.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Development => "Разработка",
            Self::Testing => "Тестирование",
            Self::Analytics => "Аналитика",
            Self::Other => "Другое",
        }
    }

    /// Reverse lookup from a display label, used when the category keyboard
    /// echoes the label back as plain text.
    pub fn from_label(label: &str) -> Option<Category> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "testing" => Ok(Self::Testing),
            "analytics" => Ok(Self::Analytics),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Открыто",
            Self::Done => "Готово",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A task owned by exactly one chat. Every store operation filters by
/// `owner`; a task is never visible outside its owner's chat.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: ChatId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: TaskStatus,
    /// RFC3339 creation timestamp as written by the store.
    pub created_at: String,
}

impl Task {
    /// Creation date in the fixed MM/DD/YYYY presentation format.
    /// Falls back to the raw timestamp if it does not parse.
    pub fn created_date(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.format("%m/%d/%Y").to_string())
            .unwrap_or_else(|_| self.created_at.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(created_at: &str) -> Task {
        Task {
            id: TaskId(1),
            owner: ChatId(10),
            title: "Fix bug".into(),
            description: String::new(),
            category: Category::Development,
            status: TaskStatus::Open,
            created_at: created_at.into(),
        }
    }

    #[test]
    fn category_roundtrip() {
        for c in Category::ALL {
            let parsed: Category = c.as_str().parse().unwrap();
            assert_eq!(parsed, c);
        }
        assert!("gardening".parse::<Category>().is_err());
    }

    #[test]
    fn category_from_label() {
        assert_eq!(Category::from_label("Разработка"), Some(Category::Development));
        assert_eq!(Category::from_label("Аналитика"), Some(Category::Analytics));
        assert_eq!(Category::from_label("⬅️ Назад"), None);
    }

    #[test]
    fn status_roundtrip() {
        assert_eq!("open".parse::<TaskStatus>().unwrap(), TaskStatus::Open);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("reopened".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_labels() {
        assert_eq!(TaskStatus::Open.label(), "Открыто");
        assert_eq!(TaskStatus::Done.label(), "Готово");
    }

    #[test]
    fn created_date_fixed_format() {
        let t = task("2026-08-07T09:30:00+00:00");
        assert_eq!(t.created_date(), "08/07/2026");
    }

    #[test]
    fn created_date_falls_back_on_garbage() {
        let t = task("not-a-timestamp");
        assert_eq!(t.created_date(), "not-a-timestamp");
    }

    #[test]
    fn serde_uses_snake_case_tokens() {
        let json = serde_json::to_value(task("2026-01-01T00:00:00Z")).unwrap();
        assert_eq!(json["category"], "development");
        assert_eq!(json["status"], "open");
    }
}
