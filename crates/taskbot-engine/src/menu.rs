//! Menu labels, message keyboards and task cards.
//!
//! Every reply-keyboard label lives in this module. The idle-phase
//! dispatcher treats any text it does not match as a search query, so a
//! new menu entry must be added both to its constant and to the dispatch
//! match — there is no second label list to forget.

use taskbot_core::events::{CallbackAction, InlineButton, Keyboard};
use taskbot_core::task::{Category, Task, TaskStatus};

pub const ADD_TASK: &str = "➕ Добавить задачу";
pub const MY_TASKS: &str = "📋 Мои задачи";
pub const STATS: &str = "📊 Статистика";
pub const SEARCH: &str = "🔍 Поиск";
pub const EXPORT: &str = "📤 Экспорт в Google Sheets";
pub const ADMIN: &str = "⚙️ Админка";
pub const BACK: &str = "⬅️ Назад";
pub const EXPORT_OFF: &str = "Отключить экспорт";
pub const EXPORT_ON: &str = "Включить экспорт";
pub const SKIP_DESCRIPTION: &str = "Оставить пустым";

pub fn is_back(text: &str) -> bool {
    text.trim() == BACK
}

pub fn main_menu(is_admin: bool) -> Keyboard {
    let mut rows = vec![
        vec![ADD_TASK.to_string()],
        vec![MY_TASKS.to_string(), STATS.to_string()],
        vec![SEARCH.to_string(), EXPORT.to_string()],
    ];
    if is_admin {
        rows.push(vec![ADMIN.to_string()]);
    }
    Keyboard::Reply(rows)
}

pub fn categories_keyboard() -> Keyboard {
    let mut rows: Vec<Vec<String>> = Category::ALL
        .iter()
        .map(|c| vec![c.label().to_string()])
        .collect();
    rows.push(vec![BACK.to_string()]);
    Keyboard::Reply(rows)
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::Reply(vec![vec![BACK.to_string()]])
}

pub fn admin_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![EXPORT_OFF.to_string(), EXPORT_ON.to_string()],
        vec![BACK.to_string()],
    ])
}

pub fn skip_description_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![InlineButton::action(
        SKIP_DESCRIPTION,
        CallbackAction::SkipDescription,
    )]])
}

/// One list-view card per task.
pub fn task_card(task: &Task) -> String {
    format!(
        "#{} — {}\nКатегория: {}\nСтатус: {}\nСоздано: {}\n{}",
        task.id,
        task.title,
        task.category.label(),
        task.status.label(),
        task.created_date(),
        task.description
    )
}

/// Inline actions under a list-view card. "Close" only while open;
/// "delete" always.
pub fn task_actions(task: &Task) -> Keyboard {
    let mut rows = Vec::new();
    if task.status == TaskStatus::Open {
        rows.push(vec![InlineButton::action(
            "✅ Закрыть",
            CallbackAction::Close(task.id),
        )]);
    }
    rows.push(vec![InlineButton::action(
        "❌ Удалить",
        CallbackAction::Delete(task.id),
    )]);
    Keyboard::Inline(rows)
}
