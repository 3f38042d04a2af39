use chrono::Utc;
use tracing::instrument;

use taskbot_core::ids::{ChatId, TaskId};
use taskbot_core::task::{Category, Task, TaskStatus};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TASK_COLUMNS: &str = "id, owner_chat_id, title, description, category, status, created_at";

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new open task and return it with its assigned id.
    #[instrument(skip(self, description), fields(chat_id = %owner, category = %category))]
    pub fn create(
        &self,
        owner: ChatId,
        title: &str,
        category: Category,
        description: &str,
    ) -> Result<Task, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (owner_chat_id, title, description, category, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'open', ?5)",
                rusqlite::params![owner.as_i64(), title, description, category.as_str(), now],
            )?;

            Ok(Task {
                id: TaskId(conn.last_insert_rowid()),
                owner,
                title: title.to_string(),
                description: description.to_string(),
                category,
                status: TaskStatus::Open,
                created_at: now,
            })
        })
    }

    /// Tasks for the list view, newest first.
    #[instrument(skip(self), fields(chat_id = %owner))]
    pub fn list(&self, owner: ChatId) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_chat_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query([owner.as_i64()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }

    /// Full task set for one owner, insertion order. Source for export,
    /// search and stats.
    #[instrument(skip(self), fields(chat_id = %owner))]
    pub fn all(&self, owner: ChatId) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_chat_id = ?1 ORDER BY id"
            ))?;
            let mut rows = stmt.query([owner.as_i64()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }

    /// Per-category task counts for one owner.
    #[instrument(skip(self), fields(chat_id = %owner))]
    pub fn stats_by_category(&self, owner: ChatId) -> Result<Vec<(Category, u32)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*) FROM tasks WHERE owner_chat_id = ?1
                 GROUP BY category ORDER BY category",
            )?;
            let mut rows = stmt.query([owner.as_i64()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row_helpers::get(row, 0, "tasks", "category")?;
                let count: u32 = row_helpers::get(row, 1, "tasks", "count")?;
                results.push((row_helpers::parse_enum(&raw, "tasks", "category")?, count));
            }
            Ok(results)
        })
    }

    /// Mark a task done. No-op when the id does not exist or belongs to
    /// another owner; closing an already-done task is also a no-op.
    #[instrument(skip(self), fields(task_id = %id, chat_id = %owner))]
    pub fn close(&self, id: TaskId, owner: ChatId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'done' WHERE id = ?1 AND owner_chat_id = ?2",
                rusqlite::params![id.as_i64(), owner.as_i64()],
            )?;
            Ok(())
        })
    }

    /// Delete a task. No-op when the id does not exist or belongs to
    /// another owner.
    #[instrument(skip(self), fields(task_id = %id, chat_id = %owner))]
    pub fn delete(&self, id: TaskId, owner: ChatId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner_chat_id = ?2",
                rusqlite::params![id.as_i64(), owner.as_i64()],
            )?;
            Ok(())
        })
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let category_raw: String = row_helpers::get(row, 4, "tasks", "category")?;
    let status_raw: String = row_helpers::get(row, 5, "tasks", "status")?;

    Ok(Task {
        id: TaskId(row_helpers::get::<i64>(row, 0, "tasks", "id")?),
        owner: ChatId(row_helpers::get::<i64>(row, 1, "tasks", "owner_chat_id")?),
        title: row_helpers::get(row, 2, "tasks", "title")?,
        description: row_helpers::get(row, 3, "tasks", "description")?,
        category: row_helpers::parse_enum(&category_raw, "tasks", "category")?,
        status: row_helpers::parse_enum(&status_raw, "tasks", "status")?,
        created_at: row_helpers::get(row, 6, "tasks", "created_at")?,
    })
}
