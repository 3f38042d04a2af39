use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use taskbot_core::ids::ChatId;

use crate::database::Database;
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub chat_id: ChatId,
    pub display_name: String,
    pub created_at: String,
}

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Idempotent upsert keyed by chat id. Refreshes the display name on
    /// repeat contact; everything else is immutable after creation.
    #[instrument(skip(self, display_name), fields(chat_id = %chat))]
    pub fn ensure(&self, chat: ChatId, display_name: &str) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO users (chat_id, display_name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(chat_id) DO UPDATE SET display_name = excluded.display_name",
                rusqlite::params![chat.as_i64(), display_name, now],
            )?;

            conn.query_row(
                "SELECT id, chat_id, display_name, created_at FROM users WHERE chat_id = ?1",
                [chat.as_i64()],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        chat_id: ChatId(row.get(1)?),
                        display_name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .map_err(|e| StoreError::Database(e.to_string()))
        })
    }

    /// Get a user by chat id.
    #[instrument(skip(self), fields(chat_id = %chat))]
    pub fn get(&self, chat: ChatId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, chat_id, display_name, created_at FROM users WHERE chat_id = ?1",
                [chat.as_i64()],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        chat_id: ChatId(row.get(1)?),
                        display_name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .map_err(|_| StoreError::NotFound(format!("user {chat}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn ensure_creates_user() {
        let repo = UserRepo::new(test_db());
        let user = repo.ensure(ChatId(100), "alice").unwrap();
        assert_eq!(user.chat_id, ChatId(100));
        assert_eq!(user.display_name, "alice");
    }

    #[test]
    fn ensure_is_idempotent() {
        let repo = UserRepo::new(test_db());
        let first = repo.ensure(ChatId(100), "alice").unwrap();
        let second = repo.ensure(ChatId(100), "alice").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn ensure_refreshes_display_name_without_duplicating() {
        let db = test_db();
        let repo = UserRepo::new(db.clone());
        repo.ensure(ChatId(100), "alice").unwrap();
        let renamed = repo.ensure(ChatId(100), "alice_renamed").unwrap();
        assert_eq!(renamed.display_name, "alice_renamed");

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn get_nonexistent_fails() {
        let repo = UserRepo::new(test_db());
        assert!(matches!(repo.get(ChatId(1)), Err(StoreError::NotFound(_))));
    }
}
