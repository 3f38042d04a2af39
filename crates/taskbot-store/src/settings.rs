use rusqlite::OptionalExtension;
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;

/// Global flag toggled from the admin menu. Seeded to "1" at first init.
pub const EXPORT_ENABLED: &str = "export_enabled";

/// Process-wide key/value settings, shared by all users and mutated only
/// by administrators.
pub struct SettingsRepo {
    db: Database,
}

impl SettingsRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)
        })
    }

    #[instrument(skip(self))]
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
    }

    /// Export is on unless the flag is explicitly "0".
    pub fn export_enabled(&self) -> Result<bool, StoreError> {
        Ok(self.get(EXPORT_ENABLED)?.as_deref() != Some("0"))
    }

    pub fn set_export_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.set(EXPORT_ENABLED, if enabled { "1" } else { "0" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> SettingsRepo {
        SettingsRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn export_enabled_by_default() {
        let repo = test_repo();
        assert_eq!(repo.get(EXPORT_ENABLED).unwrap().as_deref(), Some("1"));
        assert!(repo.export_enabled().unwrap());
    }

    #[test]
    fn toggle_export() {
        let repo = test_repo();
        repo.set_export_enabled(false).unwrap();
        assert!(!repo.export_enabled().unwrap());
        repo.set_export_enabled(true).unwrap();
        assert!(repo.export_enabled().unwrap());
    }

    #[test]
    fn get_absent_key() {
        let repo = test_repo();
        assert!(repo.get("no_such_key").unwrap().is_none());
    }

    #[test]
    fn set_overwrites() {
        let repo = test_repo();
        repo.set("greeting", "hi").unwrap();
        repo.set("greeting", "hello").unwrap();
        assert_eq!(repo.get("greeting").unwrap().as_deref(), Some("hello"));
    }
}
