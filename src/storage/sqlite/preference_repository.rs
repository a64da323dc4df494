use crate::errors::{FeederError, FeederResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::PreferenceStore;

#[derive(Clone)]
pub struct SqlitePreferenceStore {
    storage: SqliteStorage,
}

impl SqlitePreferenceStore {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, key: &str) -> FeederResult<Option<String>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT value FROM preferences WHERE key = ?1")?;

        match stmt.query_row([key], |row| row.get(0)) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FeederError::from(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> FeederResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            (key, value),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> FeederResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(())
    }
}
