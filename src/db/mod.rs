use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent key/value storage backing the session entries.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: &std::path::Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("persona-hub.db");
        let conn = Connection::open(db_path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    /// Writes several entries in one transaction so readers never see a half-written session.
    pub fn set_items(&self, items: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in items {
            tx.execute(
                "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn remove_items(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM storage ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_item("token").unwrap(), None);

        db.set_item("token", "abc").unwrap();
        db.set_item("token", "def").unwrap();
        assert_eq!(db.get_item("token").unwrap().as_deref(), Some("def"));

        db.remove_item("token").unwrap();
        assert_eq!(db.get_item("token").unwrap(), None);
    }

    #[test]
    fn batch_writes_and_removes() {
        let db = Database::in_memory().unwrap();
        db.set_items(&[("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        assert_eq!(db.keys().unwrap(), vec!["a", "b", "c"]);

        db.remove_items(&["a", "c", "missing"]).unwrap();
        assert_eq!(db.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::new(dir.path()).unwrap();
            db.set_item("workspaceId", "ws-1").unwrap();
        }
        let db = Database::new(dir.path()).unwrap();
        assert_eq!(db.get_item("workspaceId").unwrap().as_deref(), Some("ws-1"));
    }

    #[test]
    fn unusable_data_dir_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = Database::new(file.path()).err().unwrap();
        assert!(matches!(err, StoreError::Io(_)), "{err}");

        let nested = file.path().join("data");
        assert!(matches!(Database::new(&nested), Err(StoreError::Io(_))));
    }
}
