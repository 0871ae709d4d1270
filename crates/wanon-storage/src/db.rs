use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{types::Type, Connection};
use tracing::info;
use wanon_core::{payload::MessagePayload, Error, Result};

use crate::migrations;

pub struct Database {
    conn: Mutex<Connection>,
}

/// Run a synchronous database operation on the blocking pool.
pub async fn call_blocking<T, F>(db: Arc<Database>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(db.as_ref()))
        .await
        .map_err(|e| Error::Store(format!("DB task join error: {e}")))?
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).store()?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL").store()?;
        conn.pragma_update(None, "foreign_keys", "ON").store()?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .store()?;

        migrations::run(&conn).store()?;

        info!(path = %path.display(), "database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().store()?;
        conn.pragma_update(None, "foreign_keys", "ON").store()?;
        migrations::run(&conn).store()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Store(format!("DB lock poisoned: {e}")))
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.lock_conn()?;
        f(&conn).store()
    }
}

/// Maps rusqlite failures into the core `Store` error.
pub(crate) trait StoreResultExt<T> {
    fn store(self) -> Result<T>;
}

impl<T> StoreResultExt<T> for rusqlite::Result<T> {
    fn store(self) -> Result<T> {
        self.map_err(|e| Error::Store(e.to_string()))
    }
}

/// Decode a JSON payload column inside a row mapper.
pub(crate) fn payload_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<MessagePayload> {
    let raw: String = row.get(idx)?;
    MessagePayload::from_json(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
