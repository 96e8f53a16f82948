use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::info;
use rusqlite as rs;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use objcore::{Error, Result};

/// Answers which storage class a repository lives in.
pub trait StorageClassLookup: Send + Sync {
    fn resolve(&self, repo_id: &str) -> Result<Option<String>>;
}

impl StorageClassLookup for HashMap<String, String> {
    fn resolve(&self, repo_id: &str) -> Result<Option<String>> {
        Ok(self.get(repo_id).cloned())
    }
}

/// `RepoStorageId(repo_id, storage_id)` table of the server database.
pub struct SqliteLookup {
    conn: Mutex<Connection>,
}

impl SqliteLookup {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("repo storage lookup: {}", path.display());

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| Error::backend(format!("opening {}", path.display()), e))?;
        Ok(SqliteLookup::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteLookup {
            conn: Mutex::new(conn),
        }
    }
}

impl StorageClassLookup for SqliteLookup {
    fn resolve(&self, repo_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn
            .prepare_cached("SELECT storage_id FROM RepoStorageId WHERE repo_id = ?")
            .map_err(|e| Error::backend("preparing storage id lookup", e))?;

        stmt.query_row(rs::params![repo_id], |row| row.get::<_, String>(0))
            .optional()
            .map_err(|e| Error::backend(format!("looking up storage id of {}", repo_id), e))
    }
}
