use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;

use crate::infra::sqlite::schema::{ensure_parent_dir, open_connection};
use crate::usecase::ports::documents::{DocumentStore, StoredDocument};
use crate::usecase::ports::repo::RepoError;

/// Document store on a single SQLite connection, opened once per process.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        ensure_parent_dir(db_path)?;
        let conn = open_connection(db_path)?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS document (
                collection  TEXT NOT NULL,
                id          INTEGER NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            );

            CREATE TABLE IF NOT EXISTS document_sequence (
                collection  TEXT PRIMARY KEY NOT NULL,
                last_id     INTEGER NOT NULL
            );
            ",
        )
        .context("failed to initialize document schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T, RepoError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::Message("document store lock poisoned".to_string()))?;
        f(&mut *conn).map_err(RepoError::from)
    }
}

fn insert_all(conn: &mut Connection, collection: &str, bodies: Vec<JsonValue>) -> Result<Vec<i64>> {
    let tx = conn
        .transaction()
        .context("failed to start document insert transaction")?;

    // The sequence only moves forward. MAX(id) seeds it for older stores.
    let last_id: i64 = tx
        .query_row(
            "SELECT COALESCE(
                (SELECT last_id FROM document_sequence WHERE collection = ?1),
                (SELECT MAX(id) FROM document WHERE collection = ?1),
                0
             )",
            [collection],
            |row| row.get(0),
        )
        .with_context(|| format!("failed to allocate id in {collection}"))?;
    let mut next_id = last_id + 1;

    let mut ids = Vec::with_capacity(bodies.len());
    {
        let mut insert = tx
            .prepare("INSERT INTO document(collection, id, body) VALUES (?1, ?2, ?3)")
            .context("failed to prepare document insert")?;
        for body in bodies {
            let text = serde_json::to_string(&body).context("failed to encode document")?;
            insert
                .execute(params![collection, next_id, text])
                .with_context(|| format!("failed to insert document into {collection}"))?;
            ids.push(next_id);
            next_id += 1;
        }
    }

    tx.execute(
        "INSERT INTO document_sequence(collection, last_id) VALUES (?1, ?2)
         ON CONFLICT(collection) DO UPDATE SET last_id = excluded.last_id",
        params![collection, next_id - 1],
    )
    .with_context(|| format!("failed to advance id sequence of {collection}"))?;

    tx.commit()
        .context("failed to commit document insert transaction")?;
    Ok(ids)
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&self, collection: &str, body: JsonValue) -> Result<i64, RepoError> {
        self.with_conn(|conn| {
            insert_all(conn, collection, vec![body])?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("document insert returned no id"))
        })
    }

    fn insert_bulk(
        &self,
        collection: &str,
        bodies: Vec<JsonValue>,
    ) -> Result<Vec<i64>, RepoError> {
        self.with_conn(|conn| insert_all(conn, collection, bodies))
    }

    fn delete(&self, collection: &str, ids: &[i64]) -> Result<usize, RepoError> {
        self.with_conn(|conn| {
            let tx = conn
                .transaction()
                .context("failed to start document delete transaction")?;
            let mut deleted = 0;
            {
                let mut stmt = tx
                    .prepare("DELETE FROM document WHERE collection = ?1 AND id = ?2")
                    .context("failed to prepare document delete")?;
                for id in ids {
                    deleted += stmt
                        .execute(params![collection, id])
                        .with_context(|| format!("failed to delete document #{id}"))?;
                }
            }
            tx.commit()
                .context("failed to commit document delete transaction")?;
            Ok(deleted)
        })
    }

    fn scan(&self, collection: &str) -> Result<Vec<StoredDocument>, RepoError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, body FROM document WHERE collection = ?1 ORDER BY id ASC")
                .context("failed to prepare document scan")?;
            let raw = stmt
                .query_map([collection], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })
                .with_context(|| format!("failed to scan {collection}"))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .with_context(|| format!("failed to collect {collection}"))?;

            raw.into_iter()
                .map(|(id, text)| -> Result<StoredDocument> {
                    let body = serde_json::from_str(&text)
                        .with_context(|| format!("failed to decode document #{id}"))?;
                    Ok(StoredDocument { id, body })
                })
                .collect()
        })
    }
}
