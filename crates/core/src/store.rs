//! Conversation persistence. Conversations are stored as documents keyed by
//! id: one SQLite file is the database, one table is the collection, and the
//! message list is kept as a JSON column. Exactly one connection is open at
//! a time; re-pointing the store closes the old connection before the new
//! target is opened.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::title::derive_title;
use crate::{Message, unix_now};

#[derive(Clone, Debug)]
pub struct StoreTarget {
    pub path: PathBuf,
    pub collection: String,
}

impl StoreTarget {
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self { path: path.into(), collection: collection.into() }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub system_prompt: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

struct Backend {
    conn: Connection,
    collection: String,
}

impl Backend {
    fn open(target: &StoreTarget) -> Result<Self> {
        validate_collection(&target.collection)?;

        if let Some(parent) = target.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&target.path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    messages TEXT NOT NULL,
                    system_prompt TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )",
                target.collection
            ),
            [],
        )?;

        Ok(Self { conn, collection: target.collection.clone() })
    }
}

/// Collection names are interpolated into SQL, so they must be plain
/// identifiers.
fn validate_collection(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Invalid collection name: {:?}", name))
    }
}

#[derive(Clone)]
pub struct ChatStore {
    backend: Arc<Mutex<Option<Backend>>>,
}

impl ChatStore {
    pub fn connect(target: &StoreTarget) -> Result<Self> {
        let backend = Backend::open(target)?;
        Ok(Self { backend: Arc::new(Mutex::new(Some(backend))) })
    }

    /// Switch to a different database file or collection. The prior
    /// connection is closed before the new one is opened, under a single
    /// lock so no operation can observe a half-closed state. If the open
    /// fails the store stays disconnected until a later reconnect succeeds.
    pub fn reconnect(&self, target: &StoreTarget) -> Result<()> {
        let mut guard = self.lock()?;
        guard.take();
        *guard = Some(Backend::open(target)?);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Backend>>> {
        self.backend.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    /// Upsert a conversation. Updates leave the stored title untouched
    /// unless `refresh_title` is set; the caller decides that explicitly
    /// (first save of a new conversation, or a requested retitle).
    pub fn save(
        &self,
        id: &str,
        messages: &[Message],
        system_prompt: &str,
        title: Option<&str>,
        refresh_title: bool,
    ) -> Result<()> {
        let guard = self.lock()?;
        let backend = guard.as_ref().ok_or_else(|| anyhow::anyhow!("Store not connected"))?;

        let now = unix_now()?;
        let messages_json = serde_json::to_string(messages)?;
        let exists = record_exists(backend, id)?;

        if exists {
            if refresh_title {
                let title = resolve_title(title, messages, now);
                backend.conn.execute(
                    &format!(
                        "UPDATE {} SET messages = ?1, system_prompt = ?2, updated_at = ?3, title = ?4
                         WHERE id = ?5",
                        backend.collection
                    ),
                    rusqlite::params![messages_json, system_prompt, now, title, id],
                )?;
            } else {
                backend.conn.execute(
                    &format!(
                        "UPDATE {} SET messages = ?1, system_prompt = ?2, updated_at = ?3
                         WHERE id = ?4",
                        backend.collection
                    ),
                    rusqlite::params![messages_json, system_prompt, now, id],
                )?;
            }
        } else {
            let title = resolve_title(title, messages, now);
            backend.conn.execute(
                &format!(
                    "INSERT INTO {} (id, title, messages, system_prompt, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    backend.collection
                ),
                rusqlite::params![id, title, messages_json, system_prompt, now, now],
            )?;
        }

        Ok(())
    }

    /// Fails soft: any backend error reads as "not found".
    pub fn load(&self, id: &str) -> Option<Conversation> {
        self.try_load(id).unwrap_or(None)
    }

    fn try_load(&self, id: &str) -> Result<Option<Conversation>> {
        let guard = self.lock()?;
        let backend = guard.as_ref().ok_or_else(|| anyhow::anyhow!("Store not connected"))?;

        let row = backend.conn.query_row(
            &format!(
                "SELECT id, title, messages, system_prompt, created_at, updated_at
                 FROM {} WHERE id = ?1",
                backend.collection
            ),
            rusqlite::params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        );

        let (id, title, messages_json, system_prompt, created_at, updated_at) = match row {
            Ok(values) => values,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(Conversation {
            id,
            title,
            messages: serde_json::from_str(&messages_json)?,
            system_prompt,
            created_at,
            updated_at,
        }))
    }

    /// True iff a record existed and was removed. Fails soft to false.
    pub fn delete(&self, id: &str) -> bool {
        self.try_delete(id).unwrap_or(false)
    }

    fn try_delete(&self, id: &str) -> Result<bool> {
        let guard = self.lock()?;
        let backend = guard.as_ref().ok_or_else(|| anyhow::anyhow!("Store not connected"))?;

        let removed = backend.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", backend.collection),
            rusqlite::params![id],
        )?;

        Ok(removed > 0)
    }

    /// Summaries in backend order; callers sort. Fails soft to empty.
    pub fn list(&self) -> Vec<ConversationSummary> {
        self.try_list().unwrap_or_default()
    }

    fn try_list(&self) -> Result<Vec<ConversationSummary>> {
        let guard = self.lock()?;
        let backend = guard.as_ref().ok_or_else(|| anyhow::anyhow!("Store not connected"))?;

        let mut stmt = backend.conn.prepare(&format!(
            "SELECT id, title, created_at, updated_at FROM {}",
            backend.collection
        ))?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(ConversationSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }
}

fn record_exists(backend: &Backend, id: &str) -> Result<bool> {
    let row = backend.conn.query_row(
        &format!("SELECT 1 FROM {} WHERE id = ?1", backend.collection),
        rusqlite::params![id],
        |_row| Ok(true),
    );

    match row {
        Ok(found) => Ok(found),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn resolve_title(title: Option<&str>, messages: &[Message], now: i64) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or_else(|| derive_title(messages, now))
}
