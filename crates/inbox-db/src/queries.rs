use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::error;

use inbox_types::models::{Message, Receiver};

use crate::models::MessageRow;
use crate::store::MessageStore;
use crate::{Database, StoreError};

impl Database {
    // -- Fixtures --

    pub fn insert_sender(&self, id: i64, sender_name: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO senders (id, sender_name) VALUES (?1, ?2)",
                rusqlite::params![id, sender_name],
            )?;
            Ok(())
        })
    }

    pub fn insert_receiver(&self, id: i64, email: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO receivers (id, email) VALUES (?1, ?2)",
                rusqlite::params![id, email],
            )?;
            Ok(())
        })
    }

    /// Returns the id assigned to the new message.
    pub fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        subject: &str,
        message: &str,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, subject, message) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, receiver_id, subject, message],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Reads --

    pub fn get_messages(&self, receiver_id: i64) -> Result<Vec<Message>, StoreError> {
        self.with_conn(|conn| query_messages(conn, receiver_id))
    }

    pub fn get_message(&self, message_id: i64, receiver_id: i64) -> Result<Vec<Message>, StoreError> {
        self.with_conn(|conn| query_message(conn, message_id, receiver_id))
    }

    pub fn get_receivers_by_email(&self, email: &str) -> Result<Vec<Receiver>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, email FROM receivers WHERE email = ?1")?;
            let rows = stmt
                .query_map([email], |row| {
                    Ok(Receiver {
                        id: row.get(0)?,
                        email: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_messages(conn: &Connection, receiver_id: i64) -> Result<Vec<Message>, StoreError> {
    // JOIN senders to fetch sender_name in a single query
    let mut stmt = conn.prepare(
        "SELECT m.id, m.subject, m.message, m.is_read, m.created_at, s.id, s.sender_name
         FROM messages m
         JOIN senders s ON m.sender_id = s.id
         WHERE m.receiver_id = ?1
         ORDER BY m.id DESC",
    )?;

    let rows = stmt
        .query_map([receiver_id], map_message_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(Message::try_from).collect()
}

fn query_message(
    conn: &Connection,
    message_id: i64,
    receiver_id: i64,
) -> Result<Vec<Message>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.subject, m.message, m.is_read, m.created_at, s.id, s.sender_name
         FROM messages m
         JOIN senders s ON m.sender_id = s.id
         WHERE m.id = ?1 AND m.receiver_id = ?2",
    )?;

    let rows = stmt
        .query_map([message_id, receiver_id], map_message_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(Message::try_from).collect()
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        message: row.get(2)?,
        is_read: row.get(3)?,
        created_at: row.get(4)?,
        sender_id: row.get(5)?,
        sender_name: row.get(6)?,
    })
}

/// `MessageStore` over the local SQLite mirror. Queries run off the async
/// runtime on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StoreError::Join(e)
            })?
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn select_messages(&self, receiver_id: i64) -> Result<Vec<Message>, StoreError> {
        self.blocking(move |db| db.get_messages(receiver_id)).await
    }

    async fn select_message(
        &self,
        message_id: i64,
        receiver_id: i64,
    ) -> Result<Vec<Message>, StoreError> {
        self.blocking(move |db| db.get_message(message_id, receiver_id))
            .await
    }

    async fn select_receiver(&self, email: &str) -> Result<Vec<Receiver>, StoreError> {
        let email = email.to_string();
        self.blocking(move |db| db.get_receivers_by_email(&email)).await
    }
}
