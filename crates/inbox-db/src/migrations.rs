use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS senders (
            id          INTEGER PRIMARY KEY,
            sender_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS receivers (
            id          INTEGER PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id   INTEGER NOT NULL REFERENCES senders(id),
            receiver_id INTEGER NOT NULL REFERENCES receivers(id),
            subject     TEXT NOT NULL,
            message     TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id, id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
