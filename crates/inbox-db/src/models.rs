//! Database row types: these map directly to SQLite rows.
//! Distinct from inbox-types models to keep the DB layer independent.

use chrono::{DateTime, Utc};

use inbox_types::models::{Message, Sender};

use crate::StoreError;

pub struct MessageRow {
    pub id: i64,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
    pub sender_id: i64,
    pub sender_name: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: row.id,
            subject: row.subject,
            message: row.message,
            is_read: row.is_read,
            created_at: parse_timestamp(row.id, &row.created_at)?,
            sender: Sender {
                id: row.sender_id,
                sender_name: row.sender_name,
            },
        })
    }
}

fn parse_timestamp(id: i64, value: &str) -> Result<DateTime<Utc>, StoreError> {
    inbox_types::models::parse_timestamp(value).map_err(|_| StoreError::Timestamp {
        id,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_sqlite_formats() {
        let a = parse_timestamp(1, "2024-05-01T12:00:00Z").unwrap();
        let b = parse_timestamp(1, "2024-05-01 12:00:00").unwrap();
        assert_eq!(a, b);

        let c = parse_timestamp(1, "2024-05-01 12:00:00.250").unwrap();
        assert_eq!(c - a, chrono::Duration::milliseconds(250));
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let err = parse_timestamp(9, "yesterday").unwrap_err();
        assert!(matches!(err, StoreError::Timestamp { id: 9, .. }));
    }
}
