use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub sender_name: String,
}

/// A message addressed to a receiver. Read-only from the application's side.
///
/// The detail query selects a narrower column set than the list query, so
/// `subject` and `is_read` fall back to their defaults when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Embedded through the `messages_sender_id_fkey` join, which the store
    /// returns under the `senders` alias.
    #[serde(rename = "senders")]
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub id: i64,
    pub email: String,
}

/// Parse a store timestamp. Values without a zone (`timestamp` columns,
/// SQLite `datetime('now')`) are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    value.parse::<DateTime<Utc>>().or_else(|e| {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|_| e)
    })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_row_defaults_missing_columns() {
        let json = r#"{
            "id": 7,
            "message": "Hello",
            "created_at": "2024-05-01T12:34:56.123456+00:00",
            "senders": { "id": 3, "sender_name": "Grace" }
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, 7);
        assert_eq!(message.subject, "");
        assert!(!message.is_read);
        assert_eq!(message.sender.sender_name, "Grace");
    }

    #[test]
    fn zoneless_timestamps_are_utc() {
        let json = r#"{
            "id": 8,
            "message": "Hello",
            "created_at": "2024-05-01T12:34:56.123456",
            "senders": { "id": 3, "sender_name": "Grace" }
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(
            message.created_at,
            parse_timestamp("2024-05-01T12:34:56.123456Z").unwrap()
        );

        let whole = parse_timestamp("2024-05-01T12:34:56").unwrap();
        assert_eq!(whole, parse_timestamp("2024-05-01 12:34:56").unwrap());
        assert_eq!(whole, parse_timestamp("2024-05-01T12:34:56+00:00").unwrap());
    }

    #[test]
    fn unparseable_timestamp_fails_the_row() {
        let json = r#"{
            "id": 9,
            "message": "Hello",
            "created_at": "yesterday",
            "senders": { "id": 3, "sender_name": "Grace" }
        }"#;

        assert!(serde_json::from_str::<Message>(json).is_err());
    }
}
