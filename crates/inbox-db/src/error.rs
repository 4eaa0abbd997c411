use thiserror::Error;

/// Every way a store read can fail. Callers branch on this instead of
/// inspecting backend-native errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("database lock poisoned")]
    Poisoned,

    #[error("corrupt created_at '{value}' on message {id}")]
    Timestamp { id: i64, value: String },
}
