use async_trait::async_trait;
use tracing::{debug, error};

use inbox_types::models::{Message, Receiver};

use crate::StoreError;

/// Read access to the inbox schema. Implemented by the remote PostgREST
/// backend and by the local SQLite mirror.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All messages addressed to `receiver_id`, newest (`id` descending) first.
    async fn select_messages(&self, receiver_id: i64) -> Result<Vec<Message>, StoreError>;

    /// Rows matching `message_id` that belong to `receiver_id`. At most one.
    async fn select_message(
        &self,
        message_id: i64,
        receiver_id: i64,
    ) -> Result<Vec<Message>, StoreError>;

    async fn select_receiver(&self, email: &str) -> Result<Vec<Receiver>, StoreError>;
}

/// Load the inbox of a receiver. Failures are logged here and handed back to
/// the caller as `Err`; nothing past this point panics on a store fault.
pub async fn load_messages(
    store: &dyn MessageStore,
    receiver_id: i64,
) -> Result<Vec<Message>, StoreError> {
    match store.select_messages(receiver_id).await {
        Ok(messages) => {
            debug!("Loaded {} messages for receiver {}", messages.len(), receiver_id);
            Ok(messages)
        }
        Err(e) => {
            error!("Error fetching messages for receiver {}: {}", receiver_id, e);
            Err(e)
        }
    }
}

/// Load a single message owned by `receiver_id`. `Ok(None)` means no such
/// message (or not this receiver's), which is not an error.
pub async fn load_message(
    store: &dyn MessageStore,
    message_id: i64,
    receiver_id: i64,
) -> Result<Option<Message>, StoreError> {
    match store.select_message(message_id, receiver_id).await {
        Ok(rows) => Ok(rows.into_iter().next()),
        Err(e) => {
            error!("Error fetching message {}: {}", message_id, e);
            Err(e)
        }
    }
}

/// Map a logged-in user's email to the receiver account that owns their inbox.
pub async fn resolve_receiver(
    store: &dyn MessageStore,
    email: &str,
) -> Result<Option<i64>, StoreError> {
    match store.select_receiver(email).await {
        Ok(rows) => Ok(rows.first().map(|r| r.id)),
        Err(e) => {
            error!("Error resolving receiver for {}: {}", email, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbox_types::models::Sender;

    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn select_messages(&self, _: i64) -> Result<Vec<Message>, StoreError> {
            Err(StoreError::Status { status: 503, body: "unavailable".into() })
        }

        async fn select_message(&self, _: i64, _: i64) -> Result<Vec<Message>, StoreError> {
            Err(StoreError::Poisoned)
        }

        async fn select_receiver(&self, _: &str) -> Result<Vec<Receiver>, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    struct FixedStore(Vec<Message>);

    #[async_trait]
    impl MessageStore for FixedStore {
        async fn select_messages(&self, _: i64) -> Result<Vec<Message>, StoreError> {
            Ok(self.0.clone())
        }

        async fn select_message(&self, id: i64, _: i64) -> Result<Vec<Message>, StoreError> {
            Ok(self.0.iter().filter(|m| m.id == id).cloned().collect())
        }

        async fn select_receiver(&self, _: &str) -> Result<Vec<Receiver>, StoreError> {
            Ok(vec![])
        }
    }

    fn message(id: i64) -> Message {
        Message {
            id,
            subject: format!("subject {id}"),
            message: "body".into(),
            is_read: false,
            created_at: chrono::Utc::now(),
            sender: Sender { id: 1, sender_name: "sender".into() },
        }
    }

    #[tokio::test]
    async fn store_failure_becomes_err() {
        let store = FailingStore;
        assert!(matches!(
            load_messages(&store, 1).await,
            Err(StoreError::Status { status: 503, .. })
        ));
        assert!(load_message(&store, 1, 1).await.is_err());
        assert!(resolve_receiver(&store, "a@example.com").await.is_err());
    }

    #[tokio::test]
    async fn empty_detail_result_is_not_found() {
        let store = FixedStore(vec![message(1), message(2)]);
        assert_eq!(load_message(&store, 2, 1).await.unwrap().map(|m| m.id), Some(2));
        assert_eq!(load_message(&store, 99, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_email_resolves_to_none() {
        let store = FixedStore(vec![]);
        assert_eq!(resolve_receiver(&store, "nobody@example.com").await.unwrap(), None);
    }
}
