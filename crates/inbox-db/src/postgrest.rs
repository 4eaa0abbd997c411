use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::debug;

use inbox_types::models::{Message, Receiver};

use crate::StoreError;
use crate::query::{Order, Select};
use crate::store::MessageStore;

const SENDER_FKEY: &str = "messages_sender_id_fkey";
const SENDER_FIELDS: &[&str] = &["id", "sender_name"];

/// Remote store reached through a PostgREST (Supabase) endpoint.
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    schema: String,
}

impl PostgrestStore {
    /// `client` should carry the process-wide timeouts.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            schema: schema.into(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, select: &Select) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, select.table());
        debug!("PostgREST GET {} {:?}", url, select.to_query_pairs());

        let response = self
            .client
            .get(&url)
            .query(&select.to_query_pairs())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept-Profile", &self.schema)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn message_list_query(receiver_id: i64) -> Select {
    Select::from("messages")
        .columns(&["id", "subject", "message", "is_read", "created_at"])
        .embed("senders", "senders", SENDER_FKEY, SENDER_FIELDS)
        .eq("receiver_id", receiver_id)
        .order("id", Order::Desc)
}

pub fn message_detail_query(message_id: i64, receiver_id: i64) -> Select {
    Select::from("messages")
        .columns(&["id", "message", "created_at"])
        .embed("senders", "senders", SENDER_FKEY, SENDER_FIELDS)
        .eq("id", message_id)
        .eq("receiver_id", receiver_id)
}

pub fn receiver_query(email: &str) -> Select {
    Select::from("receivers")
        .columns(&["id", "email"])
        .eq("email", email)
}

#[async_trait]
impl MessageStore for PostgrestStore {
    async fn select_messages(&self, receiver_id: i64) -> Result<Vec<Message>, StoreError> {
        self.fetch(&message_list_query(receiver_id)).await
    }

    async fn select_message(
        &self,
        message_id: i64,
        receiver_id: i64,
    ) -> Result<Vec<Message>, StoreError> {
        self.fetch(&message_detail_query(message_id, receiver_id)).await
    }

    async fn select_receiver(&self, email: &str) -> Result<Vec<Receiver>, StoreError> {
        self.fetch(&receiver_query(email)).await
    }
}
