mod memory;
mod redis;
mod subscription;

pub use memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;
pub use subscription::Subscription;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;
use crate::config::{ ClientConfig, HistoryType };
use crate::models::chat::{ Chat, ChatMessage, MessageRole, NewMessage, NewSummary, SummaryRecord, UserRole };

/// Chat lists never show more than this many entries.
pub const CHAT_LIST_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Chat '{0}' not found")]
    NotFound(String),
    #[error("History store error: {0}")]
    Backend(String),
    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Per-user chats, their messages, and summary metadata.
///
/// The store assigns ids and timestamps. Chats are listed most recently
/// updated first; messages oldest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create a chat and return its id. An empty title becomes the default title.
    async fn create_chat(
        &self,
        user_id: &str,
        title: &str,
        role: UserRole
    ) -> Result<String, StoreError>;

    /// Append a message and bump the chat's `updated_at`. When the message is
    /// flagged as first, the chat title is (re)derived from its text.
    async fn add_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: NewMessage
    ) -> Result<String, StoreError>;

    /// Delete a chat together with its messages.
    async fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError>;

    async fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>, StoreError>;

    async fn list_chats(&self, user_id: &str, limit: usize) -> Result<Vec<Chat>, StoreError>;

    async fn list_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Live chat list (capped at [`CHAT_LIST_LIMIT`]).
    async fn subscribe_chat_list(
        &self,
        user_id: &str
    ) -> Result<Subscription<Vec<Chat>>, StoreError>;

    /// Live message list of one chat.
    async fn subscribe_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Subscription<Vec<ChatMessage>>, StoreError>;

    async fn save_summary(&self, user_id: &str, summary: NewSummary) -> Result<String, StoreError>;

    async fn list_summaries(&self, user_id: &str) -> Result<Vec<SummaryRecord>, StoreError>;
}

pub fn create_history_store(config: &ClientConfig) -> Result<Arc<dyn HistoryStore>, StoreError> {
    match config.history_type {
        HistoryType::Memory => Ok(Arc::new(MemoryHistoryStore::new())),
        HistoryType::Redis => {
            let store = RedisHistoryStore::new(&config.history_host, &config.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
    }
}

pub fn initialize_history_store(config: &ClientConfig) -> Result<Arc<dyn HistoryStore>, StoreError> {
    match config.history_type {
        HistoryType::Memory => info!("Chat history is kept in memory for this session"),
        HistoryType::Redis => info!("Chat history will be stored in redis at {}", config.history_host),
    }
    create_history_store(config)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn format_transcript(messages: &[ChatMessage]) -> String {
    let mut result = String::new();
    for msg in messages {
        let role_display = match msg.role {
            MessageRole::User => "You",
            MessageRole::Assistant => "CaseCut",
        };
        result.push_str(&format!("{}: {}\n", role_display, msg.text));
        for (i, case) in msg.cases.iter().flatten().enumerate() {
            result.push_str(
                &format!(
                    "  [{}] {} (IPC: {}) (Outcome: {})\n      {}\n",
                    i + 1,
                    case.court.as_deref().unwrap_or("Unknown"),
                    case.sections_label(),
                    case.outcome.as_deref().unwrap_or("unknown"),
                    case.excerpt(200)
                )
            );
        }
    }
    result
}
