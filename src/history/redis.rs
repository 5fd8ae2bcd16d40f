use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use log::{ debug, error };
use redis::{ AsyncCommands, Client, Script };

use super::{ new_id, HistoryStore, StoreError, Subscription, CHAT_LIST_LIMIT };
use crate::models::chat::{
    derive_title,
    Chat,
    ChatMessage,
    NewMessage,
    NewSummary,
    SummaryRecord,
    UserRole,
};

const CHATS_CHANGED: &str = "chats";
const MESSAGES_CHANGED_PREFIX: &str = "messages:";

// KEYS: chats index, chat doc, message list. ARGV: chat id, chat JSON,
// message JSON, updated_at. Appends only while the chat is still indexed.
const APPEND_MESSAGE_SCRIPT: &str =
    r"
if not redis.call('ZSCORE', KEYS[1], ARGV[1]) then
    return 0
end
redis.call('RPUSH', KEYS[3], ARGV[3])
redis.call('SET', KEYS[2], ARGV[2])
redis.call('ZADD', KEYS[1], ARGV[4], ARGV[1])
return 1
";

/// Redis layout, all keys under the configured prefix:
///
/// - `user:{uid}:chats` sorted set of chat ids scored by `updated_at`
/// - `user:{uid}:chat:{cid}` chat JSON
/// - `user:{uid}:chat:{cid}:messages` list of message JSON, oldest first
/// - `user:{uid}:summaries` list of summary JSON
///
/// Writes publish on `user:{uid}:events` so subscribers can re-read.
#[derive(Clone)]
pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
}

impl RedisHistoryStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn chats_key(&self, user_id: &str) -> String {
        format!("{}user:{}:chats", self.key_prefix, user_id)
    }

    fn chat_key(&self, user_id: &str, chat_id: &str) -> String {
        format!("{}user:{}:chat:{}", self.key_prefix, user_id, chat_id)
    }

    fn messages_key(&self, user_id: &str, chat_id: &str) -> String {
        format!("{}user:{}:chat:{}:messages", self.key_prefix, user_id, chat_id)
    }

    fn summaries_key(&self, user_id: &str) -> String {
        format!("{}user:{}:summaries", self.key_prefix, user_id)
    }

    fn events_channel(&self, user_id: &str) -> String {
        format!("{}user:{}:events", self.key_prefix, user_id)
    }

    async fn publish(&self, conn: &mut redis::aio::MultiplexedConnection, user_id: &str, event: &str) {
        let channel = self.events_channel(user_id);
        if let Err(e) = conn.publish::<_, _, i64>(&channel, event).await {
            error!("Failed to publish '{}' on {}: {}", event, channel, e);
        }
    }

    async fn read_chat(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        user_id: &str,
        chat_id: &str
    ) -> Result<Option<Chat>, StoreError> {
        let raw: Option<String> = conn.get(self.chat_key(user_id, chat_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Subscribe to the user's event channel and push a fresh snapshot each
    /// time an event matching `wanted` arrives.
    async fn watch<T, F, Fut>(
        &self,
        user_id: &str,
        wanted: String,
        snapshot: F
    ) -> Result<Subscription<T>, StoreError>
        where
            T: Send + 'static,
            F: Fn(RedisHistoryStore) -> Fut + Send + 'static,
            Fut: std::future::Future<Output = Result<T, StoreError>> + Send
    {
        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = self.events_channel(user_id);
        pubsub.subscribe(&channel).await?;
        let store = self.clone();

        Ok(
            Subscription::spawn(move |tx| async move {
                let mut events = pubsub.on_message();
                loop {
                    match snapshot(store.clone()).await {
                        Ok(items) => {
                            if tx.send(items).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => error!("Snapshot for {} failed: {}", channel, e),
                    }
                    loop {
                        let Some(msg) = events.next().await else {
                            debug!("Redis subscription on {} closed", channel);
                            return;
                        };
                        let payload: String = msg.get_payload().unwrap_or_default();
                        if payload == wanted {
                            break;
                        }
                    }
                }
            })
        )
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn create_chat(
        &self,
        user_id: &str,
        title: &str,
        role: UserRole
    ) -> Result<String, StoreError> {
        let mut conn = self.get_connection().await?;
        let now = Utc::now().timestamp_millis();
        let chat = Chat {
            id: new_id(),
            title: derive_title(title),
            role,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&chat)?;
        let _: () = conn.set(self.chat_key(user_id, &chat.id), json).await?;
        let _: () = conn.zadd(self.chats_key(user_id), &chat.id, now).await?;
        self.publish(&mut conn, user_id, CHATS_CHANGED).await;
        Ok(chat.id)
    }

    async fn add_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: NewMessage
    ) -> Result<String, StoreError> {
        let mut conn = self.get_connection().await?;
        let mut chat = self
            .read_chat(&mut conn, user_id, chat_id).await?
            .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;

        let now = Utc::now().timestamp_millis();
        let id = new_id();
        if message.is_first_message {
            chat.title = derive_title(&message.text);
        }
        chat.updated_at = now;

        let stored = serde_json::to_string(&message.into_message(id.clone(), now))?;
        let script = Script::new(APPEND_MESSAGE_SCRIPT);
        let appended: i64 = script
            .key(self.chats_key(user_id))
            .key(self.chat_key(user_id, chat_id))
            .key(self.messages_key(user_id, chat_id))
            .arg(chat_id)
            .arg(serde_json::to_string(&chat)?)
            .arg(stored)
            .arg(now)
            .invoke_async(&mut conn).await?;
        if appended == 0 {
            // Deleted after we read it.
            return Err(StoreError::NotFound(chat_id.to_string()));
        }

        self.publish(&mut conn, user_id, &format!("{}{}", MESSAGES_CHANGED_PREFIX, chat_id)).await;
        self.publish(&mut conn, user_id, CHATS_CHANGED).await;
        Ok(id)
    }

    async fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let removed: i64 = conn.zrem(self.chats_key(user_id), chat_id).await?;
        let _: i64 = conn.del(vec![self.chat_key(user_id, chat_id), self.messages_key(user_id, chat_id)]).await?;
        if removed == 0 {
            return Err(StoreError::NotFound(chat_id.to_string()));
        }

        self.publish(&mut conn, user_id, &format!("{}{}", MESSAGES_CHANGED_PREFIX, chat_id)).await;
        self.publish(&mut conn, user_id, CHATS_CHANGED).await;
        Ok(())
    }

    async fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>, StoreError> {
        let mut conn = self.get_connection().await?;
        self.read_chat(&mut conn, user_id, chat_id).await
    }

    async fn list_chats(&self, user_id: &str, limit: usize) -> Result<Vec<Chat>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.zrevrange(self.chats_key(user_id), 0, (limit as isize) - 1).await?;

        let mut chats = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.read_chat(&mut conn, user_id, id).await {
                Ok(Some(chat)) => chats.push(chat),
                Ok(None) => debug!("Chat index entry {} has no document", id),
                Err(e) => error!("Error reading chat {}: {}", id, e),
            }
        }
        Ok(chats)
    }

    async fn list_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let mut conn = self.get_connection().await?;
        let entries: Vec<String> = conn.lrange(self.messages_key(user_id, chat_id), 0, -1).await?;

        let mut messages = Vec::with_capacity(entries.len());
        for entry in &entries {
            match serde_json::from_str::<ChatMessage>(entry) {
                Ok(msg) => messages.push(msg),
                Err(e) => error!("Error parsing history entry: {}", e),
            }
        }
        Ok(messages)
    }

    async fn subscribe_chat_list(
        &self,
        user_id: &str
    ) -> Result<Subscription<Vec<Chat>>, StoreError> {
        let uid = user_id.to_string();
        self.watch(user_id, CHATS_CHANGED.to_string(), move |store| {
            let uid = uid.clone();
            async move { store.list_chats(&uid, CHAT_LIST_LIMIT).await }
        }).await
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Subscription<Vec<ChatMessage>>, StoreError> {
        let uid = user_id.to_string();
        let cid = chat_id.to_string();
        let wanted = format!("{}{}", MESSAGES_CHANGED_PREFIX, chat_id);
        self.watch(user_id, wanted, move |store| {
            let uid = uid.clone();
            let cid = cid.clone();
            async move { store.list_messages(&uid, &cid).await }
        }).await
    }

    async fn save_summary(&self, user_id: &str, summary: NewSummary) -> Result<String, StoreError> {
        let mut conn = self.get_connection().await?;
        let record = SummaryRecord {
            id: new_id(),
            file_name: summary.file_name,
            file_url: summary.file_url,
            user_id: user_id.to_string(),
            model_used: summary.model_used,
            summary_text: summary.summary_text,
            timestamp: Utc::now().timestamp_millis(),
        };
        let _: i64 = conn.rpush(self.summaries_key(user_id), serde_json::to_string(&record)?).await?;
        Ok(record.id)
    }

    async fn list_summaries(&self, user_id: &str) -> Result<Vec<SummaryRecord>, StoreError> {
        let mut conn = self.get_connection().await?;
        let entries: Vec<String> = conn.lrange(self.summaries_key(user_id), 0, -1).await?;
        Ok(
            entries
                .iter()
                .filter_map(|e| serde_json::from_str(e).ok())
                .collect()
        )
    }
}
