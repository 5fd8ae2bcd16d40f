use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{ self, error::RecvError };
use tokio::sync::RwLock;

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

const EVENT_BUFFER: usize = 256;

#[derive(Clone, Debug)]
enum StoreEvent {
    Chats {
        user_id: String,
    },
    Messages {
        user_id: String,
        chat_id: String,
    },
}

#[derive(Default)]
struct UserData {
    chats: HashMap<String, Chat>,
    messages: HashMap<String, Vec<ChatMessage>>,
    summaries: Vec<SummaryRecord>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserData>,
    last_timestamp: i64,
}

impl Inner {
    /// Wall-clock millis, forced strictly increasing so ordering is total.
    fn next_timestamp(&mut self) -> i64 {
        let ts = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = ts;
        ts
    }

    fn chat_list(&self, user_id: &str, limit: usize) -> Vec<Chat> {
        let Some(user) = self.users.get(user_id) else {
            return Vec::new();
        };
        let mut chats: Vec<Chat> = user.chats.values().cloned().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats.truncate(limit);
        chats
    }

    fn messages(&self, user_id: &str, chat_id: &str) -> Vec<ChatMessage> {
        let mut messages = self.users
            .get(user_id)
            .and_then(|u| u.messages.get(chat_id))
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        messages
    }
}

/// Process-local store. Subscriptions are fed from a broadcast of change events.
#[derive(Clone)]
pub struct MemoryHistoryStore {
    inner: Arc<RwLock<Inner>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            events,
        }
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers just means nobody is watching.
        let _ = self.events.send(event);
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn create_chat(
        &self,
        user_id: &str,
        title: &str,
        role: UserRole
    ) -> Result<String, StoreError> {
        let id = new_id();
        {
            let mut inner = self.inner.write().await;
            let now = inner.next_timestamp();
            let chat = Chat {
                id: id.clone(),
                title: derive_title(title),
                role,
                created_at: now,
                updated_at: now,
            };
            inner.users.entry(user_id.to_string()).or_default().chats.insert(id.clone(), chat);
        }
        debug!("Created chat {} for {}", id, user_id);
        self.notify(StoreEvent::Chats { user_id: user_id.to_string() });
        Ok(id)
    }

    async fn add_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: NewMessage
    ) -> Result<String, StoreError> {
        let id = new_id();
        {
            let mut inner = self.inner.write().await;
            let now = inner.next_timestamp();
            let user = inner.users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;
            let chat = user.chats
                .get_mut(chat_id)
                .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;
            chat.updated_at = now;
            if message.is_first_message {
                chat.title = derive_title(&message.text);
            }
            user.messages
                .entry(chat_id.to_string())
                .or_default()
                .push(message.into_message(id.clone(), now));
        }
        self.notify(StoreEvent::Messages {
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
        });
        self.notify(StoreEvent::Chats { user_id: user_id.to_string() });
        Ok(id)
    }

    async fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().await;
            let user = inner.users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::NotFound(chat_id.to_string()))?;
            if user.chats.remove(chat_id).is_none() {
                return Err(StoreError::NotFound(chat_id.to_string()));
            }
            user.messages.remove(chat_id);
        }
        debug!("Deleted chat {} for {}", chat_id, user_id);
        self.notify(StoreEvent::Messages {
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
        });
        self.notify(StoreEvent::Chats { user_id: user_id.to_string() });
        Ok(())
    }

    async fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(user_id).and_then(|u| u.chats.get(chat_id)).cloned())
    }

    async fn list_chats(&self, user_id: &str, limit: usize) -> Result<Vec<Chat>, StoreError> {
        Ok(self.inner.read().await.chat_list(user_id, limit))
    }

    async fn list_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self.inner.read().await.messages(user_id, chat_id))
    }

    async fn subscribe_chat_list(
        &self,
        user_id: &str
    ) -> Result<Subscription<Vec<Chat>>, StoreError> {
        // Subscribe before the first snapshot so no write can slip between them.
        let mut events = self.events.subscribe();
        let inner = Arc::clone(&self.inner);
        let user_id = user_id.to_string();

        Ok(
            Subscription::spawn(move |tx| async move {
                loop {
                    let snapshot = inner.read().await.chat_list(&user_id, CHAT_LIST_LIMIT);
                    if tx.send(snapshot).await.is_err() {
                        return;
                    }
                    loop {
                        match events.recv().await {
                            Ok(StoreEvent::Chats { user_id: ref u }) if *u == user_id => {
                                break;
                            }
                            Ok(_) => {
                                continue;
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                debug!("Chat list subscription lagged by {} events", skipped);
                                break;
                            }
                            Err(RecvError::Closed) => {
                                return;
                            }
                        }
                    }
                }
            })
        )
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        chat_id: &str
    ) -> Result<Subscription<Vec<ChatMessage>>, StoreError> {
        let mut events = self.events.subscribe();
        let inner = Arc::clone(&self.inner);
        let user_id = user_id.to_string();
        let chat_id = chat_id.to_string();

        Ok(
            Subscription::spawn(move |tx| async move {
                loop {
                    let snapshot = inner.read().await.messages(&user_id, &chat_id);
                    if tx.send(snapshot).await.is_err() {
                        return;
                    }
                    loop {
                        match events.recv().await {
                            Ok(StoreEvent::Messages { user_id: ref u, chat_id: ref c }) if
                                *u == user_id && *c == chat_id
                            => {
                                break;
                            }
                            Ok(_) => {
                                continue;
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                debug!("Message subscription lagged by {} events", skipped);
                                break;
                            }
                            Err(RecvError::Closed) => {
                                return;
                            }
                        }
                    }
                }
            })
        )
    }

    async fn save_summary(&self, user_id: &str, summary: NewSummary) -> Result<String, StoreError> {
        let id = new_id();
        let mut inner = self.inner.write().await;
        let timestamp = inner.next_timestamp();
        inner.users
            .entry(user_id.to_string())
            .or_default()
            .summaries.push(SummaryRecord {
                id: id.clone(),
                file_name: summary.file_name,
                file_url: summary.file_url,
                user_id: user_id.to_string(),
                model_used: summary.model_used,
                summary_text: summary.summary_text,
                timestamp,
            });
        Ok(id)
    }

    async fn list_summaries(&self, user_id: &str) -> Result<Vec<SummaryRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(
            inner.users
                .get(user_id)
                .map(|u| u.summaries.clone())
                .unwrap_or_default()
        )
    }
}
