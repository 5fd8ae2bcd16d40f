//! View state for one signed-in user: the chat list, the active chat and its
//! messages, kept live through store subscriptions, plus the send-message
//! protocol that ties the store and the backend together.

use log::{ debug, error, info, warn };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Mutex as StdMutex };
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::{ ApiError, FailureKind, LegalBackend };
use crate::config::models::DEFAULT_MODEL_ID;
use crate::history::{ HistoryStore, StoreError };
use crate::models::api::{ FeedbackRequest, QueryRequest };
use crate::models::chat::{ derive_title, Chat, ChatMessage, NewMessage, UserRole };

/// Every failure reply starts with this.
pub const ERROR_MARKER: &str = "⚠️";

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SendError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SendError::Api(e) => e.kind(),
            SendError::Store(_) => FailureKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input or nobody signed in; nothing was written.
    Skipped,
    Answered {
        chat_id: String,
    },
    /// A failure reply was recorded (best effort) in `chat_id`.
    Failed {
        chat_id: Option<String>,
        kind: FailureKind,
        message: String,
    },
}

#[derive(Default)]
struct ViewState {
    chat_list: Vec<Chat>,
    active_chat_id: Option<String>,
    messages: Vec<ChatMessage>,
}

type TaskSlot = StdMutex<Option<JoinHandle<()>>>;

fn replace_task(slot: &TaskSlot, task: Option<JoinHandle<()>>) {
    let mut guard = match slot.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(old) = guard.take() {
        old.abort();
    }
    *guard = task;
}

pub struct ChatSession {
    user_id: Option<String>,
    store: Arc<dyn HistoryStore>,
    backend: Arc<dyn LegalBackend>,
    state: Arc<RwLock<ViewState>>,
    loading: AtomicBool,
    chat_list_sync: TaskSlot,
    message_sync: TaskSlot,
}

impl ChatSession {
    /// Build a session and, when a user is signed in, start following their
    /// chat list.
    pub async fn new(
        store: Arc<dyn HistoryStore>,
        backend: Arc<dyn LegalBackend>,
        user_id: Option<String>
    ) -> Result<Self, StoreError> {
        let session = Self {
            user_id,
            store,
            backend,
            state: Arc::new(RwLock::new(ViewState::default())),
            loading: AtomicBool::new(false),
            chat_list_sync: StdMutex::new(None),
            message_sync: StdMutex::new(None),
        };

        if let Some(uid) = session.user_id.as_deref() {
            let mut sub = session.store.subscribe_chat_list(uid).await?;
            let state = Arc::clone(&session.state);
            let task = tokio::spawn(async move {
                while let Some(chats) = sub.next().await {
                    state.write().await.chat_list = chats;
                }
            });
            replace_task(&session.chat_list_sync, Some(task));
            debug!("Following chat list for {}", uid);
        }
        Ok(session)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub async fn chat_list(&self) -> Vec<Chat> {
        self.state.read().await.chat_list.clone()
    }

    pub async fn active_chat_id(&self) -> Option<String> {
        self.state.read().await.active_chat_id.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Forget the active chat; the next send creates a new one.
    pub async fn start_new_chat(&self) {
        self.activate(None).await;
    }

    /// Make `chat_id` the active chat. An unknown id leaves the current
    /// selection in place.
    pub async fn select_chat(&self, chat_id: &str) -> Result<(), StoreError> {
        if let Some(uid) = self.user_id.as_deref() {
            if self.store.get_chat(uid, chat_id).await?.is_none() {
                return Err(StoreError::NotFound(chat_id.to_string()));
            }
        }
        self.activate(Some(chat_id.to_string())).await;
        Ok(())
    }

    /// Delete a chat and its messages. Failures are logged; the return value
    /// says whether the chat was removed.
    pub async fn remove_chat(&self, chat_id: &str) -> bool {
        let Some(uid) = self.user_id.as_deref() else {
            return false;
        };
        if let Err(e) = self.store.delete_chat(uid, chat_id).await {
            error!("removeChat error: {}", e);
            return false;
        }
        if self.active_chat_id().await.as_deref() == Some(chat_id) {
            self.activate(None).await;
        }
        true
    }

    pub async fn send_feedback(&self, query: &str, rating: i8, role: UserRole) -> Result<(), ApiError> {
        self.backend.feedback(
            &(FeedbackRequest {
                query: query.to_string(),
                rating,
                role,
            })
        ).await
    }

    /// Record the question, ask the backend, record the answer. Exactly one
    /// assistant entry is appended per attempt, a failure reply included; no
    /// error is returned to the caller.
    pub async fn send_message(&self, text: &str, role: UserRole, topic: &str) -> SendOutcome {
        let Some(uid) = self.user_id.as_deref() else {
            return SendOutcome::Skipped;
        };
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Skipped;
        }

        self.loading.store(true, Ordering::SeqCst);
        let mut chat_id = self.active_chat_id().await;

        let outcome = match self.exchange(uid, text, role, topic, &mut chat_id).await {
            Ok(id) => SendOutcome::Answered { chat_id: id },
            Err(err) => {
                error!("sendMessage error: {}", err);
                if let Some(cid) = chat_id.as_deref() {
                    let reply = failure_reply(&err, &self.backend.endpoint());
                    if let Err(e) = self.store.add_message(uid, cid, NewMessage::assistant(reply)).await {
                        warn!("Could not record failure reply in chat {}: {}", cid, e);
                    }
                }
                SendOutcome::Failed {
                    chat_id,
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };

        self.loading.store(false, Ordering::SeqCst);
        outcome
    }

    async fn exchange(
        &self,
        uid: &str,
        text: &str,
        role: UserRole,
        topic: &str,
        chat_id: &mut Option<String>
    ) -> Result<String, SendError> {
        let is_new = chat_id.is_none();
        let cid = match chat_id.clone() {
            Some(id) => id,
            None => {
                let id = self.store.create_chat(uid, &derive_title(text), role).await?;
                info!("Started chat {}", id);
                *chat_id = Some(id.clone());
                self.activate(Some(id.clone())).await;
                id
            }
        };

        self.store.add_message(uid, &cid, NewMessage::user(text, is_new)).await?;

        let result = self.backend.query(&QueryRequest::new(text, role, topic)).await?;
        debug!(
            "Query answered from {} with {} cases ({} retrieved, {} ms)",
            result.source,
            result.cases.len(),
            result.total_retrieved,
            result.llm_time_ms
        );

        let reply = NewMessage::assistant(result.summary)
            .with_cases(result.cases)
            .with_model(model_tag(&result.source));
        self.store.add_message(uid, &cid, reply).await?;
        Ok(cid)
    }

    async fn activate(&self, chat_id: Option<String>) {
        replace_task(&self.message_sync, None);
        {
            let mut state = self.state.write().await;
            state.active_chat_id = chat_id.clone();
            state.messages.clear();
        }

        let (Some(uid), Some(cid)) = (self.user_id.as_deref(), chat_id) else {
            return;
        };
        let mut sub = match self.store.subscribe_messages(uid, &cid).await {
            Ok(sub) => sub,
            Err(e) => {
                error!("Could not follow messages of chat {}: {}", cid, e);
                return;
            }
        };

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            while let Some(messages) = sub.next().await {
                let mut state = state.write().await;
                // A newer selection owns the message list.
                if state.active_chat_id.as_deref() != Some(cid.as_str()) {
                    return;
                }
                state.messages = messages;
            }
        });
        replace_task(&self.message_sync, Some(task));
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        replace_task(&self.chat_list_sync, None);
        replace_task(&self.message_sync, None);
    }
}

pub fn model_tag(source: &str) -> String {
    if source.trim().is_empty() {
        DEFAULT_MODEL_ID.to_string()
    } else {
        format!("{}:{}", DEFAULT_MODEL_ID, source.trim())
    }
}

/// Transcript text describing a failed send and what to do about it.
pub fn failure_reply(err: &SendError, backend_url: &str) -> String {
    match err {
        SendError::Api(api) =>
            match api.kind() {
                FailureKind::Network =>
                    format!(
                        "{} Cannot reach the CaseCut backend at {}. Make sure the server is running, then try again.",
                        ERROR_MARKER,
                        backend_url
                    ),
                FailureKind::Server =>
                    format!(
                        "{} The server returned an error ({}): {}. {}",
                        ERROR_MARKER,
                        api.status(),
                        api,
                        api.hint().unwrap_or("Please try again in a moment.")
                    ),
                FailureKind::Other =>
                    format!(
                        "{} Unable to process your request: {}. {}",
                        ERROR_MARKER,
                        api,
                        api.hint().unwrap_or("Please check your connection and try again.")
                    ),
            }
        SendError::Store(store) =>
            format!(
                "{} Unable to process your request: {}. Please check your connection and try again.",
                ERROR_MARKER,
                store
            ),
    }
}
