use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

use crate::api::inference::InferenceClient;
use crate::api::{ ApiClient, LegalBackend };
use crate::cli::Command;
use crate::config::models::MODELS;
use crate::config::topics::{ topic_by_id, TOPICS };
use crate::config::{ ClientConfig, HistoryType };
use crate::history::{ format_transcript, initialize_history_store, HistoryStore, CHAT_LIST_LIMIT };
use crate::models::chat::{ MessageRole, UserRole };
use crate::session::{ ChatSession, SendOutcome };
use crate::storage::{ LocalBlobStorage, LocalFile };
use crate::summarizer::{ InputMode, Summarizer };

pub type AppResult = Result<(), Box<dyn Error + Send + Sync>>;

const CHAT_HELP: &str =
    "Commands: /new, /chats, /open <id>, /delete <id>, /role <lawyer|judge|student>, \
/topic <id>, /good, /bad, /history, /quit";

/// Settings the interactive chat carries between lines.
struct ReplState {
    role: UserRole,
    topic: String,
    last_query: Option<String>,
}

impl ReplState {
    fn new(role: UserRole, topic: &str) -> Self {
        Self { role, topic: topic.to_string(), last_query: None }
    }
}

#[derive(Debug, PartialEq)]
enum ReplFlow {
    Continue,
    Quit,
}

pub struct App {
    config: ClientConfig,
    user: Option<String>,
    api: Arc<ApiClient>,
    store: Arc<dyn HistoryStore>,
}

impl App {
    pub fn new(config: ClientConfig, user: Option<String>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api = Arc::new(ApiClient::new(&config));
        let store = initialize_history_store(&config)?;
        if config.history_type == HistoryType::Memory {
            warn!("Memory history does not survive this process; use --history-type redis to keep chats");
        }
        Ok(Self { config, user, api, store })
    }

    pub async fn execute(&self, command: Command) -> AppResult {
        match command {
            Command::Chat { role, topic, chat } => self.chat(role, &topic, chat).await,
            Command::Ask { query, role, topic, chat } => self.ask(&query, role, &topic, chat).await,
            Command::Chats => self.list_chats().await,
            Command::Show { chat_id } => self.show(&chat_id).await,
            Command::Delete { chat_id } => self.delete(&chat_id).await,
            Command::Summarize { text, file, model, direct } => self.summarize(text, file, &model, direct).await,
            Command::Feedback { query, rating, role } => self.feedback(&query, rating, role).await,
            Command::Health => self.health().await,
            Command::Models => {
                print_catalog();
                Ok(())
            }
        }
    }

    fn require_user(&self) -> Result<&str, Box<dyn Error + Send + Sync>> {
        self.user.as_deref().ok_or_else(|| "This command needs a signed-in user: pass --user or set CASECUT_USER".into())
    }

    async fn session(&self) -> Result<ChatSession, Box<dyn Error + Send + Sync>> {
        let user = self.require_user()?.to_string();
        let backend: Arc<dyn LegalBackend> = self.api.clone();
        Ok(ChatSession::new(Arc::clone(&self.store), backend, Some(user)).await?)
    }

    async fn ask(&self, query: &str, role: UserRole, topic: &str, chat: Option<String>) -> AppResult {
        check_topic(topic)?;
        let session = self.session().await?;
        if let Some(chat_id) = chat {
            session.select_chat(&chat_id).await?;
        }
        let outcome = session.send_message(query, role, topic).await;
        self.print_reply(&session, &outcome).await?;
        if let SendOutcome::Failed { message, .. } = outcome {
            return Err(message.into());
        }
        Ok(())
    }

    async fn chat(&self, role: UserRole, topic: &str, chat: Option<String>) -> AppResult {
        check_topic(topic)?;
        let session = self.session().await?;
        if let Some(chat_id) = chat {
            session.select_chat(&chat_id).await?;
        }
        let mut repl = ReplState::new(role, topic);

        println!("CaseCut research chat ({} view, topic: {}). {}", repl.role, repl.topic, CHAT_HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.handle_line(&session, &mut repl, line.trim()).await {
                Ok(ReplFlow::Continue) => {}
                Ok(ReplFlow::Quit) => break,
                Err(e) => println!("{}", e),
            }
        }
        Ok(())
    }

    /// Run one line of the interactive chat. Errors are for the caller to
    /// show; they never end the session.
    async fn handle_line(
        &self,
        session: &ChatSession,
        repl: &mut ReplState,
        line: &str
    ) -> Result<ReplFlow, Box<dyn Error + Send + Sync>> {
        if line.is_empty() {
            return Ok(ReplFlow::Continue);
        }
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };
        match command {
            "/quit" | "/exit" => {
                return Ok(ReplFlow::Quit);
            }
            "/help" => println!("{}", CHAT_HELP),
            "/new" => {
                session.start_new_chat().await;
                println!("Started a new conversation.");
            }
            "/chats" => {
                let uid = self.require_user()?;
                print_chats(&self.store.list_chats(uid, CHAT_LIST_LIMIT).await?);
            }
            "/open" | "/delete" if arg.is_empty() => {
                return Err(format!("Usage: {} <chat id>", command).into());
            }
            "/open" => {
                session.select_chat(arg).await?;
                self.print_chat(arg).await?;
            }
            "/delete" => {
                if !session.remove_chat(arg).await {
                    return Err(format!("Could not delete chat '{}'", arg).into());
                }
                println!("Deleted {}", arg);
            }
            "/history" =>
                match session.active_chat_id().await {
                    Some(id) => self.print_chat(&id).await?,
                    None => println!("No active conversation."),
                }
            "/role" => {
                repl.role = arg.parse::<UserRole>()?;
                println!("Answering as {} ({})", repl.role, repl.role.description());
            }
            "/topic" =>
                match topic_by_id(arg) {
                    Some(t) => {
                        repl.topic = t.id.to_string();
                        println!("Topic filter: {}", t.name);
                    }
                    None => println!("Unknown topic '{}'. Run `casecut models` for the list.", arg),
                }
            "/good" | "/bad" => {
                let Some(query) = repl.last_query.as_deref() else {
                    println!("Nothing to rate yet.");
                    return Ok(ReplFlow::Continue);
                };
                let rating = if command == "/good" { 1 } else { -1 };
                match session.send_feedback(query, rating, repl.role).await {
                    Ok(()) => println!("Thanks for the feedback."),
                    Err(e) => println!("Feedback failed: {}", e),
                }
            }
            _ if command.starts_with('/') => println!("Unknown command. {}", CHAT_HELP),
            _ => {
                repl.last_query = Some(line.to_string());
                let outcome = session.send_message(line, repl.role, &repl.topic).await;
                self.print_reply(session, &outcome).await?;
            }
        }
        Ok(ReplFlow::Continue)
    }

    async fn print_reply(&self, session: &ChatSession, outcome: &SendOutcome) -> AppResult {
        let uid = self.require_user()?;
        let chat_id = match outcome {
            SendOutcome::Skipped => {
                return Ok(());
            }
            SendOutcome::Answered { chat_id } => Some(chat_id.clone()),
            SendOutcome::Failed { chat_id, .. } => chat_id.clone(),
        };
        let Some(chat_id) = chat_id.or(session.active_chat_id().await) else {
            return Ok(());
        };
        let messages = self.store.list_messages(uid, &chat_id).await?;
        if let Some(reply) = messages.iter().rev().find(|m| m.role == MessageRole::Assistant) {
            print!("{}", format_transcript(std::slice::from_ref(reply)));
        }
        Ok(())
    }

    async fn print_chat(&self, chat_id: &str) -> AppResult {
        let uid = self.require_user()?;
        let Some(chat) = self.store.get_chat(uid, chat_id).await? else {
            return Err(format!("Chat '{}' not found", chat_id).into());
        };
        println!("# {} ({})", chat.title, chat.role);
        print!("{}", format_transcript(&self.store.list_messages(uid, chat_id).await?));
        Ok(())
    }

    async fn list_chats(&self) -> AppResult {
        let uid = self.require_user()?;
        print_chats(&self.store.list_chats(uid, CHAT_LIST_LIMIT).await?);
        Ok(())
    }

    async fn show(&self, chat_id: &str) -> AppResult {
        self.print_chat(chat_id).await
    }

    async fn delete(&self, chat_id: &str) -> AppResult {
        let uid = self.require_user()?;
        self.store.delete_chat(uid, chat_id).await?;
        info!("Deleted chat {}", chat_id);
        Ok(())
    }

    async fn summarize(
        &self,
        text: Option<String>,
        file: Option<String>,
        model: &str,
        direct: bool
    ) -> AppResult {
        let uid = self.require_user()?;
        let backend: Arc<dyn LegalBackend> = self.api.clone();
        let storage = Arc::new(LocalBlobStorage::new(&self.config.storage_dir));
        let mut summarizer = Summarizer::new(uid, backend, Arc::clone(&self.store), storage);
        if direct {
            summarizer = summarizer.with_direct_inference(InferenceClient::new(&self.config));
        }
        if !summarizer.select_model(model) {
            return Err(summarizer.error().unwrap_or("Unknown model").to_string().into());
        }

        match (text, file) {
            (_, Some(path)) => {
                summarizer.set_mode(InputMode::Pdf);
                if !summarizer.select_file(LocalFile::read(&path).await?) {
                    return Err(summarizer.error().unwrap_or("Invalid file").to_string().into());
                }
                summarizer.on_progress(Arc::new(|pct: u8| eprint!("\rUploading... {:>3}%", pct)));
            }
            (Some(text), None) => {
                summarizer.set_mode(InputMode::Text);
                summarizer.set_text(text);
            }
            (None, None) => {
                return Err("Pass --text or --file".into());
            }
        }

        summarizer.generate().await;
        if summarizer.mode() == InputMode::Pdf {
            eprintln!();
        }
        match summarizer.error() {
            Some(e) => Err(e.to_string().into()),
            None => {
                println!("{}", summarizer.summary());
                Ok(())
            }
        }
    }

    async fn feedback(&self, query: &str, rating: i8, role: UserRole) -> AppResult {
        if rating != 1 && rating != -1 {
            return Err("Rating must be 1 or -1".into());
        }
        self.api.send_feedback(
            &(crate::models::api::FeedbackRequest {
                query: query.to_string(),
                rating,
                role,
            })
        ).await?;
        println!("Feedback recorded.");
        Ok(())
    }

    async fn health(&self) -> AppResult {
        let status = self.api.health().await;
        if status.connected {
            println!("Connected to {}: {}", self.api.base_url(), status.details);
            Ok(())
        } else {
            Err(format!("Backend at {} is not reachable", self.api.base_url()).into())
        }
    }
}

fn check_topic(topic: &str) -> AppResult {
    if topic_by_id(topic).is_none() {
        return Err(format!("Unknown topic '{}'. Run `casecut models` for the list.", topic).into());
    }
    Ok(())
}

fn print_chats(chats: &[crate::models::chat::Chat]) {
    if chats.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for chat in chats {
        let updated = chrono::DateTime::from_timestamp_millis(chat.updated_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}  {}  [{}] {}", chat.id, updated, chat.role, chat.title);
    }
}

fn print_catalog() {
    println!("Models:");
    for model in MODELS {
        println!("  {:<20} {:<22} {:<12} {}", model.id, model.name, model.provider.as_str(), model.description);
    }
    println!("Roles:");
    for role in UserRole::ALL {
        println!("  {:<20} {}", role.as_str(), role.description());
    }
    println!("Topics:");
    for topic in TOPICS {
        println!("  {:<20} {}", topic.id, topic.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn app_and_session() -> (App, ChatSession) {
        let app = App::new(ClientConfig::default(), Some("u1".to_string())).unwrap();
        let session = app.session().await.unwrap();
        (app, session)
    }

    #[tokio::test]
    async fn unknown_chat_is_reported_and_the_chat_goes_on() {
        let (app, session) = app_and_session().await;
        let mut repl = ReplState::new(UserRole::Lawyer, "all");

        let err = app.handle_line(&session, &mut repl, "/open nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Chat 'nope' not found");
        assert_eq!(session.active_chat_id().await, None);

        assert_eq!(app.handle_line(&session, &mut repl, "/history").await.unwrap(), ReplFlow::Continue);
        assert_eq!(app.handle_line(&session, &mut repl, "/chats").await.unwrap(), ReplFlow::Continue);
        assert_eq!(app.handle_line(&session, &mut repl, "/quit").await.unwrap(), ReplFlow::Quit);
    }

    #[tokio::test]
    async fn open_switches_to_an_existing_chat() {
        let (app, session) = app_and_session().await;
        let mut repl = ReplState::new(UserRole::Lawyer, "all");
        let chat = app.store.create_chat("u1", "Bail in NDPS cases", UserRole::Lawyer).await.unwrap();

        let line = format!("/open {}", chat);
        assert_eq!(app.handle_line(&session, &mut repl, &line).await.unwrap(), ReplFlow::Continue);
        assert_eq!(session.active_chat_id().await.as_deref(), Some(chat.as_str()));
    }

    #[tokio::test]
    async fn delete_reports_missing_chats() {
        let (app, session) = app_and_session().await;
        let mut repl = ReplState::new(UserRole::Lawyer, "all");
        assert!(app.handle_line(&session, &mut repl, "/delete nope").await.is_err());
        assert!(app.handle_line(&session, &mut repl, "/delete").await.is_err());

        let chat = app.store.create_chat("u1", "q", UserRole::Lawyer).await.unwrap();
        let line = format!("/delete {}", chat);
        assert_eq!(app.handle_line(&session, &mut repl, &line).await.unwrap(), ReplFlow::Continue);
        assert!(app.store.get_chat("u1", &chat).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_changes_stick_and_bad_roles_are_reported() {
        let (app, session) = app_and_session().await;
        let mut repl = ReplState::new(UserRole::Lawyer, "all");
        app.handle_line(&session, &mut repl, "/role judge").await.unwrap();
        assert_eq!(repl.role, UserRole::Judge);
        assert!(app.handle_line(&session, &mut repl, "/role clerk").await.is_err());
        assert_eq!(repl.role, UserRole::Judge);
    }
}
