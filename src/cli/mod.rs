use clap::{ Parser, Subcommand };
use crate::models::chat::UserRole;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the CaseCut backend (e.g., http://localhost:8000)
    #[arg(long, env = "API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Timeout in seconds for the backend health probe.
    #[arg(long, env = "HEALTH_TIMEOUT_SECS", default_value = "5")]
    pub health_timeout_secs: u64,

    // --- Inference Args ---
    /// Token for the hosted inference API, used only for direct summarization.
    #[arg(long, env = "HF_API_TOKEN", default_value = "")]
    pub hf_api_token: String,

    /// Base URL of the hosted inference API; the model path is appended.
    #[arg(long, env = "HF_INFERENCE_URL", default_value = "https://api-inference.huggingface.co/models")]
    pub hf_inference_url: String,

    // --- History Store Args ---
    /// History chat store type (memory, redis)
    #[arg(long, env = "HISTORY_TYPE", default_value = "memory")]
    pub history_type: String,

    /// History chat store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys and notification channels.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "casecut:")]
    pub history_redis_prefix: String,

    // --- Upload Args ---
    /// Directory that uploaded PDFs are copied into.
    #[arg(long, env = "STORAGE_DIR", default_value = "uploads")]
    pub storage_dir: String,

    // --- General App Args ---
    /// Identifier of the signed-in user. Commands touching history require it.
    #[arg(short = 'u', long, env = "CASECUT_USER")]
    pub user: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive research chat. Type a question per line, `/help` for commands.
    Chat {
        #[arg(short, long, default_value = "lawyer")]
        role: UserRole,
        #[arg(short, long, default_value = "all")]
        topic: String,
        /// Resume an existing chat instead of starting a new one.
        #[arg(long)]
        chat: Option<String>,
    },
    /// Send a single question and print the answer.
    Ask {
        query: String,
        #[arg(short, long, default_value = "lawyer")]
        role: UserRole,
        #[arg(short, long, default_value = "all")]
        topic: String,
        #[arg(long)]
        chat: Option<String>,
    },
    /// List the user's chats, most recent first.
    Chats,
    /// Print the transcript of one chat.
    Show {
        chat_id: String,
    },
    /// Delete a chat and its messages.
    Delete {
        chat_id: String,
    },
    /// Summarize pasted text or a PDF document.
    Summarize {
        /// Text to summarize.
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Path to a PDF file to upload and summarize.
        #[arg(long)]
        file: Option<String>,
        /// Model id from `models`.
        #[arg(short, long, default_value = "casecut-legal")]
        model: String,
        /// Call the hosted inference API directly instead of the backend (text only).
        #[arg(long, default_value = "false")]
        direct: bool,
    },
    /// Rate an answer: 1 for thumbs up, -1 for thumbs down.
    Feedback {
        query: String,
        #[arg(allow_hyphen_values = true)]
        rating: i8,
        #[arg(short, long, default_value = "lawyer")]
        role: UserRole,
    },
    /// Probe the backend.
    Health,
    /// List available models, roles and topics.
    Models,
}
