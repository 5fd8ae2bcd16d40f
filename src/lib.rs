pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod history;
pub mod models;
pub mod session;
pub mod storage;
pub mod summarizer;

use app::{ App, AppResult };
use cli::Args;
use config::{ ClientConfig, HistoryType };
use log::info;

pub async fn run(args: Args) -> AppResult {
    let config = ClientConfig::from_args(&args)?;

    info!("--- Client Configuration ---");
    info!("Backend URL: {}", config.api_url);
    info!("Health Timeout: {:?}", config.health_timeout);
    info!("Inference Token: {}", if config.inference_token.is_some() { "set" } else { "not set" });
    info!("History Store Type: {:?}", config.history_type);
    if config.history_type == HistoryType::Redis {
        info!("History Store Host: {}", config.history_host);
        info!("History Key Prefix: {}", config.history_redis_prefix);
    }
    info!("Storage Directory: {}", config.storage_dir);
    info!("User: {}", args.user.as_deref().unwrap_or("(none)"));
    info!("----------------------------");

    let app = App::new(config, args.user.clone())?;
    app.execute(args.command).await
}
