//! healthchat: student health chat backend.
//!
//! This is the application entry point. It loads configuration from a TOML
//! file and the environment, initializes tracing, connects the store and the
//! LLM client, builds the Axum router and runs the HTTP server.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use healthchat::config::{AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use healthchat::http::start_server;
use healthchat::llm::LlmClient;
use healthchat::{create_router, store, AppState};

/// healthchat: LLM-backed health chat for students
#[derive(Parser, Debug)]
#[command(name = "healthchat", version, about)]
struct Args {
    /// Path to configuration file (built-in defaults are used if it is missing)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "healthchat=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing .env file is normal in deployed environments
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load_with_env(&args.config)?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry = tracing_subscriber::registry().with(EnvFilter::new(&log_filter));
    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    tracing::info!(
        config = %args.config,
        personalized = config.chat.personalized,
        store = ?config.store.backend,
        backend_url = %config.chat.backend_url,
        "Loaded configuration"
    );

    let llm = LlmClient::new(&config.llm)?;
    tracing::info!(model = %llm.model(), site = %config.llm.site_name, "Initialized LLM client");

    let store = store::connect(&config.store).await?;
    tracing::info!(backend = store.backend(), "Initialized store");

    let state = AppState::new(config.clone(), llm, store);
    let app = create_router(state);

    start_server(app, &config).await?;

    Ok(())
}
