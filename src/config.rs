//! Configuration loading and constants.
//!
//! Loads application configuration from a TOML file, then applies overrides
//! from the process environment (optionally seeded from a `.env` file).
//! `AppConfig` is the root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// LLM Provider Defaults
// =============================================================================

/// Base URL of the OpenAI-compatible provider API
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent sent with every provider request
pub const LLM_USER_AGENT: &str = formatcp!(
    "{}/{}",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_VERSION")
);

/// Model used for every completion request
pub const DEFAULT_LLM_MODEL: &str = "google/gemma-3n-e4b-it:free";

/// Sent as HTTP-Referer so the provider can attribute traffic
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Sent as X-Title alongside the referer
pub const DEFAULT_SITE_NAME: &str = "Health Chatbot";

/// Upper bound on a single completion request
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Chat Context Limits
// =============================================================================

/// Most recent stored messages included in a personalized prompt
pub const HISTORY_MESSAGE_LIMIT: usize = 10;

/// Most recent health snapshots included in a personalized prompt
pub const HEALTH_SNAPSHOT_LIMIT: usize = 3;

// =============================================================================
// Store Defaults
// =============================================================================

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "campus_health";

/// Upper bound on a store ping from the health endpoint
pub const STORE_PING_TIMEOUT_SECS: u64 = 2;

pub const CHAT_COLLECTION: &str = "chatbots";
pub const HEALTH_COLLECTION: &str = "physicalfitnesses";
pub const PROFILE_COLLECTION: &str = "users";

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default backend base URL advertised to clients
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:9000";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "healthchat=debug,tower_http=debug";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Cache-Control value for every API response
pub const CACHE_CONTROL_API: &str = "no-store";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Persistence backend
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5000
    }
}

/// Settings for the OpenAI-compatible completion provider
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
    /// Bearer token; usually supplied through OPENROUTER_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "LlmConfig::default_site_url")]
    pub site_url: String,
    #[serde(default = "LlmConfig::default_site_name")]
    pub site_name: String,
    /// Request timeout in seconds
    #[serde(default = "LlmConfig::default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key: None,
            site_url: Self::default_site_url(),
            site_name: Self::default_site_name(),
            timeout_seconds: Self::default_timeout(),
        }
    }
}

impl LlmConfig {
    fn default_base_url() -> String {
        DEFAULT_LLM_BASE_URL.to_string()
    }

    fn default_model() -> String {
        DEFAULT_LLM_MODEL.to_string()
    }

    fn default_site_url() -> String {
        DEFAULT_SITE_URL.to_string()
    }

    fn default_site_name() -> String {
        DEFAULT_SITE_NAME.to_string()
    }

    fn default_timeout() -> u64 {
        DEFAULT_LLM_TIMEOUT_SECS
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Which persistence backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::Mongodb),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "Unknown store backend '{}' (expected \"mongodb\" or \"memory\")",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_backend")]
    pub backend: StoreBackend,
    /// MongoDB connection string
    #[serde(default = "StoreConfig::default_uri")]
    pub uri: String,
    /// Database holding the chat, health and profile collections
    #[serde(default = "StoreConfig::default_database")]
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Self::default_backend(),
            uri: Self::default_uri(),
            database: Self::default_database(),
        }
    }
}

impl StoreConfig {
    fn default_backend() -> StoreBackend {
        StoreBackend::Mongodb
    }

    fn default_uri() -> String {
        DEFAULT_MONGODB_URI.to_string()
    }

    fn default_database() -> String {
        DEFAULT_DATABASE.to_string()
    }
}

/// Chat endpoint behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Require a student id, build context from the store and record each exchange.
    /// When false, messages are forwarded to the provider as-is.
    #[serde(default = "ChatConfig::default_personalized")]
    pub personalized: bool,
    /// Base URL of the main backend, reported at startup
    #[serde(default = "ChatConfig::default_backend_url")]
    pub backend_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            personalized: Self::default_personalized(),
            backend_url: Self::default_backend_url(),
        }
    }
}

impl ChatConfig {
    fn default_personalized() -> bool {
        true
    }

    fn default_backend_url() -> String {
        DEFAULT_BACKEND_URL.to_string()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Parse a configuration file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from built-in defaults.
    /// Environment overrides are applied in both cases.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENROUTER_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("SITE_URL") {
            self.llm.site_url = url;
        }
        if let Some(name) = lookup("SITE_NAME") {
            self.llm.site_name = name;
        }
        if let Some(uri) = lookup("MONGODB_URI") {
            self.store.uri = uri;
        }
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(url) = lookup("BACKEND_URL") {
            self.chat.backend_url = url;
        }
        if let Some(port) = lookup("PORT") {
            self.http.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid PORT value '{}'", port)))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Mongodb && self.store.database.is_empty() {
            return Err(ConfigError::Validation(
                "store.database must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
