//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::store::SharedStore;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Contains the application configuration, the LLM provider client and the
/// persistence backend.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm: LlmClient,
    pub store: SharedStore,
}

impl AppState {
    /// Creates a new application state from the given configuration, LLM client and store.
    pub fn new(config: AppConfig, llm: LlmClient, store: SharedStore) -> Self {
        Self {
            config: Arc::new(config),
            llm,
            store,
        }
    }
}
