//! healthchat: a student health chat backend.
//!
//! Forwards chat messages to an OpenAI-compatible LLM provider. In
//! personalized mode each prompt carries the student's profile, recent
//! health measurements and conversation history from MongoDB, and every
//! exchange is written back to the student's transcript.

pub mod assessment;
pub mod bmi;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod llm;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
