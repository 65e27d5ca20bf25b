//! Persistence for chat transcripts, health snapshots and student profiles.
//!
//! Backends implement the fallible `fetch_*`/`append_exchange` methods. The
//! provided methods are what request handlers call: they never fail, logging
//! the underlying error and degrading to "no data" instead.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{StoreBackend, StoreConfig, HEALTH_SNAPSHOT_LIMIT, HISTORY_MESSAGE_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The stored transcript for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub student_id: String,
    pub student_name: String,
    pub messages: Vec<ChatMessage>,
    pub last_message_time: DateTime<Utc>,
    pub last_message_sender: Sender,
    pub last_message_content: String,
}

impl ChatRecord {
    pub fn new(student_id: impl Into<String>, student_name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: student_name.into(),
            messages: Vec::new(),
            last_message_time: Utc::now(),
            last_message_sender: Sender::Bot,
            last_message_content: String::new(),
        }
    }

    /// Append a user/bot pair and point the last-message fields at the bot reply.
    pub fn push_exchange(&mut self, user: ChatMessage, bot: ChatMessage) {
        self.last_message_time = bot.timestamp;
        self.last_message_sender = bot.sender;
        self.last_message_content = bot.content.clone();
        self.messages.push(user);
        self.messages.push(bot);
    }

    /// The newest `limit` messages, oldest first.
    pub fn recent_messages(&self, limit: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub name: Option<String>,
    pub gender: Option<String>,
    /// Date of birth as entered (`YYYY-MM-DD` or `DD/MM/YYYY`)
    pub dob: Option<String>,
    /// Study programme
    pub major: Option<String>,
    pub cohort: Option<String>,
}

impl StudentProfile {
    /// Age in whole years on `today`, when the date of birth parses.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.dob.as_deref()?.trim();
        let born = NaiveDate::parse_from_str(dob, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(dob, "%d/%m/%Y"))
            .ok()?;
        let mut age = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// One recorded set of measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub follow_date: Option<String>,
    /// Centimetres
    pub height: Option<f64>,
    /// Kilograms
    pub weight: Option<f64>,
    /// BMI as recorded by the clinic, may be empty
    pub bmi: Option<String>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub heart_rate: Option<f64>,
}

/// Everything the context builder knows about a student.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentHealthData {
    pub profile: Option<StudentProfile>,
    /// Newest first
    pub snapshots: Vec<HealthSnapshot>,
}

pub type SharedStore = Arc<dyn ChatStore>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Newest `limit` messages for a student, oldest first.
    async fn fetch_recent_messages(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    async fn fetch_profile(&self, student_id: &str) -> Result<Option<StudentProfile>, StoreError>;

    /// Newest `limit` snapshots, newest first.
    async fn fetch_recent_snapshots(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<HealthSnapshot>, StoreError>;

    /// Push both messages and update the last-message fields, creating the
    /// record if the student has none yet.
    async fn append_exchange(
        &self,
        student_id: &str,
        student_name: &str,
        user: ChatMessage,
        bot: ChatMessage,
    ) -> Result<(), StoreError>;

    async fn fetch_chat_record(&self, student_id: &str) -> Result<Option<ChatRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Last stored messages, or none when the store fails.
    async fn get_conversation_history(&self, student_id: &str) -> Vec<ChatMessage> {
        match self
            .fetch_recent_messages(student_id, HISTORY_MESSAGE_LIMIT)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(student_id, error = %e, "Failed to load conversation history");
                Vec::new()
            }
        }
    }

    /// Profile plus recent snapshots; `None` for unknown students or on error.
    async fn get_student_health_data(&self, student_id: &str) -> Option<StudentHealthData> {
        let profile = match self.fetch_profile(student_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(student_id, error = %e, "Failed to load student profile");
                return None;
            }
        };
        let snapshots = match self
            .fetch_recent_snapshots(student_id, HEALTH_SNAPSHOT_LIMIT)
            .await
        {
            Ok(snapshots) => snapshots,
            Err(e) => {
                tracing::error!(student_id, error = %e, "Failed to load health snapshots");
                return None;
            }
        };

        if profile.is_none() && snapshots.is_empty() {
            return None;
        }
        Some(StudentHealthData { profile, snapshots })
    }

    /// Record an exchange. Failures are logged and otherwise ignored.
    async fn save_message_to_db(
        &self,
        student_id: &str,
        student_name: &str,
        user_message: &str,
        bot_message: &str,
    ) {
        let user = ChatMessage::user(user_message);
        let bot = ChatMessage::bot(bot_message);
        if let Err(e) = self
            .append_exchange(student_id, student_name, user, bot)
            .await
        {
            tracing::error!(student_id, error = %e, "Failed to save chat exchange");
        }
    }

    async fn is_connected(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(backend = self.backend(), error = %e, "Store ping failed");
                false
            }
        }
    }
}

/// Create the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    match config.backend {
        StoreBackend::Mongodb => Ok(Arc::new(MongoStore::connect(config).await?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
