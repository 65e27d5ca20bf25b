//! MongoDB backend.
//!
//! Documents keep the camelCase field names the rest of the platform writes,
//! so the collections can be shared with the main backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::config::{
    StoreConfig, CHAT_COLLECTION, HEALTH_COLLECTION, PROFILE_COLLECTION, STORE_PING_TIMEOUT_SECS,
};

use super::{
    ChatMessage, ChatRecord, ChatStore, HealthSnapshot, Sender, StoreError, StudentProfile,
};

#[derive(Debug, Serialize, Deserialize)]
struct MessageDocument {
    sender: Sender,
    content: String,
    timestamp: BsonDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatDocument {
    student_id: String,
    #[serde(default)]
    student_name: String,
    #[serde(default)]
    messages: Vec<MessageDocument>,
    last_message_time: Option<BsonDateTime>,
    last_message_sender: Option<Sender>,
    last_message_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    follow_date: Option<String>,
    height: Option<f64>,
    weight: Option<f64>,
    /// Usually a string, older imports stored a number
    bmi: Option<Bson>,
    systolic: Option<f64>,
    diastolic: Option<f64>,
    heart_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    name: Option<String>,
    gender: Option<String>,
    dob: Option<String>,
    major: Option<String>,
    cohort: Option<String>,
}

fn to_chrono(value: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

fn to_bson_time(value: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(value.timestamp_millis())
}

fn message_document(message: &ChatMessage) -> Document {
    doc! {
        "sender": message.sender.as_str(),
        "content": message.content.as_str(),
        "timestamp": to_bson_time(message.timestamp),
    }
}

impl From<MessageDocument> for ChatMessage {
    fn from(doc: MessageDocument) -> Self {
        Self {
            sender: doc.sender,
            content: doc.content,
            timestamp: to_chrono(doc.timestamp),
        }
    }
}

impl From<ChatDocument> for ChatRecord {
    fn from(doc: ChatDocument) -> Self {
        Self {
            student_id: doc.student_id,
            student_name: doc.student_name,
            messages: doc.messages.into_iter().map(ChatMessage::from).collect(),
            last_message_time: doc.last_message_time.map(to_chrono).unwrap_or_default(),
            last_message_sender: doc.last_message_sender.unwrap_or(Sender::Bot),
            last_message_content: doc.last_message_content.unwrap_or_default(),
        }
    }
}

impl From<SnapshotDocument> for HealthSnapshot {
    fn from(doc: SnapshotDocument) -> Self {
        let bmi = match doc.bmi {
            Some(Bson::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Bson::Double(v)) => Some(format!("{:.2}", v)),
            Some(Bson::Int32(v)) => Some(v.to_string()),
            Some(Bson::Int64(v)) => Some(v.to_string()),
            _ => None,
        };
        Self {
            follow_date: doc.follow_date,
            height: doc.height,
            weight: doc.weight,
            bmi,
            systolic: doc.systolic,
            diastolic: doc.diastolic,
            heart_rate: doc.heart_rate,
        }
    }
}

impl From<ProfileDocument> for StudentProfile {
    fn from(doc: ProfileDocument) -> Self {
        Self {
            name: doc.name,
            gender: doc.gender,
            dob: doc.dob,
            major: doc.major,
            cohort: doc.cohort,
        }
    }
}

/// Store backed by a process-wide MongoDB client.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Parse the connection string and create the client.
    ///
    /// The driver connects lazily, so an unreachable server is reported by
    /// the first query or ping rather than here.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let db = client.database(&config.database);
        tracing::info!(database = %config.database, "MongoDB client created");
        Ok(Self { client, db })
    }

    fn chats(&self) -> Collection<ChatDocument> {
        self.db.collection(CHAT_COLLECTION)
    }

    fn snapshots(&self) -> Collection<SnapshotDocument> {
        self.db.collection(HEALTH_COLLECTION)
    }

    fn profiles(&self) -> Collection<ProfileDocument> {
        self.db.collection(PROFILE_COLLECTION)
    }
}

#[async_trait]
impl ChatStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn fetch_recent_messages(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let slice = -i64::try_from(limit).unwrap_or(i64::MAX);
        let record = self
            .chats()
            .find_one(doc! { "studentId": student_id })
            .projection(doc! { "messages": { "$slice": slice } })
            .await?;

        Ok(record
            .map(|r| r.messages.into_iter().map(ChatMessage::from).collect())
            .unwrap_or_default())
    }

    async fn fetch_profile(&self, student_id: &str) -> Result<Option<StudentProfile>, StoreError> {
        let profile = self
            .profiles()
            .find_one(doc! { "studentId": student_id })
            .await?;
        Ok(profile.map(StudentProfile::from))
    }

    async fn fetch_recent_snapshots(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<HealthSnapshot>, StoreError> {
        let cursor = self
            .snapshots()
            .find(doc! { "studentId": student_id })
            .sort(doc! { "_id": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?;
        let documents: Vec<SnapshotDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(HealthSnapshot::from).collect())
    }

    async fn append_exchange(
        &self,
        student_id: &str,
        student_name: &str,
        user: ChatMessage,
        bot: ChatMessage,
    ) -> Result<(), StoreError> {
        let update = doc! {
            "$push": {
                "messages": { "$each": [message_document(&user), message_document(&bot)] }
            },
            "$set": {
                "lastMessageTime": to_bson_time(bot.timestamp),
                "lastMessageSender": bot.sender.as_str(),
                "lastMessageContent": bot.content.as_str(),
            },
            "$setOnInsert": { "studentName": student_name },
        };

        let result = self
            .chats()
            .update_one(doc! { "studentId": student_id }, update)
            .upsert(true)
            .await?;

        tracing::debug!(
            student_id,
            matched = result.matched_count,
            inserted = result.upserted_id.is_some(),
            "Chat exchange stored"
        );
        Ok(())
    }

    async fn fetch_chat_record(&self, student_id: &str) -> Result<Option<ChatRecord>, StoreError> {
        let record = self
            .chats()
            .find_one(doc! { "studentId": student_id })
            .await?;
        Ok(record.map(ChatRecord::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let timeout = Duration::from_secs(STORE_PING_TIMEOUT_SECS);
        let admin = self.client.database("admin");
        let ping = admin.run_command(doc! { "ping": 1 });
        tokio::time::timeout(timeout, ping).await.map_err(|_| {
            StoreError::Unavailable(format!("ping timed out after {}s", STORE_PING_TIMEOUT_SECS))
        })??;
        Ok(())
    }
}
