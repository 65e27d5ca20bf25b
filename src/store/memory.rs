//! In-process store for local runs and tests. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChatMessage, ChatRecord, ChatStore, HealthSnapshot, StoreError, StudentProfile};

#[derive(Default)]
pub struct MemoryStore {
    chats: RwLock<HashMap<String, ChatRecord>>,
    profiles: RwLock<HashMap<String, StudentProfile>>,
    /// Oldest first, as recorded
    snapshots: RwLock<HashMap<String, Vec<HealthSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, student_id: impl Into<String>, profile: StudentProfile) {
        self.profiles.write().await.insert(student_id.into(), profile);
    }

    pub async fn record_snapshot(&self, student_id: impl Into<String>, snapshot: HealthSnapshot) {
        self.snapshots
            .write()
            .await
            .entry(student_id.into())
            .or_default()
            .push(snapshot);
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch_recent_messages(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let chats = self.chats.read().await;
        Ok(chats
            .get(student_id)
            .map(|record| record.recent_messages(limit).to_vec())
            .unwrap_or_default())
    }

    async fn fetch_profile(&self, student_id: &str) -> Result<Option<StudentProfile>, StoreError> {
        Ok(self.profiles.read().await.get(student_id).cloned())
    }

    async fn fetch_recent_snapshots(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<HealthSnapshot>, StoreError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(student_id)
            .map(|all| all.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_exchange(
        &self,
        student_id: &str,
        student_name: &str,
        user: ChatMessage,
        bot: ChatMessage,
    ) -> Result<(), StoreError> {
        let mut chats = self.chats.write().await;
        chats
            .entry(student_id.to_string())
            .or_insert_with(|| ChatRecord::new(student_id, student_name))
            .push_exchange(user, bot);
        Ok(())
    }

    async fn fetch_chat_record(&self, student_id: &str) -> Result<Option<ChatRecord>, StoreError> {
        Ok(self.chats.read().await.get(student_id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_appends_two_messages() {
        let store = MemoryStore::new();
        store.save_message_to_db("SV001", "An", "q1", "a1").await;
        store.save_message_to_db("SV001", "An", "q2", "a2").await;

        let record = store.fetch_chat_record("SV001").await.unwrap().unwrap();
        assert_eq!(record.messages.len(), 4);
        assert_eq!(record.student_name, "An");
        assert_eq!(record.last_message_content, "a2");
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store
                .save_message_to_db("SV001", "An", &format!("q{}", i), &format!("a{}", i))
                .await;
        }

        let history = store.get_conversation_history("SV001").await;
        assert_eq!(history.len(), 10);
        assert_eq!(history.last().unwrap().content, "a6");
        assert!(store.get_conversation_history("unknown").await.is_empty());
    }

    #[tokio::test]
    async fn test_health_data_unknown_student() {
        let store = MemoryStore::new();
        assert!(store.get_student_health_data("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_health_data_newest_first() {
        let store = MemoryStore::new();
        for (i, date) in ["2023-01-01", "2023-06-01", "2024-01-01", "2024-06-01"]
            .into_iter()
            .enumerate()
        {
            store
                .record_snapshot(
                    "SV001",
                    HealthSnapshot {
                        follow_date: Some(date.to_string()),
                        weight: Some(60.0 + i as f64),
                        ..Default::default()
                    },
                )
                .await;
        }

        let data = store.get_student_health_data("SV001").await.unwrap();
        assert!(data.profile.is_none());
        assert_eq!(data.snapshots.len(), 3);
        assert_eq!(data.snapshots[0].follow_date.as_deref(), Some("2024-06-01"));
        assert_eq!(data.snapshots[2].follow_date.as_deref(), Some("2023-06-01"));
    }

    #[tokio::test]
    async fn test_ping_connected() {
        assert!(MemoryStore::new().is_connected().await);
    }
}
