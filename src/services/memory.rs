use crate::models::{MoodStatus, QuizAnswerSet, UserRecord};
use crate::services::store::{StoreError, UserStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process user store, ordered by user id
///
/// Used for local development (`store.backend = "memory"`), tests and benches.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.user_id.clone(), u)).collect()),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn completed_quiz_users(&self, exclude_user_id: &str) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.quiz_completed && u.user_id != exclude_user_id)
            .cloned()
            .collect())
    }

    async fn create_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn save_quiz_answers(&self, user_id: &str, answers: &QuizAnswerSet) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user_id)))?;

        user.quiz_answers = Some(answers.clone());
        user.quiz_completed = true;
        user.quiz_completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn set_mood(&self, user_id: &str, mood: &MoodStatus) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user_id)))?;

        user.mood_status = Some(mood.clone());
        Ok(())
    }
}
