use async_trait::async_trait;
use thiserror::Error;
use crate::models::{MoodStatus, QuizAnswerSet, UserRecord};

/// Errors that can occur when talking to the user document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Whether a caller could reasonably retry the same call
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::RequestError(_) | StoreError::ApiError(_) => true,
            StoreError::NotFound(_) | StoreError::Unauthorized | StoreError::InvalidResponse(_) => false,
        }
    }
}

/// Persistence seam for user records
///
/// `completed_quiz_users` must return records ordered by user id ascending;
/// the ranker relies on that for deterministic tie-breaks.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// All users with `quizCompleted == true` except `exclude_user_id`
    async fn completed_quiz_users(&self, exclude_user_id: &str) -> Result<Vec<UserRecord>, StoreError>;

    async fn create_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Replace a user's answers wholesale and mark the quiz completed
    async fn save_quiz_answers(&self, user_id: &str, answers: &QuizAnswerSet) -> Result<(), StoreError>;

    async fn set_mood(&self, user_id: &str, mood: &MoodStatus) -> Result<(), StoreError>;
}
