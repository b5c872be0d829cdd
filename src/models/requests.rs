use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::QuizAnswerSet;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Quiz submission; overwrites any previous answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: QuizAnswerSet,
}

/// Query parameters for the match list
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MatchQuery {
    #[serde(default)]
    pub gender: Option<String>,
    #[validate(range(max = 100))]
    #[serde(default, rename = "minCompatibility")]
    pub min_compatibility: Option<u8>,
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetMoodRequest {
    #[validate(length(min = 1))]
    pub mood: String,
    #[validate(length(max = 140))]
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenChatRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "other_user_id", rename = "otherUserId")]
    pub other_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub text: String,
}
