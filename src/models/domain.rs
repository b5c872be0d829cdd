use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user's quiz answers: question id -> selected option value
///
/// Backed by a `BTreeMap` so iteration (and anything derived from it, like the
/// list of agreed questions) is ordered by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswerSet(BTreeMap<String, String>);

impl QuizAnswerSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Answer for a question, treating blank values as unanswered
    pub fn answer(&self, question: &str) -> Option<&str> {
        self.0
            .get(question)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Iterate over answered questions (blank values skipped)
    pub fn answered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(question, value)| (question.as_str(), value.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answered().next().is_none()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QuizAnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// User record as stored in the document database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(rename = "quizAnswers", default)]
    pub quiz_answers: Option<QuizAnswerSet>,
    #[serde(rename = "quizCompleted", default)]
    pub quiz_completed: bool,
    #[serde(rename = "quizCompletedAt", default)]
    pub quiz_completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "moodStatus", default)]
    pub mood_status: Option<MoodStatus>,
}

impl UserRecord {
    /// Fresh record for a user who just signed up
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: Some(name.into()),
            email: Some(email.into()),
            gender: None,
            university: None,
            quiz_answers: None,
            quiz_completed: false,
            quiz_completed_at: None,
            mood_status: Some(MoodStatus::just_joined()),
        }
    }

    /// Answers usable for scoring, if any
    pub fn answers(&self) -> Option<&QuizAnswerSet> {
        self.quiz_answers.as_ref().filter(|answers| !answers.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Anonymous")
    }
}

/// Current mood shown on a user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodStatus {
    pub emoji: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl MoodStatus {
    pub fn just_joined() -> Self {
        Self {
            emoji: "😊".to_string(),
            name: "Happy".to_string(),
            status: "Just joined!".to_string(),
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Another user paired with their compatibility against the acting user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    pub compatibility: u8,
    pub gender: Option<String>,
    #[serde(rename = "agreedOn", default)]
    pub agreed_on: Vec<String>,
}

/// Password account used by the auth API
#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Two-person chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub participants: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Chat {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "chatId")]
    pub chat_id: String,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "senderName")]
    pub sender_name: String,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of a user's chat list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub participants: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "lastMessageAt")]
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "unreadCount")]
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "notificationId")]
    pub notification_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate unread counters for one signed-in user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadStats {
    #[serde(rename = "unreadMessages")]
    pub unread_messages: u64,
    #[serde(rename = "chatsWithUnread")]
    pub chats_with_unread: u64,
    #[serde(rename = "unreadNotifications")]
    pub unread_notifications: u64,
}

/// Ranking limits
#[derive(Debug, Clone, Copy)]
pub struct RankingLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for RankingLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}
