// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Account, Chat, ChatMessage, ChatSummary, MatchCandidate, MoodStatus, Notification, QuizAnswerSet,
    RankingLimits, UnreadStats, UserRecord,
};
pub use requests::{MatchQuery, OpenChatRequest, SendMessageRequest, SetMoodRequest, SignInRequest, SignUpRequest, SubmitQuizRequest};
pub use responses::{AccountView, AuthResponse, ErrorResponse, HealthResponse, MatchesResponse, MeResponse};
