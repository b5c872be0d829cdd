// Core algorithm exports
pub mod aggregate;
pub mod compatibility;
pub mod matcher;
pub mod mood;
pub mod quiz;

pub use aggregate::{SourceError, UnreadAggregator, UnreadSource};
pub use compatibility::{calculate_compatibility, compare_answers, Compatibility};
pub use matcher::{MatchError, MatchFilter, MatchRanker, MatchResult};
pub use mood::{find_mood, MoodPreset, MOOD_PRESETS};
pub use quiz::{find_question, validate_answers, QuizError, QuizQuestion, QUIZ_QUESTIONS};
