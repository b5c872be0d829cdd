//! Roomie Match - roommate matching service
//!
//! Scores users against each other from their preference quiz answers and
//! ranks the best roommate candidates. Also hosts the chat, mood and
//! notification API with live unread counters per signed-in session.

pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use crate::core::{calculate_compatibility, MatchRanker, UnreadAggregator};
pub use crate::models::{MatchCandidate, QuizAnswerSet, UnreadStats, UserRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let mine: QuizAnswerSet = [("sleepSchedule", "early")].into_iter().collect();
        assert_eq!(calculate_compatibility(Some(&mine), Some(&mine)), 100);
    }
}
