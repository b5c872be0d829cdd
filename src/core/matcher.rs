use thiserror::Error;
use crate::core::compatibility::compare_answers;
use crate::models::{MatchCandidate, QuizAnswerSet, RankingLimits, UserRecord};
use crate::services::store::{StoreError, UserStore};

/// Errors surfaced by the match ranker
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Quiz answers not found for user {0}")]
    QuizNotCompleted(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Optional narrowing of a ranked list
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub gender: Option<String>,
    pub min_compatibility: Option<u8>,
    pub limit: Option<usize>,
}

impl MatchFilter {
    fn accepts(&self, candidate: &MatchCandidate) -> bool {
        if let Some(min) = self.min_compatibility {
            if candidate.compatibility < min {
                return false;
            }
        }

        match (&self.gender, &candidate.gender) {
            (None, _) => true,
            (Some(wanted), Some(gender)) => wanted.eq_ignore_ascii_case(gender),
            (Some(_), None) => false,
        }
    }
}

/// Result of a ranking pass
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matches: Vec<MatchCandidate>,
    pub total_candidates: usize,
}

/// Scores every completed-quiz user against the acting user and ranks them
///
/// # Pipeline
/// 1. Load the acting user's answers (fail fast if missing)
/// 2. Load candidates from the store
/// 3. Skip self and answer-less records, score the rest
/// 4. Stable sort by compatibility, descending
#[derive(Debug, Clone)]
pub struct MatchRanker {
    limits: RankingLimits,
}

impl MatchRanker {
    pub fn new(limits: RankingLimits) -> Self {
        Self { limits }
    }

    pub fn with_default_limits() -> Self {
        Self {
            limits: RankingLimits::default(),
        }
    }

    /// Rank candidates for a user with the given answers
    ///
    /// Ties keep the order of `candidates`. Records belonging to `user_id`
    /// or lacking answers are skipped.
    pub fn rank(
        &self,
        user_id: &str,
        answers: &QuizAnswerSet,
        candidates: Vec<UserRecord>,
    ) -> Vec<MatchCandidate> {
        let mut ranked: Vec<MatchCandidate> = candidates
            .into_iter()
            .filter(|record| record.user_id != user_id)
            .filter_map(|record| {
                let theirs = record.answers()?;
                let compatibility = compare_answers(answers, theirs);

                Some(MatchCandidate {
                    name: record.display_name().to_string(),
                    user_id: record.user_id,
                    compatibility: compatibility.score,
                    gender: record.gender,
                    agreed_on: compatibility.agreed_on,
                })
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.compatibility.cmp(&a.compatibility));

        ranked
    }

    /// Apply a filter and the configured limits to a ranked list
    pub fn select(&self, ranked: &[MatchCandidate], filter: &MatchFilter) -> Vec<MatchCandidate> {
        let limit = filter
            .limit
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit);

        ranked
            .iter()
            .filter(|candidate| filter.accepts(candidate))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Full ranking against the store for one user, unfiltered
    pub async fn find_matches(
        &self,
        store: &dyn UserStore,
        user_id: &str,
    ) -> Result<MatchResult, MatchError> {
        let user = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| MatchError::UserNotFound(user_id.to_string()))?;

        let answers = user
            .answers()
            .ok_or_else(|| MatchError::QuizNotCompleted(user_id.to_string()))?;

        let candidates = store.completed_quiz_users(user_id).await?;
        let total_candidates = candidates.len();

        tracing::debug!("Scoring {} candidates for {}", total_candidates, user_id);

        let matches = self.rank(user_id, answers, candidates);

        Ok(MatchResult {
            matches,
            total_candidates,
        })
    }
}

impl Default for MatchRanker {
    fn default() -> Self {
        Self::with_default_limits()
    }
}
