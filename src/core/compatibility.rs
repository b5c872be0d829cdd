use serde::{Deserialize, Serialize};
use crate::models::QuizAnswerSet;

/// Detailed outcome of comparing two answer sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    /// Percentage agreement over shared questions (0-100)
    pub score: u8,
    /// Questions answered on both sides
    pub compared: usize,
    /// Questions with identical answers
    pub matched: usize,
    /// Ids of the matched questions, ordered
    #[serde(rename = "agreedOn")]
    pub agreed_on: Vec<String>,
}

/// Calculate compatibility (0-100) between two users' quiz answers
///
/// Only questions answered by both users are compared, and agreement is
/// exact-match only. Returns 0 when either side is absent or the two sets
/// share no questions.
///
/// ```
/// use roomie_match::core::calculate_compatibility;
/// use roomie_match::models::QuizAnswerSet;
///
/// let a: QuizAnswerSet = [("sleep", "early"), ("clean", "very_clean")].into_iter().collect();
/// let b: QuizAnswerSet = [("sleep", "early"), ("clean", "messy")].into_iter().collect();
/// assert_eq!(calculate_compatibility(Some(&a), Some(&b)), 50);
/// ```
pub fn calculate_compatibility(first: Option<&QuizAnswerSet>, second: Option<&QuizAnswerSet>) -> u8 {
    match (first, second) {
        (Some(first), Some(second)) => compare_answers(first, second).score,
        _ => 0,
    }
}

/// Compare two answer sets question by question
pub fn compare_answers(first: &QuizAnswerSet, second: &QuizAnswerSet) -> Compatibility {
    let mut compared = 0;
    let mut agreed_on = Vec::new();

    for (question, answer) in first.answered() {
        let Some(other) = second.answer(question) else {
            continue;
        };

        compared += 1;
        if answer == other {
            agreed_on.push(question.to_string());
        }
    }

    let matched = agreed_on.len();

    Compatibility {
        score: percentage(matched, compared),
        compared,
        matched,
        agreed_on,
    }
}

/// round(100 * matched / compared), 0 when nothing was compared
#[inline]
fn percentage(matched: usize, compared: usize) -> u8 {
    if compared == 0 {
        return 0;
    }

    // Integer half-up rounding, matches f64::round for non-negative ratios
    let scaled = (200 * matched + compared) / (2 * compared);
    scaled.min(100) as u8
}
