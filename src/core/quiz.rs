use serde::Serialize;
use thiserror::Error;
use crate::models::QuizAnswerSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("quiz submission contains no answers")]
    Empty,

    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    #[error("invalid option '{value}' for question {question}")]
    InvalidOption { question: String, value: String },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuizOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuizQuestion {
    pub id: &'static str,
    pub question: &'static str,
    pub options: &'static [QuizOption],
}

impl QuizQuestion {
    pub fn accepts(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

/// The roommate preference quiz
pub const QUIZ_QUESTIONS: &[QuizQuestion] = &[
    QuizQuestion {
        id: "sleepSchedule",
        question: "What is your typical sleep schedule?",
        options: &[
            QuizOption { value: "early", label: "Early bird (sleep early, wake early)" },
            QuizOption { value: "late", label: "Night owl (sleep late, wake late)" },
            QuizOption { value: "mixed", label: "Mixed/Flexible" },
        ],
    },
    QuizQuestion {
        id: "cleanliness",
        question: "How would you describe your cleanliness level?",
        options: &[
            QuizOption { value: "very_clean", label: "Very organized and clean" },
            QuizOption { value: "moderately_clean", label: "Moderately clean" },
            QuizOption { value: "messy", label: "Comfortable with some mess" },
        ],
    },
    QuizQuestion {
        id: "noise",
        question: "What is your noise preference?",
        options: &[
            QuizOption { value: "quiet", label: "I prefer quiet environments" },
            QuizOption { value: "moderate", label: "Some background noise is fine" },
            QuizOption { value: "lively", label: "I enjoy music and lively environments" },
        ],
    },
    QuizQuestion {
        id: "guests",
        question: "How often do you plan to have guests over?",
        options: &[
            QuizOption { value: "rarely", label: "Rarely or never" },
            QuizOption { value: "occasionally", label: "Occasionally" },
            QuizOption { value: "frequently", label: "Frequently" },
        ],
    },
    QuizQuestion {
        id: "sharing",
        question: "How do you feel about sharing items (food, appliances, etc.)?",
        options: &[
            QuizOption { value: "separate", label: "I prefer keeping things separate" },
            QuizOption { value: "some_sharing", label: "Some sharing is fine" },
            QuizOption { value: "communal", label: "I prefer a communal approach" },
        ],
    },
];

pub fn find_question(id: &str) -> Option<&'static QuizQuestion> {
    QUIZ_QUESTIONS.iter().find(|q| q.id == id)
}

/// Check a submission against the question catalog
///
/// Scoring itself accepts any keys; only submissions are held to the catalog.
pub fn validate_answers(answers: &QuizAnswerSet) -> Result<(), QuizError> {
    if answers.is_empty() {
        return Err(QuizError::Empty);
    }

    for (question, value) in answers.iter() {
        let known = find_question(question)
            .ok_or_else(|| QuizError::UnknownQuestion(question.clone()))?;

        if !known.accepts(value) {
            return Err(QuizError::InvalidOption {
                question: question.clone(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_unique() {
        for (i, q) in QUIZ_QUESTIONS.iter().enumerate() {
            assert!(QUIZ_QUESTIONS[i + 1..].iter().all(|other| other.id != q.id));
            assert_eq!(q.options.len(), 3);
        }
    }

    #[test]
    fn test_valid_submission() {
        let answers: QuizAnswerSet = [
            ("sleepSchedule", "early"),
            ("cleanliness", "very_clean"),
            ("noise", "quiet"),
        ]
        .into_iter()
        .collect();

        assert_eq!(validate_answers(&answers), Ok(()));
    }

    #[test]
    fn test_rejects_unknown_question() {
        let answers: QuizAnswerSet = [("pets", "cats")].into_iter().collect();

        assert_eq!(
            validate_answers(&answers),
            Err(QuizError::UnknownQuestion("pets".to_string()))
        );
    }

    #[test]
    fn test_rejects_unknown_option() {
        let answers: QuizAnswerSet = [("noise", "deafening")].into_iter().collect();

        assert!(matches!(
            validate_answers(&answers),
            Err(QuizError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_answers(&QuizAnswerSet::new()), Err(QuizError::Empty));
    }
}
