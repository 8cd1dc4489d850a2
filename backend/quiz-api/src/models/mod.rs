use serde::{Deserialize, Serialize};

pub mod dashboard;
pub mod notes;
pub mod result;
pub mod timer;
pub mod view;

pub use result::QuizResult;

/// Every generated question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;
/// Number of questions requested from the generation service.
pub const QUESTIONS_PER_QUIZ: usize = 5;

/// A single multiple-choice question as produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl Question {
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_answer_index
    }
}

/// A generated question set together with the title it was generated for.
///
/// The id is assigned once, so retakes of the same set share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    pub created_at: i64,
}
