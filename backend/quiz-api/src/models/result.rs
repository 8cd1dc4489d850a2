use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Summary of one completed attempt, as kept in the history slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total: u32,
    /// Completion time in epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidResult {
    #[error("quiz result must cover at least one question")]
    EmptyQuiz,
    #[error("score {score} exceeds total {total}")]
    ScoreAboveTotal { score: u32, total: u32 },
}

impl QuizResult {
    pub fn new(
        quiz_id: impl Into<String>,
        quiz_title: impl Into<String>,
        score: u32,
        total: u32,
        timestamp: i64,
    ) -> Result<Self, InvalidResult> {
        let result = Self {
            quiz_id: quiz_id.into(),
            quiz_title: quiz_title.into(),
            score,
            total,
            timestamp,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), InvalidResult> {
        if self.total == 0 {
            return Err(InvalidResult::EmptyQuiz);
        }
        if self.score > self.total {
            return Err(InvalidResult::ScoreAboveTotal {
                score: self.score,
                total: self.total,
            });
        }
        Ok(())
    }
}
