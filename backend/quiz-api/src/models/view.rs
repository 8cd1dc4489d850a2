use serde::{Deserialize, Serialize};

/// What a front end needs to render the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScreenView {
    Idle { generating: bool },
    Quiz(QuizView),
    Results(ResultsView),
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizView {
    pub quiz_id: String,
    pub title: String,
    pub attempt_id: String,
    /// 1-based, for "Question n of m".
    pub question_number: usize,
    pub total_questions: usize,
    pub score: u32,
    pub question: QuestionView,
    pub phase: PhaseView,
}

/// The correct answer and explanation stay hidden until the question is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PhaseView {
    AwaitingAnswer {
        time_left: u32,
    },
    Answered {
        selected: Option<usize>,
        correct: bool,
        timed_out: bool,
        is_last_question: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsView {
    pub quiz_id: String,
    pub title: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
}
