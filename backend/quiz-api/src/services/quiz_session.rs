//! Pure state machine for a single quiz attempt.
//!
//! A session value is never mutated in place: [`QuizSession::apply`] returns the
//! next session or the reason the action does not apply. The countdown is driven
//! by explicit [`SessionAction::Tick`] actions, so real-time scheduling lives
//! elsewhere.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{Question, OPTIONS_PER_QUESTION};

pub const DEFAULT_QUESTION_SECONDS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAnswer { index: usize, time_left: u32 },
    /// `selected` is `None` when the countdown ran out.
    Answered { index: usize, selected: Option<usize> },
    Finished { score: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Select(usize),
    Tick,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("current question has not been answered yet")]
    NotAnswered,
    #[error("countdown is not running")]
    NotAwaiting,
    #[error("attempt already finished")]
    AttemptFinished,
    #[error("option {0} is out of range")]
    OptionOutOfRange(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected: Option<usize>,
    pub correct: bool,
}

impl AnswerRecord {
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Arc<[Question]>,
    question_seconds: u32,
    state: SessionState,
    score: u32,
    answers: Vec<AnswerRecord>,
}

impl QuizSession {
    pub fn new(questions: Arc<[Question]>, question_seconds: u32) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        let question_seconds = question_seconds.max(1);

        Ok(Self {
            questions,
            question_seconds,
            state: SessionState::AwaitingAnswer {
                index: 0,
                time_left: question_seconds,
            },
            score: 0,
            answers: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn question_seconds(&self) -> u32 {
        self.question_seconds
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn questions(&self) -> &Arc<[Question]> {
        &self.questions
    }

    /// The question on screen, `None` once finished.
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::AwaitingAnswer { index, .. } | SessionState::Answered { index, .. } => {
                self.questions.get(index)
            }
            SessionState::Finished { .. } => None,
        }
    }

    pub fn is_last_question(&self, index: usize) -> bool {
        index + 1 >= self.questions.len()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished { .. })
    }

    pub fn apply(&self, action: SessionAction) -> Result<QuizSession, SessionError> {
        match (self.state, action) {
            (SessionState::Finished { .. }, _) => Err(SessionError::AttemptFinished),

            (SessionState::AwaitingAnswer { index, .. }, SessionAction::Select(option)) => {
                if option >= OPTIONS_PER_QUESTION {
                    return Err(SessionError::OptionOutOfRange(option));
                }
                Ok(self.answer(index, Some(option)))
            }
            (SessionState::Answered { .. }, SessionAction::Select(_)) => {
                Err(SessionError::AlreadyAnswered)
            }

            (SessionState::AwaitingAnswer { index, time_left }, SessionAction::Tick) => {
                let time_left = time_left.saturating_sub(1);
                if time_left == 0 {
                    return Ok(self.answer(index, None));
                }
                let mut next = self.clone();
                next.state = SessionState::AwaitingAnswer { index, time_left };
                Ok(next)
            }
            (SessionState::Answered { .. }, SessionAction::Tick) => Err(SessionError::NotAwaiting),

            (SessionState::AwaitingAnswer { .. }, SessionAction::Advance) => {
                Err(SessionError::NotAnswered)
            }
            (SessionState::Answered { index, .. }, SessionAction::Advance) => {
                let mut next = self.clone();
                next.state = if self.is_last_question(index) {
                    SessionState::Finished { score: self.score }
                } else {
                    SessionState::AwaitingAnswer {
                        index: index + 1,
                        time_left: self.question_seconds,
                    }
                };
                Ok(next)
            }
        }
    }

    fn answer(&self, index: usize, selected: Option<usize>) -> QuizSession {
        let question = &self.questions[index];
        let correct = selected.is_some_and(|option| question.is_correct(option));

        let mut next = self.clone();
        if correct {
            next.score += 1;
        }
        next.answers.push(AnswerRecord {
            question_id: question.id.clone(),
            selected,
            correct,
        });
        next.state = SessionState::Answered { index, selected };
        next
    }
}
