//! Top-level mode selector: upload, quiz, results and dashboard.
//!
//! [`Orchestrator::apply`] is pure. Side effects it needs (countdown task,
//! result persistence) are returned as [`Effect`]s for the caller to run.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{
    notes::NavigationTarget,
    view::{PhaseView, QuestionView, QuizView, ResultsView, ScreenView},
    Quiz, QuizResult,
};

use super::analytics::percentage;
use super::quiz_session::{QuizSession, SessionAction, SessionError, SessionState};

#[derive(Debug, Clone)]
pub enum Screen {
    Idle {
        /// Token of the generation currently awaited, if any.
        pending: Option<u64>,
    },
    Quiz {
        quiz: Arc<Quiz>,
        attempt: u64,
        session: QuizSession,
    },
    Results {
        quiz: Arc<Quiz>,
        score: u32,
    },
    Dashboard,
}

#[derive(Debug, Clone)]
pub enum ScreenAction {
    BeginGeneration,
    GenerationSucceeded { token: u64, quiz: Quiz },
    GenerationFailed { token: u64 },
    Session(SessionAction),
    /// One countdown step for a specific attempt and question.
    Tick { attempt: u64, question_index: usize },
    Restart,
    Navigate(NavigationTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTimer { attempt: u64, question_index: usize },
    StopTimer,
    RecordResult(QuizResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("a quiz is already being generated")]
    GenerationInProgress,
    #[error("notes can only be uploaded from the upload screen")]
    NotIdle,
    #[error("generation result no longer applies to the current screen")]
    StaleGeneration,
    #[error("no quiz is in progress")]
    NoActiveQuiz,
    #[error("countdown tick does not match the current question")]
    StaleTick,
    #[error("a quiz can only be restarted from its results")]
    NothingToRestart,
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    screen: Screen,
    question_seconds: u32,
    next_token: u64,
    next_attempt: u64,
}

impl Orchestrator {
    pub fn new(question_seconds: u32) -> Self {
        Self {
            screen: Screen::Idle { pending: None },
            question_seconds,
            next_token: 1,
            next_attempt: 1,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Token of the generation the upload screen is waiting for.
    pub fn pending_generation(&self) -> Option<u64> {
        match self.screen {
            Screen::Idle { pending } => pending,
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&QuizSession> {
        match &self.screen {
            Screen::Quiz { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn attempt(&self) -> Option<u64> {
        match self.screen {
            Screen::Quiz { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    pub fn apply(
        &self,
        action: ScreenAction,
        now_ms: i64,
    ) -> Result<(Orchestrator, Vec<Effect>), ScreenError> {
        let mut next = self.clone();
        let effects = next.step(action, now_ms)?;
        Ok((next, effects))
    }

    fn step(&mut self, action: ScreenAction, now_ms: i64) -> Result<Vec<Effect>, ScreenError> {
        match action {
            ScreenAction::BeginGeneration => match self.screen {
                Screen::Idle { pending: Some(_) } => Err(ScreenError::GenerationInProgress),
                Screen::Idle { pending: None } => {
                    let token = self.next_token;
                    self.next_token += 1;
                    self.screen = Screen::Idle {
                        pending: Some(token),
                    };
                    Ok(Vec::new())
                }
                _ => Err(ScreenError::NotIdle),
            },

            ScreenAction::GenerationSucceeded { token, quiz } => {
                if self.pending_generation() != Some(token) {
                    return Err(ScreenError::StaleGeneration);
                }
                self.start_attempt(Arc::new(quiz))
            }

            ScreenAction::GenerationFailed { token } => {
                if self.pending_generation() != Some(token) {
                    return Err(ScreenError::StaleGeneration);
                }
                self.screen = Screen::Idle { pending: None };
                Ok(Vec::new())
            }

            ScreenAction::Session(action) => self.apply_session(action, now_ms),

            ScreenAction::Tick {
                attempt,
                question_index,
            } => {
                let current = match (&self.screen, self.attempt()) {
                    (Screen::Quiz { session, .. }, Some(a)) if a == attempt => session.state(),
                    _ => return Err(ScreenError::StaleTick),
                };
                match current {
                    SessionState::AwaitingAnswer { index, .. } if index == question_index => {
                        self.apply_session(SessionAction::Tick, now_ms)
                    }
                    _ => Err(ScreenError::StaleTick),
                }
            }

            ScreenAction::Restart => {
                let quiz = match &self.screen {
                    Screen::Results { quiz, .. } => quiz.clone(),
                    _ => return Err(ScreenError::NothingToRestart),
                };
                self.start_attempt(quiz)
            }

            ScreenAction::Navigate(target) => {
                let mut effects = Vec::new();
                if matches!(self.screen, Screen::Quiz { .. }) {
                    effects.push(Effect::StopTimer);
                }
                self.screen = match target {
                    NavigationTarget::Idle => Screen::Idle { pending: None },
                    NavigationTarget::Dashboard => Screen::Dashboard,
                };
                Ok(effects)
            }
        }
    }

    fn start_attempt(&mut self, quiz: Arc<Quiz>) -> Result<Vec<Effect>, ScreenError> {
        let session = QuizSession::new(quiz.questions.clone().into(), self.question_seconds)?;
        let attempt = self.next_attempt;
        self.next_attempt += 1;

        self.screen = Screen::Quiz {
            quiz,
            attempt,
            session,
        };
        Ok(vec![Effect::StartTimer {
            attempt,
            question_index: 0,
        }])
    }

    fn apply_session(
        &mut self,
        action: SessionAction,
        now_ms: i64,
    ) -> Result<Vec<Effect>, ScreenError> {
        let (quiz, attempt, previous, next) = match &self.screen {
            Screen::Quiz {
                quiz,
                attempt,
                session,
            } => {
                // A rejected action leaves the screen as it is.
                let next = session.apply(action)?;
                (quiz.clone(), *attempt, session.state(), next)
            }
            _ => return Err(ScreenError::NoActiveQuiz),
        };

        let effects = match (previous, next.state()) {
            (SessionState::AwaitingAnswer { .. }, SessionState::Answered { .. }) => {
                vec![Effect::StopTimer]
            }
            (SessionState::Answered { .. }, SessionState::AwaitingAnswer { index, .. }) => {
                vec![Effect::StartTimer {
                    attempt,
                    question_index: index,
                }]
            }
            (_, SessionState::Finished { score }) => {
                let total = next.total() as u32;
                let result = QuizResult {
                    quiz_id: quiz.id.clone(),
                    quiz_title: quiz.title.clone(),
                    score,
                    total,
                    timestamp: now_ms,
                };
                self.screen = Screen::Results { quiz, score };
                return Ok(vec![Effect::RecordResult(result)]);
            }
            _ => Vec::new(),
        };

        self.screen = Screen::Quiz {
            quiz,
            attempt,
            session: next,
        };
        Ok(effects)
    }

    pub fn view(&self) -> ScreenView {
        match &self.screen {
            Screen::Idle { pending } => ScreenView::Idle {
                generating: pending.is_some(),
            },
            Screen::Quiz {
                quiz,
                attempt,
                session,
            } => ScreenView::Quiz(quiz_view(quiz, *attempt, session)),
            Screen::Results { quiz, score } => {
                let total = quiz.questions.len() as u32;
                ScreenView::Results(ResultsView {
                    quiz_id: quiz.id.clone(),
                    title: quiz.title.clone(),
                    score: *score,
                    total,
                    percentage: percentage(*score, total),
                })
            }
            Screen::Dashboard => ScreenView::Dashboard,
        }
    }
}

impl ScreenError {
    /// The session-level reason, when the action was rejected by the session.
    pub fn session_error(&self) -> Option<SessionError> {
        match self {
            ScreenError::Session(e) => Some(*e),
            _ => None,
        }
    }
}

fn quiz_view(quiz: &Quiz, attempt: u64, session: &QuizSession) -> QuizView {
    let (index, phase, revealed) = match session.state() {
        SessionState::AwaitingAnswer { index, time_left } => {
            (index, PhaseView::AwaitingAnswer { time_left }, false)
        }
        SessionState::Answered { index, selected } => {
            let question = &session.questions()[index];
            (
                index,
                PhaseView::Answered {
                    selected,
                    correct: selected.is_some_and(|s| question.is_correct(s)),
                    timed_out: selected.is_none(),
                    is_last_question: session.is_last_question(index),
                },
                true,
            )
        }
        // Finished sessions are replaced by the results screen.
        SessionState::Finished { .. } => (
            session.total() - 1,
            PhaseView::AwaitingAnswer { time_left: 0 },
            true,
        ),
    };

    let question = &session.questions()[index];
    QuizView {
        quiz_id: quiz.id.clone(),
        title: quiz.title.clone(),
        attempt_id: attempt.to_string(),
        question_number: index + 1,
        total_questions: session.total(),
        score: session.score(),
        question: QuestionView {
            id: question.id.clone(),
            question: question.question.clone(),
            options: question.options.to_vec(),
            correct_answer_index: revealed.then_some(question.correct_answer_index),
            explanation: revealed.then(|| question.explanation.clone()),
        },
        phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quiz_session::tests::question;

    fn quiz(correct: &[usize]) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Enzymes".to_string(),
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| question(&format!("q{}", i + 1), *c))
                .collect(),
            created_at: 0,
        }
    }

    fn apply(o: &Orchestrator, action: ScreenAction) -> (Orchestrator, Vec<Effect>) {
        o.apply(action, 1_000).unwrap()
    }

    fn in_quiz(correct: &[usize]) -> Orchestrator {
        let o = Orchestrator::new(30);
        let (o, _) = apply(&o, ScreenAction::BeginGeneration);
        let token = o.pending_generation().unwrap();
        let (o, _) = apply(
            &o,
            ScreenAction::GenerationSucceeded {
                token,
                quiz: quiz(correct),
            },
        );
        o
    }

    #[test]
    fn test_starts_idle() {
        let o = Orchestrator::new(30);
        assert_eq!(o.view(), ScreenView::Idle { generating: false });
    }

    #[test]
    fn test_duplicate_generation_is_rejected() {
        let (o, _) = apply(&Orchestrator::new(30), ScreenAction::BeginGeneration);
        assert_eq!(o.view(), ScreenView::Idle { generating: true });
        assert_eq!(
            o.apply(ScreenAction::BeginGeneration, 0).unwrap_err(),
            ScreenError::GenerationInProgress
        );
    }

    #[test]
    fn test_generation_success_starts_quiz_and_timer() {
        let (o, _) = apply(&Orchestrator::new(30), ScreenAction::BeginGeneration);
        let token = o.pending_generation().unwrap();
        let (o, effects) = apply(
            &o,
            ScreenAction::GenerationSucceeded {
                token,
                quiz: quiz(&[0, 1]),
            },
        );

        let attempt = o.attempt().unwrap();
        assert_eq!(
            effects,
            vec![Effect::StartTimer {
                attempt,
                question_index: 0
            }]
        );
        match o.view() {
            ScreenView::Quiz(view) => {
                assert_eq!(view.question_number, 1);
                assert_eq!(view.total_questions, 2);
                assert_eq!(view.question.correct_answer_index, None);
                assert_eq!(view.question.explanation, None);
                assert_eq!(view.phase, PhaseView::AwaitingAnswer { time_left: 30 });
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_generation_failure_returns_to_idle() {
        let (o, _) = apply(&Orchestrator::new(30), ScreenAction::BeginGeneration);
        let token = o.pending_generation().unwrap();
        let (o, effects) = apply(&o, ScreenAction::GenerationFailed { token });
        assert!(effects.is_empty());
        assert_eq!(o.view(), ScreenView::Idle { generating: false });
    }

    #[test]
    fn test_generation_after_navigation_is_stale() {
        let (o, _) = apply(&Orchestrator::new(30), ScreenAction::BeginGeneration);
        let token = o.pending_generation().unwrap();
        let (o, _) = apply(&o, ScreenAction::Navigate(NavigationTarget::Dashboard));

        let err = o
            .apply(
                ScreenAction::GenerationSucceeded {
                    token,
                    quiz: quiz(&[0]),
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err, ScreenError::StaleGeneration);
        assert_eq!(o.view(), ScreenView::Dashboard);
    }

    #[test]
    fn test_old_token_cannot_complete_new_generation() {
        let (o, _) = apply(&Orchestrator::new(30), ScreenAction::BeginGeneration);
        let old = o.pending_generation().unwrap();
        let (o, _) = apply(&o, ScreenAction::Navigate(NavigationTarget::Idle));
        let (o, _) = apply(&o, ScreenAction::BeginGeneration);

        assert_ne!(o.pending_generation(), Some(old));
        assert_eq!(
            o.apply(ScreenAction::GenerationFailed { token: old }, 0)
                .unwrap_err(),
            ScreenError::StaleGeneration
        );
    }

    #[test]
    fn test_upload_only_from_idle() {
        let (o, _) = apply(
            &Orchestrator::new(30),
            ScreenAction::Navigate(NavigationTarget::Dashboard),
        );
        assert_eq!(
            o.apply(ScreenAction::BeginGeneration, 0).unwrap_err(),
            ScreenError::NotIdle
        );
    }

    #[test]
    fn test_answer_stops_timer_and_reveals_explanation() {
        let o = in_quiz(&[2, 0]);
        let (o, effects) = apply(&o, ScreenAction::Session(SessionAction::Select(2)));
        assert_eq!(effects, vec![Effect::StopTimer]);

        match o.view() {
            ScreenView::Quiz(view) => {
                assert_eq!(view.score, 1);
                assert_eq!(view.question.correct_answer_index, Some(2));
                assert!(view.question.explanation.is_some());
                assert_eq!(
                    view.phase,
                    PhaseView::Answered {
                        selected: Some(2),
                        correct: true,
                        timed_out: false,
                        is_last_question: false
                    }
                );
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_advance_starts_timer_for_next_question() {
        let o = in_quiz(&[2, 0]);
        let attempt = o.attempt().unwrap();
        let (o, _) = apply(&o, ScreenAction::Session(SessionAction::Select(1)));
        let (_, effects) = apply(&o, ScreenAction::Session(SessionAction::Advance));
        assert_eq!(
            effects,
            vec![Effect::StartTimer {
                attempt,
                question_index: 1
            }]
        );
    }

    #[test]
    fn test_finishing_records_result_and_shows_results() {
        let o = in_quiz(&[2]);
        let (o, _) = apply(&o, ScreenAction::Session(SessionAction::Select(2)));
        let (o, effects) = o
            .apply(ScreenAction::Session(SessionAction::Advance), 42)
            .unwrap();

        assert_eq!(
            effects,
            vec![Effect::RecordResult(QuizResult {
                quiz_id: "quiz-1".into(),
                quiz_title: "Enzymes".into(),
                score: 1,
                total: 1,
                timestamp: 42,
            })]
        );
        assert_eq!(
            o.view(),
            ScreenView::Results(ResultsView {
                quiz_id: "quiz-1".into(),
                title: "Enzymes".into(),
                score: 1,
                total: 1,
                percentage: 100,
            })
        );
    }

    #[test]
    fn test_restart_uses_same_questions_with_fresh_state() {
        let o = in_quiz(&[2]);
        let first_attempt = o.attempt().unwrap();
        let (o, _) = apply(&o, ScreenAction::Session(SessionAction::Select(2)));
        let (o, _) = apply(&o, ScreenAction::Session(SessionAction::Advance));

        let (o, effects) = apply(&o, ScreenAction::Restart);

        let attempt = o.attempt().unwrap();
        assert_ne!(attempt, first_attempt);
        assert_eq!(
            effects,
            vec![Effect::StartTimer {
                attempt,
                question_index: 0
            }]
        );
        let session = o.session().unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(session.questions()[0].id, "q1");
        match o.view() {
            ScreenView::Quiz(view) => assert_eq!(view.quiz_id, "quiz-1"),
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_restart_outside_results_is_rejected() {
        assert_eq!(
            in_quiz(&[0]).apply(ScreenAction::Restart, 0).unwrap_err(),
            ScreenError::NothingToRestart
        );
    }

    #[test]
    fn test_ticks_for_other_questions_are_stale() {
        let o = in_quiz(&[0, 1]);
        let attempt = o.attempt().unwrap();

        let (o, effects) = apply(
            &o,
            ScreenAction::Tick {
                attempt,
                question_index: 0,
            },
        );
        assert!(effects.is_empty());

        assert_eq!(
            o.apply(
                ScreenAction::Tick {
                    attempt,
                    question_index: 1
                },
                0
            )
            .unwrap_err(),
            ScreenError::StaleTick
        );
        assert_eq!(
            o.apply(
                ScreenAction::Tick {
                    attempt: attempt + 1,
                    question_index: 0
                },
                0
            )
            .unwrap_err(),
            ScreenError::StaleTick
        );
    }

    #[test]
    fn test_tick_after_click_is_stale() {
        let o = in_quiz(&[0]);
        let attempt = o.attempt().unwrap();
        let (o, _) = apply(&o, ScreenAction::Session(SessionAction::Select(3)));

        assert_eq!(
            o.apply(
                ScreenAction::Tick {
                    attempt,
                    question_index: 0
                },
                0
            )
            .unwrap_err(),
            ScreenError::StaleTick
        );
    }

    #[test]
    fn test_countdown_expiry_stops_timer() {
        let mut o = Orchestrator::new(2);
        o = apply(&o, ScreenAction::BeginGeneration).0;
        let token = o.pending_generation().unwrap();
        o = apply(
            &o,
            ScreenAction::GenerationSucceeded {
                token,
                quiz: quiz(&[0]),
            },
        )
        .0;
        let attempt = o.attempt().unwrap();
        let tick = ScreenAction::Tick {
            attempt,
            question_index: 0,
        };

        let (o, effects) = apply(&o, tick.clone());
        assert!(effects.is_empty());
        let (o, effects) = apply(&o, tick);
        assert_eq!(effects, vec![Effect::StopTimer]);
        match o.view() {
            ScreenView::Quiz(view) => {
                assert_eq!(view.score, 0);
                assert!(matches!(
                    view.phase,
                    PhaseView::Answered {
                        selected: None,
                        timed_out: true,
                        ..
                    }
                ));
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_navigating_away_abandons_quiz() {
        let o = in_quiz(&[0]);
        let (o, effects) = apply(&o, ScreenAction::Navigate(NavigationTarget::Idle));
        assert_eq!(effects, vec![Effect::StopTimer]);
        assert!(o.session().is_none());
        assert_eq!(
            o.apply(ScreenAction::Session(SessionAction::Select(0)), 0)
                .unwrap_err(),
            ScreenError::NoActiveQuiz
        );
    }

    #[test]
    fn test_session_errors_leave_screen_unchanged() {
        let o = in_quiz(&[0, 1]);
        let err = o
            .apply(ScreenAction::Session(SessionAction::Advance), 0)
            .unwrap_err();
        assert_eq!(err.session_error(), Some(SessionError::NotAnswered));
    }
}
