//! Runs the study flow: owns the orchestrator, executes its effects and
//! publishes countdown events.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{AppError, QuizError};
use crate::metrics::{
    record_answer, QUIZZES_COMPLETED_TOTAL, QUIZ_GENERATIONS_TOTAL,
    QUIZ_GENERATION_DURATION_SECONDS,
};
use crate::models::{
    dashboard::DashboardSummary,
    notes::NavigationTarget,
    timer::{TimeExpired, TimerEvent, TimerTick},
    view::ScreenView,
    Quiz, QuizResult,
};
use crate::utils::time::now_millis;

use super::analytics;
use super::notes_extractor::{derive_title, ensure_enough_text, TextExtractor};
use super::quiz_generator::QuizGenerator;
use super::quiz_session::{SessionAction, SessionError, SessionState};
use super::result_store::HistoryStore;
use super::screen::{Effect, Orchestrator, ScreenAction, ScreenError};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What happened to a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Expired,
    /// The tick no longer matches the question on screen and was dropped.
    Stale,
}

struct Flow {
    orchestrator: Orchestrator,
    ticker: Option<JoinHandle<()>>,
}

impl Flow {
    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

struct Shared {
    flow: Mutex<Flow>,
    store: Arc<dyn HistoryStore>,
    generator: Arc<dyn QuizGenerator>,
    extractor: Arc<dyn TextExtractor>,
    events: broadcast::Sender<TimerEvent>,
    question_seconds: u32,
    tick_interval: Duration,
}

#[derive(Clone)]
pub struct StudyService {
    shared: Arc<Shared>,
}

impl StudyService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        generator: Arc<dyn QuizGenerator>,
        extractor: Arc<dyn TextExtractor>,
        question_seconds: u32,
        tick_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let question_seconds = question_seconds.max(1);

        Self {
            shared: Arc::new(Shared {
                flow: Mutex::new(Flow {
                    orchestrator: Orchestrator::new(question_seconds),
                    ticker: None,
                }),
                store,
                generator,
                extractor,
                events,
                question_seconds,
                tick_interval: tick_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    pub async fn state(&self) -> ScreenView {
        self.shared.flow.lock().await.orchestrator.view()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events.subscribe()
    }

    pub async fn dashboard(&self) -> DashboardSummary {
        analytics::summarize(&self.shared.store.list().await)
    }

    pub async fn history(&self) -> Vec<QuizResult> {
        self.shared.store.list().await
    }

    /// Extracts the notes, asks the generator for a quiz and starts it.
    ///
    /// The work runs in its own task so a dropped request still resolves the
    /// pending generation.
    pub async fn submit_notes(
        &self,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<ScreenView, AppError> {
        let token = {
            let mut flow = self.shared.flow.lock().await;
            self.apply_locked(&mut flow, ScreenAction::BeginGeneration)?;
            flow.orchestrator
                .pending_generation()
                .ok_or_else(|| anyhow!("generation started without a token"))?
        };

        let title = derive_title(file_name);
        tracing::info!(
            "Generating quiz '{}' from {} bytes of PDF (token={})",
            title,
            pdf.len(),
            token
        );

        let service = self.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = service.produce_quiz(pdf, &title).await;
            QUIZ_GENERATION_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
            service.finish_generation(token, outcome).await
        });

        task.await
            .map_err(|e| AppError::Internal(anyhow!("generation task failed: {}", e)))?
    }

    async fn produce_quiz(&self, pdf: Vec<u8>, title: &str) -> Result<Quiz, QuizError> {
        let extractor = self.shared.extractor.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&pdf))
            .await
            .map_err(|e| {
                QuizError::ExtractionFailure(format!("extraction task failed: {}", e))
            })??;
        let text = ensure_enough_text(text)?;

        let questions = self.shared.generator.generate(&text, title).await?;

        Ok(Quiz {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            questions,
            created_at: now_millis(),
        })
    }

    async fn finish_generation(
        &self,
        token: u64,
        outcome: Result<Quiz, QuizError>,
    ) -> Result<ScreenView, AppError> {
        let mut flow = self.shared.flow.lock().await;

        match outcome {
            Ok(quiz) => {
                let quiz_id = quiz.id.clone();
                let action = ScreenAction::GenerationSucceeded { token, quiz };
                match self.apply_locked(&mut flow, action) {
                    Ok(_) => {
                        QUIZ_GENERATIONS_TOTAL.with_label_values(&["success"]).inc();
                        tracing::info!("Quiz {} ready", quiz_id);
                        Ok(flow.orchestrator.view())
                    }
                    Err(e) => {
                        QUIZ_GENERATIONS_TOTAL.with_label_values(&["stale"]).inc();
                        tracing::warn!("Discarding quiz {}: {}", quiz_id, e);
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                QUIZ_GENERATIONS_TOTAL.with_label_values(&[e.kind()]).inc();
                tracing::warn!("Quiz generation failed (token={}): {}", token, e);
                let action = ScreenAction::GenerationFailed { token };
                if let Err(stale) = self.apply_locked(&mut flow, action) {
                    tracing::debug!("Generation failure arrived late: {}", stale);
                }
                Err(e.into())
            }
        }
    }

    /// Records the first answer to the current question. Later clicks on an
    /// answered question are ignored.
    pub async fn select(&self, option_index: usize) -> Result<ScreenView, AppError> {
        let mut flow = self.shared.flow.lock().await;
        let action = ScreenAction::Session(SessionAction::Select(option_index));

        match self.apply_locked(&mut flow, action) {
            Ok(_) => {
                let correct = flow
                    .orchestrator
                    .session()
                    .and_then(|s| s.answers().last())
                    .map(|a| a.correct)
                    .unwrap_or(false);
                record_answer(if correct { "correct" } else { "incorrect" });
                Ok(flow.orchestrator.view())
            }
            Err(ScreenError::Session(SessionError::AlreadyAnswered)) => {
                tracing::debug!("Ignoring selection on an answered question");
                Ok(flow.orchestrator.view())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn advance(&self) -> Result<ScreenView, AppError> {
        self.run(ScreenAction::Session(SessionAction::Advance)).await
    }

    pub async fn restart(&self) -> Result<ScreenView, AppError> {
        self.run(ScreenAction::Restart).await
    }

    pub async fn navigate(&self, target: NavigationTarget) -> Result<ScreenView, AppError> {
        self.run(ScreenAction::Navigate(target)).await
    }

    async fn run(&self, action: ScreenAction) -> Result<ScreenView, AppError> {
        let (view, finished) = {
            let mut flow = self.shared.flow.lock().await;
            let finished = self.apply_locked(&mut flow, action)?;
            (flow.orchestrator.view(), finished)
        };

        for result in finished {
            self.record(result).await;
        }
        Ok(view)
    }

    async fn record(&self, result: QuizResult) {
        QUIZZES_COMPLETED_TOTAL.inc();
        tracing::info!(
            "Quiz {} finished: {}/{}",
            result.quiz_id,
            result.score,
            result.total
        );

        // The results screen is shown even when the history cannot be written.
        if let Err(e) = self.shared.store.append(result).await {
            tracing::error!("Failed to save quiz result: {:#}", e);
        }
    }

    /// Applies `action`, runs the timer effects and hands back results to persist.
    fn apply_locked(
        &self,
        flow: &mut Flow,
        action: ScreenAction,
    ) -> Result<Vec<QuizResult>, ScreenError> {
        let (next, effects) = flow.orchestrator.apply(action, now_millis())?;
        flow.orchestrator = next;

        let mut finished = Vec::new();
        for effect in effects {
            match effect {
                Effect::StopTimer => flow.stop_ticker(),
                Effect::StartTimer {
                    attempt,
                    question_index,
                } => {
                    flow.stop_ticker();
                    flow.ticker = Some(self.spawn_ticker(attempt, question_index));
                }
                Effect::RecordResult(result) => finished.push(result),
            }
        }
        Ok(finished)
    }

    fn spawn_ticker(&self, attempt: u64, question_index: usize) -> JoinHandle<()> {
        let total = self.shared.question_seconds;
        self.publish(TimerEvent::TimerTick(TimerTick {
            attempt_id: attempt.to_string(),
            question_index,
            remaining_seconds: total,
            total_seconds: total,
            timestamp: Utc::now(),
        }));

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let period = self.shared.tick_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of an interval completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let service = StudyService { shared };
                if service.tick(attempt, question_index).await != TickOutcome::Running {
                    break;
                }
            }
            tracing::debug!(
                "Countdown for attempt {} question {} ended",
                attempt,
                question_index
            );
        })
    }

    /// One countdown step for the given attempt and question.
    pub async fn tick(&self, attempt: u64, question_index: usize) -> TickOutcome {
        let mut flow = self.shared.flow.lock().await;
        let action = ScreenAction::Tick {
            attempt,
            question_index,
        };

        let (next, effects) = match flow.orchestrator.apply(action, now_millis()) {
            Ok(step) => step,
            Err(e) => {
                tracing::debug!("Dropping countdown tick: {}", e);
                return TickOutcome::Stale;
            }
        };
        flow.orchestrator = next;

        let attempt_id = attempt.to_string();
        let state = flow.orchestrator.session().map(|s| s.state());
        match state {
            Some(SessionState::AwaitingAnswer { time_left, .. }) => {
                self.publish(TimerEvent::TimerTick(TimerTick {
                    attempt_id,
                    question_index,
                    remaining_seconds: time_left,
                    total_seconds: self.shared.question_seconds,
                    timestamp: Utc::now(),
                }));
                TickOutcome::Running
            }
            _ => {
                if effects.contains(&Effect::StopTimer) {
                    flow.stop_ticker();
                }
                record_answer("timeout");
                tracing::info!(
                    "Time expired: attempt={} question={}",
                    attempt_id,
                    question_index
                );
                self.publish(TimerEvent::TimeExpired(TimeExpired {
                    attempt_id,
                    question_index,
                    timestamp: Utc::now(),
                    message: "Time is up".to_string(),
                }));
                TickOutcome::Expired
            }
        }
    }

    fn publish(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }
}
