use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

use assess_core::model::{
    AgeBand, PatientId, Question, ResultDraft, ResultId, SessionId, SubjectDraft,
};
use assess_core::scoring::ScoreSummary;
use storage::repository::{PatientRepository, ResultRepository, StorageError};

use super::machine::{Advance, Resolution, SessionStateMachine};
use super::plan::QuestionSetBuilder;
use super::progress::{SessionObservation, SessionStatus};
use crate::Clock;
use crate::error::{PersistenceError, SessionError};
use crate::timer::{TimerController, TimerHandle, TimerId};

/// Tunables for a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub target_questions: usize,
    /// How long the locked answer stays on screen before advancing.
    pub settle_delay: Duration,
    pub tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_questions: QuestionSetBuilder::DEFAULT_TARGET,
            settle_delay: Duration::from_secs(1),
            tick: Duration::from_secs(1),
        }
    }
}

/// Input from whatever surface is driving the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SubjectSubmitted { name: String, age: String },
    OptionSelected(usize),
    Exit,
}

type Registration = JoinHandle<Result<PatientId, StorageError>>;

#[derive(Debug, Clone, Copy)]
enum TimerEvent {
    Tick(TimerId, u32),
    Expired(TimerId),
}

/// Final score plus the in-flight save of the result.
#[derive(Debug)]
pub struct Completion {
    pub session_id: SessionId,
    pub summary: ScoreSummary,
    pub save: JoinHandle<Result<ResultId, PersistenceError>>,
}

impl Completion {
    /// Wait for the background save.
    ///
    /// # Errors
    ///
    /// Returns the `PersistenceError` of the save, or `PersistenceError::Task` if it panicked.
    pub async fn saved(self) -> Result<ResultId, PersistenceError> {
        self.save
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?
    }
}

#[derive(Debug)]
pub enum Step {
    Next,
    Completed(Completion),
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(Completion),
    Exited,
}

/// Drives a `SessionStateMachine` with real countdowns and storage.
///
/// Patient registration and the result save both run on their own tasks, so a
/// slow or failing store never holds up a question or an exit. The save waits
/// for a registration that is still in flight.
pub struct AssessmentRunner {
    machine: SessionStateMachine,
    config: SessionConfig,
    rng: StdRng,
    clock: Clock,
    timers: TimerController,
    active: Option<TimerHandle>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    observations: watch::Sender<SessionObservation>,
    patients: Arc<dyn PatientRepository>,
    results: Arc<dyn ResultRepository>,
    registration: Option<Registration>,
    patient_id: Option<PatientId>,
    notice: Option<String>,
}

impl AssessmentRunner {
    /// Runner over the built-in catalog for `band`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the built-in catalog is malformed.
    pub fn new(
        band: AgeBand,
        patients: Arc<dyn PatientRepository>,
        results: Arc<dyn ResultRepository>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let catalog = band.catalog()?;
        Ok(Self::with_catalog(band, catalog, patients, results, config))
    }

    #[must_use]
    pub fn with_catalog(
        band: AgeBand,
        catalog: Vec<Question>,
        patients: Arc<dyn PatientRepository>,
        results: Arc<dyn ResultRepository>,
        config: SessionConfig,
    ) -> Self {
        let builder = QuestionSetBuilder::new(config.target_questions);
        let machine = SessionStateMachine::new(band, catalog, builder);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (observations, _) = watch::channel(machine.observe());
        Self {
            machine,
            config,
            rng: StdRng::from_os_rng(),
            clock: Clock::default(),
            timers: TimerController::new().with_tick(config.tick),
            active: None,
            timer_tx,
            timer_rx,
            observations,
            patients,
            results,
            registration: None,
            patient_id: None,
            notice: None,
        }
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionObservation> {
        self.observations.subscribe()
    }

    #[must_use]
    pub fn machine(&self) -> &SessionStateMachine {
        &self.machine
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.machine.current_question()
    }

    /// Id of the registered patient, once registration has been observed to succeed.
    #[must_use]
    pub fn patient_id(&self) -> Option<PatientId> {
        self.patient_id
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    // ─── Commands ──────────────────────────────────────────────────────────────

    /// Validate intake, present the first question and start registering the patient.
    ///
    /// Registration runs in the background; a failure is published as a notice
    /// and the session goes ahead. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the machine's intake errors; see [`SessionStateMachine::submit_subject`].
    pub fn submit_subject(&mut self, name: &str, age: &str) -> Result<(), SessionError> {
        let draft = SubjectDraft::new(name, age);
        let subject = match self.machine.submit_subject(&draft, &mut self.rng) {
            Ok(subject) => subject.clone(),
            Err(err) => {
                self.publish();
                return Err(err);
            }
        };
        tracing::info!(
            session = %self.machine.id(),
            band = %self.machine.band(),
            questions = self.machine.total_questions(),
            "session started"
        );

        self.arm_current();
        self.publish();

        let patients = Arc::clone(&self.patients);
        let registered_at = self.clock.now();
        self.registration = Some(tokio::spawn(async move {
            patients.create_patient(&subject, registered_at).await
        }));
        Ok(())
    }

    /// Wait for patient registration to finish and return the id, or `None` if it failed.
    pub async fn registered(&mut self) -> Option<PatientId> {
        if let Some(pending) = self.registration.take() {
            let outcome = pending.await;
            self.apply_registration(outcome);
        }
        self.patient_id
    }

    /// Answer the question on screen and stop its countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` for an index past the option list.
    pub fn select_option(&mut self, index: usize) -> Result<Resolution, SessionError> {
        let resolution = self.machine.select_option(index)?;
        if let Resolution::Locked(record) = &resolution {
            self.cancel_timer();
            tracing::debug!(
                question = %record.question_id,
                correct = record.is_correct,
                "answer locked"
            );
            self.publish();
        }
        Ok(resolution)
    }

    /// Wait for the next countdown event and apply it.
    ///
    /// Returns `Resolution::Locked` when this event timed the question out. Waits
    /// forever if no countdown is running.
    pub async fn next_timer_event(&mut self) -> Resolution {
        match self.timer_rx.recv().await {
            Some(event) => self.apply_timer_event(event),
            None => Resolution::Ignored,
        }
    }

    /// Hold the locked answer for the settle delay, then move on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLocked` (or `AwaitingSubject`/`Completed`) if no answer is locked.
    pub async fn advance(&mut self) -> Result<Step, SessionError> {
        match self.machine.status() {
            SessionStatus::Locked => {}
            SessionStatus::Presenting => return Err(SessionError::NotLocked),
            SessionStatus::AwaitingSubject => return Err(SessionError::AwaitingSubject),
            SessionStatus::Completed => return Err(SessionError::Completed),
        }
        tokio::time::sleep(self.config.settle_delay).await;
        self.finish_advance()
    }

    /// Abandon the session. Nothing is saved; a registration already in flight finishes on its own.
    #[must_use]
    pub fn exit(mut self) -> RunOutcome {
        self.cancel_timer();
        tracing::info!(session = %self.machine.id(), status = self.machine.status().as_str(), "session exited");
        RunOutcome::Exited
    }

    /// Process UI events until the session completes or the user exits.
    ///
    /// Closing the event channel counts as exit. Selections made while an answer is
    /// locked are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` only for failures that end the session, such as an empty catalog.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) -> Result<RunOutcome, SessionError> {
        self.publish();
        loop {
            if self.machine.is_locked() {
                let settle = tokio::time::sleep(self.config.settle_delay);
                tokio::pin!(settle);
                loop {
                    tokio::select! {
                        () = &mut settle => break,
                        event = events.recv() => match event {
                            None | Some(UiEvent::Exit) => return Ok(self.exit()),
                            Some(event) => tracing::debug!(?event, "input ignored while answer is shown"),
                        },
                        outcome = wait_registration(&mut self.registration), if self.registration.is_some() => {
                            self.registration = None;
                            self.apply_registration(outcome);
                        }
                    }
                }
                if let Step::Completed(completion) = self.finish_advance()? {
                    return Ok(RunOutcome::Completed(completion));
                }
                continue;
            }

            tokio::select! {
                event = events.recv() => match event {
                    None | Some(UiEvent::Exit) => return Ok(self.exit()),
                    Some(UiEvent::SubjectSubmitted { name, age }) => {
                        match self.submit_subject(&name, &age) {
                            Ok(()) | Err(SessionError::Subject(_) | SessionError::AlreadyStarted) => {}
                            Err(err) => return Err(err),
                        }
                    }
                    Some(UiEvent::OptionSelected(index)) => {
                        if let Err(err) = self.select_option(index) {
                            tracing::debug!("selection rejected: {err}");
                        }
                    }
                },
                Some(event) = self.timer_rx.recv() => {
                    self.apply_timer_event(event);
                }
                outcome = wait_registration(&mut self.registration), if self.registration.is_some() => {
                    self.registration = None;
                    self.apply_registration(outcome);
                }
            }
        }
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    fn finish_advance(&mut self) -> Result<Step, SessionError> {
        match self.machine.advance()? {
            Advance::Next { index } => {
                tracing::debug!(session = %self.machine.id(), index, "next question");
                self.arm_current();
                self.publish();
                Ok(Step::Next)
            }
            Advance::Completed(summary) => {
                tracing::info!(
                    session = %self.machine.id(),
                    score = summary.score,
                    total = summary.total_questions,
                    percentage = summary.percentage,
                    "session completed"
                );
                let save = self.spawn_save(&summary);
                self.publish();
                Ok(Step::Completed(Completion {
                    session_id: self.machine.id(),
                    summary,
                    save,
                }))
            }
        }
    }

    fn apply_registration(&mut self, outcome: Result<Result<PatientId, StorageError>, JoinError>) {
        let err = match outcome {
            Ok(Ok(id)) => {
                tracing::info!(session = %self.machine.id(), patient = %id, "patient registered");
                self.patient_id = Some(id);
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(err) => err.to_string(),
        };
        tracing::warn!("patient registration failed, result will not be saved: {err}");
        self.notice = Some(format!("Could not register patient: {err}"));
        self.publish();
    }

    fn apply_timer_event(&mut self, event: TimerEvent) -> Resolution {
        match event {
            TimerEvent::Tick(id, remaining) => {
                if self.machine.timer_tick(id, remaining) {
                    self.publish();
                }
                Resolution::Ignored
            }
            TimerEvent::Expired(id) => {
                let resolution = self.machine.timer_expired(id);
                if let Resolution::Locked(record) = &resolution {
                    self.active = None;
                    tracing::debug!(question = %record.question_id, "question timed out");
                    self.publish();
                }
                resolution
            }
        }
    }

    fn arm_current(&mut self) {
        self.cancel_timer();
        if self.machine.status() != SessionStatus::Presenting {
            return;
        }
        let Some(secs) = self.machine.current_question().map(Question::time_limit_secs) else {
            return;
        };
        let tick_tx = self.timer_tx.clone();
        let expire_tx = self.timer_tx.clone();
        let handle = self.timers.start(
            secs,
            move |id, remaining| {
                let _ = tick_tx.send(TimerEvent::Tick(id, remaining));
            },
            move |id| {
                let _ = expire_tx.send(TimerEvent::Expired(id));
            },
        );
        self.machine.arm_timer(handle.id());
        self.active = Some(handle);
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
    }

    fn publish(&self) {
        let mut observation = self.machine.observe();
        observation.notice.clone_from(&self.notice);
        self.observations.send_replace(observation);
    }

    fn spawn_save(&mut self, summary: &ScoreSummary) -> JoinHandle<Result<ResultId, PersistenceError>> {
        let results = Arc::clone(&self.results);
        let registration = self.registration.take();
        let patient_id = self.patient_id;
        let band = self.machine.band();
        let (score, total) = (summary.score, summary.total_questions);
        let completed_at = self.clock.now();
        tokio::spawn(async move {
            let patient_id = match registration {
                Some(pending) => pending.await.ok().and_then(Result::ok),
                None => patient_id,
            };
            let outcome =
                save_result(results.as_ref(), patient_id, band, score, total, completed_at).await;
            match &outcome {
                Ok(id) => tracing::info!(result = %id, "assessment result saved"),
                Err(err) => tracing::warn!("assessment result not saved: {err}"),
            }
            outcome
        })
    }
}

async fn wait_registration(
    pending: &mut Option<Registration>,
) -> Result<Result<PatientId, StorageError>, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn save_result(
    results: &dyn ResultRepository,
    patient_id: Option<PatientId>,
    band: AgeBand,
    score: u32,
    total: u32,
    completed_at: DateTime<Utc>,
) -> Result<ResultId, PersistenceError> {
    let patient_id = patient_id.ok_or(PersistenceError::NoPatient)?;
    let draft = ResultDraft::new(patient_id, band, score, total, completed_at)?;
    Ok(results.save_result(&draft).await?)
}
