use rand::Rng;

use assess_core::model::{AgeBand, Question, SessionId, Subject, SubjectDraft, SubjectErrors};
use assess_core::scoring::{ScoreAggregator, ScoreSummary};

use super::plan::{QuestionSetBuilder, SessionQuestionSet};
use super::progress::{AnswerRecord, SessionObservation, SessionStatus};
use crate::error::SessionError;
use crate::timer::TimerId;

/// Outcome of an answer or an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The question was resolved by this event.
    Locked(AnswerRecord),
    /// The event arrived too late or for a stale timer.
    Ignored,
}

/// Outcome of leaving a locked question.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next { index: usize },
    Completed(ScoreSummary),
}

/// Deterministic core of an assessment session.
///
/// Every question is resolved exactly once, either by `select_option` or by
/// `timer_expired` for the currently armed timer. Whichever arrives first locks
/// the question and the other becomes a no-op. No I/O happens here; the runner
/// owns timers and persistence.
#[derive(Debug)]
pub struct SessionStateMachine {
    id: SessionId,
    band: AgeBand,
    catalog: Vec<Question>,
    builder: QuestionSetBuilder,
    status: SessionStatus,
    subject: Option<Subject>,
    intake_errors: Option<SubjectErrors>,
    questions: SessionQuestionSet,
    current: usize,
    scores: ScoreAggregator,
    time_remaining: u32,
    armed: Option<TimerId>,
    last_answer: Option<AnswerRecord>,
    summary: Option<ScoreSummary>,
}

impl SessionStateMachine {
    #[must_use]
    pub fn new(band: AgeBand, catalog: Vec<Question>, builder: QuestionSetBuilder) -> Self {
        Self {
            id: SessionId::generate(),
            band,
            catalog,
            builder,
            status: SessionStatus::AwaitingSubject,
            subject: None,
            intake_errors: None,
            questions: SessionQuestionSet::default(),
            current: 0,
            scores: ScoreAggregator::new(0),
            time_remaining: 0,
            armed: None,
            last_answer: None,
            summary: None,
        }
    }

    /// Machine over the built-in catalog for `band`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the built-in catalog is malformed.
    pub fn for_band(band: AgeBand, builder: QuestionSetBuilder) -> Result<Self, SessionError> {
        Ok(Self::new(band, band.catalog()?, builder))
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn band(&self) -> AgeBand {
        self.band
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn intake_errors(&self) -> Option<&SubjectErrors> {
        self.intake_errors.as_ref()
    }

    /// The question on screen while presenting or locked.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            SessionStatus::Presenting | SessionStatus::Locked => self.questions.get(self.current),
            SessionStatus::AwaitingSubject | SessionStatus::Completed => None,
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn armed_timer(&self) -> Option<TimerId> {
        self.armed
    }

    #[must_use]
    pub fn last_answer(&self) -> Option<&AnswerRecord> {
        self.last_answer.as_ref()
    }

    #[must_use]
    pub fn scores(&self) -> &ScoreAggregator {
        &self.scores
    }

    #[must_use]
    pub fn summary(&self) -> Option<&ScoreSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status == SessionStatus::Locked
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Fraction of the session reached, counting the question on screen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        match self.status {
            SessionStatus::AwaitingSubject => 0.0,
            SessionStatus::Completed => 1.0,
            SessionStatus::Presenting | SessionStatus::Locked => {
                (self.current + 1) as f64 / self.questions.len().max(1) as f64
            }
        }
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    /// Validate the intake form, draw the question set and present question 1.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyStarted` once a subject has been accepted.
    /// - `SessionError::Subject` with per-field messages; the machine stays in intake.
    /// - `SessionError::Empty` if the catalog yields no questions.
    pub fn submit_subject<R: Rng + ?Sized>(
        &mut self,
        draft: &SubjectDraft,
        rng: &mut R,
    ) -> Result<&Subject, SessionError> {
        if self.status != SessionStatus::AwaitingSubject {
            return Err(SessionError::AlreadyStarted);
        }
        let subject = match draft.validate() {
            Ok(subject) => subject,
            Err(errors) => {
                self.intake_errors = Some(errors.clone());
                return Err(errors.into());
            }
        };
        let questions = self.builder.build(&self.catalog, rng);
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        self.scores = ScoreAggregator::new(total);
        self.questions = questions;
        self.intake_errors = None;
        self.open(0);
        Ok(self.subject.insert(subject))
    }

    /// Record the countdown for the question on screen. Returns false unless presenting.
    pub fn arm_timer(&mut self, timer: TimerId) -> bool {
        if self.status != SessionStatus::Presenting {
            return false;
        }
        self.armed = Some(timer);
        true
    }

    /// Apply a countdown tick. Ticks from any timer but the armed one are dropped.
    pub fn timer_tick(&mut self, timer: TimerId, remaining: u32) -> bool {
        if self.status != SessionStatus::Presenting || self.armed != Some(timer) {
            return false;
        }
        self.time_remaining = remaining;
        true
    }

    /// Resolve the question on screen as unanswered, if `timer` is still armed.
    pub fn timer_expired(&mut self, timer: TimerId) -> Resolution {
        if self.status != SessionStatus::Presenting || self.armed != Some(timer) {
            return Resolution::Ignored;
        }
        self.time_remaining = 0;
        self.resolve(None)
    }

    /// Resolve the question on screen with the chosen option.
    ///
    /// Selections outside `Presenting` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` for an index past the option list; nothing changes.
    pub fn select_option(&mut self, index: usize) -> Result<Resolution, SessionError> {
        if self.status != SessionStatus::Presenting {
            return Ok(Resolution::Ignored);
        }
        let len = self
            .questions
            .get(self.current)
            .map_or(0, |q| q.options().len());
        if index >= len {
            return Err(SessionError::InvalidOption { index, len });
        }
        Ok(self.resolve(Some(index)))
    }

    /// Leave the locked question for the next one, or complete the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLocked`, `AwaitingSubject` or `Completed` when called
    /// from any state other than `Locked`.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.status {
            SessionStatus::Locked => {}
            SessionStatus::Presenting => return Err(SessionError::NotLocked),
            SessionStatus::AwaitingSubject => return Err(SessionError::AwaitingSubject),
            SessionStatus::Completed => return Err(SessionError::Completed),
        }

        let next = self.current + 1;
        if next < self.questions.len() {
            self.open(next);
            return Ok(Advance::Next { index: next });
        }

        let summary = self.scores.summarize();
        self.status = SessionStatus::Completed;
        self.summary = Some(summary.clone());
        Ok(Advance::Completed(summary))
    }

    #[must_use]
    pub fn observe(&self) -> SessionObservation {
        let question = self.current_question().cloned();
        SessionObservation {
            session_id: self.id,
            band: self.band,
            status: self.status,
            subject: self.subject.clone(),
            intake_errors: self.intake_errors.clone(),
            question_number: if question.is_some() { self.current + 1 } else { 0 },
            question,
            total_questions: self.questions.len(),
            time_remaining: self.time_remaining,
            progress: self.progress(),
            last_answer: self.last_answer.clone(),
            summary: self.summary.clone(),
            notice: None,
        }
    }

    fn open(&mut self, index: usize) {
        self.current = index;
        self.status = SessionStatus::Presenting;
        self.armed = None;
        self.last_answer = None;
        self.time_remaining = self
            .questions
            .get(index)
            .map_or(0, Question::time_limit_secs);
    }

    fn resolve(&mut self, selected: Option<usize>) -> Resolution {
        let Some(question) = self.questions.get(self.current) else {
            return Resolution::Ignored;
        };
        let record = AnswerRecord {
            question_id: question.id(),
            category: question.category().clone(),
            selected,
            correct_index: question.correct_index(),
            is_correct: question.is_correct(selected),
        };
        self.scores.record(&record.category, record.is_correct);
        self.status = SessionStatus::Locked;
        self.armed = None;
        self.last_answer = Some(record.clone());
        Resolution::Locked(record)
    }
}
