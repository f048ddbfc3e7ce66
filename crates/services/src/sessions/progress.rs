use assess_core::model::{AgeBand, Category, Question, QuestionId, SessionId, Subject, SubjectErrors};
use assess_core::scoring::ScoreSummary;
use serde::Serialize;

/// Lifecycle of one assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingSubject,
    Presenting,
    Locked,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::AwaitingSubject => "awaiting_subject",
            SessionStatus::Presenting => "presenting",
            SessionStatus::Locked => "locked",
            SessionStatus::Completed => "completed",
        }
    }
}

/// How a single question was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub category: Category,
    /// `None` when the countdown ran out.
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
}

impl AnswerRecord {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }
}

/// Read-only snapshot of a session, published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionObservation {
    pub session_id: SessionId,
    pub band: AgeBand,
    pub status: SessionStatus,
    pub subject: Option<Subject>,
    pub intake_errors: Option<SubjectErrors>,
    pub question: Option<Question>,
    /// 1-based position of `question`, 0 before the first one.
    pub question_number: usize,
    pub total_questions: usize,
    pub time_remaining: u32,
    pub progress: f64,
    pub last_answer: Option<AnswerRecord>,
    pub summary: Option<ScoreSummary>,
    /// Transient message for failed background writes.
    pub notice: Option<String>,
}

impl SessionObservation {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status == SessionStatus::Locked
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}
