mod machine;
mod plan;
mod progress;
mod runner;

// Public API of the session subsystem.
pub use crate::error::{PersistenceError, SessionError};
pub use machine::{Advance, Resolution, SessionStateMachine};
pub use plan::{QuestionSetBuilder, SessionQuestionSet};
pub use progress::{AnswerRecord, SessionObservation, SessionStatus};
pub use runner::{AssessmentRunner, Completion, RunOutcome, SessionConfig, Step, UiEvent};
