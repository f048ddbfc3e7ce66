#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;
pub mod timer;
pub mod trend_service;

pub use assess_core::Clock;

pub use error::{PersistenceError, SessionError, TrendServiceError};
pub use timer::{TimerController, TimerHandle, TimerId};
pub use trend_service::TrendService;

pub use sessions::{
    AnswerRecord, AssessmentRunner, Completion, QuestionSetBuilder, RunOutcome, SessionConfig,
    SessionObservation, SessionStateMachine, SessionStatus, UiEvent,
};
