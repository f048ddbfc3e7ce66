//! Shared error types for the services crate.

use thiserror::Error;

use assess_core::model::{QuestionError, ResultError, SubjectErrors};
use storage::repository::StorageError;

/// Errors emitted by the session state machine and runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("subject already submitted")]
    AlreadyStarted,
    #[error("no subject submitted yet")]
    AwaitingSubject,
    #[error("current question is not locked")]
    NotLocked,
    #[error("session already completed")]
    Completed,
    #[error("option {index} is out of range for {len} options")]
    InvalidOption { index: usize, len: usize },
    #[error("invalid subject: {0}")]
    Subject(#[from] SubjectErrors),
    #[error(transparent)]
    Catalog(#[from] QuestionError),
}

/// Failures of the asynchronous writes issued by a session.
///
/// These never roll back or block the session; they only mean the outcome was not saved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("patient was never registered; result not saved")]
    NoPatient,
    #[error("save task did not finish: {0}")]
    Task(String),
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TrendService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrendServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
