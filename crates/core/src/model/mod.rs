mod catalog;
mod ids;
mod question;
mod result;
mod subject;

pub use catalog::{AgeBand, UnknownAgeBand};
pub use ids::{ParseIdError, PatientId, QuestionId, ResultId, SessionId};
pub use question::{
    Category, DEFAULT_TIME_LIMIT_SECS, Difficulty, MAX_OPTIONS, MIN_OPTIONS, Question,
    QuestionError, RenderHint,
};
pub use result::{AssessmentResult, ResultDraft, ResultError, percentage_of};
pub use subject::{Patient, Subject, SubjectDraft, SubjectErrors};
