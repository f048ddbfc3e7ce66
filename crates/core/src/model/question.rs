use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Time limit applied when a catalog entry does not specify one.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 20;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("category must not be empty")]
    EmptyCategory,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("question needs {MIN_OPTIONS}..={MAX_OPTIONS} options, got {0}")]
    OptionCount(usize),

    #[error("correct index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("time limit must be positive")]
    ZeroTimeLimit,
}

//
// ─── CATEGORY ─────────────────────────────────────────────────────────────────
//

/// Tag grouping questions by the skill they exercise (memory, logic, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category(String);

impl Category {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyCategory` for blank tags.
    pub fn new(tag: impl Into<String>) -> Result<Self, QuestionError> {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Presentation hint carried alongside the prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderHint {
    /// A color the renderer should show as a swatch, e.g. `#3B82F6`.
    ColorSwatch(String),
    Emoji(String),
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice item. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    category: Category,
    difficulty: Option<Difficulty>,
    prompt: String,
    hint: Option<RenderHint>,
    options: Vec<String>,
    correct_index: usize,
    time_limit_secs: u32,
}

impl Question {
    /// Build a validated question.
    ///
    /// `time_limit_secs` falls back to [`DEFAULT_TIME_LIMIT_SECS`] when `None`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, the option count is outside
    /// 2..=5, the correct index does not point at an option, or the limit is zero.
    pub fn new(
        id: QuestionId,
        category: Category,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        time_limit_secs: Option<u32>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(QuestionError::OptionCount(options.len()));
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        let time_limit_secs = time_limit_secs.unwrap_or(DEFAULT_TIME_LIMIT_SECS);
        if time_limit_secs == 0 {
            return Err(QuestionError::ZeroTimeLimit);
        }

        Ok(Self {
            id,
            category,
            difficulty: None,
            prompt,
            hint: None,
            options,
            correct_index,
            time_limit_secs,
        })
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: RenderHint) -> Self {
        self.hint = Some(hint);
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn hint(&self) -> Option<&RenderHint> {
        self.hint.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// `None` is the timeout sentinel and is never correct.
    #[must_use]
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("opt {i}")).collect()
    }

    fn cat() -> Category {
        Category::new("memory").unwrap()
    }

    #[test]
    fn default_time_limit_applies() {
        let q = Question::new(QuestionId::new(1), cat(), "Q?", opts(4), 1, None).unwrap();
        assert_eq!(q.time_limit_secs(), DEFAULT_TIME_LIMIT_SECS);
        assert!(q.difficulty().is_none());
    }

    #[test]
    fn rejects_bad_option_counts() {
        let err = Question::new(QuestionId::new(1), cat(), "Q?", opts(1), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::OptionCount(1));
        let err = Question::new(QuestionId::new(1), cat(), "Q?", opts(6), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::OptionCount(6));
    }

    #[test]
    fn rejects_correct_index_past_options() {
        let err = Question::new(QuestionId::new(1), cat(), "Q?", opts(3), 3, None).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::CorrectIndexOutOfRange { index: 3, len: 3 }
        ));
    }

    #[test]
    fn rejects_zero_time_limit_and_blank_prompt() {
        let err = Question::new(QuestionId::new(1), cat(), "Q?", opts(2), 0, Some(0)).unwrap_err();
        assert_eq!(err, QuestionError::ZeroTimeLimit);
        let err = Question::new(QuestionId::new(1), cat(), "  ", opts(2), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn timeout_sentinel_is_never_correct() {
        let q = Question::new(QuestionId::new(1), cat(), "Q?", opts(2), 0, None).unwrap();
        assert!(q.is_correct(Some(0)));
        assert!(!q.is_correct(Some(1)));
        assert!(!q.is_correct(None));
    }

    #[test]
    fn category_is_trimmed_and_non_empty() {
        assert_eq!(Category::new("  logic ").unwrap().as_str(), "logic");
        assert_eq!(Category::new(" ").unwrap_err(), QuestionError::EmptyCategory);
    }
}
