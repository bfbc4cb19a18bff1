use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest subject the stores accept. Matches the MySQL column width.
pub const MAX_SUBJECT_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    #[error("subject is empty")]
    Empty,
    #[error("subject exceeds 255 bytes")]
    TooLong,
}

/// Opaque principal identifier supplied by the caller. Never looked up
/// against a user table.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    pub fn new(raw: impl Into<String>) -> Result<Self, SubjectError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(SubjectError::Empty);
        }
        if raw.len() > MAX_SUBJECT_LEN {
            return Err(SubjectError::TooLong);
        }
        Ok(Subject(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Subject {
    type Error = SubjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Subject::new(value)
    }
}

impl From<Subject> for String {
    fn from(value: Subject) -> Self {
        value.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Subject {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::new(s)
    }
}
