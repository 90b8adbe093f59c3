use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    Empty,
}

/// Name of the subject a question set belongs to.
///
/// Questions, checkpoints and history records are all scoped by topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Build a topic from a raw name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::Empty` if nothing remains after trimming.
    pub fn new(name: impl AsRef<str>) -> Result<Self, TopicError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TopicError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_trimmed() {
        let topic = Topic::new("  Cyber Security ").unwrap();
        assert_eq!(topic.as_str(), "Cyber Security");
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert_eq!(Topic::new("   ").unwrap_err(), TopicError::Empty);
        assert!(serde_json::from_str::<Topic>("\"\"").is_err());
    }
}
