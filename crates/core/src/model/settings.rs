use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question time must be between 5 and 600 seconds")]
    InvalidQuestionSeconds,

    #[error("pass percentage must be between 1 and 100")]
    InvalidPassPercentage,
}

/// Tunables of a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    question_seconds: u32,
    pass_percentage: u32,
}

impl QuizSettings {
    pub const DEFAULT_QUESTION_SECONDS: u32 = 30;
    pub const DEFAULT_PASS_PERCENTAGE: u32 = 70;

    /// # Errors
    ///
    /// Returns `SettingsError` if a value is outside its allowed range.
    pub fn new(question_seconds: u32, pass_percentage: u32) -> Result<Self, SettingsError> {
        if !(5..=600).contains(&question_seconds) {
            return Err(SettingsError::InvalidQuestionSeconds);
        }
        if !(1..=100).contains(&pass_percentage) {
            return Err(SettingsError::InvalidPassPercentage);
        }
        Ok(Self {
            question_seconds,
            pass_percentage,
        })
    }

    /// Seconds allotted to each question before it expires.
    #[must_use]
    pub fn question_seconds(&self) -> u32 {
        self.question_seconds
    }

    /// Minimum rounded percentage that counts as a pass.
    #[must_use]
    pub fn pass_percentage(&self) -> u32 {
        self.pass_percentage
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_seconds: Self::DEFAULT_QUESTION_SECONDS,
            pass_percentage: Self::DEFAULT_PASS_PERCENTAGE,
        }
    }
}
