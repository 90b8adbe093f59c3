/// Aggregated view of session progress, useful for the question overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub current_index: usize,
    pub time_remaining: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Whether every question has been answered or has expired.
    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.remaining == 0
    }
}
