use crate::error::BatchError;

/// Decides whether a failed chunk write is attempted again with the same items.
pub trait RetryPolicy {
    /// `attempt` is the number of write attempts already made for the chunk
    /// (1 after the first failure).
    fn can_retry(&self, attempt: u32, error: &BatchError) -> bool;
}

/// Never retries: the first failed write fails the step.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn can_retry(&self, _attempt: u32, _error: &BatchError) -> bool {
        false
    }
}

/// Retries writer failures until `max_attempts` attempts were made.
#[derive(Debug, Clone, Copy)]
pub struct MaxAttemptsRetry {
    pub max_attempts: u32,
}

impl MaxAttemptsRetry {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl RetryPolicy for MaxAttemptsRetry {
    fn can_retry(&self, attempt: u32, error: &BatchError) -> bool {
        matches!(error, BatchError::ItemWriter(_)) && attempt < self.max_attempts
    }
}
