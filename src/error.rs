use thiserror::Error;

use crate::core::execution::{BatchStatus, RunId};

#[derive(Error, Debug, Clone, PartialEq)]
/// Batch error
pub enum BatchError {
    /// The item reader could not produce the next item (parsing, connectivity...).
    #[error("ItemReader: {0}")]
    ItemReader(String),

    /// The item processor failed to transform an item. A validation rejection is
    /// not an error and never ends up here.
    #[error("ItemProcessor: {0}")]
    ItemProcessor(String),

    /// The item writer could not persist a chunk. The whole chunk is rolled back.
    #[error("ItemWriter: {0}")]
    ItemWriter(String),

    #[error("Job '{job_name}' already has an execution for run id {run_id}")]
    DuplicateRun { job_name: String, run_id: RunId },

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: BatchStatus, to: BatchStatus },

    #[error("No execution found: {0}")]
    ExecutionNotFound(String),

    #[error("Job '{job_name}' run {run_id} cannot be restarted: {reason}")]
    NotRestartable {
        job_name: String,
        run_id: RunId,
        reason: String,
    },

    #[error("JobRepository: {0}")]
    Repository(String),

    #[error("Configuration: {0}")]
    Configuration(String),

    #[error("Listener: {0}")]
    Listener(String),
}
