use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one launch of a job.
///
/// Two executions of the same job can never share a run id: the repository
/// refuses to create the second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> RunId {
        RunId(self.0 + 1)
    }
}

impl From<u64> for RunId {
    fn from(value: u64) -> Self {
        RunId(value)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status shared by job and step executions.
///
/// ```text
/// STARTING ──> STARTED ──> COMPLETED
///    │            ├──────> FAILED
///    │            └──────> STOPPED
///    └──────> FAILED | STOPPED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// The execution record exists but no work has been done yet.
    Starting,
    /// The execution is running.
    Started,
    /// The execution finished without fatal error.
    Completed,
    /// The execution ended on a fatal error.
    Failed,
    /// The execution ended because a stop was requested.
    Stopped,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BatchStatus::Starting | BatchStatus::Started)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match self {
            BatchStatus::Starting => matches!(
                next,
                BatchStatus::Started | BatchStatus::Failed | BatchStatus::Stopped
            ),
            BatchStatus::Started => next.is_terminal(),
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped => false,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Stopped => "STOPPED",
        };
        f.write_str(label)
    }
}

/// One run of a named job, as recorded by the [`JobRepository`](super::repository::JobRepository).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_name: String,
    pub run_id: RunId,
    pub status: BatchStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub failure_cause: Option<String>,
    /// Run id of the failed or stopped execution this one resumes.
    pub restart_of: Option<RunId>,
    /// Step executions in the order the steps ran.
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    pub fn new(job_name: &str, run_id: RunId) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            run_id,
            status: BatchStatus::Starting,
            create_time: Utc::now(),
            start_time: None,
            end_time: None,
            failure_cause: None,
            restart_of: None,
            step_executions: Vec::new(),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }

    pub fn step_execution(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|step| step.step_name == step_name)
    }

    /// Process exit code for this execution: `0` when completed, non-zero otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            BatchStatus::Completed => 0,
            BatchStatus::Failed => 1,
            BatchStatus::Stopped => 2,
            BatchStatus::Starting | BatchStatus::Started => 3,
        }
    }
}

/// One step's contribution to a [`JobExecution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: Uuid,
    pub step_name: String,
    pub status: BatchStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items committed by the writer
    pub write_count: usize,
    /// Number of read items that were not written on purpose: validation
    /// rejections, filtered items and tolerated processor errors
    pub skip_count: usize,
    /// Part of `skip_count` filtered by the processor
    pub filter_count: usize,
    /// Part of `skip_count` made of tolerated processor errors
    pub process_skip_count: usize,
    /// Number of tolerated reader errors (these never count as reads)
    pub read_skip_count: usize,
    pub commit_count: usize,
    pub rollback_count: usize,
    pub failure_cause: Option<String>,
}

impl StepExecution {
    pub fn new(step_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_name: step_name.to_string(),
            status: BatchStatus::Starting,
            start_time: None,
            end_time: None,
            read_count: 0,
            write_count: 0,
            skip_count: 0,
            filter_count: 0,
            process_skip_count: 0,
            read_skip_count: 0,
            commit_count: 0,
            rollback_count: 0,
            failure_cause: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = BatchStatus::Started;
        self.start_time = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, status: BatchStatus, failure_cause: Option<String>) {
        self.status = status;
        self.failure_cause = failure_cause;
        self.end_time = Some(Utc::now());
    }

    /// Read items that were neither written nor skipped: the content of the
    /// chunk in flight and the item that failed processing when the step
    /// ended on a fatal error.
    pub fn unaccounted_count(&self) -> usize {
        self.read_count
            .saturating_sub(self.write_count + self.skip_count)
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}
