use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use super::execution::{BatchStatus, JobExecution, RunId, StepExecution};
use crate::BatchError;

/// Stores job and step execution records.
///
/// A repository is shared by every launcher of the process and may be used
/// from several threads at once. It guarantees that a (job name, run id) pair
/// is claimed by at most one execution.
pub trait JobRepository: Send + Sync {
    /// Creates a `STARTING` execution for `run_id`.
    ///
    /// Fails with [`BatchError::DuplicateRun`] if the job already has an
    /// execution with this run id, whatever its status.
    fn create_execution(&self, job_name: &str, run_id: RunId) -> Result<JobExecution, BatchError>;

    /// Moves an execution to `status`, recording the failure cause if any.
    ///
    /// The start time is set when entering `STARTED`, the end time when
    /// entering a terminal status. Transitions the state machine does not
    /// allow are refused with [`BatchError::IllegalTransition`].
    fn update_status(
        &self,
        execution_id: Uuid,
        status: BatchStatus,
        cause: Option<String>,
    ) -> Result<JobExecution, BatchError>;

    /// Creates a `STARTING` execution for `run_id` resuming run `restart_of`.
    ///
    /// A run is resumed at most once: fails with
    /// [`BatchError::NotRestartable`] if another execution of the job already
    /// resumes `restart_of`, and with [`BatchError::DuplicateRun`] if `run_id`
    /// is taken.
    fn create_restart_execution(
        &self,
        job_name: &str,
        run_id: RunId,
        restart_of: RunId,
    ) -> Result<JobExecution, BatchError>;

    /// Inserts or replaces (by id) a step execution of `execution_id`.
    fn save_step_execution(
        &self,
        execution_id: Uuid,
        step_execution: &StepExecution,
    ) -> Result<(), BatchError>;

    fn get_execution(&self, job_name: &str, run_id: RunId) -> Option<JobExecution>;

    fn find_execution(&self, execution_id: Uuid) -> Option<JobExecution>;

    /// Every execution of `job_name`, ordered by run id.
    fn executions(&self, job_name: &str) -> Vec<JobExecution>;

    /// Highest run id used so far by `job_name`.
    fn last_run_id(&self, job_name: &str) -> Option<RunId>;

    /// Releases the repository. Every later call fails.
    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

#[derive(Default)]
struct RepositoryState {
    executions: HashMap<Uuid, JobExecution>,
    by_run: HashMap<(String, RunId), Uuid>,
    closed: bool,
}

impl RepositoryState {
    /// Stores a new execution, claiming its (job name, run id) pair.
    fn insert(&mut self, execution: JobExecution) -> Result<JobExecution, BatchError> {
        let key = (execution.job_name.clone(), execution.run_id);
        if self.by_run.contains_key(&key) {
            return Err(BatchError::DuplicateRun {
                job_name: execution.job_name,
                run_id: execution.run_id,
            });
        }

        debug!(
            "Created execution {} for job {} run {}",
            execution.id, execution.job_name, execution.run_id
        );
        self.by_run.insert(key, execution.id);
        self.executions.insert(execution.id, execution.clone());

        Ok(execution)
    }

    fn execution_mut(&mut self, execution_id: Uuid) -> Result<&mut JobExecution, BatchError> {
        self.executions
            .get_mut(&execution_id)
            .ok_or_else(|| BatchError::ExecutionNotFound(execution_id.to_string()))
    }
}

/// [`JobRepository`] keeping every record in memory, for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryJobRepository {
    state: Mutex<RepositoryState>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_state(&self) -> Result<MutexGuard<'_, RepositoryState>, BatchError> {
        let state = self
            .state
            .lock()
            .map_err(|error| BatchError::Repository(error.to_string()))?;
        if state.closed {
            return Err(BatchError::Repository("repository is closed".to_string()));
        }
        Ok(state)
    }
}

impl JobRepository for InMemoryJobRepository {
    fn create_execution(&self, job_name: &str, run_id: RunId) -> Result<JobExecution, BatchError> {
        let mut state = self.open_state()?;
        state.insert(JobExecution::new(job_name, run_id))
    }

    fn create_restart_execution(
        &self,
        job_name: &str,
        run_id: RunId,
        restart_of: RunId,
    ) -> Result<JobExecution, BatchError> {
        let mut state = self.open_state()?;

        if let Some(restart) = state.executions.values().find(|execution| {
            execution.job_name == job_name && execution.restart_of == Some(restart_of)
        }) {
            return Err(BatchError::NotRestartable {
                job_name: job_name.to_string(),
                run_id: restart_of,
                reason: format!("already restarted by run {}", restart.run_id),
            });
        }

        let mut execution = JobExecution::new(job_name, run_id);
        execution.restart_of = Some(restart_of);
        state.insert(execution)
    }

    fn update_status(
        &self,
        execution_id: Uuid,
        status: BatchStatus,
        cause: Option<String>,
    ) -> Result<JobExecution, BatchError> {
        let mut state = self.open_state()?;
        let execution = state.execution_mut(execution_id)?;

        if !execution.status.can_transition_to(status) {
            return Err(BatchError::IllegalTransition {
                from: execution.status,
                to: status,
            });
        }

        execution.status = status;
        if status == BatchStatus::Started {
            execution.start_time = Some(Utc::now());
        }
        if status.is_terminal() {
            execution.end_time = Some(Utc::now());
        }
        if cause.is_some() {
            execution.failure_cause = cause;
        }

        Ok(execution.clone())
    }

    fn save_step_execution(
        &self,
        execution_id: Uuid,
        step_execution: &StepExecution,
    ) -> Result<(), BatchError> {
        let mut state = self.open_state()?;
        let execution = state.execution_mut(execution_id)?;

        match execution
            .step_executions
            .iter_mut()
            .find(|step| step.id == step_execution.id)
        {
            Some(existing) => *existing = step_execution.clone(),
            None => execution.step_executions.push(step_execution.clone()),
        }

        Ok(())
    }

    fn get_execution(&self, job_name: &str, run_id: RunId) -> Option<JobExecution> {
        let state = self.open_state().ok()?;
        let id = state.by_run.get(&(job_name.to_string(), run_id))?;
        state.executions.get(id).cloned()
    }

    fn find_execution(&self, execution_id: Uuid) -> Option<JobExecution> {
        let state = self.open_state().ok()?;
        state.executions.get(&execution_id).cloned()
    }

    fn executions(&self, job_name: &str) -> Vec<JobExecution> {
        let Ok(state) = self.open_state() else {
            return Vec::new();
        };
        let mut executions: Vec<JobExecution> = state
            .executions
            .values()
            .filter(|execution| execution.job_name == job_name)
            .cloned()
            .collect();
        executions.sort_by_key(|execution| execution.run_id);
        executions
    }

    fn last_run_id(&self, job_name: &str) -> Option<RunId> {
        let state = self.open_state().ok()?;
        state
            .by_run
            .keys()
            .filter(|(name, _)| name == job_name)
            .map(|(_, run_id)| *run_id)
            .max()
    }

    fn close(&self) -> Result<(), BatchError> {
        let mut state = self.open_state()?;
        state.closed = true;
        debug!("Job repository closed");
        Ok(())
    }
}
