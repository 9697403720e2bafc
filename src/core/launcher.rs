use log::{error, info};
use uuid::Uuid;

use super::{
    execution::{BatchStatus, JobExecution, RunId, StepExecution},
    job::Job,
    listener::notify,
    repository::JobRepository,
    step::StopSignal,
};
use crate::BatchError;

/// Strategy choosing the run id of the next launch of a job.
pub trait RunIdIncrementer {
    fn next(&self, last: Option<RunId>) -> RunId;
}

/// Run ids 1, 2, 3...
#[derive(Debug, Default, Clone, Copy)]
pub struct IncrementingRunId;

impl RunIdIncrementer for IncrementingRunId {
    fn next(&self, last: Option<RunId>) -> RunId {
        last.map_or(RunId(1), RunId::next)
    }
}

/// Runs jobs and keeps their execution records up to date.
///
/// Every run returned by the launcher is terminal: `COMPLETED`, `FAILED` or
/// `STOPPED`. A launch is refused (`Err`) before any step runs when the run id
/// was already used for the job.
pub struct JobLauncher<'r> {
    repository: &'r dyn JobRepository,
    stop: StopSignal,
}

impl<'r> JobLauncher<'r> {
    pub fn new(repository: &'r dyn JobRepository) -> Self {
        Self {
            repository,
            stop: StopSignal::new(),
        }
    }

    /// Uses `stop` to end runs of this launcher early. Raising it stops the
    /// current step at its next chunk boundary and skips the remaining steps.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs `job` under `run_id`.
    ///
    /// # Returns
    /// - `Ok(JobExecution)`: the finalized execution, whatever its status
    /// - `Err(BatchError::DuplicateRun)`: the job already ran with this run id
    /// - `Err(BatchError)`: the repository failed
    pub fn run(&self, job: &Job, run_id: RunId) -> Result<JobExecution, BatchError> {
        let execution = self.repository.create_execution(job.name(), run_id)?;
        self.execute(job, execution, &[])
    }

    /// Runs `job` under the run id following the last one recorded for it.
    pub fn run_next(
        &self,
        job: &Job,
        incrementer: &dyn RunIdIncrementer,
    ) -> Result<JobExecution, BatchError> {
        let run_id = incrementer.next(self.repository.last_run_id(job.name()));
        self.run(job, run_id)
    }

    /// Resumes a failed or stopped run under a new run id.
    ///
    /// Steps that completed in the previous run, or in any run it resumed
    /// itself, are not executed again. The other steps start over from the
    /// first item of their source: readers are opened again through
    /// [`ItemReader::open`](super::item::ItemReader::open), and readers that
    /// cannot rewind must be rebuilt in `job` before calling this.
    ///
    /// # Returns
    /// - `Ok(JobExecution)`: the finalized execution of the new run
    /// - `Err(BatchError::ExecutionNotFound)`: `previous` never ran
    /// - `Err(BatchError::NotRestartable)`: `previous` did not fail or stop,
    ///   or was already restarted
    pub fn restart(&self, job: &Job, previous: RunId) -> Result<JobExecution, BatchError> {
        let previous_execution = self
            .repository
            .get_execution(job.name(), previous)
            .ok_or_else(|| {
                BatchError::ExecutionNotFound(format!("job {} run {}", job.name(), previous))
            })?;

        if !matches!(
            previous_execution.status,
            BatchStatus::Failed | BatchStatus::Stopped
        ) {
            return Err(BatchError::NotRestartable {
                job_name: job.name().to_string(),
                run_id: previous,
                reason: format!("status is {}", previous_execution.status),
            });
        }

        let completed_steps = self.completed_steps(job.name(), previous_execution);

        let run_id = IncrementingRunId.next(self.repository.last_run_id(job.name()));
        let execution = self
            .repository
            .create_restart_execution(job.name(), run_id, previous)?;

        info!(
            "Restarting job {} run {} as run {}",
            job.name(),
            previous,
            run_id
        );

        self.execute(job, execution, &completed_steps)
    }

    /// Names of the steps completed by `execution` and by the runs it resumed.
    fn completed_steps(&self, job_name: &str, execution: JobExecution) -> Vec<String> {
        let mut completed_steps = Vec::new();
        let mut current = Some(execution);

        while let Some(execution) = current {
            completed_steps.extend(
                execution
                    .step_executions
                    .iter()
                    .filter(|step| step.status == BatchStatus::Completed)
                    .map(|step| step.step_name.clone()),
            );
            // restart_of always names an earlier run, the chain ends
            current = execution
                .restart_of
                .and_then(|run_id| self.repository.get_execution(job_name, run_id));
        }

        completed_steps
    }

    fn execute(
        &self,
        job: &Job,
        execution: JobExecution,
        completed_steps: &[String],
    ) -> Result<JobExecution, BatchError> {
        let listeners = job.listeners();
        let execution_id = execution.id;

        notify(listeners, "before_job", |listener| {
            listener.before_job(&execution)
        });

        info!(
            "Start of job: {}, run: {}, id: {}",
            execution.job_name, execution.run_id, execution_id
        );

        let outcome = self
            .repository
            .update_status(execution_id, BatchStatus::Started, None)
            .and_then(|_| self.run_steps(job, execution_id, completed_steps));

        let (status, cause) = match outcome {
            Ok(outcome) => outcome,
            Err(error) => {
                error!("Job {} aborted: {}", execution.job_name, error);
                (BatchStatus::Failed, Some(error.to_string()))
            }
        };

        let finalized = self
            .repository
            .update_status(execution_id, status, cause.clone());

        let final_execution = match &finalized {
            Ok(final_execution) => final_execution.clone(),
            Err(error) => {
                error!(
                    "Cannot record the end of job {}: {}",
                    execution.job_name, error
                );
                let mut local = execution.clone();
                local.status = status;
                local.failure_cause = cause;
                local
            }
        };

        info!(
            "End of job: {}, run: {}, status: {}",
            final_execution.job_name, final_execution.run_id, final_execution.status
        );

        notify(listeners, "after_job", |listener| {
            listener.after_job(&final_execution)
        });

        finalized
    }

    /// Runs the steps in order and tells how the job ends.
    ///
    /// Only repository failures are returned as `Err`; step failures end the
    /// job with `FAILED` and the step's cause.
    fn run_steps(
        &self,
        job: &Job,
        execution_id: Uuid,
        completed_steps: &[String],
    ) -> Result<(BatchStatus, Option<String>), BatchError> {
        let listeners = job.listeners();

        for step in job.steps() {
            if completed_steps.iter().any(|name| name == step.name()) {
                info!("Step {} already completed, not run again", step.name());
                continue;
            }

            if self.stop.is_stop_requested() {
                info!("Stop requested, step {} not run", step.name());
                return Ok((BatchStatus::Stopped, None));
            }

            let mut step_execution = StepExecution::new(step.name());
            self.repository
                .save_step_execution(execution_id, &step_execution)?;

            notify(listeners, "before_step", |listener| {
                listener.before_step(&step_execution)
            });

            let result = step.execute(&mut step_execution, &self.stop);

            if let Err(error) = &result {
                notify(listeners, "on_error", |listener| {
                    listener.on_error(&step_execution, error)
                });
            }
            notify(listeners, "after_step", |listener| {
                listener.after_step(&step_execution)
            });

            self.repository
                .save_step_execution(execution_id, &step_execution)?;

            match step_execution.status {
                BatchStatus::Completed => {}
                BatchStatus::Stopped => return Ok((BatchStatus::Stopped, None)),
                _ => {
                    let cause = step_execution
                        .failure_cause
                        .clone()
                        .unwrap_or_else(|| format!("ended with status {}", step_execution.status));
                    return Ok((
                        BatchStatus::Failed,
                        Some(format!("Step {}: {}", step_execution.step_name, cause)),
                    ));
                }
            }
        }

        Ok((BatchStatus::Completed, None))
    }
}
