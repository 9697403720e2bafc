use log::{info, warn};

use super::execution::{JobExecution, StepExecution};
use crate::BatchError;

pub type ListenerResult = Result<(), BatchError>;

/// Hooks called around a job and its steps.
///
/// Every hook defaults to a no-op, so a listener implements only what it needs.
/// Hooks see the execution records read-only; an error returned by a hook is
/// logged and never changes the outcome of the job.
///
/// Order for one job run:
/// `before_job`, then for each step `before_step`, `on_error` (failed step
/// only), `after_step`, and finally `after_job`, exactly once.
pub trait ExecutionListener {
    fn before_job(&self, _job_execution: &JobExecution) -> ListenerResult {
        Ok(())
    }

    /// Called once the job status is final, on success as well as on failure.
    fn after_job(&self, _job_execution: &JobExecution) -> ListenerResult {
        Ok(())
    }

    fn before_step(&self, _step_execution: &StepExecution) -> ListenerResult {
        Ok(())
    }

    fn after_step(&self, _step_execution: &StepExecution) -> ListenerResult {
        Ok(())
    }

    fn on_error(&self, _step_execution: &StepExecution, _error: &BatchError) -> ListenerResult {
        Ok(())
    }
}

/// Logs job boundaries, elapsed time and step counters.
#[derive(Default)]
pub struct LoggingListener;

impl ExecutionListener for LoggingListener {
    fn before_job(&self, job_execution: &JobExecution) -> ListenerResult {
        info!(
            "Job {} run {} started",
            job_execution.job_name, job_execution.run_id
        );
        Ok(())
    }

    fn after_job(&self, job_execution: &JobExecution) -> ListenerResult {
        let elapsed = job_execution.duration().unwrap_or_default();
        info!(
            "Job {} run {} ended with status {} in {}ms",
            job_execution.job_name,
            job_execution.run_id,
            job_execution.status,
            elapsed.as_millis()
        );
        Ok(())
    }

    fn after_step(&self, step_execution: &StepExecution) -> ListenerResult {
        info!(
            "Step {}: read {}, written {}, skipped {}, commits {}, rollbacks {}",
            step_execution.step_name,
            step_execution.read_count,
            step_execution.write_count,
            step_execution.skip_count,
            step_execution.commit_count,
            step_execution.rollback_count
        );
        Ok(())
    }

    fn on_error(&self, step_execution: &StepExecution, error: &BatchError) -> ListenerResult {
        warn!("Step {} failed: {}", step_execution.step_name, error);
        Ok(())
    }
}

/// Runs `hook` on every listener, logging failures instead of propagating them.
pub(crate) fn notify<'a, L>(listeners: &[&'a dyn ExecutionListener], hook_name: &str, hook: L)
where
    L: Fn(&'a dyn ExecutionListener) -> ListenerResult,
{
    for listener in listeners {
        if let Err(error) = hook(*listener) {
            warn!("Listener {} hook failed: {}", hook_name, error);
        }
    }
}
