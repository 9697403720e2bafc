mod common;

use std::cell::Cell;

use chunk_batch::{
    BatchError,
    core::{
        execution::{BatchStatus, RunId, StepExecution},
        item::{ItemWriter, ItemWriterResult, PassThroughProcessor},
        job::JobBuilder,
        launcher::{IncrementingRunId, JobLauncher},
        listener::{ExecutionListener, ListenerResult, LoggingListener},
        repository::{InMemoryJobRepository, JobRepository},
        step::{StepBuilder, StopSignal},
    },
    item::memory::{InMemoryItemWriter, IterItemReader},
};
use common::{EvenProcessor, RecordingListener};

/// Writer failing on chosen calls (1-based), recording the other chunks.
struct FailingOnCall {
    inner: InMemoryItemWriter<i32>,
    calls: Cell<usize>,
    failing_calls: Vec<usize>,
}

impl FailingOnCall {
    fn new(failing_calls: &[usize]) -> Self {
        Self {
            inner: InMemoryItemWriter::new(),
            calls: Cell::new(0),
            failing_calls: failing_calls.to_vec(),
        }
    }
}

impl ItemWriter<i32> for FailingOnCall {
    fn write(&self, items: &[i32]) -> ItemWriterResult {
        self.calls.set(self.calls.get() + 1);
        if self.failing_calls.contains(&self.calls.get()) {
            return Err(BatchError::ItemWriter("constraint violation".to_string()));
        }
        self.inner.write(items)
    }
}

/// Raises the stop signal once the first chunk is written.
struct StoppingWriter {
    inner: InMemoryItemWriter<i32>,
    stop: StopSignal,
}

impl ItemWriter<i32> for StoppingWriter {
    fn write(&self, items: &[i32]) -> ItemWriterResult {
        self.stop.request_stop();
        self.inner.write(items)
    }
}

struct BrokenListener;

impl ExecutionListener for BrokenListener {
    fn before_step(&self, _step_execution: &StepExecution) -> ListenerResult {
        Err(BatchError::Listener("report directory missing".to_string()))
    }
}

#[test]
fn five_items_one_rejected_chunk_of_two() {
    let reader = IterItemReader::new(vec![2, 4, 5, 6, 8]);
    let writer = InMemoryItemWriter::new();
    let step = StepBuilder::new("importStep")
        .chunk(2)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let job = JobBuilder::new().name("importJob").start(&step).build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository)
        .run(&job, RunId(1))
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.exit_code(), 0);
    assert_eq!(writer.chunks(), vec![vec![2, 4], vec![6, 8]]);

    let step_execution = execution.step_execution("importStep").unwrap();
    assert_eq!(step_execution.read_count, 5);
    assert_eq!(step_execution.write_count, 4);
    assert_eq!(step_execution.skip_count, 1);

    let stored = repository.get_execution("importJob", RunId(1)).unwrap();
    assert_eq!(stored, execution);
    assert!(stored.start_time.is_some());
    assert!(stored.end_time.is_some());
}

#[test]
fn reusing_a_run_id_is_refused_before_any_step_runs() {
    let reader = IterItemReader::new(vec![2, 4]);
    let writer = InMemoryItemWriter::new();
    let step = StepBuilder::new("step")
        .chunk(10)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let listener = RecordingListener::default();
    let job = JobBuilder::new()
        .name("importJob")
        .start(&step)
        .listener(&listener)
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = JobLauncher::new(&repository);
    launcher.run(&job, RunId(1)).unwrap();
    let calls_after_first_run = listener.calls().len();

    let second = launcher.run(&job, RunId(1));

    assert_eq!(
        second,
        Err(BatchError::DuplicateRun {
            job_name: "importJob".to_string(),
            run_id: RunId(1),
        })
    );
    assert_eq!(listener.calls().len(), calls_after_first_run);
    assert_eq!(writer.items(), vec![2, 4]);
    assert_eq!(repository.executions("importJob").len(), 1);
}

#[test]
fn listeners_see_the_whole_lifecycle_in_order() {
    let reader = IterItemReader::new(vec![2]);
    let first_writer = InMemoryItemWriter::new();
    let second_writer = InMemoryItemWriter::new();
    let first = StepBuilder::new("first")
        .chunk(1)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&first_writer)
        .build()
        .unwrap();
    let second = StepBuilder::new("second")
        .chunk(1)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&second_writer)
        .build()
        .unwrap();
    let listener = RecordingListener::default();
    let job = JobBuilder::new()
        .name("lifecycle")
        .start(&first)
        .next(&second)
        .listener(&listener)
        .build();

    let repository = InMemoryJobRepository::new();
    JobLauncher::new(&repository)
        .run(&job, RunId(1))
        .unwrap();

    assert_eq!(
        listener.calls(),
        vec![
            "before_job",
            "before_step:first",
            "after_step:first",
            "before_step:second",
            "after_step:second",
            "after_job",
        ]
    );
    assert_eq!(*listener.job_statuses.borrow(), vec!["STARTING", "COMPLETED"]);
}

#[test]
fn writer_failure_on_second_chunk_fails_the_job() {
    let reader = IterItemReader::new(vec![2, 4, 6, 8, 10, 12]);
    let writer = FailingOnCall::new(&[2]);
    let step = StepBuilder::new("load")
        .chunk(2)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let never_run = StepBuilder::new("report")
        .chunk(2)
        .reader(&reader)
        .processor(&PassThroughProcessor)
        .writer(&writer.inner)
        .build()
        .unwrap();
    let listener = RecordingListener::default();
    let job = JobBuilder::new()
        .name("loadJob")
        .start(&step)
        .next(&never_run)
        .listener(&listener)
        .build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository)
        .run(&job, RunId(1))
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert_eq!(execution.exit_code(), 1);
    assert_eq!(
        execution.failure_cause.as_deref(),
        Some("Step load: ItemWriter: constraint violation")
    );
    assert_eq!(writer.inner.chunks(), vec![vec![2, 4]]);
    assert_eq!(writer.calls.get(), 2);
    assert_eq!(execution.step_executions.len(), 1);

    let step_execution = execution.step_execution("load").unwrap();
    assert_eq!(step_execution.status, BatchStatus::Failed);
    assert_eq!(step_execution.write_count, 2);
    assert_eq!(step_execution.rollback_count, 1);

    assert_eq!(
        listener.calls(),
        vec![
            "before_job",
            "before_step:load",
            "on_error:load",
            "after_step:load",
            "after_job",
        ]
    );
    assert_eq!(*listener.job_statuses.borrow(), vec!["STARTING", "FAILED"]);
}

#[test]
fn listener_errors_do_not_change_the_outcome() {
    let reader = IterItemReader::new(vec![2, 4]);
    let writer = InMemoryItemWriter::new();
    let step = StepBuilder::new("step")
        .chunk(2)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let job = JobBuilder::new()
        .name("noisy")
        .start(&step)
        .listener(&BrokenListener)
        .listener(&LoggingListener)
        .build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository)
        .run(&job, RunId(1))
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(writer.items(), vec![2, 4]);
}

#[test]
fn run_next_uses_the_following_run_id() {
    let reader = IterItemReader::new(Vec::<i32>::new());
    let writer = InMemoryItemWriter::new();
    let step = StepBuilder::new("step")
        .chunk(2)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let job = JobBuilder::new().name("daily").start(&step).build();

    let repository = InMemoryJobRepository::new();
    let launcher = JobLauncher::new(&repository);

    let first = launcher.run_next(&job, &IncrementingRunId).unwrap();
    let second = launcher.run_next(&job, &IncrementingRunId).unwrap();
    launcher.run(&job, RunId(10)).unwrap();
    let fourth = launcher.run_next(&job, &IncrementingRunId).unwrap();

    assert_eq!(first.run_id, RunId(1));
    assert_eq!(second.run_id, RunId(2));
    assert_eq!(fourth.run_id, RunId(11));
    assert_eq!(repository.last_run_id("daily"), Some(RunId(11)));
}

#[test]
fn stop_request_ends_the_job_at_a_chunk_boundary() {
    let stop = StopSignal::new();
    let reader = IterItemReader::new(vec![2, 4, 6, 8, 10]);
    let writer = StoppingWriter {
        inner: InMemoryItemWriter::new(),
        stop: stop.clone(),
    };
    let step = StepBuilder::new("stoppable")
        .chunk(2)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let job = JobBuilder::new().name("stoppable").start(&step).build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository)
        .with_stop_signal(stop)
        .run(&job, RunId(1))
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Stopped);
    assert_eq!(execution.exit_code(), 2);
    assert_eq!(writer.inner.chunks(), vec![vec![2, 4]]);

    let step_execution = execution.step_execution("stoppable").unwrap();
    assert_eq!(step_execution.status, BatchStatus::Stopped);
    assert_eq!(step_execution.read_count, 2);
    assert_eq!(step_execution.write_count, 2);
}

#[test]
fn restart_skips_completed_steps_and_resumes_the_failed_one() {
    let extract_reader = IterItemReader::new(vec![2, 4]);
    let extract_writer = InMemoryItemWriter::new();
    let extract = StepBuilder::new("extract")
        .chunk(2)
        .reader(&extract_reader)
        .processor(&EvenProcessor)
        .writer(&extract_writer)
        .build()
        .unwrap();

    let load_reader = IterItemReader::new(vec![6, 8, 10, 12]);
    let load_writer = FailingOnCall::new(&[1]);
    let load = StepBuilder::new("load")
        .chunk(2)
        .reader(&load_reader)
        .processor(&EvenProcessor)
        .writer(&load_writer)
        .build()
        .unwrap();

    let job = JobBuilder::new()
        .name("etl")
        .start(&extract)
        .next(&load)
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = JobLauncher::new(&repository);

    let failed = launcher.run(&job, RunId(1)).unwrap();
    assert_eq!(failed.status, BatchStatus::Failed);

    let restarted = launcher.restart(&job, RunId(1)).unwrap();

    assert_eq!(restarted.status, BatchStatus::Completed);
    assert_eq!(restarted.run_id, RunId(2));
    assert_eq!(restarted.restart_of, Some(RunId(1)));
    assert!(restarted.step_execution("extract").is_none());
    assert_eq!(extract_writer.chunks(), vec![vec![2, 4]]);
    // the rolled back chunk is read and written again
    assert_eq!(load_writer.inner.chunks(), vec![vec![6, 8], vec![10, 12]]);
    assert_eq!(load_writer.inner.items(), vec![6, 8, 10, 12]);
    assert_eq!(restarted.step_execution("load").unwrap().read_count, 4);

    assert_eq!(
        launcher.restart(&job, RunId(1)),
        Err(BatchError::NotRestartable {
            job_name: "etl".to_string(),
            run_id: RunId(1),
            reason: "already restarted by run 2".to_string(),
        })
    );
    assert!(matches!(
        launcher.restart(&job, RunId(2)),
        Err(BatchError::NotRestartable { .. })
    ));
    assert!(matches!(
        launcher.restart(&job, RunId(7)),
        Err(BatchError::ExecutionNotFound(_))
    ));
}

#[test]
fn restarting_a_restart_keeps_steps_completed_earlier() {
    let extract_reader = IterItemReader::new(vec![2, 4]);
    let extract_writer = InMemoryItemWriter::new();
    let extract = StepBuilder::new("extract")
        .chunk(2)
        .reader(&extract_reader)
        .processor(&EvenProcessor)
        .writer(&extract_writer)
        .build()
        .unwrap();

    let load_reader = IterItemReader::new(vec![6, 8, 10, 12]);
    let load_writer = FailingOnCall::new(&[1, 2]);
    let load = StepBuilder::new("load")
        .chunk(2)
        .reader(&load_reader)
        .processor(&EvenProcessor)
        .writer(&load_writer)
        .build()
        .unwrap();

    let job = JobBuilder::new()
        .name("etl")
        .start(&extract)
        .next(&load)
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = JobLauncher::new(&repository);

    assert_eq!(
        launcher.run(&job, RunId(1)).unwrap().status,
        BatchStatus::Failed
    );

    let second = launcher.restart(&job, RunId(1)).unwrap();
    assert_eq!(second.status, BatchStatus::Failed);
    assert!(second.step_execution("extract").is_none());

    let third = launcher.restart(&job, RunId(2)).unwrap();

    assert_eq!(third.status, BatchStatus::Completed);
    assert_eq!(third.run_id, RunId(3));
    assert_eq!(third.restart_of, Some(RunId(2)));
    let steps: Vec<&str> = third
        .step_executions
        .iter()
        .map(|step| step.step_name.as_str())
        .collect();
    assert_eq!(steps, vec!["load"]);
    assert_eq!(extract_writer.chunks(), vec![vec![2, 4]]);
    assert_eq!(load_writer.inner.items(), vec![6, 8, 10, 12]);
}

#[test]
fn closed_repository_refuses_new_runs() {
    let reader = IterItemReader::new(vec![2]);
    let writer = InMemoryItemWriter::new();
    let step = StepBuilder::new("step")
        .chunk(1)
        .reader(&reader)
        .processor(&EvenProcessor)
        .writer(&writer)
        .build()
        .unwrap();
    let job = JobBuilder::new().name("late").start(&step).build();

    let repository = InMemoryJobRepository::new();
    repository.close().unwrap();

    assert!(matches!(
        JobLauncher::new(&repository).run(&job, RunId(1)),
        Err(BatchError::Repository(_))
    ));
    assert!(writer.items().is_empty());
}
