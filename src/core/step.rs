use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, error, info, warn};

use crate::BatchError;

use super::{
    build_name,
    chunk::Chunk,
    execution::{BatchStatus, StepExecution},
    item::{ItemProcessor, ItemReader, ItemWriter, Processed},
    retry::{NeverRetry, RetryPolicy},
};

/// Cooperative cancellation flag shared between a launcher and its steps.
///
/// Steps look at it only when no chunk is in flight, so a stop never splits a
/// chunk.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A phase of a job.
pub trait Step {
    fn name(&self) -> &str;

    /// Executes the step, recording progress and the final status in
    /// `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed or stopped on request
    /// - `Err(BatchError)`: the step failed, the same cause is stored in
    ///   `step_execution.failure_cause`
    fn execute(&self, step_execution: &mut StepExecution, stop: &StopSignal)
    -> Result<(), BatchError>;
}

/// How the item loop of a step ended without error.
#[derive(Debug, PartialEq)]
enum LoopEnd {
    Exhausted,
    Stopped,
}

/// Reads, processes and writes items in chunks of `chunk_size` output items.
///
/// Each full chunk is handed to the writer in one call; a writer failure
/// discards the whole chunk and, unless the retry policy allows another
/// attempt, fails the step.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Component responsible for processing items
    processor: &'a dyn ItemProcessor<I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    /// Commit interval: number of output items written together
    chunk_size: u16,
    /// Maximum number of reader and processor errors tolerated before failing the step
    skip_limit: u16,
    retry_policy: &'a dyn RetryPolicy,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &self,
        step_execution: &mut StepExecution,
        stop: &StopSignal,
    ) -> Result<(), BatchError> {
        step_execution.start();

        info!(
            "Start of step: {}, id: {}",
            step_execution.step_name, step_execution.id
        );

        let result = self
            .reader
            .open()
            .and_then(|()| self.writer.open())
            .and_then(|()| {
                let result = self.process_items(step_execution, stop);
                Self::manage_error(self.writer.close());
                result
            });

        let result = match result {
            Ok(LoopEnd::Exhausted) => {
                step_execution.finish(BatchStatus::Completed, None);
                Ok(())
            }
            Ok(LoopEnd::Stopped) => {
                info!("Step {} stopped on request", step_execution.step_name);
                step_execution.finish(BatchStatus::Stopped, None);
                Ok(())
            }
            Err(error) => {
                error!("Step {} failed: {}", step_execution.step_name, error);
                step_execution.finish(BatchStatus::Failed, Some(error.to_string()));
                Err(error)
            }
        };

        info!(
            "End of step: {}, status: {}, read: {}, write: {}, skip: {}",
            step_execution.step_name,
            step_execution.status,
            step_execution.read_count,
            step_execution.write_count,
            step_execution.skip_count
        );

        result
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    /// Runs the step on its own, outside of any job.
    ///
    /// The returned execution holds the final status, the counters and, on
    /// failure, the cause.
    pub fn run(&self) -> StepExecution {
        let mut step_execution = StepExecution::new(&self.name);
        // The failure cause is kept on the execution.
        let _ = self.execute(&mut step_execution, &StopSignal::new());
        step_execution
    }

    fn process_items(
        &self,
        step_execution: &mut StepExecution,
        stop: &StopSignal,
    ) -> Result<LoopEnd, BatchError> {
        let mut chunk = Chunk::new(self.chunk_size.into());

        loop {
            if chunk.is_empty() && stop.is_stop_requested() {
                return Ok(LoopEnd::Stopped);
            }

            let Some(item) = self.read_item(step_execution)? else {
                if !chunk.is_empty() {
                    self.write_chunk(step_execution, &mut chunk)?;
                }
                return Ok(LoopEnd::Exhausted);
            };

            if let Some(output) = self.process_item(step_execution, &item)? {
                if chunk.push(output) {
                    self.write_chunk(step_execution, &mut chunk)?;
                }
            }
        }
    }

    /// Reads the next item, skipping unreadable ones while the skip limit allows it.
    ///
    /// # Returns
    /// - `Ok(Some(item))`: an item was read
    /// - `Ok(None)`: the reader is exhausted
    /// - `Err(BatchError)`: a reader error that cannot be skipped
    fn read_item(&self, step_execution: &mut StepExecution) -> Result<Option<I>, BatchError> {
        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    step_execution.read_count += 1;
                    return Ok(Some(item));
                }
                Ok(None) => {
                    debug!("Reader exhausted after {} items", step_execution.read_count);
                    return Ok(None);
                }
                Err(error) => {
                    if !self.can_skip(step_execution) {
                        return Err(error);
                    }
                    warn!("Skipping unreadable item: {}", error);
                    step_execution.read_skip_count += 1;
                }
            }
        }
    }

    /// Processes one item.
    ///
    /// # Returns
    /// - `Ok(Some(output))`: the output goes to the current chunk
    /// - `Ok(None)`: the item was rejected, filtered or its error skipped
    /// - `Err(BatchError)`: a processor error that cannot be skipped
    fn process_item(
        &self,
        step_execution: &mut StepExecution,
        item: &I,
    ) -> Result<Option<O>, BatchError> {
        match self.processor.process(item) {
            Ok(Processed::Item(output)) => Ok(Some(output)),
            Ok(Processed::Filtered) => {
                step_execution.skip_count += 1;
                step_execution.filter_count += 1;
                Ok(None)
            }
            Ok(Processed::Rejected { reason }) => {
                debug!("Skipping rejected item: {}", reason);
                step_execution.skip_count += 1;
                Ok(None)
            }
            Err(error) => {
                if !self.can_skip(step_execution) {
                    return Err(error);
                }
                warn!("Skipping item after processor error: {}", error);
                step_execution.skip_count += 1;
                step_execution.process_skip_count += 1;
                Ok(None)
            }
        }
    }

    /// Writes the chunk in one writer call, retrying as the policy allows.
    ///
    /// The chunk is cleared in every case: on success its items are committed,
    /// on failure they are discarded.
    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        chunk: &mut Chunk<O>,
    ) -> Result<(), BatchError> {
        debug!("Writing chunk of {} items", chunk.len());

        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            match self.writer.write(chunk.items()) {
                Ok(()) => break Ok(()),
                Err(error) => {
                    step_execution.rollback_count += 1;
                    if !self.retry_policy.can_retry(attempt, &error) {
                        break Err(error);
                    }
                    warn!("Chunk write failed on attempt {}, retrying: {}", attempt, error);
                }
            }
        };

        match &result {
            Ok(()) => {
                step_execution.write_count += chunk.len();
                step_execution.commit_count += 1;
            }
            Err(error) => {
                error!("Chunk of {} items rolled back: {}", chunk.len(), error);
            }
        }

        chunk.clear();
        result
    }

    fn can_skip(&self, step_execution: &StepExecution) -> bool {
        step_execution.read_skip_count + step_execution.process_skip_count
            < self.skip_limit.into()
    }

    /// Logs errors of operations that must not fail the step.
    fn manage_error(result: Result<(), BatchError>) {
        if let Err(error) = result {
            warn!("Non-fatal error: {}", error);
        }
    }
}

/// Builder for [`ChunkOrientedStep`], usually obtained from [`StepBuilder::chunk`].
pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: u16,
    skip_limit: u16,
    retry_policy: &'a dyn RetryPolicy,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 10,
            skip_limit: 0,
            retry_policy: &NeverRetry,
        }
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn chunk_size(mut self, chunk_size: u16) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn skip_limit(mut self, skip_limit: u16) -> Self {
        self.skip_limit = skip_limit;
        self
    }

    pub fn retry_policy(mut self, retry_policy: &'a dyn RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(format!(
                "step {}: chunk size must be greater than 0",
                self.name
            )));
        }

        let missing = |part: &str| {
            BatchError::Configuration(format!("step {}: {} is required", self.name, part))
        };

        Ok(ChunkOrientedStep {
            reader: self.reader.ok_or_else(|| missing("reader"))?,
            processor: self.processor.ok_or_else(|| missing("processor"))?,
            writer: self.writer.ok_or_else(|| missing("writer"))?,
            name: self.name,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            retry_policy: self.retry_policy,
        })
    }
}

/// Entry point for building steps.
///
/// ```
/// use chunk_batch::core::item::PassThroughProcessor;
/// use chunk_batch::core::step::StepBuilder;
/// use chunk_batch::core::execution::BatchStatus;
/// use chunk_batch::item::memory::{InMemoryItemWriter, IterItemReader};
///
/// let reader = IterItemReader::new(vec![1, 2, 3, 4, 5]);
/// let processor = PassThroughProcessor;
/// let writer = InMemoryItemWriter::new();
///
/// let step = StepBuilder::new("copy")
///     .chunk(2)
///     .reader(&reader)
///     .processor(&processor)
///     .writer(&writer)
///     .build()
///     .unwrap();
///
/// let execution = step.run();
/// assert_eq!(execution.status, BatchStatus::Completed);
/// assert_eq!(writer.chunk_sizes(), vec![2, 2, 1]);
/// ```
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Starts a chunk-oriented step committing every `chunk_size` output items.
    pub fn chunk<'a, I, O>(self, chunk_size: u16) -> ChunkOrientedStepBuilder<'a, I, O> {
        ChunkOrientedStepBuilder::new(&self.name).chunk_size(chunk_size)
    }
}

impl Default for StepBuilder {
    /// A builder with a generated name. Restarts match steps by name, so
    /// restartable jobs should name their steps.
    fn default() -> Self {
        Self { name: build_name() }
    }
}
