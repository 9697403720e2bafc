use crate::error::BatchError;

/// Result of reading one item: `Ok(None)` signals the end of the source.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of processing one item.
pub type ItemProcessorResult<O> = Result<Processed<O>, BatchError>;

/// Result of writing one chunk.
pub type ItemWriterResult = Result<(), BatchError>;

/// Produces the input items of a step, one at a time.
///
/// A reader is finite: once it returned `Ok(None)` the step never calls
/// `read` again. Errors (malformed record, lost connection...) are reported as
/// [`BatchError::ItemReader`].
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;

    /// Called once before the first read of a step execution.
    ///
    /// Readers able to go back to the first item do so here, which lets a
    /// restarted step read its whole source again. The default keeps the
    /// current position; such readers must be rebuilt before a restart.
    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// What a processor made of one input item.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed<O> {
    /// The item goes on to the current chunk.
    Item(O),
    /// The processor decided the item must not be written.
    Filtered,
    /// The item failed validation. This is an expected outcome, not an error.
    Rejected { reason: String },
}

impl<O> Processed<O> {
    pub fn into_option(self) -> Option<O> {
        match self {
            Processed::Item(item) => Some(item),
            Processed::Filtered | Processed::Rejected { .. } => None,
        }
    }
}

/// Turns one input item into zero or one output item.
///
/// Implementations must not keep state from one item to the next: after a
/// restart the same item can be processed again.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Persists a chunk of items.
///
/// `write` must be atomic: either every item of the slice is persisted or none
/// is. The step never calls it with an empty slice.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    /// Called once before the first chunk of the step.
    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Called once after the last chunk of the step, whatever its outcome.
    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Processor handing every item over unchanged.
#[derive(Default)]
pub struct PassThroughProcessor;

impl<T: Clone> ItemProcessor<T, T> for PassThroughProcessor {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        Ok(Processed::Item(item.clone()))
    }
}
