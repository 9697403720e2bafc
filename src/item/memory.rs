use std::{cell::RefCell, iter::Fuse};

use crate::{
    BatchError,
    core::item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult},
};

/// Reads the items of any iterator, in order.
///
/// Opening the reader goes back to the first item, so a restarted step reads
/// the whole source again.
///
/// # Examples
///
/// ```
/// use chunk_batch::core::item::ItemReader;
/// use chunk_batch::item::memory::IterItemReader;
///
/// let reader = IterItemReader::new(vec!["a", "b"]);
///
/// assert_eq!(reader.read(), Ok(Some("a")));
/// assert_eq!(reader.read(), Ok(Some("b")));
/// assert_eq!(reader.read(), Ok(None));
///
/// reader.open().unwrap();
/// assert_eq!(reader.read(), Ok(Some("a")));
/// ```
pub struct IterItemReader<It: Iterator + Clone> {
    source: It,
    items: RefCell<Fuse<It>>,
}

impl<It: Iterator + Clone> IterItemReader<It> {
    pub fn new<C>(items: C) -> Self
    where
        C: IntoIterator<IntoIter = It>,
    {
        let source = items.into_iter();
        Self {
            items: RefCell::new(source.clone().fuse()),
            source,
        }
    }
}

impl<It: Iterator + Clone> ItemReader<It::Item> for IterItemReader<It> {
    fn read(&self) -> ItemReaderResult<It::Item> {
        Ok(self.items.borrow_mut().next())
    }

    fn open(&self) -> Result<(), BatchError> {
        *self.items.borrow_mut() = self.source.clone().fuse();
        Ok(())
    }
}

/// Keeps every chunk it is given, in memory.
pub struct InMemoryItemWriter<T> {
    chunks: RefCell<Vec<Vec<T>>>,
}

impl<T> Default for InMemoryItemWriter<T> {
    fn default() -> Self {
        Self {
            chunks: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Clone> InMemoryItemWriter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every written item, in write order.
    pub fn items(&self) -> Vec<T> {
        self.chunks.borrow().iter().flatten().cloned().collect()
    }

    /// Size of each written chunk, in write order.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.borrow().iter().map(Vec::len).collect()
    }

    pub fn chunks(&self) -> Vec<Vec<T>> {
        self.chunks.borrow().clone()
    }
}

impl<T: Clone> ItemWriter<T> for InMemoryItemWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.chunks.borrow_mut().push(items.to_vec());
        Ok(())
    }
}
