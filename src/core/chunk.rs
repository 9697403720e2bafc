/// Processed items waiting to be written together.
///
/// A chunk never holds more than its capacity (the commit interval). It is
/// written in a single [`ItemWriter::write`](super::item::ItemWriter::write)
/// call and cleared afterwards, whether the write succeeded or not.
#[derive(Debug)]
pub struct Chunk<O> {
    items: Vec<O>,
    capacity: usize,
}

impl<O> Chunk<O> {
    pub fn new(capacity: usize) -> Chunk<O> {
        Chunk {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds an item, returning `true` when the chunk became full.
    pub fn push(&mut self, item: O) -> bool {
        debug_assert!(self.items.len() < self.capacity);
        self.items.push(item);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[O] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
