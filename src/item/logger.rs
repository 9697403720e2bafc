use std::fmt::Debug;

use log::info;

use crate::core::item::{ItemWriter, ItemWriterResult};

/// Writes every item of a chunk to the log at info level.
#[derive(Default)]
pub struct LoggerWriter {
    label: Option<String>,
}

impl LoggerWriter {
    /// A writer prefixing each line with `label` instead of `Record`.
    pub fn with_label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
        }
    }
}

impl<T> ItemWriter<T> for LoggerWriter
where
    T: Debug,
{
    fn write(&self, items: &[T]) -> ItemWriterResult {
        let label = self.label.as_deref().unwrap_or("Record");
        items.iter().for_each(|item| info!("{}: {:?}", label, item));
        Ok(())
    }
}
