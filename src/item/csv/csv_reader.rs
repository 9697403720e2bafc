use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use log::debug;
use serde::de::DeserializeOwned;
use std::{cell::RefCell, fs::File, io::Read, path::Path};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// Reads CSV rows one at a time and deserializes them into `T`.
///
/// Parsing and deserialization failures are returned as
/// [`BatchError::ItemReader`] with the position of the offending record, so
/// the step can fail or skip the row.
///
/// The underlying stream cannot be rewound: a step restarted after a failure
/// needs a new reader built from the same source.
pub struct CsvItemReader<R> {
    /// Uses `RefCell` so rows can be consumed through `&self`.
    records: RefCell<StringRecordsIntoIter<R>>,
    /// Names used to map columns to fields, if any.
    headers: Option<StringRecord>,
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for CsvItemReader<R> {
    fn read(&self) -> ItemReaderResult<T> {
        let Some(result) = self.records.borrow_mut().next() else {
            return Ok(None);
        };

        let record = result.map_err(|error| BatchError::ItemReader(error.to_string()))?;

        record
            .deserialize(self.headers.as_ref())
            .map(Some)
            .map_err(|error| BatchError::ItemReader(error.to_string()))
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Headers: disabled
/// - Field names: none (columns are mapped by position)
/// - Trimming: all fields trimmed
pub struct CsvItemReaderBuilder {
    delimiter: u8,
    has_headers: bool,
    field_names: Option<Vec<String>>,
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
            field_names: None,
        }
    }

    /// Sets the field delimiter, e.g. `b';'` or `b'\t'`.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Whether the first row holds column names.
    ///
    /// The header row is never returned as an item. Unless
    /// [`field_names`](Self::field_names) is set, its names are matched to
    /// struct fields.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Names the columns, in order. Takes precedence over the header row.
    pub fn field_names(mut self, names: &[&str]) -> Self {
        self.field_names = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Creates a `CsvItemReader` reading from any `Read` source.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvItemReader<R> {
        let rdr = self.reader_builder().from_reader(rdr);
        self.build(rdr)
    }

    /// Creates a `CsvItemReader` reading the file at `path`.
    ///
    /// # Errors
    /// Returns `BatchError::ItemReader` if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<File>, BatchError> {
        let rdr = self
            .reader_builder()
            .from_path(path.as_ref())
            .map_err(|error| {
                BatchError::ItemReader(format!(
                    "cannot open {}: {}",
                    path.as_ref().display(),
                    error
                ))
            })?;
        Ok(self.build(rdr))
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(false);
        builder
    }

    fn build<R: Read>(self, mut rdr: csv::Reader<R>) -> CsvItemReader<R> {
        let headers = match self.field_names {
            Some(names) => Some(StringRecord::from(names)),
            None if self.has_headers => rdr.headers().ok().cloned(),
            None => None,
        };
        debug!("CSV reader columns: {:?}", headers);

        CsvItemReader {
            records: RefCell::new(rdr.into_records()),
            headers,
        }
    }
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
