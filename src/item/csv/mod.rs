/// CSV support for reading delimited records.
///
/// [`CsvItemReader`](csv_reader::CsvItemReader) deserializes each row into a
/// Rust struct with serde. Columns are matched to struct fields by name, using
/// either the header row of the data or an explicit list of field names for
/// files without header.
///
/// # Examples
///
/// ```
/// use chunk_batch::item::csv::csv_reader::CsvItemReaderBuilder;
/// use chunk_batch::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Person {
///     name: String,
///     age: u8,
/// }
///
/// let reader = CsvItemReaderBuilder::new()
///     .field_names(&["name", "age"])
///     .from_reader("Ada,36\nAlan,41".as_bytes());
///
/// let first: Person = reader.read().unwrap().unwrap();
/// assert_eq!(first, Person { name: "Ada".to_string(), age: 36 });
/// ```
pub mod csv_reader;
