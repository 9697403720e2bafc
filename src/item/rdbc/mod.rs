use sqlx::{Database, query_builder::Separated};

#[cfg(feature = "rdbc-sqlite")]
pub mod sqlite_writer;

/// Binds the fields of one item as the values of one inserted row.
///
/// Fields must be pushed in the order of the writer's columns.
pub trait DatabaseItemBinder<O, DB: Database> {
    fn bind(&self, item: &O, query_builder: Separated<DB, &str>);
}

#[cfg(feature = "rdbc-sqlite")]
pub use sqlite_writer::SqliteItemWriter;
