use log::{debug, error};
use sqlx::{Pool, QueryBuilder, Sqlite, query_builder::Separated};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::BatchError;
use crate::core::item::{ItemWriter, ItemWriterResult};
use crate::item::rdbc::DatabaseItemBinder;

// SQLITE_MAX_VARIABLE_NUMBER of the bundled SQLite
const BIND_LIMIT: usize = 32766;

/// Inserts each chunk into a SQLite table inside one transaction.
///
/// Rows are inserted with multi-row `INSERT` statements; the transaction is
/// committed once every row of the chunk is in, and rolled back as soon as
/// one statement fails. A failed chunk therefore leaves the table untouched.
///
/// The writer bridges to sqlx's async API and must be used from a
/// multi-threaded tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use chunk_batch::item::rdbc::{DatabaseItemBinder, SqliteItemWriter};
/// use sqlx::{query_builder::Separated, Sqlite, SqlitePool};
///
/// struct Person {
///     name: String,
///     age: i64,
/// }
///
/// struct PersonBinder;
/// impl DatabaseItemBinder<Person, Sqlite> for PersonBinder {
///     fn bind(&self, item: &Person, mut query_builder: Separated<Sqlite, &str>) {
///         query_builder.push_bind(item.name.clone());
///         query_builder.push_bind(item.age);
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite://people.db").await?;
/// let binder = PersonBinder;
///
/// let writer = SqliteItemWriter::<Person>::new()
///     .pool(&pool)
///     .table("person")
///     .add_column("name")
///     .add_column("age")
///     .item_binder(&binder);
/// # Ok(())
/// # }
/// ```
pub struct SqliteItemWriter<'a, O> {
    pool: Option<&'a Pool<Sqlite>>,
    table: Option<&'a str>,
    columns: Vec<&'a str>,
    item_binder: Option<&'a dyn DatabaseItemBinder<O, Sqlite>>,
}

impl<'a, O> SqliteItemWriter<'a, O> {
    pub fn new() -> Self {
        Self {
            pool: None,
            table: None,
            columns: Vec::new(),
            item_binder: None,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn table(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    /// Adds a column. Columns are filled in the order they are added.
    pub fn add_column(mut self, column: &'a str) -> Self {
        self.columns.push(column);
        self
    }

    pub fn item_binder(mut self, item_binder: &'a dyn DatabaseItemBinder<O, Sqlite>) -> Self {
        self.item_binder = Some(item_binder);
        self
    }

    fn configuration(
        &self,
    ) -> Result<(&'a Pool<Sqlite>, &'a str, &'a dyn DatabaseItemBinder<O, Sqlite>), BatchError>
    {
        let missing =
            |part: &str| BatchError::Configuration(format!("SqliteItemWriter: {} is required", part));

        if self.columns.is_empty() {
            return Err(missing("at least one column"));
        }

        Ok((
            self.pool.ok_or_else(|| missing("pool"))?,
            self.table.ok_or_else(|| missing("table"))?,
            self.item_binder.ok_or_else(|| missing("item binder"))?,
        ))
    }

    fn runtime_handle() -> Result<Handle, BatchError> {
        let handle = Handle::try_current().map_err(|error| {
            BatchError::Configuration(format!("SqliteItemWriter needs a tokio runtime: {}", error))
        })?;
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(BatchError::Configuration(
                "SqliteItemWriter needs a multi-threaded tokio runtime".to_string(),
            ));
        }
        Ok(handle)
    }
}

impl<O> Default for SqliteItemWriter<'_, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> ItemWriter<O> for SqliteItemWriter<'_, O> {
    fn open(&self) -> ItemWriterResult {
        self.configuration().map(|_| ())
    }

    fn write(&self, items: &[O]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(());
        }

        let (pool, table, item_binder) = self.configuration()?;
        let handle = Self::runtime_handle()?;
        let insert = format!("INSERT INTO {} ({}) ", table, self.columns.join(","));
        let rows_per_statement = (BIND_LIMIT / self.columns.len()).max(1);

        let result = tokio::task::block_in_place(|| {
            handle.block_on(async {
                let mut transaction = pool.begin().await?;

                for rows in items.chunks(rows_per_statement) {
                    let mut query_builder = QueryBuilder::<Sqlite>::new(insert.as_str());
                    query_builder.push_values(rows, |b: Separated<'_, '_, Sqlite, &str>, item| {
                        item_binder.bind(item, b)
                    });
                    query_builder.build().execute(&mut *transaction).await?;
                }

                transaction.commit().await?;
                Ok::<_, sqlx::Error>(())
            })
        });

        match result {
            Ok(()) => {
                debug!("Committed {} items into SQLite table {}", items.len(), table);
                Ok(())
            }
            Err(e) => {
                error!("Rolled back {} items for SQLite table {}: {}", items.len(), table, e);
                Err(BatchError::ItemWriter(format!("SQLite write failed: {}", e)))
            }
        }
    }
}
