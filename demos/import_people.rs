//! Imports `demos/data/people.csv` (or the file given as first argument) into
//! the `person` table of a SQLite database.
//!
//! ```sh
//! RUST_LOG=info cargo run --example import_people --features full -- people.csv
//! ```
//!
//! The database is in memory unless `DATABASE_URL` points to a file, e.g.
//! `sqlite://people.db`. The process exits with the code of the job execution.
use std::{env, process, str::FromStr};

use anyhow::Result;
use chunk_batch::{
    BatchError,
    core::{
        job::JobBuilder,
        launcher::{IncrementingRunId, JobLauncher},
        listener::LoggingListener,
        repository::{InMemoryJobRepository, JobRepository},
        step::StepBuilder,
        validator::{ValidatingItemProcessor, ValidationOutcome},
    },
    item::{
        csv::csv_reader::CsvItemReaderBuilder,
        logger::LoggerWriter,
        rdbc::{DatabaseItemBinder, SqliteItemWriter},
    },
};
use log::info;
use serde::Deserialize;
use sqlx::{
    Sqlite,
    query_builder::Separated,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

const CHUNK_SIZE: u16 = 65000;

#[derive(Debug, Clone, Deserialize)]
struct Person {
    name: String,
    age: u32,
    nation: String,
    address: String,
}

#[derive(Debug, Clone)]
struct PersonRow {
    name: String,
    age: u32,
    nation_code: &'static str,
    address: String,
}

fn validate(person: &Person) -> ValidationOutcome {
    let length = person.name.chars().count();
    if (2..=4).contains(&length) {
        ValidationOutcome::Accepted
    } else {
        ValidationOutcome::rejected(format!("{}: name must have 2 to 4 characters", person.name))
    }
}

fn to_row(person: &Person) -> Result<PersonRow, BatchError> {
    Ok(PersonRow {
        name: person.name.clone(),
        age: person.age,
        nation_code: if person.nation == "汉族" { "01" } else { "02" },
        address: person.address.clone(),
    })
}

struct PersonRowBinder;

impl DatabaseItemBinder<PersonRow, Sqlite> for PersonRowBinder {
    fn bind(&self, item: &PersonRow, mut query_builder: Separated<Sqlite, &str>) {
        query_builder.push_bind(item.name.clone());
        query_builder.push_bind(i64::from(item.age));
        query_builder.push_bind(item.nation_code);
        query_builder.push_bind(item.address.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let input = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/people.csv".to_string());
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    // Prepare database
    let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            nation TEXT NOT NULL,
            address TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;

    // Prepare reader, processor and writers
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_path(&input)?;
    let processor = ValidatingItemProcessor::new(validate, to_row);
    let item_binder = PersonRowBinder;
    let writer = SqliteItemWriter::new()
        .pool(&pool)
        .table("person")
        .add_column("name")
        .add_column("age")
        .add_column("nation")
        .add_column("address")
        .item_binder(&item_binder);

    let import = StepBuilder::new("importPeople")
        .chunk::<Person, PersonRow>(CHUNK_SIZE)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()?;

    let rejected_reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_path(&input)?;
    let rejected = ValidatingItemProcessor::new(
        |person: &Person| match validate(person) {
            ValidationOutcome::Accepted => ValidationOutcome::rejected("valid"),
            ValidationOutcome::Rejected { .. } => ValidationOutcome::Accepted,
        },
        |person: &Person| Ok(person.clone()),
    );
    let rejected_logger = LoggerWriter::with_label("rejected");
    let report = StepBuilder::new("reportRejected")
        .chunk::<Person, Person>(CHUNK_SIZE)
        .reader(&rejected_reader)
        .processor(&rejected)
        .writer(&rejected_logger)
        .skip_limit(u16::MAX)
        .build()?;

    // Execute job
    let job = JobBuilder::new()
        .name("importUserJob")
        .start(&import)
        .next(&report)
        .listener(&LoggingListener)
        .build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository).run_next(&job, &IncrementingRunId)?;

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM person")
        .fetch_one(&pool)
        .await?;
    info!(
        "Job {} ended with status {}, {} people in database",
        execution.job_name, execution.status, stored
    );

    repository.close()?;
    process::exit(execution.exit_code());
}
