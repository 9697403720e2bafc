#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Chunk Batch

 A chunk-oriented batch engine: items are read one at a time, validated and
 transformed, then written in chunks, each chunk as one atomic operation.
 Every run of a job is recorded with its status and counters so that a run id
 is never executed twice and failed runs can be resumed.

 ## Core Concepts

- **Job:** a named, ordered list of steps. A job holds no state; each launch
  produces a `JobExecution`.
- **Step:** a read, process, write loop over one source. A `ChunkOrientedStep`
  groups output items into chunks of a fixed size and hands each chunk to the
  writer in a single call.
- **ItemReader:** produces input items until `Ok(None)`.
- **ItemProcessor:** turns an input item into an output item, filters it or
  rejects it. `ValidatingItemProcessor` pairs a validator with a transform.
- **ItemWriter:** persists a whole chunk atomically.
- **JobRepository:** stores job and step executions and refuses a second
  execution for the same (job name, run id).
- **JobLauncher:** creates the execution, runs the steps, notifies the
  listeners and records the final status.

 ## Execution status

 ```text
 STARTING ──> STARTED ──> COMPLETED | FAILED | STOPPED
 ```

 `COMPLETED`, `FAILED` and `STOPPED` are terminal: an execution never leaves
 them. A failed or stopped run can be restarted under a new run id.

 ## Features

| **Feature**   | **Description**                                          |
|---------------|----------------------------------------------------------|
| csv           | Enables a CSV `ItemReader`                               |
| rdbc-sqlite   | Enables a transactional SQLite `ItemWriter`              |
| logger        | Enables a logger `ItemWriter`, useful for debugging      |
| full          | Enables all available features                           |

 ## Getting Started

```rust
use chunk_batch::{
    core::{
        execution::{BatchStatus, RunId},
        job::JobBuilder,
        launcher::JobLauncher,
        repository::InMemoryJobRepository,
        step::StepBuilder,
        validator::{ValidatingItemProcessor, ValidationOutcome},
    },
    item::memory::{InMemoryItemWriter, IterItemReader},
    BatchError,
};

fn main() -> Result<(), BatchError> {
    let reader = IterItemReader::new(vec!["ada", "", "alan", "grace"]);
    let processor = ValidatingItemProcessor::new(
        |name: &&str| {
            if name.is_empty() {
                ValidationOutcome::rejected("empty name")
            } else {
                ValidationOutcome::Accepted
            }
        },
        |name: &&str| Ok(name.to_uppercase()),
    );
    let writer = InMemoryItemWriter::new();

    let step = StepBuilder::new("uppercase")
        .chunk(2)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()?;

    let job = JobBuilder::new().name("namesJob").start(&step).build();

    let repository = InMemoryJobRepository::new();
    let execution = JobLauncher::new(&repository).run(&job, RunId(1))?;

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(writer.chunks(), vec![vec!["ADA", "ALAN"], vec!["GRACE"]]);

    let step_execution = execution.step_execution("uppercase").unwrap();
    assert_eq!(step_execution.read_count, 4);
    assert_eq!(step_execution.skip_count, 1);

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item readers and writers (for example: csv reader, sqlite writer)
pub mod item;
