#![allow(dead_code)]

pub mod mocks;

use std::cell::RefCell;

use chunk_batch::{
    BatchError,
    core::{
        execution::{JobExecution, StepExecution},
        item::{ItemProcessor, ItemProcessorResult, Processed},
        listener::{ExecutionListener, ListenerResult},
        validator::ValidationOutcome,
    },
};
use serde::{Deserialize, Serialize};

/// Person as found in the import files.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub nation: String,
    pub address: String,
}

/// Person ready to be stored, with its nation code.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    pub name: String,
    pub age: u32,
    pub nation: String,
    pub address: String,
}

pub fn person(name: &str, age: u32, nation: &str, address: &str) -> Person {
    Person {
        name: name.to_string(),
        age,
        nation: nation.to_string(),
        address: address.to_string(),
    }
}

/// Names must have 2 to 4 characters.
pub fn validate_name(person: &Person) -> ValidationOutcome {
    let length = person.name.chars().count();
    if (2..=4).contains(&length) {
        ValidationOutcome::Accepted
    } else {
        ValidationOutcome::rejected(format!("name {:?} must have 2 to 4 characters", person.name))
    }
}

pub fn to_record(person: &Person) -> Result<PersonRecord, BatchError> {
    let nation = if person.nation == "汉族" { "01" } else { "02" };
    Ok(PersonRecord {
        name: person.name.clone(),
        age: person.age,
        nation: nation.to_string(),
        address: person.address.clone(),
    })
}

/// Rejects odd numbers, keeps the others.
pub struct EvenProcessor;

impl ItemProcessor<i32, i32> for EvenProcessor {
    fn process(&self, item: &i32) -> ItemProcessorResult<i32> {
        if item % 2 == 0 {
            Ok(Processed::Item(*item))
        } else {
            Ok(Processed::Rejected {
                reason: format!("{} is odd", item),
            })
        }
    }
}

/// Records the name of every hook it receives.
#[derive(Default)]
pub struct RecordingListener {
    pub calls: RefCell<Vec<String>>,
    pub job_statuses: RefCell<Vec<String>>,
}

impl RecordingListener {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) -> ListenerResult {
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl ExecutionListener for RecordingListener {
    fn before_job(&self, job_execution: &JobExecution) -> ListenerResult {
        self.job_statuses
            .borrow_mut()
            .push(job_execution.status.to_string());
        self.record("before_job".to_string())
    }

    fn after_job(&self, job_execution: &JobExecution) -> ListenerResult {
        self.job_statuses
            .borrow_mut()
            .push(job_execution.status.to_string());
        self.record("after_job".to_string())
    }

    fn before_step(&self, step_execution: &StepExecution) -> ListenerResult {
        self.record(format!("before_step:{}", step_execution.step_name))
    }

    fn after_step(&self, step_execution: &StepExecution) -> ListenerResult {
        self.record(format!("after_step:{}", step_execution.step_name))
    }

    fn on_error(&self, step_execution: &StepExecution, _error: &BatchError) -> ListenerResult {
        self.record(format!("on_error:{}", step_execution.step_name))
    }
}
