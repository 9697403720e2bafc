use super::{build_name, listener::ExecutionListener, step::Step};

/// A named sequence of steps, with the listeners watching its runs.
///
/// A job holds no run state: every run is tracked by its own
/// [`JobExecution`](super::execution::JobExecution), created by the
/// [`JobLauncher`](super::launcher::JobLauncher).
pub struct Job<'a> {
    /// Human-readable name, the key of the job in the repository
    name: String,
    /// Steps of the job, in execution order
    steps: Vec<&'a dyn Step>,
    listeners: Vec<&'a dyn ExecutionListener>,
}

impl<'a> Job<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[&'a dyn Step] {
        &self.steps
    }

    pub fn listeners(&self) -> &[&'a dyn ExecutionListener] {
        &self.listeners
    }
}

/// Builder for creating a [`Job`].
///
/// # Example
///
/// ```ignore
/// use chunk_batch::core::job::JobBuilder;
///
/// let job = JobBuilder::new()
///     .name("importJob")
///     .start(&read_step)
///     .next(&export_step)
///     .listener(&listener)
///     .build();
/// ```
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    steps: Vec<&'a dyn Step>,
    listeners: Vec<&'a dyn ExecutionListener>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> JobBuilder<'a> {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the first step of the job.
    ///
    /// Same as `next()`, reads better for the first step.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps run in the order they are added.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    pub fn listener(mut self, listener: &'a dyn ExecutionListener) -> JobBuilder<'a> {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Job<'a> {
        Job {
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
            listeners: self.listeners,
        }
    }
}
