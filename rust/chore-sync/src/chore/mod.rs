//! Chore entity model.
//!
//! A chore is a named, recurring trigger on the planning server that runs an
//! ordered list of processes. This module holds the local representation and
//! its wire encoding; the server stays authoritative and nothing here talks
//! to it.
//!
//! - [`ChoreFrequency`]: recurrence interval (`P01DT00H00M00S`)
//! - [`ChoreStartTime`]: first trigger instant (`2024-01-01T06:00:00Z`)
//! - [`ChoreTask`]: one process invocation with parameter bindings

pub mod frequency;
pub mod start_time;
pub mod task;

pub use frequency::ChoreFrequency;
pub use start_time::ChoreStartTime;
pub use task::{ChoreTask, ParameterValue, TaskParameter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChoreError, ChoreResult};

/// How the steps of a chore commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// All steps commit as one transaction at the end of the run.
    #[default]
    SingleCommit,
    /// Each step commits on its own.
    MultipleCommit,
}

/// A chore definition.
///
/// Constructed locally with [`Chore::new`] and the `with_*` builders, or
/// produced fresh by every read from the server. A fetched chore keeps no
/// link to the server; edits only take effect when written back.
///
/// Task steps are not checked on construction. Call [`Chore::validate`] to
/// catch gaps or duplicates locally, otherwise the server rejects them on
/// write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chore {
    name: String,
    active: bool,
    dst_sensitive: bool,
    execution_mode: ExecutionMode,
    start_time: ChoreStartTime,
    frequency: ChoreFrequency,
    tasks: Vec<ChoreTask>,
}

impl Chore {
    /// Create an active, DST-sensitive chore without tasks that starts now
    /// and repeats daily.
    pub fn new(name: impl Into<String>, execution_mode: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            active: true,
            dst_sensitive: true,
            execution_mode,
            start_time: ChoreStartTime::now(),
            frequency: ChoreFrequency::default(),
            tasks: Vec::new(),
        }
    }

    /// Same chore under another name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn with_dst_sensitivity(mut self, dst_sensitive: bool) -> Self {
        self.dst_sensitive = dst_sensitive;
        self
    }

    #[must_use]
    pub fn with_start_time(mut self, start_time: ChoreStartTime) -> Self {
        self.start_time = start_time;
        self
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: ChoreFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<ChoreTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dst_sensitive(&self) -> bool {
        self.dst_sensitive
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn start_time(&self) -> ChoreStartTime {
        self.start_time
    }

    pub fn frequency(&self) -> ChoreFrequency {
        self.frequency
    }

    pub fn tasks(&self) -> &[ChoreTask] {
        &self.tasks
    }

    /// Task at `step`, if any.
    pub fn task(&self, step: usize) -> Option<&ChoreTask> {
        self.tasks.iter().find(|t| t.step() == step)
    }

    /// Mark the chore active. Calling it again changes nothing.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Mark the chore inactive. Calling it again changes nothing.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn set_dst_sensitivity(&mut self, dst_sensitive: bool) {
        self.dst_sensitive = dst_sensitive;
    }

    pub fn set_execution_mode(&mut self, execution_mode: ExecutionMode) {
        self.execution_mode = execution_mode;
    }

    pub fn set_start_time(&mut self, start_time: ChoreStartTime) {
        self.start_time = start_time;
    }

    pub fn set_frequency(&mut self, frequency: ChoreFrequency) {
        self.frequency = frequency;
    }

    pub fn set_tasks(&mut self, tasks: Vec<ChoreTask>) {
        self.tasks = tasks;
    }

    /// Append a step running `process_name` after the current last step.
    pub fn add_task(
        &mut self,
        process_name: impl Into<String>,
        parameters: impl IntoIterator<Item = TaskParameter>,
    ) -> &ChoreTask {
        let step = self.tasks.len();
        self.tasks
            .push(ChoreTask::with_parameters(step, process_name, parameters));
        &self.tasks[step]
    }

    /// Insert `task` at its step, shifting later steps down by one.
    ///
    /// A step past the end appends. Steps are renumbered to stay contiguous.
    pub fn insert_task(&mut self, task: ChoreTask) {
        let position = task.step().min(self.tasks.len());
        self.tasks.insert(position, task);
        self.renumber_tasks();
    }

    /// Remove the step at `step` and close the gap.
    pub fn remove_task(&mut self, step: usize) -> Option<ChoreTask> {
        let position = self.tasks.iter().position(|t| t.step() == step)?;
        let removed = self.tasks.remove(position);
        self.renumber_tasks();
        Some(removed)
    }

    fn renumber_tasks(&mut self) {
        for (position, task) in self.tasks.iter_mut().enumerate() {
            task.set_step(position);
        }
    }

    /// Whether any step runs `process_name`.
    pub fn references_process(&self, process_name: &str) -> bool {
        self.tasks.iter().any(|t| t.references_process(process_name))
    }

    /// Whether any step binds a parameter to exactly `value`.
    pub fn has_parameter_value(&self, value: &ParameterValue) -> bool {
        self.tasks.iter().any(|t| t.has_parameter_value(value))
    }

    /// Check the structure the server expects: a non-empty name and task
    /// steps numbered `0..n` in order.
    pub fn validate(&self) -> ChoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(ChoreError::Validation(
                "chore name must not be empty".to_string(),
            ));
        }
        for (position, task) in self.tasks.iter().enumerate() {
            if task.step() != position {
                return Err(ChoreError::Validation(format!(
                    "chore '{}': task at position {position} has step {}, steps must be contiguous from 0",
                    self.name,
                    task.step()
                )));
            }
        }
        Ok(())
    }

    /// Full wire representation, as sent on create.
    pub fn to_body(&self) -> Value {
        let mut body = self.to_body_without_tasks();
        body["Active"] = Value::Bool(self.active);
        body["Tasks"] = Value::Array(self.tasks.iter().map(ChoreTask::to_body).collect());
        body
    }

    /// Header fields only, as sent when patching an existing chore. Tasks and
    /// the activation flag are managed through their own calls.
    pub fn to_body_without_tasks(&self) -> Value {
        serde_json::json!({
            "Name": self.name,
            "StartTime": self.start_time,
            "DSTSensitive": self.dst_sensitive,
            "ExecutionMode": self.execution_mode,
            "Frequency": self.frequency,
        })
    }

    /// Decode a chore from a server payload. A missing `Tasks` array means
    /// the chore has no steps.
    pub fn from_value(value: Value) -> ChoreResult<Self> {
        let document: ChoreDocument = serde_json::from_value(value)?;
        let tasks = document
            .tasks
            .into_iter()
            .enumerate()
            .map(|(position, task)| ChoreTask::from_value(task, position))
            .collect::<ChoreResult<Vec<_>>>()?;

        Ok(Self {
            name: document.name,
            active: document.active,
            dst_sensitive: document.dst_sensitive,
            execution_mode: document.execution_mode,
            start_time: document.start_time,
            frequency: document.frequency,
            tasks,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChoreDocument {
    name: String,
    #[serde(default)]
    active: bool,
    #[serde(rename = "DSTSensitive", default)]
    dst_sensitive: bool,
    #[serde(default)]
    execution_mode: ExecutionMode,
    start_time: ChoreStartTime,
    frequency: ChoreFrequency,
    #[serde(default)]
    tasks: Vec<Value>,
}
