//! Chore task steps: one process invocation with its parameter bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChoreResult;
use crate::paths;

/// Scalar value bound to a process parameter.
///
/// Numbers compare by value, so `2024` and `2024.0` are the same binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// String parameter.
    String(String),
    /// Numeric parameter.
    Number(serde_json::Number),
    /// Boolean parameter.
    Bool(bool),
}

impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => match (integral(a), integral(b)) {
                (Some(a), Some(b)) => a == b,
                (None, None) => a.as_f64() == b.as_f64(),
                _ => false,
            },
            _ => false,
        }
    }
}

// JSON numbers are never NaN.
impl Eq for ParameterValue {}

impl Hash for ParameterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::String(s) => s.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Number(n) => match integral(n) {
                Some(i) => i.hash(state),
                None => n.as_f64().map(f64::to_bits).hash(state),
            },
        }
    }
}

/// Exact integer value of `n`, whether it was written as an integer or as a
/// float with no fractional part.
#[allow(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    reason = "bounded and fraction-free before the cast"
)]
fn integral(n: &serde_json::Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < 1e36)
        .map(|f| f as i128)
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ParameterValue {
    /// Non-finite floats have no JSON number form and are kept as text.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map_or_else(|| Self::String(value.to_string()), Self::Number)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A named parameter binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskParameter {
    pub name: String,
    pub value: ParameterValue,
}

/// One step of a chore.
///
/// Steps are zero-based. Parameter names are unique within a step and
/// their order carries no meaning: two tasks with the same bindings in a
/// different order are equal.
#[derive(Debug, Clone)]
pub struct ChoreTask {
    step: usize,
    process_name: String,
    parameters: Vec<TaskParameter>,
}

impl ChoreTask {
    /// Create a task without parameters.
    pub fn new(step: usize, process_name: impl Into<String>) -> Self {
        Self {
            step,
            process_name: process_name.into(),
            parameters: Vec::new(),
        }
    }

    /// Create a task from a list of bindings. A repeated name keeps its last value.
    pub fn with_parameters(
        step: usize,
        process_name: impl Into<String>,
        parameters: impl IntoIterator<Item = TaskParameter>,
    ) -> Self {
        parameters
            .into_iter()
            .fold(Self::new(step, process_name), |task, p| {
                task.with_parameter(p.name, p.value)
            })
    }

    /// Bind a parameter, replacing any existing binding with the same name.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set_parameter(name, value);
        self
    }

    /// Bind a parameter in place.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        let name = name.into();
        let value = value.into();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.parameters.push(TaskParameter { name, value }),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub(crate) fn set_step(&mut self, step: usize) {
        self.step = step;
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn parameters(&self) -> &[TaskParameter] {
        &self.parameters
    }

    /// Value bound to `name`, if any.
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Whether any binding carries exactly `value`.
    pub fn has_parameter_value(&self, value: &ParameterValue) -> bool {
        self.parameters.iter().any(|p| &p.value == value)
    }

    /// Whether this step runs `process_name`.
    ///
    /// Object names on the server ignore case and spaces, so this does too.
    pub fn references_process(&self, process_name: &str) -> bool {
        paths::names_equal(&self.process_name, process_name)
    }

    fn parameter_map(&self) -> BTreeMap<&str, &ParameterValue> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), &p.value))
            .collect()
    }

    /// Wire form sent on create and task updates.
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "Step": self.step,
            "Process@odata.bind": paths::process_bind(&self.process_name),
            "Parameters": self.parameters,
        })
    }

    /// Decode a task as returned by the server. `position` is used when the
    /// payload carries no `Step`.
    pub fn from_value(value: Value, position: usize) -> ChoreResult<Self> {
        let document: TaskDocument = serde_json::from_value(value)?;
        let process_name = match document.process {
            ProcessRef::Named { name } | ProcessRef::Plain(name) => name,
        };
        Ok(Self::with_parameters(
            document.step.unwrap_or(position),
            process_name,
            document.parameters,
        ))
    }
}

impl PartialEq for ChoreTask {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
            && self.process_name == other.process_name
            && self.parameter_map() == other.parameter_map()
    }
}

impl Eq for ChoreTask {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskDocument {
    #[serde(default)]
    step: Option<usize>,
    process: ProcessRef,
    #[serde(default)]
    parameters: Vec<TaskParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProcessRef {
    Named {
        #[serde(rename = "Name")]
        name: String,
    },
    Plain(String),
}
