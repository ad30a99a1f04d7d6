//! In-memory fakes for the backend and metric traits (testing only)
//!
//! Provides `ScriptedBackend`, which replies per task name and records every
//! call, plus `FixedMetric`, `FailingMetric`, and `FnMetric` for driving the
//! quality scorer without a model.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{FieldMap, ModelBackend, TaskSpec};
use crate::domain::{BackendError, MetricError, TestCase};
use crate::scoring::{Measurement, MetricScorer};

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// One recorded backend invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub task: String,
    pub inputs: FieldMap,
}

#[derive(Debug, Clone)]
enum Script {
    Reply(FieldMap),
    Fail(BackendError),
}

/// Backend that answers each task with a pre-scripted reply or error.
///
/// Tasks with no script fail with [`BackendError::NotConfigured`].
#[derive(Debug)]
pub struct ScriptedBackend {
    name: String,
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply to `task` with the fields of `reply`. Non-object values reply
    /// with an empty field map.
    pub fn on_task(mut self, task: &str, reply: Value) -> Self {
        let fields = match reply {
            Value::Object(map) => map,
            _ => FieldMap::new(),
        };
        self.scripts.insert(task.to_string(), Script::Reply(fields));
        self
    }

    pub fn fail_task(mut self, task: &str, error: BackendError) -> Self {
        self.scripts.insert(task.to_string(), Script::Fail(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.task == task)
            .count()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, task: &TaskSpec, inputs: &FieldMap) -> Result<FieldMap, BackendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            task: task.name.clone(),
            inputs: inputs.clone(),
        });
        match self.scripts.get(&task.name) {
            Some(Script::Reply(fields)) => Ok(fields.clone()),
            Some(Script::Fail(err)) => Err(err.clone()),
            None => Err(BackendError::NotConfigured(format!(
                "{} has no reply for task {}",
                self.name, task.name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric fakes
// ---------------------------------------------------------------------------

/// Metric that always returns the same score.
#[derive(Debug, Clone)]
pub struct FixedMetric {
    measurement: Measurement,
}

impl FixedMetric {
    pub fn new(score: f64) -> Self {
        Self {
            measurement: Measurement::new(score),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.measurement = self.measurement.with_reason(reason);
        self
    }
}

#[async_trait]
impl MetricScorer for FixedMetric {
    async fn measure(&self, _case: &TestCase) -> Result<Measurement, MetricError> {
        Ok(self.measurement.clone())
    }
}

/// Metric that always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingMetric {
    message: String,
}

impl FailingMetric {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl MetricScorer for FailingMetric {
    async fn measure(&self, _case: &TestCase) -> Result<Measurement, MetricError> {
        Err(MetricError::Failed(self.message.clone()))
    }
}

type MeasureFn = dyn Fn(&TestCase) -> Result<Measurement, MetricError> + Send + Sync;

/// Metric computed by a closure over the test case.
pub struct FnMetric {
    f: Box<MeasureFn>,
}

impl FnMetric {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TestCase) -> Result<Measurement, MetricError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl MetricScorer for FnMetric {
    async fn measure(&self, case: &TestCase) -> Result<Measurement, MetricError> {
        (self.f)(case)
    }
}
