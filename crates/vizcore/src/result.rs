use crate::{RunId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Final state of one node in a run.
///
/// Serializes as the bare output or as `{"error": ...}`. A node whose output
/// is itself `{"error": ...}` looks the same as a failure on the wire, so
/// outcomes are serialize-only; use [`NodeOutcome::is_success`] on the
/// in-memory value.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NodeOutcome {
    Failed { error: String },
    Succeeded(Value),
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NodeOutcome::Succeeded(_))
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            NodeOutcome::Succeeded(value) => Some(value),
            NodeOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NodeOutcome::Failed { error } => Some(error),
            NodeOutcome::Succeeded(_) => None,
        }
    }

    /// Value as exposed to clients: the output itself, or `{"error": ...}`
    pub fn to_value(&self) -> Value {
        match self {
            NodeOutcome::Succeeded(value) => value.clone(),
            NodeOutcome::Failed { error } => serde_json::json!({ "error": error }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
}

/// Result of workflow execution: one entry per node reached before the
/// run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub outputs: HashMap<String, NodeOutcome>,
    /// Node ids in the order they reached a terminal state
    pub order: Vec<String>,
    pub total_nodes: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn new(run_id: RunId, total_nodes: usize) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            outputs: HashMap::new(),
            order: Vec::new(),
            total_nodes,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, node_id: impl Into<String>, outcome: NodeOutcome) {
        let node_id = node_id.into();
        if self.outputs.insert(node_id.clone(), outcome).is_none() {
            self.order.push(node_id);
        }
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeOutcome> {
        self.outputs.get(node_id)
    }

    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.get(node_id).and_then(NodeOutcome::output)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn completed_nodes(&self) -> usize {
        self.outputs.values().filter(|o| o.is_success()).count()
    }

    pub fn failed_nodes(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.outputs.get(id.as_str()).map(|o| !o.is_success()).unwrap_or(false))
            .map(String::as_str)
            .collect()
    }

    /// Plain `{nodeId: output | {error}}` map, as returned to the canvas
    pub fn to_json(&self) -> Value {
        let map = self
            .order
            .iter()
            .filter_map(|id| self.outputs.get(id).map(|o| (id.clone(), o.to_value())))
            .collect::<serde_json::Map<String, Value>>();
        Value::Object(map)
    }
}
