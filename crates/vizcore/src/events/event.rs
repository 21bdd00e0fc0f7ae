use crate::Value;
use serde::{Deserialize, Serialize};

/// Events emitted during workflow execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ExecutionEvent {
    NodeExecuted {
        #[serde(rename = "nodeId")]
        node_id: String,
        output: Value,
    },
    NodeError {
        #[serde(rename = "nodeId")]
        node_id: String,
        error: String,
    },
    WorkflowCompleted,
    WorkflowCompletedWithErrors,
}

impl ExecutionEvent {
    /// Wire name of the event kind
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionEvent::NodeExecuted { .. } => "nodeExecuted",
            ExecutionEvent::NodeError { .. } => "nodeError",
            ExecutionEvent::WorkflowCompleted => "workflowCompleted",
            ExecutionEvent::WorkflowCompletedWithErrors => "workflowCompletedWithErrors",
        }
    }

    /// Event payload without the kind tag; `{}` for terminal events
    pub fn data(&self) -> Value {
        match self {
            ExecutionEvent::NodeExecuted { node_id, output } => {
                serde_json::json!({ "nodeId": node_id, "output": output })
            }
            ExecutionEvent::NodeError { node_id, error } => {
                serde_json::json!({ "nodeId": node_id, "error": error })
            }
            ExecutionEvent::WorkflowCompleted | ExecutionEvent::WorkflowCompletedWithErrors => {
                serde_json::json!({})
            }
        }
    }

    /// Node the event refers to, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ExecutionEvent::NodeExecuted { node_id, .. } | ExecutionEvent::NodeError { node_id, .. } => {
                Some(node_id)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionEvent::WorkflowCompleted | ExecutionEvent::WorkflowCompletedWithErrors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let event = ExecutionEvent::NodeExecuted {
            node_id: "1".to_string(),
            output: json!("seed"),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "nodeExecuted", "data": { "nodeId": "1", "output": "seed" } })
        );
        assert_eq!(
            serde_json::to_value(ExecutionEvent::WorkflowCompleted).unwrap(),
            json!({ "event": "workflowCompleted" })
        );
        assert_eq!(ExecutionEvent::WorkflowCompletedWithErrors.data(), json!({}));
    }
}
