use crate::{NodeDefinition, NodeError, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Core trait that all executable nodes implement
#[async_trait]
pub trait Node: Send + Sync {
    /// Static metadata: ports and configurable properties
    fn definition(&self) -> NodeDefinition;

    /// Execute the node with the outputs of its upstream nodes.
    ///
    /// The returned value is handed unchanged to every dependent node.
    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError>;
}

/// Execution context passed to each node
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Id of the node record being executed
    pub node_id: String,

    /// Full outputs of upstream nodes, keyed by target handle
    pub inputs: HashMap<String, Value>,
}

impl NodeContext {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_input(mut self, handle: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(handle.into(), value.into());
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }
}

/// Configured properties of a node, layered over the defaults of its
/// definition.
#[derive(Debug, Clone, Default)]
pub struct NodeProperties {
    values: HashMap<String, Value>,
}

impl NodeProperties {
    /// Defaults from `definition`, overridden by anything set on the record.
    /// Explicit nulls fall back to the default.
    pub fn resolve(definition: &NodeDefinition, configured: &HashMap<String, Value>) -> Self {
        let mut values = definition.defaults();
        for (name, value) in configured {
            if !value.is_null() {
                values.insert(name.clone(), value.clone());
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get property or return error
    pub fn require(&self, name: &str) -> Result<&Value, NodeError> {
        self.values
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| NodeError::Configuration(format!("Missing property: {}", name)))
    }

    /// String property, empty strings count as unset
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Numeric property; numeric strings from text inputs are accepted
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }

    /// Comma separated string property split into trimmed, non-empty items
    pub fn list(&self, name: &str) -> Vec<String> {
        self.str(name)
            .map(|s| {
                s.split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.values
    }
}
