use vizcore::{Node, NodeDefinition, NodeError, NodeRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Factory trait for creating node instances
pub trait NodeFactory: Send + Sync {
    /// Create a new instance bound to `record`
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError>;

    /// Static metadata for this node type. `definition().name` is the
    /// registry tag.
    fn definition(&self) -> NodeDefinition;

    /// Node type identifier
    fn node_type(&self) -> String {
        self.definition().name
    }
}

/// Registry of available node types.
///
/// Filled once at startup and shared read-only afterwards.
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory. A later registration under the same tag
    /// replaces the earlier one.
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type();
        tracing::info!("Registering node type: {}", node_type);
        if self.factories.insert(node_type.clone(), factory).is_some() {
            tracing::warn!("Node type {} registered twice, keeping the latest", node_type);
        }
    }

    /// Create a node instance for a record
    pub fn create_node(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let factory = self
            .factories
            .get(&record.node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(record.node_type.clone()))?;

        factory.create(record).map_err(|e| match e {
            NodeError::Construction(_) | NodeError::UnknownNodeType(_) => e,
            other => NodeError::Construction(other.to_string()),
        })
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get the definition of a node type
    pub fn get_definition(&self, node_type: &str) -> Option<NodeDefinition> {
        self.factories.get(node_type).map(|f| f.definition())
    }

    /// Definitions of every registered type, keyed by tag
    pub fn definitions(&self) -> BTreeMap<String, NodeDefinition> {
        self.factories
            .iter()
            .map(|(tag, factory)| (tag.clone(), factory.definition()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
