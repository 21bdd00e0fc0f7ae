use crate::{GraphError, Value};
use petgraph::graph::{DiGraph, EdgeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle name used when an edge does not name its target handle
pub const DEFAULT_HANDLE: &str = "default";

pub type NodeIndex = petgraph::graph::NodeIndex;

/// Workflow document as submitted by the canvas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStructure {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl WorkflowStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeRecord) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let edge = EdgeRecord::new(source, target);
        self.edges.push(edge);
    }

    pub fn connect_handle(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) {
        let edge = EdgeRecord::new(source, target).with_target_handle(target_handle);
        self.edges.push(edge);
    }
}

/// Graph vertex as drawn on the canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            data: NodeData::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = label.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// Canvas coordinates. Layout only, never read by the engine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Directed data dependency from `source` to `target`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e{}-{}", source, target),
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Input handle on the target node this edge feeds. Missing or empty
    /// handles map to [`DEFAULT_HANDLE`].
    pub fn input_handle(&self) -> &str {
        match self.target_handle.as_deref() {
            Some(handle) if !handle.is_empty() => handle,
            _ => DEFAULT_HANDLE,
        }
    }
}

/// Validated, immutable graph for one run.
///
/// Node weights are stored in submission order so that a node's
/// [`NodeIndex`] equals its position in the submitted `nodes` list; edge
/// indices likewise follow declaration order.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    graph: DiGraph<NodeRecord, EdgeRecord>,
    index_of: HashMap<String, NodeIndex>,
}

impl ExecutionGraph {
    /// Validate a submitted document and build the graph. Cycles are not
    /// rejected here.
    pub fn build(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index_of = HashMap::with_capacity(nodes.len());

        for (position, node) in nodes.into_iter().enumerate() {
            if node.id.is_empty() {
                return Err(GraphError::MissingNodeId { index: position });
            }
            if node.node_type.is_empty() {
                return Err(GraphError::MissingNodeType { node: node.id });
            }
            if index_of.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            index_of.insert(id, idx);
        }

        for edge in edges {
            let source = *index_of.get(&edge.source).ok_or_else(|| GraphError::UnknownEdgeEndpoint {
                edge: edge.id.clone(),
                node: edge.source.clone(),
            })?;
            let target = *index_of.get(&edge.target).ok_or_else(|| GraphError::UnknownEdgeEndpoint {
                edge: edge.id.clone(),
                node: edge.target.clone(),
            })?;
            graph.add_edge(source, target, edge);
        }

        Ok(Self { graph, index_of })
    }

    pub fn from_structure(structure: WorkflowStructure) -> Result<Self, GraphError> {
        Self::build(structure.nodes, structure.edges)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node indices in submission order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn node(&self, idx: NodeIndex) -> &NodeRecord {
        &self.graph[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> + '_ {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> + '_ {
        self.graph.edge_weights()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index_of.get(id).copied()
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeRecord> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Edges feeding `idx`, as `(source, edge)` pairs in declaration order
    pub fn incoming(&self, idx: NodeIndex) -> Vec<(NodeIndex, &EdgeRecord)> {
        let mut incoming: Vec<(EdgeIndex, NodeIndex, &EdgeRecord)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source(), edge.weight()))
            .collect();
        // petgraph walks adjacency lists newest-first
        incoming.sort_by_key(|(edge_idx, _, _)| *edge_idx);
        incoming
            .into_iter()
            .map(|(_, source, edge)| (source, edge))
            .collect()
    }

    /// Direct predecessors of `idx` in edge declaration order. A source
    /// connected by several edges appears once per edge.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.incoming(idx).into_iter().map(|(source, _)| source).collect()
    }

    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}
