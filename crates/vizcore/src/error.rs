use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(#[from] GraphError),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run already started: {0}")]
    RunAlreadyStarted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-node failures. These never escape the executor; they are recorded
/// in the execution result and reported as `nodeError` events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Failed to create node instance: {0}")]
    Construction(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream node '{upstream}' failed")]
    UpstreamFailed { upstream: String },

    #[error("Cyclic dependency detected via node '{via}'")]
    CyclicDependency { via: String },
}

/// Structural problems found while building an execution graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("workflow has no nodes")]
    Empty,

    #[error("node at position {index} has no id")]
    MissingNodeId { index: usize },

    #[error("node '{node}' has no type")]
    MissingNodeType { node: String },

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownEdgeEndpoint { edge: String, node: String },
}
