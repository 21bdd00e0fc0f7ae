//! Core abstractions for the visual workflow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the submitted graph model, the node contract,
//! node definitions, execution events and errors. Event delivery is
//! built on tokio channels.

mod definition;
mod error;
pub mod events;
mod graph;
mod node;
mod result;

pub use definition::{DisplayOptions, NodeDefinition, PropertyDescriptor, PropertyKind, PropertyOption};
pub use error::{EngineError, GraphError, NodeError};
pub use events::*;
pub use graph::{
    EdgeRecord, ExecutionGraph, NodeData, NodeIndex, NodeRecord, Position, WorkflowStructure,
    DEFAULT_HANDLE,
};
pub use node::{Node, NodeContext, NodeProperties};
pub use result::{ExecutionResult, NodeOutcome, RunStatus};

/// All node inputs, outputs and properties are JSON values.
pub use serde_json::Value;

/// Identifier of one workflow run
pub type RunId = uuid::Uuid;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
