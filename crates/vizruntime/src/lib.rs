//! Workflow execution runtime
//!
//! This crate provides the execution engine that runs submitted graphs,
//! the registry that maps node type tags to implementations, and the
//! per-run store that hands a submitted graph to its first subscriber.

mod executor;
mod registry;
mod runtime;

pub use executor::{NodeInstance, NodeStatus, WorkflowExecutor};
pub use registry::{NodeFactory, NodeRegistry};
pub use runtime::{RunState, RuntimeConfig, VizRuntime};
