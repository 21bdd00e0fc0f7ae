// crates/vizruntime/tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::sync::{Arc, Mutex};
use vizcore::{
    EdgeRecord, EventChannel, ExecutionEvent, ExecutionGraph, ExecutionResult, Node, NodeContext,
    NodeDefinition, NodeError, NodeRecord, Value, DEFAULT_HANDLE,
};
use vizruntime::{NodeFactory, NodeRegistry, WorkflowExecutor};

/// Ids of executed nodes, in call order
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy)]
enum Behavior {
    /// Resolve to the "default" input, or "seed"
    Echo,
    /// Resolve to the whole inputs map
    Collect,
    /// Resolve to the "value" property
    Const,
    Fail,
}

struct TestNode {
    id: String,
    behavior: Behavior,
    value: Value,
    log: CallLog,
}

#[async_trait]
impl Node for TestNode {
    fn definition(&self) -> NodeDefinition {
        NodeDefinition::new("Test", "Test")
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        self.log.lock().unwrap().push(self.id.clone());
        // Give other tasks a chance to run
        tokio::task::yield_now().await;
        match self.behavior {
            Behavior::Echo => Ok(ctx
                .input(DEFAULT_HANDLE)
                .cloned()
                .unwrap_or_else(|| json!("seed"))),
            Behavior::Collect => Ok(serde_json::to_value(&ctx.inputs).unwrap()),
            Behavior::Const => Ok(self.value.clone()),
            Behavior::Fail => Err(NodeError::Execution("boom".to_string())),
        }
    }
}

struct TestFactory {
    tag: &'static str,
    behavior: Behavior,
    log: CallLog,
}

impl NodeFactory for TestFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(TestNode {
            id: record.id.clone(),
            behavior: self.behavior,
            value: record.data.properties.get("value").cloned().unwrap_or(Value::Null),
            log: self.log.clone(),
        }))
    }

    fn definition(&self) -> NodeDefinition {
        NodeDefinition::new(self.tag, self.tag)
            .with_input(DEFAULT_HANDLE)
            .with_output(DEFAULT_HANDLE)
    }
}

/// Factory whose records never construct
struct BrokenFactory;

impl NodeFactory for BrokenFactory {
    fn create(&self, _record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        Err(NodeError::Configuration("bad config".to_string()))
    }

    fn definition(&self) -> NodeDefinition {
        NodeDefinition::new("Broken", "Broken")
    }
}

pub fn test_registry(log: &CallLog) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    for (tag, behavior) in [
        ("Echo", Behavior::Echo),
        ("Collect", Behavior::Collect),
        ("Const", Behavior::Const),
        ("Fail", Behavior::Fail),
    ] {
        registry.register(Arc::new(TestFactory {
            tag,
            behavior,
            log: log.clone(),
        }));
    }
    registry.register(Arc::new(BrokenFactory));
    registry
}

pub fn node(id: &str, node_type: &str) -> NodeRecord {
    NodeRecord::new(id, node_type)
}

pub fn edge(source: &str, target: &str) -> EdgeRecord {
    EdgeRecord::new(source, target)
}

pub fn edge_to(source: &str, target: &str, handle: &str) -> EdgeRecord {
    EdgeRecord::new(source, target).with_target_handle(handle)
}

pub struct Run {
    pub result: ExecutionResult,
    pub events: Vec<ExecutionEvent>,
    pub calls: Vec<String>,
}

pub async fn run_graph(graph: &ExecutionGraph) -> Run {
    let log = CallLog::default();
    let registry = test_registry(&log);
    let channel = EventChannel::new();
    let events = channel.subscribe_until_terminal();

    let result = WorkflowExecutor::new().execute(graph, &registry, &channel).await;
    let events = events.collect().await;
    let calls = log.lock().unwrap().clone();
    Run { result, events, calls }
}

pub async fn run(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Run {
    let graph = ExecutionGraph::build(nodes, edges).expect("valid graph");
    run_graph(&graph).await
}

/// Compact event description, e.g. "nodeExecuted(1)"
pub fn describe(events: &[ExecutionEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| match e.node_id() {
            Some(id) => format!("{}({})", e.name(), id),
            None => e.name().to_string(),
        })
        .collect()
}
