use crate::registry::NodeRegistry;
use std::time::Instant;
use vizcore::{
    EventChannel, ExecutionEvent, ExecutionGraph, ExecutionResult, Node, NodeContext,
    NodeDefinition, NodeError, NodeIndex, NodeOutcome, RunId, RunStatus, Value,
};

/// Lifecycle of one node within a run.
///
/// A node leaves `Pending` at most once; `Succeeded` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// A node implementation bound to one record for the duration of a run
pub struct NodeInstance {
    node_id: String,
    node: Box<dyn Node>,
    output: Option<Value>,
}

impl NodeInstance {
    pub fn new(node_id: impl Into<String>, node: Box<dyn Node>) -> Self {
        Self {
            node_id: node_id.into(),
            node,
            output: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn definition(&self) -> NodeDefinition {
        self.node.definition()
    }

    /// Output of the last successful execution
    pub fn last_output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub async fn execute(&mut self, ctx: NodeContext) -> Result<Value, NodeError> {
        let output = self.node.execute(ctx).await?;
        self.output = Some(output.clone());
        Ok(output)
    }
}

/// One entry of the resolution work-list: a node waiting on its
/// predecessors, and how many of them are already resolved.
struct Frame {
    idx: NodeIndex,
    predecessors: Vec<NodeIndex>,
    cursor: usize,
}

impl Frame {
    fn new(idx: NodeIndex, graph: &ExecutionGraph) -> Self {
        Self {
            idx,
            predecessors: graph.predecessors(idx),
            cursor: 0,
        }
    }
}

/// Executes one graph at a time, sequentially, in dependency order
#[derive(Debug, Default)]
pub struct WorkflowExecutor;

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a graph under a fresh run id
    pub async fn execute(
        &self,
        graph: &ExecutionGraph,
        registry: &NodeRegistry,
        events: &EventChannel,
    ) -> ExecutionResult {
        self.execute_run(RunId::new_v4(), graph, registry, events).await
    }

    /// Execute a graph and return the per-node results.
    ///
    /// Node failures never surface as errors here: they are recorded in the
    /// result, reported as `nodeError` events, and end the run with
    /// `workflowCompletedWithErrors`.
    pub async fn execute_run(
        &self,
        run_id: RunId,
        graph: &ExecutionGraph,
        registry: &NodeRegistry,
        events: &EventChannel,
    ) -> ExecutionResult {
        let start_time = Instant::now();
        let mut result = ExecutionResult::new(run_id, graph.node_count());

        tracing::info!(
            "Starting workflow run {} ({} nodes, {} edges)",
            run_id,
            graph.node_count(),
            graph.edge_count()
        );

        // Create node instances
        let mut instances = Vec::with_capacity(graph.node_count());
        for idx in graph.node_indices() {
            let record = graph.node(idx);
            match registry.create_node(record) {
                Ok(node) => instances.push(NodeInstance::new(record.id.clone(), node)),
                Err(e) => {
                    tracing::error!("Failed to create node instance for {}: {}", record.id, e);
                    self.fail(&mut result, events, &record.id, e);
                    return self.finish(result, events, start_time, RunStatus::CompletedWithErrors);
                }
            }
        }

        let mut status = vec![NodeStatus::Pending; graph.node_count()];

        for root in graph.node_indices() {
            if status[root.index()] != NodeStatus::Pending {
                continue;
            }

            self.resolve(root, graph, &mut instances, &mut status, &mut result, events)
                .await;

            if status[root.index()] == NodeStatus::Failed {
                tracing::warn!(
                    "Node {} failed, stopping run {}",
                    graph.node(root).id,
                    run_id
                );
                return self.finish(result, events, start_time, RunStatus::CompletedWithErrors);
            }
        }

        self.finish(result, events, start_time, RunStatus::Completed)
    }

    /// Resolve `root` and, depth-first, every node it transitively depends
    /// on. Uses an explicit work-list rather than recursion; a predecessor
    /// found still `Running` closes a cycle and fails the waiting node.
    async fn resolve(
        &self,
        root: NodeIndex,
        graph: &ExecutionGraph,
        instances: &mut [NodeInstance],
        status: &mut [NodeStatus],
        result: &mut ExecutionResult,
        events: &EventChannel,
    ) {
        status[root.index()] = NodeStatus::Running;
        let mut stack = vec![Frame::new(root, graph)];

        while let Some(frame) = stack.last_mut() {
            let idx = frame.idx;
            if let Some(&pred) = frame.predecessors.get(frame.cursor) {
                let blocked = match status[pred.index()] {
                    NodeStatus::Succeeded => {
                        frame.cursor += 1;
                        None
                    }
                    NodeStatus::Pending => {
                        status[pred.index()] = NodeStatus::Running;
                        stack.push(Frame::new(pred, graph));
                        None
                    }
                    NodeStatus::Failed => Some(NodeError::UpstreamFailed {
                        upstream: graph.node(pred).id.clone(),
                    }),
                    NodeStatus::Running => Some(NodeError::CyclicDependency {
                        via: graph.node(pred).id.clone(),
                    }),
                };

                if let Some(error) = blocked {
                    stack.pop();
                    status[idx.index()] = NodeStatus::Failed;
                    self.fail(result, events, &graph.node(idx).id, error);
                }
                continue;
            }

            // Every predecessor has succeeded
            stack.pop();

            let ctx = self.collect_node_inputs(idx, graph, result);
            let instance = &mut instances[idx.index()];
            tracing::debug!("Executing node {} ({} inputs)", instance.node_id(), ctx.inputs.len());

            let start = Instant::now();
            match instance.execute(ctx).await {
                Ok(output) => {
                    let node_id = instance.node_id().to_string();
                    tracing::info!("Node {} completed in {}ms", node_id, start.elapsed().as_millis());
                    status[idx.index()] = NodeStatus::Succeeded;
                    result.record(node_id.clone(), NodeOutcome::Succeeded(output.clone()));
                    events.emit(ExecutionEvent::NodeExecuted { node_id, output });
                }
                Err(e) => {
                    status[idx.index()] = NodeStatus::Failed;
                    let node_id = instance.node_id().to_string();
                    self.fail(result, events, &node_id, e);
                }
            }
        }
    }

    /// Collect inputs for a node from its predecessors.
    ///
    /// Each edge delivers the whole output of its source under the edge's
    /// target handle; later edges overwrite earlier ones on the same handle.
    fn collect_node_inputs(
        &self,
        idx: NodeIndex,
        graph: &ExecutionGraph,
        result: &ExecutionResult,
    ) -> NodeContext {
        let mut ctx = NodeContext::new(graph.node(idx).id.clone());
        for (source, edge) in graph.incoming(idx) {
            if let Some(output) = result.output(&graph.node(source).id) {
                ctx.inputs.insert(edge.input_handle().to_string(), output.clone());
            }
        }
        ctx
    }

    fn fail(&self, result: &mut ExecutionResult, events: &EventChannel, node_id: &str, error: NodeError) {
        let message = error.to_string();
        tracing::error!("Node {} failed: {}", node_id, message);
        result.record(node_id, NodeOutcome::Failed { error: message.clone() });
        events.emit(ExecutionEvent::NodeError {
            node_id: node_id.to_string(),
            error: message,
        });
    }

    fn finish(
        &self,
        mut result: ExecutionResult,
        events: &EventChannel,
        start_time: Instant,
        status: RunStatus,
    ) -> ExecutionResult {
        result.status = status;
        result.duration_ms = start_time.elapsed().as_millis() as u64;

        match status {
            RunStatus::Completed => {
                tracing::info!(
                    "Workflow run {} completed: {}/{} nodes in {}ms",
                    result.run_id,
                    result.completed_nodes(),
                    result.total_nodes,
                    result.duration_ms
                );
                events.emit(ExecutionEvent::WorkflowCompleted);
            }
            RunStatus::CompletedWithErrors => {
                tracing::warn!(
                    "Workflow run {} completed with errors: failed nodes {:?}",
                    result.run_id,
                    result.failed_nodes()
                );
                events.emit(ExecutionEvent::WorkflowCompletedWithErrors);
            }
        }

        result
    }
}
