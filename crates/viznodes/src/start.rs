use async_trait::async_trait;
use vizcore::{Node, NodeContext, NodeDefinition, NodeError, NodeRecord, Value};
use vizruntime::NodeFactory;

/// Entry point of a workflow; emits a fixed marker
pub struct StartNode;

impl StartNode {
    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("StartNode", "Start")
            .with_description("Marks the beginning of a workflow")
            .with_color("#00ff00")
            .with_output("output")
    }
}

#[async_trait]
impl Node for StartNode {
    fn definition(&self) -> NodeDefinition {
        StartNode::node_definition()
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<Value, NodeError> {
        Ok(serde_json::json!({ "output": "Workflow started" }))
    }
}

pub struct StartNodeFactory;

impl NodeFactory for StartNodeFactory {
    fn create(&self, _record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(StartNode))
    }

    fn definition(&self) -> NodeDefinition {
        StartNode::node_definition()
    }
}
