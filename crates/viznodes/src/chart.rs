use crate::table::kind;
use async_trait::async_trait;
use serde_json::{json, Map};
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// Sink node that prepares rows for the canvas chart panel.
///
/// Axis and category choices are read by the front end from the node's
/// properties; execution only shapes the data into `chartData`.
pub struct D3JsNode {
    properties: NodeProperties,
}

impl D3JsNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        let axis = |name: &str, display: &str, description: &str| {
            PropertyDescriptor::new(name, display, PropertyKind::String)
                .with_default("")
                .with_description(description)
        };
        NodeDefinition::new("D3JsNode", "Charts and Plots")
            .with_description("Visualizes data using D3.js")
            .with_color("#4287f5")
            .with_input("data")
            .with_property(
                PropertyDescriptor::new("chartType", "Chart Type", PropertyKind::Options)
                    .with_default("scatter")
                    .with_description("Select the type of chart to display")
                    .with_option("Scatter Plot", "scatter")
                    .with_option("Line Chart", "line")
                    .with_option("Bar Chart", "bar"),
            )
            .with_property(axis("xAxis", "X Axis", "The property to use for the X axis"))
            .with_property(axis("yAxis", "Y Axis", "The property to use for the Y axis"))
            .with_property(axis(
                "category",
                "Category",
                "The property to use for the color label / category label",
            ))
    }
}

#[async_trait]
impl Node for D3JsNode {
    fn definition(&self) -> NodeDefinition {
        D3JsNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let input = ctx.require_input("data")?;
        let data = input
            .pointer("/data/json")
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "data".to_string(),
                expected: "table".to_string(),
                actual: kind(input).to_string(),
            })?;

        tracing::debug!(
            chart = self.properties.str("chartType").unwrap_or("scatter"),
            "preparing chart data"
        );
        Ok(json!({ "data": { "json": { "chartData": chart_data(data) } } }))
    }
}

pub struct D3JsNodeFactory;

impl NodeFactory for D3JsNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties =
            NodeProperties::resolve(&D3JsNode::node_definition(), &record.data.properties);
        Ok(Box::new(D3JsNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        D3JsNode::node_definition()
    }
}

/// Rows to plot. A `{reducedData, originalData}` pair is merged row by row,
/// original columns winning on name clashes; anything else passes through.
fn chart_data(data: &Value) -> Value {
    let (Some(Value::Array(reduced)), Some(Value::Array(original))) =
        (data.get("reducedData"), data.get("originalData"))
    else {
        return data.clone();
    };

    let rows = reduced
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut merged = Map::new();
            for part in [Some(row), original.get(index)].into_iter().flatten() {
                if let Value::Object(fields) = part {
                    merged.extend(fields.clone());
                }
            }
            Value::Object(merged)
        })
        .collect();
    Value::Array(rows)
}
