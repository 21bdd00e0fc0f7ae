use crate::table::{as_number, as_text, input_rows, table_output, Row};
use async_trait::async_trait;
use serde_json::json;
use std::cmp::Ordering;
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// One filter criterion from the `filterCriteria` list
#[derive(Debug, Clone)]
struct Criterion {
    column: String,
    operation: String,
    value: String,
}

impl Criterion {
    fn from_value(value: &Value) -> Option<Self> {
        let field = |name: &str| value.get(name).and_then(as_text).unwrap_or_default();
        let column = field("column");
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column,
            operation: field("operation"),
            value: field("value"),
        })
    }

    fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.get(&self.column) else {
            return false;
        };
        match self.operation.as_str() {
            "equals" => compare(cell, &self.value) == Some(Ordering::Equal),
            "contains" => cell.as_str().map(|s| s.contains(&self.value)).unwrap_or(false),
            "greaterThan" => compare(cell, &self.value) == Some(Ordering::Greater),
            "lessThan" => compare(cell, &self.value) == Some(Ordering::Less),
            _ => false,
        }
    }
}

/// Numeric comparison when both sides are numeric, text comparison otherwise.
///
/// Not a strict type-and-value check: against a criterion of `"5"`, the
/// cells `5`, `5.0` and `"5"` are all equal. Criterion values are always
/// text from the property form.
fn compare(cell: &Value, value: &str) -> Option<Ordering> {
    if let (Some(a), Ok(b)) = (as_number(cell), value.trim().parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    as_text(cell).map(|text| text.as_str().cmp(value))
}

/// Keeps rows matching every criterion and drops excluded columns
pub struct FilterDataNode {
    properties: NodeProperties,
}

impl FilterDataNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("FilterDataNode", "Filter Data")
            .with_description(
                "Filters data based on multiple criteria and excludes specified columns from output",
            )
            .with_color("#E621F5")
            .with_input("data")
            .with_output("data")
            .with_property(
                PropertyDescriptor::new("filterCriteria", "Filter Criteria", PropertyKind::List)
                    .with_default(json!([]))
                    .with_description("List of filter criteria: column, operation, value"),
            )
            .with_property(
                PropertyDescriptor::new("excludeColumns", "Exclude Columns", PropertyKind::String)
                    .with_default("")
                    .with_description("Comma-separated list of columns to exclude from the output"),
            )
    }

    fn criteria(&self) -> Vec<Criterion> {
        self.properties
            .get("filterCriteria")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Criterion::from_value).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Node for FilterDataNode {
    fn definition(&self) -> NodeDefinition {
        FilterDataNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let rows = input_rows(&ctx, "data")?;
        let criteria = self.criteria();
        if criteria.is_empty() {
            return Err(NodeError::Configuration(
                "Invalid input or filter criteria".to_string(),
            ));
        }

        let excluded = self.properties.list("excludeColumns");
        let total = rows.len();
        let filtered: Vec<Row> = rows
            .into_iter()
            .filter(|row| criteria.iter().all(|c| c.matches(row)))
            .map(|mut row| {
                for column in &excluded {
                    row.remove(column);
                }
                row
            })
            .collect();

        tracing::debug!("Filter kept {}/{} rows", filtered.len(), total);
        Ok(table_output(filtered))
    }
}

pub struct FilterDataNodeFactory;

impl NodeFactory for FilterDataNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties =
            NodeProperties::resolve(&FilterDataNode::node_definition(), &record.data.properties);
        Ok(Box::new(FilterDataNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        FilterDataNode::node_definition()
    }
}
