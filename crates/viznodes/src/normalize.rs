use crate::table::{as_number, input_rows, table_output, Row};
use async_trait::async_trait;
use serde_json::json;
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// Rescales numeric columns with min-max or z-score normalization
pub struct NormalizeDataNode {
    properties: NodeProperties,
}

impl NormalizeDataNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("NormalizeDataNode", "Normalize Data")
            .with_description("Normalizes numerical data for analysis")
            .with_color("#ECCC12")
            .with_input("data")
            .with_output("normalizedData")
            .with_property(
                PropertyDescriptor::new("normalizationMethod", "Normalization Method", PropertyKind::Options)
                    .with_default("min-max")
                    .with_description("Method to normalize data (min-max, z-score)")
                    .with_option("Min-Max", "min-max")
                    .with_option("Z-Score", "z-score"),
            )
            .with_property(
                PropertyDescriptor::new("columnsToNormalize", "Columns to Normalize", PropertyKind::String)
                    .with_default("")
                    .with_description("Comma-separated list of columns to normalize"),
            )
    }
}

#[async_trait]
impl Node for NormalizeDataNode {
    fn definition(&self) -> NodeDefinition {
        NormalizeDataNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let mut rows = input_rows(&ctx, "data")?;
        let columns = self.properties.list("columnsToNormalize");
        if columns.is_empty() {
            return Err(NodeError::Configuration(
                "Invalid input or column specification".to_string(),
            ));
        }

        let scale: fn(&[f64]) -> Scale = match self.properties.str("normalizationMethod") {
            Some("min-max") | None => Scale::min_max,
            Some("z-score") => Scale::z_score,
            Some(other) => {
                return Err(NodeError::Configuration(format!(
                    "Invalid normalization method: {}",
                    other
                )))
            }
        };

        for column in &columns {
            let values = column_values(&rows, column)?;
            if values.is_empty() {
                continue;
            }
            let scale = scale(&values);
            for row in rows.iter_mut() {
                if let Some(cell) = row.get_mut(column) {
                    if let Some(value) = as_number(cell) {
                        *cell = json!(scale.apply(value));
                    }
                }
            }
        }

        Ok(table_output(rows))
    }
}

pub struct NormalizeDataNodeFactory;

impl NodeFactory for NormalizeDataNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties =
            NodeProperties::resolve(&NormalizeDataNode::node_definition(), &record.data.properties);
        Ok(Box::new(NormalizeDataNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        NormalizeDataNode::node_definition()
    }
}

/// Numeric values of `column` across rows that have it
fn column_values(rows: &[Row], column: &str) -> Result<Vec<f64>, NodeError> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .map(|cell| {
            as_number(cell).ok_or_else(|| {
                NodeError::Execution(format!("Column '{}' has a non-numeric value", column))
            })
        })
        .collect()
}

/// `(value - offset) / divisor`. A zero spread maps every value to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    offset: f64,
    divisor: f64,
}

impl Scale {
    fn min_max(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            offset: min,
            divisor: max - min,
        }
    }

    /// Population standard deviation
    fn z_score(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            offset: mean,
            divisor: variance.sqrt(),
        }
    }

    fn apply(&self, value: f64) -> f64 {
        if self.divisor == 0.0 {
            0.0
        } else {
            (value - self.offset) / self.divisor
        }
    }
}
