use crate::table::{as_number, input_rows, table_output, Row};
use async_trait::async_trait;
use serde_json::json;
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// Groups a numeric column into labelled bins, written to `<column>_binned`
pub struct DataBinningNode {
    properties: NodeProperties,
}

impl DataBinningNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("DataBinningNode", "Data Binning")
            .with_description("Groups continuous data into discrete intervals or bins")
            .with_color("#00A971")
            .with_input("data")
            .with_output("data")
            .with_property(
                PropertyDescriptor::new("binningMethod", "Binning Method", PropertyKind::Options)
                    .with_default("equal-width")
                    .with_description("Method to use for binning")
                    .with_option("Equal Width", "equal-width")
                    .with_option("Equal Frequency", "equal-frequency")
                    .with_option("Custom", "custom"),
            )
            .with_property(
                PropertyDescriptor::new("numberOfBins", "Number of Bins", PropertyKind::Number)
                    .with_default(10)
                    .with_description("Number of bins to create"),
            )
            .with_property(
                PropertyDescriptor::new("customBinEdges", "Custom Bin Edges", PropertyKind::String)
                    .with_default("")
                    .with_description("Comma-separated list of custom bin edges")
                    .shown_when("binningMethod", vec![json!("custom")]),
            )
            .with_property(
                PropertyDescriptor::new("columnToBin", "Column to Bin", PropertyKind::String)
                    .with_default("")
                    .with_description("The column to apply binning on"),
            )
            .with_property(
                PropertyDescriptor::new("binLabels", "Bin Labels", PropertyKind::String)
                    .with_default("")
                    .with_description("Comma-separated list of labels for each bin"),
            )
    }

    fn bin_count(&self) -> Result<usize, NodeError> {
        match self.properties.f64("numberOfBins") {
            Some(n) if n >= 1.0 => Ok(n as usize),
            _ => Err(NodeError::Configuration(
                "Number of bins must be at least 1".to_string(),
            )),
        }
    }

    fn custom_edges(&self) -> Result<Vec<f64>, NodeError> {
        let edges = self
            .properties
            .list("customBinEdges")
            .iter()
            .map(|edge| {
                edge.parse::<f64>()
                    .map_err(|_| NodeError::Configuration(format!("Invalid bin edge: {}", edge)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if edges.is_empty() {
            return Err(NodeError::Configuration(
                "Custom binning needs at least one bin edge".to_string(),
            ));
        }
        Ok(edges)
    }
}

#[async_trait]
impl Node for DataBinningNode {
    fn definition(&self) -> NodeDefinition {
        DataBinningNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let rows = input_rows(&ctx, "data")?;
        let column = self.properties.str("columnToBin").ok_or_else(|| {
            NodeError::Configuration("Invalid input or column specification".to_string())
        })?;
        let labels = self.properties.list("binLabels");
        let method = self.properties.str("binningMethod").unwrap_or("equal-width");

        let values = rows
            .iter()
            .map(|row| {
                row.get(column).and_then(as_number).ok_or_else(|| {
                    NodeError::Execution(format!("Column '{}' has a non-numeric value", column))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let binned = match method {
            "equal-width" => equal_width(rows, &values, column, self.bin_count()?, &labels),
            "equal-frequency" => equal_frequency(rows, &values, column, self.bin_count()?, &labels),
            "custom" => custom(rows, &values, column, &self.custom_edges()?, &labels),
            other => {
                return Err(NodeError::Configuration(format!(
                    "Invalid binning method: {}",
                    other
                )))
            }
        };

        Ok(table_output(binned))
    }
}

pub struct DataBinningNodeFactory;

impl NodeFactory for DataBinningNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties =
            NodeProperties::resolve(&DataBinningNode::node_definition(), &record.data.properties);
        Ok(Box::new(DataBinningNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        DataBinningNode::node_definition()
    }
}

fn label(labels: &[String], index: usize, bins: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("Bin {}", index.min(bins - 1)))
}

fn tag(mut row: Row, column: &str, label: String) -> Row {
    row.insert(format!("{}_binned", column), Value::String(label));
    row
}

fn equal_width(rows: Vec<Row>, values: &[f64], column: &str, bins: usize, labels: &[String]) -> Vec<Row> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    rows.into_iter()
        .zip(values)
        .map(|(row, value)| {
            let index = if width > 0.0 {
                ((value - min) / width).floor() as usize
            } else {
                0
            };
            // The maximum lands one past the last bin
            let index = index.min(bins - 1);
            tag(row, column, label(labels, index, bins))
        })
        .collect()
}

/// Rows come back sorted by the binned column
fn equal_frequency(rows: Vec<Row>, values: &[f64], column: &str, bins: usize, labels: &[String]) -> Vec<Row> {
    let mut pairs: Vec<(f64, Row)> = values.iter().copied().zip(rows).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let bin_size = pairs.len().div_ceil(bins).max(1);

    pairs
        .into_iter()
        .enumerate()
        .map(|(position, (_, row))| {
            let index = position / bin_size;
            tag(row, column, label(labels, index, bins))
        })
        .collect()
}

fn custom(rows: Vec<Row>, values: &[f64], column: &str, edges: &[f64], labels: &[String]) -> Vec<Row> {
    rows.into_iter()
        .zip(values)
        .map(|(row, value)| {
            let index = edges.iter().enumerate().position(|(i, edge)| {
                let upper = edges.get(i + 1).copied().unwrap_or(f64::INFINITY);
                *value >= *edge && *value < upper
            });
            let name = match index {
                Some(index) => labels
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("Bin {}", index)),
                None => "Out of range".to_string(),
            };
            tag(row, column, name)
        })
        .collect()
}
