use crate::table::{as_number, as_text, input_rows, table_output, Row};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// Deduplicates rows, fills or drops missing values, then converts column types.
pub struct CleanDataNode {
    properties: NodeProperties,
}

impl CleanDataNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("CleanDataNode", "Clean Data")
            .with_description(
                "Cleans data by removing duplicates, handling missing values, and transforming data types",
            )
            .with_color("#FF9800")
            .with_input("data")
            .with_output("data")
            .with_property(
                PropertyDescriptor::new("removeDuplicates", "Remove Duplicates", PropertyKind::Boolean)
                    .with_default(true)
                    .with_description("Remove duplicate rows"),
            )
            .with_property(
                PropertyDescriptor::new("handleMissingValues", "Handle Missing Values", PropertyKind::Options)
                    .with_default("mean")
                    .with_description("Strategy for missing values")
                    .with_option("Fill with Mean", "mean")
                    .with_option("Fill with Median", "median")
                    .with_option("Drop Rows", "drop"),
            )
            .with_property(
                PropertyDescriptor::new("transformDataTypes", "Transform Data Types", PropertyKind::List)
                    .with_default(json!([]))
                    .with_description("Columns to convert: column, targetType (number, boolean, date)"),
            )
    }
}

#[async_trait]
impl Node for CleanDataNode {
    fn definition(&self) -> NodeDefinition {
        CleanDataNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let mut rows = input_rows(&ctx, "data")?;

        if self.properties.bool("removeDuplicates").unwrap_or(true) {
            rows = remove_duplicates(rows);
        }

        let fill = match self.properties.str("handleMissingValues").unwrap_or("mean") {
            "drop" => None,
            "mean" => Some(mean as fn(&mut [f64]) -> f64),
            "median" => Some(median as fn(&mut [f64]) -> f64),
            other => {
                return Err(NodeError::Configuration(format!(
                    "Invalid missing value strategy: {}",
                    other
                )))
            }
        };
        match fill {
            None => rows.retain(|row| !row.values().any(Value::is_null)),
            Some(statistic) => fill_missing(&mut rows, statistic),
        }

        for transform in self.transforms()? {
            for row in rows.iter_mut() {
                if let Some(cell) = row.get_mut(&transform.column) {
                    *cell = transform.target.convert(cell);
                }
            }
        }

        tracing::debug!(rows = rows.len(), "cleaned table");
        Ok(table_output(rows))
    }
}

impl CleanDataNode {
    fn transforms(&self) -> Result<Vec<Transform>, NodeError> {
        let Some(Value::Array(entries)) = self.properties.get("transformDataTypes") else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .filter_map(|entry| {
                let column = entry.get("column").and_then(as_text)?;
                let target = entry.get("targetType").and_then(as_text).unwrap_or_default();
                Some((column, target))
            })
            .map(|(column, target)| {
                let target = match target.as_str() {
                    "number" => TargetType::Number,
                    "boolean" => TargetType::Boolean,
                    "date" => TargetType::Date,
                    other => {
                        return Err(NodeError::Configuration(format!(
                            "Unsupported target type '{}' for column '{}'",
                            other, column
                        )))
                    }
                };
                Ok(Transform { column, target })
            })
            .collect()
    }
}

pub struct CleanDataNodeFactory;

impl NodeFactory for CleanDataNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties =
            NodeProperties::resolve(&CleanDataNode::node_definition(), &record.data.properties);
        Ok(Box::new(CleanDataNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        CleanDataNode::node_definition()
    }
}

struct Transform {
    column: String,
    target: TargetType,
}

#[derive(Debug, Clone, Copy)]
enum TargetType {
    Number,
    Boolean,
    Date,
}

impl TargetType {
    fn convert(self, cell: &Value) -> Value {
        match self {
            TargetType::Number => as_number(cell).map(|n| json!(n)).unwrap_or(Value::Null),
            TargetType::Boolean => Value::Bool(
                as_text(cell)
                    .map(|text| text.to_lowercase() == "true")
                    .unwrap_or(false),
            ),
            TargetType::Date => as_text(cell)
                .and_then(|text| parse_date(&text))
                .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .unwrap_or(Value::Null),
        }
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD`; naive times are UTC.
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(date.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// Keeps the first occurrence of each row
fn remove_duplicates(rows: Vec<Row>) -> Vec<Row> {
    let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }
    unique
}

/// Replaces nulls in numeric columns with a column statistic, rounded to
/// the most decimal places the column already shows.
fn fill_missing(rows: &mut [Row], statistic: fn(&mut [f64]) -> f64) {
    let columns: BTreeSet<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();

    for column in columns {
        let present: Vec<&Value> = rows
            .iter()
            .filter_map(|row| row.get(&column))
            .filter(|cell| !cell.is_null())
            .collect();
        if present.is_empty() || !present.iter().all(|cell| cell.is_number()) {
            continue;
        }

        let mut values: Vec<f64> = present.iter().filter_map(|cell| cell.as_f64()).collect();
        let places = present.iter().map(|cell| decimal_places(cell)).max().unwrap_or(0);
        let replacement = rounded(statistic(&mut values), places);

        for row in rows.iter_mut() {
            if let Some(cell) = row.get_mut(&column) {
                if cell.is_null() {
                    *cell = replacement.clone();
                }
            }
        }
    }
}

fn decimal_places(cell: &Value) -> usize {
    let text = cell.to_string();
    text.split_once('.').map(|(_, fraction)| fraction.len()).unwrap_or(0)
}

fn rounded(value: f64, places: usize) -> Value {
    if places == 0 {
        return json!(value.round() as i64);
    }
    let factor = 10f64.powi(places as i32);
    json!((value * factor).round() / factor)
}

fn mean(values: &mut [f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
