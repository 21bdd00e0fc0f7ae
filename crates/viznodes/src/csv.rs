use crate::table::{table_output, Row};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ::csv::{Error as CsvError, ErrorKind, ReaderBuilder};
use std::io::Cursor;
use vizcore::{
    Node, NodeContext, NodeDefinition, NodeError, NodeProperties, NodeRecord, PropertyDescriptor,
    PropertyKind, Value,
};
use vizruntime::NodeFactory;

/// Reads an uploaded CSV file into rows.
///
/// The `csvFile` property holds `{name, content}` where `content` is base64,
/// optionally as a data URL. The first line is the header. Cells are typed
/// dynamically: numbers, `true`/`false`, empty cells as null.
pub struct ReadCsvNode {
    properties: NodeProperties,
}

impl ReadCsvNode {
    pub fn new(properties: NodeProperties) -> Self {
        Self { properties }
    }

    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("ReadCSVNode", "Read CSV File")
            .with_description("Reads CSV file for the workflow")
            .with_color("#4CAF50")
            .with_input("data")
            .with_output("data")
            .with_property(
                PropertyDescriptor::new("csvFile", "CSV File", PropertyKind::File)
                    .with_default(serde_json::json!({}))
                    .with_description("Upload the CSV file to be read"),
            )
    }

    fn file_contents(&self) -> Result<String, NodeError> {
        let content = self
            .properties
            .get("csvFile")
            .and_then(|file| file.get("content"))
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| NodeError::Configuration("No CSV file provided".to_string()))?;

        // Strip a data URL prefix such as "data:text/csv;base64,"
        let encoded = match content.split_once(',') {
            Some((_, payload)) => payload,
            None => content,
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| NodeError::Execution(format!("CSV file is not valid base64: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| NodeError::Execution(format!("CSV file is not valid UTF-8: {}", e)))
    }
}

#[async_trait]
impl Node for ReadCsvNode {
    fn definition(&self) -> NodeDefinition {
        ReadCsvNode::node_definition()
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<Value, NodeError> {
        let text = self.file_contents()?;
        let rows = parse_csv(&text)?;
        tracing::debug!("Parsed {} CSV rows", rows.len());
        Ok(table_output(rows))
    }
}

pub struct ReadCsvNodeFactory;

impl NodeFactory for ReadCsvNodeFactory {
    fn create(&self, record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        let properties = NodeProperties::resolve(&ReadCsvNode::node_definition(), &record.data.properties);
        Ok(Box::new(ReadCsvNode::new(properties)))
    }

    fn definition(&self) -> NodeDefinition {
        ReadCsvNode::node_definition()
    }
}

/// Serializes its `data` input to a JSON string
pub struct CsvToJsonNode;

impl CsvToJsonNode {
    pub fn node_definition() -> NodeDefinition {
        NodeDefinition::new("CSVToJSONNode", "CSV to JSON")
            .with_description("Converts CSV data to JSON")
            .with_color("#ff6600")
            .with_input("data")
            .with_output("json")
    }
}

#[async_trait]
impl Node for CsvToJsonNode {
    fn definition(&self) -> NodeDefinition {
        CsvToJsonNode::node_definition()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let data = ctx
            .input("data")
            .filter(|v| !v.is_null())
            .ok_or_else(|| NodeError::MissingInput("No CSV data provided".to_string()))?;

        let json = serde_json::to_string(data)
            .map_err(|e| NodeError::Execution(format!("JSON stringify error: {}", e)))?;
        Ok(serde_json::json!({ "json": json }))
    }
}

pub struct CsvToJsonNodeFactory;

impl NodeFactory for CsvToJsonNodeFactory {
    fn create(&self, _record: &NodeRecord) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(CsvToJsonNode))
    }

    fn definition(&self) -> NodeDefinition {
        CsvToJsonNode::node_definition()
    }
}

fn parse_csv(text: &str) -> Result<Vec<Row>, NodeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(Cursor::new(text.as_bytes()));

    let header: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(String::from)
        .collect();
    if header.is_empty() {
        return Err(NodeError::Execution("CSV file is empty".to_string()));
    }

    reader
        .records()
        .map(|record| {
            let record = record.map_err(csv_error)?;
            Ok(header
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.clone(), typed_cell(cell)))
                .collect())
        })
        .collect()
}

fn csv_error(err: CsvError) -> NodeError {
    match err.kind() {
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => NodeError::Execution(format!(
            "CSV parsing errors: line {} has {} fields, expected {}",
            pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            len,
            expected_len
        )),
        _ => NodeError::Execution(format!("CSV parsing errors: {}", err)),
    }
}

fn typed_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    match trimmed {
        "" => Value::Null,
        "true" | "TRUE" => Value::Bool(true),
        "false" | "FALSE" => Value::Bool(false),
        _ => {
            if let Ok(n) = trimmed.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                Value::Number(n)
            } else {
                Value::String(cell.to_string())
            }
        }
    }
}
