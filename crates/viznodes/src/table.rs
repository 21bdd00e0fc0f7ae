use serde_json::{json, Map};
use vizcore::{NodeContext, NodeError, Value};

pub(crate) type Row = Map<String, Value>;

/// Rows of a tabular input under `handle`
pub(crate) fn input_rows(ctx: &NodeContext, handle: &str) -> Result<Vec<Row>, NodeError> {
    let input = ctx.require_input(handle)?;
    let rows = input
        .pointer("/data/json")
        .and_then(Value::as_array)
        .ok_or_else(|| NodeError::InvalidInputType {
            field: handle.to_string(),
            expected: "table".to_string(),
            actual: kind(input).to_string(),
        })?;

    rows.iter()
        .map(|row| {
            row.as_object().cloned().ok_or_else(|| NodeError::InvalidInputType {
                field: format!("{} row", handle),
                expected: "object".to_string(),
                actual: kind(row).to_string(),
            })
        })
        .collect()
}

pub(crate) fn table_output(rows: Vec<Row>) -> Value {
    json!({ "data": { "json": rows, "binary": null } })
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numeric reading of a cell; numeric strings count
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Textual reading of a scalar cell
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
