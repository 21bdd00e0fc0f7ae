// crates/viznodes/tests/nodes_test.rs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use serde_json::json;
use vizcore::{
    EdgeRecord, EventChannel, ExecutionGraph, Node, NodeContext, NodeError, NodeProperties,
    NodeRecord, Value,
};
use viznodes::{
    CleanDataNode, D3JsNode, DataBinningNode, FilterDataNode, NormalizeDataNode, ReadCsvNode,
};
use vizruntime::{NodeRegistry, WorkflowExecutor};

const IRIS: &str = "sepal_length,species\n5.1,setosa\n7.0,versicolor\n6.3,virginica\n4.9,setosa\n";

fn csv_file(text: &str) -> Value {
    json!({
        "name": "iris.csv",
        "content": format!("data:text/csv;base64,{}", STANDARD.encode(text)),
    })
}

fn table(rows: Value) -> Value {
    json!({ "data": { "json": rows, "binary": null } })
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    viznodes::register_all(&mut registry);
    registry
}

fn properties_for(node_type: &str, record: &NodeRecord) -> NodeProperties {
    let definition = registry().get_definition(node_type).unwrap();
    NodeProperties::resolve(&definition, &record.data.properties)
}

#[test]
fn test_register_all_lists_builtin_types() {
    let registry = registry();
    assert_eq!(
        registry.list_node_types(),
        vec![
            "CSVToJSONNode",
            "CleanDataNode",
            "D3JsNode",
            "DataBinningNode",
            "FilterDataNode",
            "NormalizeDataNode",
            "ReadCSVNode",
            "StartNode",
        ]
    );

    let binning = registry.get_definition("DataBinningNode").unwrap();
    assert_eq!(binning.inputs, vec!["data"]);
    assert!(binning.property("customBinEdges").unwrap().display_options.is_some());

    let chart = registry.get_definition("D3JsNode").unwrap();
    assert!(chart.outputs.is_empty());
}

#[tokio::test]
async fn test_read_csv_types_cells() {
    let record = NodeRecord::new("read", "ReadCSVNode").with_property("csvFile", csv_file(IRIS));
    let node = ReadCsvNode::new(properties_for("ReadCSVNode", &record));

    let output = node.execute(NodeContext::new("read")).await.unwrap();
    let rows = output.pointer("/data/json").and_then(Value::as_array).unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], json!({ "sepal_length": 5.1, "species": "setosa" }));
}

#[tokio::test]
async fn test_read_csv_without_file_fails() {
    let record = NodeRecord::new("read", "ReadCSVNode");
    let node = ReadCsvNode::new(properties_for("ReadCSVNode", &record));

    let err = node.execute(NodeContext::new("read")).await.unwrap_err();
    assert_eq!(err, NodeError::Configuration("No CSV file provided".to_string()));
}

#[tokio::test]
async fn test_filter_applies_all_criteria_and_excludes_columns() {
    let record = NodeRecord::new("filter", "FilterDataNode")
        .with_property(
            "filterCriteria",
            json!([
                { "column": "species", "operation": "equals", "value": "setosa" },
                { "column": "sepal_length", "operation": "greaterThan", "value": "5" }
            ]),
        )
        .with_property("excludeColumns", "species");
    let node = FilterDataNode::new(properties_for("FilterDataNode", &record));

    let input = table(json!([
        { "sepal_length": 5.1, "species": "setosa" },
        { "sepal_length": 4.9, "species": "setosa" },
        { "sepal_length": 7.0, "species": "versicolor" }
    ]));
    let ctx = NodeContext::new("filter").with_input("data", input);

    let output = node.execute(ctx).await.unwrap();
    assert_eq!(output, table(json!([{ "sepal_length": 5.1 }])));
}

#[tokio::test]
async fn test_filter_requires_table_input() {
    let record = NodeRecord::new("filter", "FilterDataNode")
        .with_property("filterCriteria", json!([{ "column": "a", "operation": "equals", "value": "1" }]));
    let node = FilterDataNode::new(properties_for("FilterDataNode", &record));

    let err = node
        .execute(NodeContext::new("filter").with_input("data", "not a table"))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::InvalidInputType { .. }));

    let err = node.execute(NodeContext::new("filter")).await.unwrap_err();
    assert_eq!(err, NodeError::MissingInput("data".to_string()));
}

#[tokio::test]
async fn test_binning_rejects_unknown_method() {
    let record = NodeRecord::new("bin", "DataBinningNode")
        .with_property("columnToBin", "x")
        .with_property("binningMethod", "quantum");
    let node = DataBinningNode::new(properties_for("DataBinningNode", &record));

    let ctx = NodeContext::new("bin").with_input("data", table(json!([{ "x": 1 }])));
    let err = node.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Configuration(msg) if msg.contains("quantum")));
}

#[tokio::test]
async fn test_csv_filter_binning_pipeline() {
    let nodes = vec![
        NodeRecord::new("start", "StartNode"),
        NodeRecord::new("read", "ReadCSVNode").with_property("csvFile", csv_file(IRIS)),
        NodeRecord::new("filter", "FilterDataNode").with_property(
            "filterCriteria",
            json!([{ "column": "species", "operation": "contains", "value": "s" }]),
        ),
        NodeRecord::new("bin", "DataBinningNode")
            .with_property("columnToBin", "sepal_length")
            .with_property("binningMethod", "custom")
            .with_property("customBinEdges", "0, 6")
            .with_property("binLabels", "short, long"),
    ];
    let edges = vec![
        EdgeRecord::new("start", "read").with_target_handle("data"),
        EdgeRecord::new("read", "filter").with_target_handle("data"),
        EdgeRecord::new("filter", "bin").with_target_handle("data"),
    ];
    let graph = ExecutionGraph::build(nodes, edges).unwrap();

    let channel = EventChannel::new();
    let events = channel.subscribe_until_terminal();
    let result = WorkflowExecutor::new()
        .execute(&graph, &registry(), &channel)
        .await;
    let events: Vec<_> = events.collect().await;

    assert!(result.is_success(), "{:?}", result.to_json());
    assert_eq!(events.len(), 5);

    let rows = result
        .output("bin")
        .and_then(|v| v.pointer("/data/json"))
        .and_then(Value::as_array)
        .unwrap();
    let labels: Vec<&str> = rows
        .iter()
        .map(|r| r["sepal_length_binned"].as_str().unwrap())
        .collect();
    // every species contains an "s"
    assert_eq!(labels, vec!["short", "long", "long", "short"]);
}

#[tokio::test]
async fn test_filter_equals_compares_numbers_by_value() {
    let record = NodeRecord::new("filter", "FilterDataNode").with_property(
        "filterCriteria",
        json!([{ "column": "n", "operation": "equals", "value": "5" }]),
    );
    let node = FilterDataNode::new(properties_for("FilterDataNode", &record));

    let input = table(json!([{ "n": 5.0 }, { "n": "5" }, { "n": 50 }]));
    let output = node
        .execute(NodeContext::new("filter").with_input("data", input))
        .await
        .unwrap();
    assert_eq!(output, table(json!([{ "n": 5.0 }, { "n": "5" }])));
}

#[tokio::test]
async fn test_clean_dedupes_fills_and_converts() {
    let record = NodeRecord::new("clean", "CleanDataNode")
        .with_property("handleMissingValues", "median")
        .with_property(
            "transformDataTypes",
            json!([
                { "column": "active", "targetType": "boolean" },
                { "column": "seen", "targetType": "date" }
            ]),
        );
    let node = CleanDataNode::new(properties_for("CleanDataNode", &record));

    let input = table(json!([
        { "age": 30, "active": "true", "seen": "2024-01-02" },
        { "age": 30, "active": "true", "seen": "2024-01-02" },
        { "age": null, "active": "False", "seen": "never" },
        { "age": 40, "active": "TRUE", "seen": "2024-01-03T10:00:00Z" }
    ]));
    let output = node
        .execute(NodeContext::new("clean").with_input("data", input))
        .await
        .unwrap();

    assert_eq!(
        output,
        table(json!([
            { "age": 30, "active": true, "seen": "2024-01-02T00:00:00.000Z" },
            { "age": 35, "active": false, "seen": null },
            { "age": 40, "active": true, "seen": "2024-01-03T10:00:00.000Z" }
        ]))
    );
}

#[tokio::test]
async fn test_clean_drop_removes_incomplete_rows() {
    let record = NodeRecord::new("clean", "CleanDataNode")
        .with_property("removeDuplicates", false)
        .with_property("handleMissingValues", "drop");
    let node = CleanDataNode::new(properties_for("CleanDataNode", &record));

    let input = table(json!([{ "a": 1 }, { "a": 1 }, { "a": null }]));
    let output = node
        .execute(NodeContext::new("clean").with_input("data", input))
        .await
        .unwrap();
    assert_eq!(output, table(json!([{ "a": 1 }, { "a": 1 }])));
}

#[tokio::test]
async fn test_normalize_min_max_and_errors() {
    let record = NodeRecord::new("norm", "NormalizeDataNode")
        .with_property("columnsToNormalize", "x");
    let node = NormalizeDataNode::new(properties_for("NormalizeDataNode", &record));

    let input = table(json!([{ "x": 10, "k": "a" }, { "x": 20, "k": "b" }, { "x": 30, "k": "c" }]));
    let output = node
        .execute(NodeContext::new("norm").with_input("data", input))
        .await
        .unwrap();
    assert_eq!(
        output,
        table(json!([
            { "x": 0.0, "k": "a" },
            { "x": 0.5, "k": "b" },
            { "x": 1.0, "k": "c" }
        ]))
    );

    let unconfigured = NormalizeDataNode::new(properties_for(
        "NormalizeDataNode",
        &NodeRecord::new("norm", "NormalizeDataNode"),
    ));
    let err = unconfigured
        .execute(NodeContext::new("norm").with_input("data", table(json!([{ "x": 1 }]))))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        NodeError::Configuration("Invalid input or column specification".to_string())
    );

    let text_column = NormalizeDataNode::new(properties_for(
        "NormalizeDataNode",
        &NodeRecord::new("norm", "NormalizeDataNode").with_property("columnsToNormalize", "k"),
    ));
    let err = text_column
        .execute(NodeContext::new("norm").with_input("data", table(json!([{ "k": "a" }]))))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Execution(msg) if msg.contains("'k'")));
}

#[tokio::test]
async fn test_chart_wraps_rows_as_chart_data() {
    let node = D3JsNode::new(properties_for("D3JsNode", &NodeRecord::new("chart", "D3JsNode")));
    let rows = json!([{ "x": 1, "y": 2 }]);

    let output = node
        .execute(NodeContext::new("chart").with_input("data", table(rows.clone())))
        .await
        .unwrap();
    assert_eq!(output, json!({ "data": { "json": { "chartData": rows } } }));
}

#[tokio::test]
async fn test_csv_clean_normalize_chart_pipeline() {
    let text = "x,label\n2,a\n2,a\n,b\n6,c\n";
    let nodes = vec![
        NodeRecord::new("read", "ReadCSVNode").with_property("csvFile", csv_file(text)),
        NodeRecord::new("clean", "CleanDataNode"),
        NodeRecord::new("norm", "NormalizeDataNode")
            .with_property("columnsToNormalize", "x")
            .with_property("normalizationMethod", "z-score"),
        NodeRecord::new("chart", "D3JsNode").with_property("xAxis", "x"),
    ];
    let edges = vec![
        EdgeRecord::new("read", "clean").with_target_handle("data"),
        EdgeRecord::new("clean", "norm").with_target_handle("data"),
        EdgeRecord::new("norm", "chart").with_target_handle("data"),
    ];
    let graph = ExecutionGraph::build(nodes, edges).unwrap();

    let result = WorkflowExecutor::new()
        .execute(&graph, &registry(), &EventChannel::new())
        .await;
    assert!(result.is_success(), "{:?}", result.to_json());

    // deduped to [2, null -> 4, 6]; mean 4, population std sqrt(8/3)
    let chart = result
        .output("chart")
        .and_then(|v| v.pointer("/data/json/chartData"))
        .and_then(Value::as_array)
        .unwrap();
    let xs: Vec<f64> = chart.iter().map(|r| r["x"].as_f64().unwrap()).collect();
    assert_eq!(xs.len(), 3);
    assert!((xs[0] + 1.224744871391589).abs() < 1e-9);
    assert_eq!(xs[1], 0.0);
    assert!((xs[2] - 1.224744871391589).abs() < 1e-9);
}
