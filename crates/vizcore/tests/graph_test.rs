// crates/vizcore/tests/graph_test.rs

use serde_json::json;
use vizcore::{EdgeRecord, ExecutionGraph, GraphError, NodeRecord, WorkflowStructure};

#[test]
fn test_parses_canvas_document() {
    let doc = json!({
        "nodes": [
            {
                "id": "1",
                "type": "ReadCSVNode",
                "position": { "x": 10.0, "y": 20.0 },
                "data": { "label": "Read", "properties": { "csvFile": {} } }
            },
            { "id": "2", "type": "FilterDataNode", "position": { "x": 0, "y": 0 }, "data": { "label": "Filter", "properties": {} } }
        ],
        "edges": [
            { "id": "e1-2", "source": "1", "target": "2", "sourceHandle": "data", "targetHandle": "data" }
        ]
    });
    let structure: WorkflowStructure = serde_json::from_value(doc).unwrap();
    let graph = ExecutionGraph::from_structure(structure).unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    let target = graph.index_of("2").unwrap();
    let incoming = graph.incoming(target);
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].1.input_handle(), "data");
    assert_eq!(graph.find_node("1").unwrap().data.label, "Read");
}

#[test]
fn test_rejects_empty_graph() {
    let err = ExecutionGraph::build(vec![], vec![]).unwrap_err();
    assert_eq!(err, GraphError::Empty);
}

#[test]
fn test_rejects_edge_to_missing_node() {
    let nodes = vec![NodeRecord::new("a", "Echo")];
    let edges = vec![EdgeRecord::new("a", "ghost")];
    let err = ExecutionGraph::build(nodes, edges).unwrap_err();
    assert!(matches!(err, GraphError::UnknownEdgeEndpoint { node, .. } if node == "ghost"));
}

#[test]
fn test_rejects_duplicate_and_blank_ids() {
    let nodes = vec![NodeRecord::new("a", "Echo"), NodeRecord::new("a", "Echo")];
    assert_eq!(
        ExecutionGraph::build(nodes, vec![]).unwrap_err(),
        GraphError::DuplicateNode("a".to_string())
    );

    let nodes = vec![NodeRecord::new("a", "Echo"), NodeRecord::new("", "Echo")];
    assert_eq!(
        ExecutionGraph::build(nodes, vec![]).unwrap_err(),
        GraphError::MissingNodeId { index: 1 }
    );
}

#[test]
fn test_cycles_are_built_but_reported() {
    let nodes = vec![NodeRecord::new("a", "Echo"), NodeRecord::new("b", "Echo")];
    let edges = vec![EdgeRecord::new("a", "b"), EdgeRecord::new("b", "a")];
    let graph = ExecutionGraph::build(nodes, edges).unwrap();
    assert!(graph.is_cyclic());

    let nodes = vec![NodeRecord::new("a", "Echo"), NodeRecord::new("b", "Echo")];
    let graph = ExecutionGraph::build(nodes, vec![EdgeRecord::new("a", "b")]).unwrap();
    assert!(!graph.is_cyclic());
}

#[test]
fn test_node_indices_follow_submission_order() {
    let mut structure = WorkflowStructure::new();
    structure.add_node(NodeRecord::new("z", "Echo"));
    structure.add_node(NodeRecord::new("a", "Echo"));
    structure.add_node(NodeRecord::new("m", "Echo"));
    let graph = ExecutionGraph::from_structure(structure).unwrap();

    let ids: Vec<&str> = graph
        .node_indices()
        .map(|idx| graph.node(idx).id.as_str())
        .collect();
    assert_eq!(ids, vec!["z", "a", "m"]);
}
