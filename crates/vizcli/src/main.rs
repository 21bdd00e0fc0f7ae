// crates/vizcli/src/main.rs

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vizcore::{EventChannel, ExecutionEvent, ExecutionGraph, NodeRecord, WorkflowStructure};
use vizruntime::{NodeRegistry, RuntimeConfig, VizRuntime};

#[derive(Parser)]
#[command(name = "viz")]
#[command(about = "Data visualization workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    viznodes::register_all(&mut registry);
    registry
}

fn load_workflow(file: &Path) -> Result<WorkflowStructure> {
    debug!("Reading workflow file {}", file.display());
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let structure: WorkflowStructure = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    debug!(
        nodes = structure.nodes.len(),
        edges = structure.edges.len(),
        "Parsed workflow"
    );
    Ok(structure)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, verbose } => {
            let level = if verbose { "debug" } else { "info" };
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
                )
                .init();

            run_workflow(&file, verbose).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(&file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

async fn run_workflow(file: &Path, verbose: bool) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let structure = load_workflow(file)?;
    println!("   Nodes: {}", structure.nodes.len());
    println!("   Edges: {}", structure.edges.len());
    println!();

    let graph = ExecutionGraph::from_structure(structure)?;
    let runtime = VizRuntime::with_registry(Arc::new(standard_registry()), RuntimeConfig::from_env());

    let channel: EventChannel = runtime.new_channel();
    let mut events = channel.subscribe_until_terminal();

    // Ends with the terminal event, so awaiting it drains every line
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                ExecutionEvent::NodeExecuted { node_id, output } => {
                    println!("  ✅ Node {} executed", node_id);
                    if verbose {
                        println!("     {}", output);
                    }
                }
                ExecutionEvent::NodeError { node_id, error } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::WorkflowCompleted => {
                    println!("✨ Workflow completed successfully");
                }
                ExecutionEvent::WorkflowCompletedWithErrors => {
                    println!("💥 Workflow completed with errors");
                }
            }
        }
    });

    info!("Executing workflow {}", file.display());
    let result = runtime.execute(&graph, &channel).await;
    printer.await?;
    info!(
        run_id = %result.run_id,
        status = ?result.status,
        duration_ms = result.duration_ms,
        "Workflow run finished"
    );

    println!();
    println!("📊 Execution Summary:");
    println!("   Run ID: {}", result.run_id);
    println!("   Completed: {}/{} nodes", result.completed_nodes(), result.total_nodes);
    println!("   Duration: {}ms", result.duration_ms);

    if verbose && !result.order.is_empty() {
        println!();
        println!("📤 Outputs:");
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    }

    if !result.is_success() {
        bail!("Failed nodes: {}", result.failed_nodes().join(", "));
    }
    Ok(())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let structure = load_workflow(file)?;
    let graph = ExecutionGraph::from_structure(structure)?;
    let registry = standard_registry();

    let unknown: Vec<String> = graph
        .nodes()
        .filter(|node| !registry.contains(&node.node_type))
        .map(|node| format!("{} ({})", node.id, node.node_type))
        .collect();

    if graph.is_cyclic() {
        println!("⚠️  Workflow contains a cycle; nodes on it will fail at run time");
    }
    if !unknown.is_empty() {
        bail!("Unknown node types: {}", unknown.join(", "));
    }

    println!("✅ Workflow is valid:");
    println!("   Nodes: {}", graph.node_count());
    println!("   Edges: {}", graph.edge_count());

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    for (name, definition) in standard_registry().definitions() {
        println!("  • {} ({})", name, definition.display_name);
        println!("    {}", definition.description);
        if !definition.inputs.is_empty() || !definition.outputs.is_empty() {
            println!(
                "    in: [{}]  out: [{}]",
                definition.inputs.join(", "),
                definition.outputs.join(", ")
            );
        }
    }
}

const EXAMPLE_CSV: &str = "name,score\nada,91\nbob,47\ncy,78\n";

fn example_workflow() -> WorkflowStructure {
    let csv_file = json!({
        "name": "scores.csv",
        "content": format!("data:text/csv;base64,{}", STANDARD.encode(EXAMPLE_CSV)),
    });

    let mut workflow = WorkflowStructure::new();
    workflow.add_node(
        NodeRecord::new("start", "StartNode")
            .with_label("Start")
            .with_position(0.0, 100.0),
    );
    workflow.add_node(
        NodeRecord::new("read", "ReadCSVNode")
            .with_label("Read Scores")
            .with_property("csvFile", csv_file)
            .with_position(200.0, 100.0),
    );
    workflow.add_node(
        NodeRecord::new("filter", "FilterDataNode")
            .with_label("Passing Scores")
            .with_property(
                "filterCriteria",
                json!([{ "column": "score", "operation": "greaterThan", "value": "50" }]),
            )
            .with_position(400.0, 100.0),
    );
    workflow.add_node(
        NodeRecord::new("bin", "DataBinningNode")
            .with_label("Grade")
            .with_property("columnToBin", "score")
            .with_property("binningMethod", "custom")
            .with_property("customBinEdges", "50, 80")
            .with_property("binLabels", "pass, merit")
            .with_position(600.0, 100.0),
    );

    for (source, target) in [("start", "read"), ("read", "filter"), ("filter", "bin")] {
        workflow.connect_handle(source, target, "data");
    }
    workflow
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&example_workflow())?;
    std::fs::write(output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  viz run --file {}", output.display());

    Ok(())
}
