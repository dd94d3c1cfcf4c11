use anyhow::Result;
use bimcore::{port, Graph, NodeHandler, NodeSpec, RunEvent, Value};
use bimnodes::collab::Collaborators;
use bimruntime::{HandlerRegistry, PipelineRuntime, RuntimeConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bimflow")]
#[command(about = "BIM pipeline engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline file
    Run {
        /// Path to pipeline JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a pipeline file without running it
    Validate {
        /// Path to pipeline JSON file
        file: PathBuf,
    },

    /// List available node kinds
    Kinds,

    /// Create a new example pipeline
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, verbose } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_pipeline(file).await?;
        }

        Commands::Validate { file } => {
            validate_pipeline(file)?;
        }

        Commands::Kinds => {
            list_kinds();
        }

        Commands::Init { output } => {
            create_example_pipeline(output)?;
        }
    }

    Ok(())
}

fn build_runtime() -> PipelineRuntime {
    let mut registry = HandlerRegistry::new();
    bimnodes::register_all(&mut registry, &Collaborators::sample());
    PipelineRuntime::with_registry(Arc::new(registry), RuntimeConfig::default())
}

async fn run_pipeline(file: PathBuf) -> Result<()> {
    println!("Loading pipeline from: {}", file.display());

    let graph_json = std::fs::read_to_string(&file)?;
    let graph: Graph = serde_json::from_str(&graph_json)?;

    println!("Pipeline: {}", graph.name);
    println!("   Nodes: {}", graph.nodes.len());
    println!("   Edges: {}", graph.edges.len());
    println!();

    let runtime = build_runtime();
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::RunStarted { graph, .. } => {
                    println!("▶ Run started: {}", graph);
                }
                RunEvent::NodeStarted { node_id, kind, .. } => {
                    println!("  ⚡ {} ({})", node_id, kind);
                }
                RunEvent::NodeCompleted {
                    node_id,
                    result_type,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ {} -> {} in {}ms", node_id, result_type, duration_ms);
                }
                RunEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ {} failed: {}", node_id, error);
                }
                RunEvent::NodeStatus { node_id, patch, .. } => {
                    if let Some(pct) = patch.progress_percentage {
                        let msg = patch.progress_message.unwrap_or_default();
                        println!("     {:>5.1}% [{}] {}", pct, node_id, msg);
                    }
                    if let Some(error) = patch.error {
                        println!("     ⚠ [{}] {}", node_id, error);
                    }
                }
                RunEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Run completed in {}ms", duration_ms);
                    } else {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let outcome = runtime.execute(&graph).await?;
    // Give the printer a moment to drain before summarizing.
    tokio::task::yield_now().await;
    event_task.abort();

    println!();
    println!(
        "Results ({}/{} nodes):",
        outcome.completed_nodes, outcome.total_nodes
    );
    let mut ids: Vec<&String> = outcome.results.keys().collect();
    ids.sort();
    for id in ids {
        if let Some(value) = outcome.result(id) {
            println!("  {} = {}", id, summarize(value));
        }
    }

    Ok(())
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Model(m) => format!("model '{}' ({} elements)", m.name, m.element_count()),
        Value::Elements(e) => format!("{} elements", e.len()),
        Value::ClashResults(c) => format!("{} clashes", c.clashes.len()),
        Value::Quantities(q) => format!("{} = {:?}", q.quantity, q.totals),
        Value::String(s) if s.len() > 60 => format!("string ({} bytes)", s.len()),
        other => format!("{:?}", other),
    }
}

fn validate_pipeline(file: PathBuf) -> Result<()> {
    let graph_json = std::fs::read_to_string(&file)?;
    let graph: Graph = serde_json::from_str(&graph_json)?;

    graph.validate()?;
    bimruntime::topo_sort(&graph)?;

    let runtime = build_runtime();
    let mut unknown: Vec<&NodeSpec> = Vec::new();
    for node in &graph.nodes {
        match runtime.registry().get(&node.kind) {
            Some(handler) => handler
                .validate_properties(&node.properties)
                .map_err(|e| anyhow::anyhow!("node '{}': {}", node.id, e))?,
            None => unknown.push(node),
        }
    }

    println!("✅ Pipeline '{}' is valid", graph.name);
    for node in unknown {
        println!(
            "   ⚠ node '{}' has unregistered kind '{}' (will resolve to null)",
            node.id, node.kind
        );
    }
    Ok(())
}

fn list_kinds() {
    let runtime = build_runtime();
    println!("Available node kinds:");
    for kind in runtime.registry().kinds() {
        match runtime.registry().info(&kind) {
            Some(info) => println!("  {:<22} [{}] {}", kind, info.category, info.description),
            None => println!("  {}", kind),
        }
    }
}

fn create_example_pipeline(output: PathBuf) -> Result<()> {
    let mut graph = Graph::new("example-clash-check");

    let model = graph.add_node(
        NodeSpec::new("model", "ifcNode").with_property("file", "building.ifc"),
    );
    let geometry = graph.add_node(NodeSpec::new("geometry", "geometryNode"));
    let walls = graph.add_node(
        NodeSpec::new("walls", "filterNode").with_property("ifcClass", "IfcWall"),
    );
    let doors = graph.add_node(
        NodeSpec::new("doors", "filterNode").with_property("ifcClass", "IfcDoor"),
    );
    let clashes = graph.add_node(
        NodeSpec::new("clashes", "clashNode").with_property("tolerance", 0.05),
    );
    let report = graph.add_node(
        NodeSpec::new("report", "exportNode").with_property("format", "csv"),
    );

    graph.connect(&model, port::OUTPUT, &geometry, port::INPUT);
    graph.connect(&geometry, port::OUTPUT, &walls, port::INPUT);
    graph.connect(&geometry, port::OUTPUT, &doors, port::INPUT);
    graph.connect(&walls, port::OUTPUT, &clashes, port::INPUT);
    graph.connect(&doors, port::OUTPUT, &clashes, port::REFERENCE);
    graph.connect(&clashes, port::OUTPUT, &report, port::INPUT);

    std::fs::write(&output, serde_json::to_string_pretty(&graph)?)?;
    println!("Wrote example pipeline to {}", output.display());
    Ok(())
}
