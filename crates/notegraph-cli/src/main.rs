//! Notegraph CLI - inspect and analyse knowledge graph snapshots

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use notegraph_core::config::Config;
use notegraph_core::domain::analytics::GraphAnalyticsService;
use notegraph_core::domain::discovery::EdgeDiscoveryService;
use notegraph_core::domain::events::{InMemoryEventStore, publish_uncommitted};
use notegraph_core::domain::graph::{
    Edge, EdgeOptions, EdgeType, Graph, GraphSnapshot, Node, NodeId, Position3D,
};
use notegraph_core::domain::relationship::NodeRelationshipService;
use notegraph_core::domain::similarity::SimilarityCalculator;
use notegraph_core::domain::validation::GraphValidationService;
use notegraph_core::infrastructure::InMemoryGraphStore;
use serde_json::json;
use tracing::{debug, info};

#[cfg(test)]
mod main_tests;

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(author, version, about = "Knowledge graph of notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty graph snapshot
    Init {
        /// Snapshot file to create
        file: PathBuf,
        /// Graph name (defaults to the configured name)
        #[arg(short, long, default_value = "")]
        name: String,
        /// Graph description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Owning user
        #[arg(short, long, default_value = "local")]
        user: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Add a note to a graph
    Add {
        file: PathBuf,
        /// Note title
        #[arg(short, long)]
        title: String,
        /// Note body
        #[arg(short, long, default_value = "")]
        body: String,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Position in space
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        at: Option<Vec<f64>>,
    },

    /// Connect two notes
    Connect {
        file: PathBuf,
        /// Source note (ID or title)
        source: String,
        /// Target note (ID or title)
        target: String,
        /// Edge type
        #[arg(long = "type", default_value = "normal")]
        edge_type: EdgeType,
        /// Edge weight in [0, 1]
        #[arg(short, long, default_value_t = 1.0)]
        weight: f64,
        /// Traversable in both directions
        #[arg(short, long)]
        bidirectional: bool,
    },

    /// Check graph invariants and note bounds
    Validate { file: PathBuf },

    /// Show summary statistics
    Stats { file: PathBuf },

    /// List notes a page at a time
    Nodes {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Shortest path between two notes
    Path {
        file: PathBuf,
        from: String,
        to: String,
    },

    /// Connected groups of notes
    Clusters { file: PathBuf },

    /// Notes ranked by approximate betweenness centrality
    Centrality {
        file: PathBuf,
        /// Show only the top N notes
        #[arg(long)]
        top: Option<usize>,
    },

    /// Suggest connections for a note
    Suggest {
        file: PathBuf,
        node: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Discover candidate edges for a note
    Discover {
        file: PathBuf,
        node: String,
        /// Connect the candidates and save the graph
        #[arg(long)]
        apply: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notegraph=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Config { action } => cmd_config(action, quiet),
        command => {
            let config = Config::load()?;
            run(command, &config, format, quiet).await
        }
    }
}

async fn run(command: Commands, config: &Config, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            file,
            name,
            description,
            user,
            force,
        } => cmd_init(config, &file, &name, &description, &user, force, format, quiet).await,
        Commands::Add {
            file,
            title,
            body,
            tags,
            at,
        } => cmd_add(config, &file, &title, &body, tags, at, format, quiet).await,
        Commands::Connect {
            file,
            source,
            target,
            edge_type,
            weight,
            bidirectional,
        } => {
            let options = EdgeOptions::new(edge_type)
                .with_weight(weight)
                .bidirectional(bidirectional);
            cmd_connect(config, &file, &source, &target, options, format, quiet).await
        }
        Commands::Validate { file } => cmd_validate(config, &file, format, quiet),
        Commands::Stats { file } => cmd_stats(config, &file, format),
        Commands::Nodes {
            file,
            offset,
            limit,
        } => cmd_nodes(config, &file, offset, limit, format).await,
        Commands::Path { file, from, to } => cmd_path(config, &file, &from, &to, format),
        Commands::Clusters { file } => cmd_clusters(config, &file, format),
        Commands::Centrality { file, top } => cmd_centrality(config, &file, top, format),
        Commands::Suggest { file, node, limit } => cmd_suggest(config, &file, &node, limit, format),
        Commands::Discover { file, node, apply } => {
            cmd_discover(config, &file, &node, apply, format, quiet).await
        }
        Commands::Config { action } => cmd_config(action, quiet),
    }
}

// ============================================================================
// Snapshot helpers
// ============================================================================

fn read_graph(path: &Path, config: &Config) -> anyhow::Result<Graph> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let snapshot = GraphSnapshot::from_json(&json)
        .with_context(|| format!("Failed to parse graph file {}", path.display()))?;
    let graph = Graph::from_snapshot(snapshot, config.graph.clone())?;
    debug!(graph_id = %graph.id(), path = %path.display(), "Graph loaded");
    Ok(graph)
}

/// Publish pending events, then write the snapshot
///
/// The CLI has no event sink: published events are logged at debug level
/// and then discarded, only the snapshot is persisted.
async fn save_graph(path: &Path, graph: &mut Graph) -> anyhow::Result<()> {
    let store = InMemoryEventStore::new();
    let published = publish_uncommitted(graph, &store).await?;
    for event in store.all_events() {
        debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "Event published"
        );
    }

    std::fs::write(path, graph.to_snapshot().to_json()?)
        .with_context(|| format!("Failed to write graph file {}", path.display()))?;
    info!(graph_id = %graph.id(), events = published, version = graph.version(), "Graph saved");
    Ok(())
}

/// Resolve a note by ID, or by a unique case-insensitive title
fn resolve_node(graph: &Graph, reference: &str) -> anyhow::Result<NodeId> {
    if let Ok(id) = reference.parse::<NodeId>() {
        if graph.contains_node(&id) {
            return Ok(id);
        }
        bail!("Note {} is not part of this graph", id);
    }

    let matches: Vec<&Node> = graph
        .nodes()
        .filter(|node| node.content.title.eq_ignore_ascii_case(reference.trim()))
        .collect();
    match matches.as_slice() {
        [node] => Ok(node.id),
        [] => Err(anyhow!("No note titled '{}'", reference)),
        _ => Err(anyhow!(
            "{} notes are titled '{}'; use an ID instead",
            matches.len(),
            reference
        )),
    }
}

fn title_of(graph: &Graph, id: &NodeId) -> String {
    graph
        .node(id)
        .map(|node| node.content.title.clone())
        .unwrap_or_default()
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn cmd_init(
    config: &Config,
    file: &Path,
    name: &str,
    description: &str,
    user: &str,
    force: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    if file.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", file.display());
    }

    let mut graph: Graph = Graph::new(user, name, description, config.graph.clone())?;
    save_graph(file, &mut graph).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "id": graph.id(),
            "name": graph.name(),
            "path": file.display().to_string(),
        }))?,
        OutputFormat::Text if !quiet => {
            println!("Graph created successfully!");
            println!("  ID: {}", graph.id());
            println!("  Name: {}", graph.name());
            println!("  File: {}", file.display());
        }
        OutputFormat::Text => println!("{}", graph.id()),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_add(
    config: &Config,
    file: &Path,
    title: &str,
    body: &str,
    tags: Vec<String>,
    at: Option<Vec<f64>>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut graph = read_graph(file, config)?;

    let mut node = Node::new(graph.user_id().clone(), title, body).with_tags(tags);
    if let Some([x, y, z]) = at.as_deref() {
        node = node.with_position(Position3D::new(*x, *y, *z));
    }

    let validator = GraphValidationService::new(config.graph.clone(), config.validation.clone());
    validator.validate_new_node(&graph, &node)?;

    let id = node.id;
    graph.add_node(node)?;
    save_graph(file, &mut graph).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "title": title }))?,
        OutputFormat::Text if !quiet => println!("Added note '{}' ({})", title, id),
        OutputFormat::Text => println!("{}", id),
    }
    Ok(())
}

async fn cmd_connect(
    config: &Config,
    file: &Path,
    source: &str,
    target: &str,
    options: EdgeOptions,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut graph = read_graph(file, config)?;
    let source_id = resolve_node(&graph, source)?;
    let target_id = resolve_node(&graph, target)?;

    let validator = GraphValidationService::new(config.graph.clone(), config.validation.clone());
    let proposed = Edge::with_options(source_id, target_id, options.clone())?;
    validator.validate_new_edge(&graph, &proposed)?;

    let edge = graph.connect_nodes_with(source_id, target_id, options)?;
    save_graph(file, &mut graph).await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&edge)?)?,
        OutputFormat::Text if !quiet => println!(
            "Connected '{}' -> '{}' ({}, weight {})",
            title_of(&graph, &source_id),
            title_of(&graph, &target_id),
            edge.edge_type,
            edge.weight
        ),
        OutputFormat::Text => println!("{}", edge.key()),
    }
    Ok(())
}

fn cmd_validate(config: &Config, file: &Path, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let validator = GraphValidationService::new(config.graph.clone(), config.validation.clone());

    if let Err(error) = validator.validate_graph(&graph) {
        if format == OutputFormat::Json {
            print_json(&json!({
                "valid": false,
                "code": error.code(),
                "error": error.to_string(),
            }))?;
        }
        return Err(error.into());
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "valid": true,
            "nodes": graph.node_count(),
            "edges": graph.edge_count(),
        }))?,
        OutputFormat::Text if !quiet => println!(
            "[OK] Graph '{}' is valid ({} notes, {} edges)",
            graph.name(),
            graph.node_count(),
            graph.edge_count()
        ),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn cmd_stats(config: &Config, file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let stats = GraphAnalyticsService::new().statistics(&graph);

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&stats)?)?,
        OutputFormat::Text => {
            println!("Graph: {} (version {})", graph.name(), graph.version());
            println!("  Notes: {}", stats.node_count);
            println!("  Edges: {}", stats.edge_count);
            println!("  Bidirectional edges: {}", stats.bidirectional_edges);
            println!("  Density: {:.4}", stats.density);
            println!("  Average degree: {:.2}", stats.average_degree);
            println!("  Clusters: {}", stats.cluster_count);
            println!("  Orphans: {}", stats.orphan_count);
            for (edge_type, count) in &stats.edges_by_type {
                println!("  {} edges: {}", edge_type, count);
            }
        }
    }
    Ok(())
}

async fn cmd_nodes(
    config: &Config,
    file: &Path,
    offset: usize,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let store = InMemoryGraphStore::new();
    store.save_graph(&graph, None)?;
    let lazy = store.load_lazy(&graph.id(), config.graph.clone())?;

    let page = lazy.fetch_nodes_page(&store, offset, limit).await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&page)?)?,
        OutputFormat::Text => {
            if page.items.is_empty() {
                println!("No notes found.");
                return Ok(());
            }
            println!(
                "Notes {}-{} of {}:",
                page.offset + 1,
                page.offset + page.items.len(),
                page.total
            );
            for node in &page.items {
                let tags = if node.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", node.tags.join(", "))
                };
                println!(
                    "  {}  {}{} ({} connections)",
                    node.id,
                    node.content.title,
                    tags,
                    lazy.connectivity(&node.id)
                );
            }
            if page.has_more {
                println!("\nMore with: --offset {}", page.offset + page.items.len());
            }
        }
    }
    Ok(())
}

fn cmd_path(config: &Config, file: &Path, from: &str, to: &str, format: OutputFormat) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let from_id = resolve_node(&graph, from)?;
    let to_id = resolve_node(&graph, to)?;

    let path = GraphAnalyticsService::new().find_path(&graph, &from_id, &to_id)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "path": path,
            "length": path.len().saturating_sub(1),
        }))?,
        OutputFormat::Text => {
            let titles: Vec<String> = path.iter().map(|id| title_of(&graph, id)).collect();
            println!("{}", titles.join(" -> "));
            println!("({} hops)", path.len().saturating_sub(1));
        }
    }
    Ok(())
}

fn cmd_clusters(config: &Config, file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let clusters = GraphAnalyticsService::new().get_clusters(&graph);

    match format {
        OutputFormat::Json => print_json(&json!({ "clusters": clusters }))?,
        OutputFormat::Text => {
            println!("{} clusters:", clusters.len());
            for (index, cluster) in clusters.iter().enumerate() {
                let titles: Vec<String> = cluster.iter().map(|id| title_of(&graph, id)).collect();
                println!("  {}. {}", index + 1, titles.join(", "));
            }
        }
    }
    Ok(())
}

fn cmd_centrality(config: &Config, file: &Path, top: Option<usize>, format: OutputFormat) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let scores = GraphAnalyticsService::new().calculate_centrality(&graph);

    let mut ranked: Vec<(NodeId, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(top) = top {
        ranked.truncate(top);
    }

    match format {
        OutputFormat::Json => {
            let items: Vec<_> = ranked
                .iter()
                .map(|(id, score)| json!({ "node_id": id, "score": score }))
                .collect();
            print_json(&json!({ "centrality": items }))?
        }
        OutputFormat::Text => {
            for (id, score) in &ranked {
                println!("  {:.3}  {}", score, title_of(&graph, id));
            }
        }
    }
    Ok(())
}

fn cmd_suggest(config: &Config, file: &Path, node: &str, limit: usize, format: OutputFormat) -> anyhow::Result<()> {
    let graph = read_graph(file, config)?;
    let node_id = resolve_node(&graph, node)?;

    let suggestions = NodeRelationshipService::new().suggest_connections(&graph, &node_id, limit)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&suggestions)?)?,
        OutputFormat::Text => {
            if suggestions.is_empty() {
                println!("No suggestions for '{}'.", title_of(&graph, &node_id));
                return Ok(());
            }
            println!("Suggestions for '{}':", title_of(&graph, &node_id));
            for suggestion in &suggestions {
                println!(
                    "  {:.2}  {} ({})",
                    suggestion.similarity, suggestion.title, suggestion.reason
                );
            }
        }
    }
    Ok(())
}

async fn cmd_discover(
    config: &Config,
    file: &Path,
    node: &str,
    apply: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut graph = read_graph(file, config)?;
    let node_id = resolve_node(&graph, node)?;
    let subject = graph
        .node(&node_id)
        .cloned()
        .ok_or_else(|| anyhow!("Note {} is not part of this graph", node_id))?;

    let scorer = Arc::new(SimilarityCalculator::new(config.similarity.clone()));
    let service = EdgeDiscoveryService::with_scorer(config.discovery.clone(), scorer);
    let candidates = service.suggest_edges(&subject, &graph);

    let applied = if apply {
        let edges = service.apply_candidates(&mut graph, &candidates)?;
        save_graph(file, &mut graph).await?;
        Some(edges.len())
    } else {
        None
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "candidates": candidates,
            "applied": applied,
        }))?,
        OutputFormat::Text => {
            if candidates.is_empty() && !quiet {
                println!("No candidate edges for '{}'.", subject.content.title);
            }
            for candidate in &candidates {
                println!(
                    "  {:.2}  {} -> {} ({})",
                    candidate.similarity,
                    title_of(&graph, &candidate.source_id),
                    title_of(&graph, &candidate.target_id),
                    candidate.edge_type
                );
            }
            if let Some(count) = applied {
                if !quiet {
                    println!("Applied {} edges.", count);
                }
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

