//! CLI tests

use clap::{CommandFactory, Parser};
use notegraph_core::config::GraphLimits;
use notegraph_core::domain::graph::{EdgeType, Graph, Node, UserId};

use crate::{Cli, Commands, ConfigAction, OutputFormat, resolve_node};

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from(["notegraph", "stats", "g.json", "--format", "json", "-q"]).unwrap();

    assert_eq!(cli.format, OutputFormat::Json);
    assert!(cli.quiet);
    assert!(matches!(cli.command, Commands::Stats { .. }));
}

#[test]
fn test_connect_parses_edge_options() {
    let cli = Cli::try_parse_from([
        "notegraph", "connect", "g.json", "A", "B", "--type", "hierarchical", "--weight", "0.5", "-b",
    ])
    .unwrap();

    match cli.command {
        Commands::Connect {
            edge_type,
            weight,
            bidirectional,
            ..
        } => {
            assert_eq!(edge_type, EdgeType::Hierarchical);
            assert_eq!(weight, 0.5);
            assert!(bidirectional);
        }
        _ => panic!("expected connect"),
    }
}

#[test]
fn test_unknown_edge_type_is_rejected() {
    let result = Cli::try_parse_from(["notegraph", "connect", "g.json", "A", "B", "--type", "sideways"]);
    assert!(result.is_err());
}

#[test]
fn test_add_parses_position_and_tags() {
    let cli = Cli::try_parse_from([
        "notegraph", "add", "g.json", "-t", "Note", "--tag", "a", "--tag", "b", "--at", "1", "-2.5", "3",
    ])
    .unwrap();

    match cli.command {
        Commands::Add { tags, at, .. } => {
            assert_eq!(tags, vec!["a", "b"]);
            assert_eq!(at, Some(vec![1.0, -2.5, 3.0]));
        }
        _ => panic!("expected add"),
    }
}

#[test]
fn test_config_subcommands() {
    let cli = Cli::try_parse_from(["notegraph", "config", "set", "graph.max_depth", "3"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Set { .. }
        }
    ));
}

#[test]
fn test_resolve_node_by_id_or_title() {
    let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
    let user = UserId::new("u1").unwrap();
    let rust = Node::new(user.clone(), "Rust", "");
    let rust_id = rust.id;
    graph.add_node(rust).unwrap();
    graph.add_node(Node::new(user.clone(), "Twin", "")).unwrap();
    graph.add_node(Node::new(user, "twin", "")).unwrap();

    assert_eq!(resolve_node(&graph, &rust_id.to_string()).unwrap(), rust_id);
    assert_eq!(resolve_node(&graph, "rust").unwrap(), rust_id);
    assert!(resolve_node(&graph, "Twin").is_err());
    assert!(resolve_node(&graph, "Missing").is_err());
    assert!(resolve_node(&graph, &notegraph_core::domain::graph::NodeId::new().to_string()).is_err());
}
