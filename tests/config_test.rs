//! Integration tests for loading cluster files.
//!
//! These tests load files from temp directories only and skip the global
//! config and environment layers via `Settings::load_file_only`.

use std::fs;

use tempfile::TempDir;

use racktopo::application::ApplicationError;
use racktopo::cli::commands::build_cluster;
use racktopo::config::{expand_path, Settings};

const CLUSTER: &str = r#"
default_rack = "/dc1/default"

[[nodes]]
id = "b1:3181"
rack = "/dc1/rack1"

[[nodes]]
id = "b2:3181"
rack = "/dc1/rack2"

[[nodes]]
id = "b3:3181"
"#;

#[test]
fn given_cluster_file_when_loading_then_nodes_and_default_rack_are_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cluster.toml");
    fs::write(&path, CLUSTER).unwrap();

    let settings = Settings::load_file_only(&path).expect("load settings");

    assert_eq!(settings.default_rack, "/dc1/default");
    assert_eq!(settings.nodes.len(), 3);
    assert_eq!(settings.rack_for("b3:3181"), "/dc1/default");
}

#[test]
fn given_cluster_file_when_building_cluster_then_topology_has_two_level_racks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cluster.toml");
    fs::write(&path, CLUSTER).unwrap();
    let settings = Settings::load_file_only(&path).unwrap();

    let membership = build_cluster(&settings).unwrap();
    let topology = membership.topology();

    assert_eq!(topology.num_of_leaves(), 3);
    assert_eq!(topology.depth_of_all_leaves(), Some(3));
    assert_eq!(topology.get_leaves("/dc1").len(), 3);
}

#[test]
fn given_missing_file_when_loading_then_returns_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load_file_only(&dir.path().join("absent.toml"));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_toml_when_loading_then_returns_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cluster.toml");
    fs::write(&path, "[[nodes]\nid = ").unwrap();

    assert!(matches!(
        Settings::load_file_only(&path),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_path_with_tilde_when_expanding_then_resolves_home() {
    let expanded = expand_path("~/cluster.toml");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("cluster.toml"));
}
