//! Integration tests for membership and rack-aware placement.

use std::collections::HashSet;
use std::sync::Arc;

use rstest::{fixture, rstest};

use racktopo::application::services::{MembershipService, PlacementService};
use racktopo::application::ApplicationError;
use racktopo::config::{NodeEntry, Settings};
use racktopo::domain::{Leaf, NetworkLocation, NetworkTopology, Node, TopologyError};
use racktopo::util::testing;

fn entry(id: &str, rack: Option<&str>) -> NodeEntry {
    NodeEntry {
        id: id.to_string(),
        rack: rack.map(str::to_string),
    }
}

#[fixture]
fn settings() -> Settings {
    testing::init_test_setup();
    Settings {
        default_rack: "/default-rack".to_string(),
        nodes: vec![
            entry("b1:3181", Some("/rack1")),
            entry("b2:3181", Some("/rack1")),
            entry("b3:3181", Some("/rack2")),
            entry("b4:3181", Some("/rack3")),
            entry("b5:3181", None),
        ],
    }
}

// ============================================================
// MembershipService
// ============================================================

#[rstest]
fn given_settings_when_bootstrapping_then_topology_mirrors_members(settings: Settings) {
    let topology = Arc::new(NetworkTopology::new());
    let membership = MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();

    assert_eq!(membership.members().len(), 5);
    assert_eq!(topology.num_of_racks(), 4);
    assert_eq!(
        topology.racks(),
        vec!["/default-rack", "/rack1", "/rack2", "/rack3"]
    );
    assert_eq!(
        membership.member("b5:3181").unwrap().location().as_str(),
        "/default-rack"
    );
}

#[rstest]
fn given_member_when_leaving_then_rack_disappears_with_last_node(settings: Settings) {
    let topology = Arc::new(NetworkTopology::new());
    let membership = MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();

    let left = membership.leave("b3:3181").unwrap();

    assert!(!topology.contains(&Node::from(left)));
    assert_eq!(topology.num_of_racks(), 3);
    assert!(membership.member("b3:3181").is_none());
    assert!(matches!(
        membership.leave("b3:3181"),
        Err(ApplicationError::UnknownNode(_))
    ));
}

#[rstest]
fn given_unmapped_node_when_joining_then_uses_default_rack(settings: Settings) {
    let membership = MembershipService::new(Arc::new(NetworkTopology::new()), &settings);

    let leaf = membership.join("late:3181").unwrap();

    assert_eq!(membership.rack_of("late:3181"), "/default-rack");
    assert_eq!(leaf.path(), "/default-rack/late:3181");
}

#[test]
fn given_racks_of_different_depth_when_bootstrapping_then_returns_invalid_topology() {
    let settings = Settings {
        default_rack: "/default-rack".to_string(),
        nodes: vec![
            entry("b1", Some("/rack1")),
            entry("b2", Some("/dc1/rack1")),
        ],
    };

    let result = MembershipService::bootstrap(Arc::new(NetworkTopology::new()), &settings);

    assert!(matches!(
        result,
        Err(ApplicationError::Topology(TopologyError::InvalidTopology { .. }))
    ));
}

// ============================================================
// PlacementService
// ============================================================

fn racks_of(leaves: &[Leaf]) -> HashSet<NetworkLocation> {
    leaves.iter().map(|l| l.location().clone()).collect()
}

#[rstest]
#[case(1, 1)]
#[case(3, 3)]
#[case(4, 4)]
#[case(5, 4)]
fn given_cluster_when_choosing_ensemble_then_spreads_over_racks(
    settings: Settings,
    #[case] size: usize,
    #[case] distinct_racks: usize,
) {
    let topology = Arc::new(NetworkTopology::new());
    MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();
    let placement = PlacementService::new(topology);

    let ensemble = placement.new_ensemble(size, &[]).unwrap();

    assert_eq!(ensemble.len(), size);
    assert_eq!(ensemble.iter().collect::<HashSet<_>>().len(), size);
    assert_eq!(racks_of(&ensemble).len(), distinct_racks);
}

#[rstest]
fn given_excluded_nodes_when_choosing_then_never_picks_them(settings: Settings) {
    let topology = Arc::new(NetworkTopology::new());
    let membership = MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();
    let excluded = vec![
        membership.member("b1:3181").unwrap(),
        membership.member("b2:3181").unwrap(),
    ];
    let placement = PlacementService::new(topology);

    let ensemble = placement.new_ensemble(3, &excluded).unwrap();

    assert!(ensemble.iter().all(|l| !excluded.contains(l)));
    assert!(matches!(
        placement.new_ensemble(4, &excluded),
        Err(ApplicationError::NotEnoughNodes {
            requested: 4,
            available: 3
        })
    ));
}

#[rstest]
fn given_failed_member_when_replacing_then_avoids_remaining_racks(settings: Settings) {
    let topology = Arc::new(NetworkTopology::new());
    let membership = MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();
    let ensemble = vec![
        membership.member("b1:3181").unwrap(),
        membership.member("b3:3181").unwrap(),
        membership.member("b4:3181").unwrap(),
    ];
    let placement = PlacementService::new(topology);

    let replacement = placement.replace_node(&ensemble, &ensemble[1]).unwrap();

    // b2 shares /rack1 with a remaining member, b5 sits on an unused rack
    assert_eq!(replacement.location().as_str(), "/default-rack");
}

#[rstest]
fn given_non_member_when_replacing_then_returns_unknown_node(settings: Settings) {
    let topology = Arc::new(NetworkTopology::new());
    MembershipService::bootstrap(Arc::clone(&topology), &settings).unwrap();
    let placement = PlacementService::new(topology);
    let stranger = Leaf::new("stranger", "/rack9").unwrap();

    assert!(matches!(
        placement.replace_node(&[], &stranger),
        Err(ApplicationError::UnknownNode(_))
    ));
}
