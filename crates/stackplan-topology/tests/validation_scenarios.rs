//! Integration tests validating complete deployment plans.
//!
//! Plans are loaded from JSON fixtures in the planner's document format and
//! run through allocation, editing and validation end to end.

use std::fs;
use std::path::PathBuf;

use stackplan_core::config::NetworkConfig;
use stackplan_core::ids::SequentialIds;
use stackplan_core::model::{DeploymentPlan, InterfaceSlot, NodeType, Role};
use stackplan_topology::{validate, Action, AppState, NodeEditor, Rule, Severity, ValidationReport};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load and parse a plan fixture.
fn load_plan(name: &str) -> DeploymentPlan {
    let fixture_path = fixtures_dir().join(name);
    let json_data = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read plan fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    DeploymentPlan::from_json(&json_data)
        .unwrap_or_else(|e| panic!("Failed to parse plan fixture {name}: {e}"))
}

fn failing_rules(report: &ValidationReport) -> Vec<Rule> {
    report.failures().map(|d| d.rule).collect()
}

#[test]
fn test_sample_plan_is_valid() {
    let plan = load_plan("sample_plan.json");
    assert_eq!(plan.nodes.len(), 4);

    let report = validate(&plan.nodes, &plan.network_config);
    assert!(report.is_valid, "{:#?}", report.details());
    assert_eq!(report.message, "Configuration validation passed!");

    let details = report.details();
    assert!(details.contains(&"172.16.100.0/24 is a valid management CIDR subnet address."));
    assert!(details.contains(&"172.16.100.11 is a valid management IP for controller01."));
    assert!(details.contains(&"192.168.100.41 is a valid tunnel IP for storage01."));
    assert!(details.contains(&"10.100.0.1 is a valid external gateway IP."));
    assert!(details.contains(
        &"All required roles (controller, network, compute, storage) are present in the deployment."
    ));
    assert!(details.contains(&"External interface for floating IPs is available on: network01."));
}

#[test]
fn test_sample_plan_matches_default_state() {
    let plan = load_plan("sample_plan.json");
    let state = AppState::default();
    assert_eq!(plan.nodes, state.nodes);
    assert_eq!(plan.network_config, state.network_config);
}

#[test]
fn test_hyperconverged_plan_is_valid() {
    let plan = load_plan("hyperconverged_plan.json");
    let report = validate(&plan.nodes, &plan.network_config);

    assert!(report.is_valid, "{:#?}", report.details());
    assert!(plan.network_config.vip_external_ip.is_none());

    let advisories: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Info)
        .collect();
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].node.as_deref(), Some("hybrid03"));
    assert_eq!(advisories[0].rule, Rule::StorageDisksMissing);
}

#[test]
fn test_broken_plan_reports_every_problem() {
    let plan = load_plan("broken_plan.json");
    let report = validate(&plan.nodes, &plan.network_config);

    assert!(!report.is_valid);
    assert_eq!(report.message, "Configuration validation failed!");

    let rules = failing_rules(&report);
    for expected in [
        Rule::RequiredFields,
        Rule::UniqueInterfaceNames,
        Rule::DuplicateManagementIp,
        Rule::ManagementIp,
        Rule::TunnelForbidden,
        Rule::TunnelRequired,
        Rule::ExternalForbidden,
        Rule::VipExternalNameConflict,
        Rule::VipExternalStaticIp,
        Rule::ExternalRangeOrder,
        Rule::RoleCoverage,
        Rule::HybridRoles,
        Rule::FloatingIpInterface,
    ] {
        assert!(rules.contains(&expected), "missing failure for {expected:?}");
    }
    assert!(!rules.contains(&Rule::ControllerPresent));
    assert_eq!(
        rules
            .iter()
            .filter(|rule| **rule == Rule::UniqueInterfaceNames)
            .count(),
        2
    );

    let details = report.details();
    assert!(details.contains(&"Node unnamed has missing required fields."));
    assert!(details.contains(&"Duplicate management IP: 172.16.100.11"));
    assert!(details.contains(&"172.16.200.51 is an invalid management IP for hybrid01."));
    assert!(details.contains(&"Missing required roles in deployment: storage"));
    assert!(details.contains(&"Hybrid node hybrid01 must have at least one role selected."));
}

#[test]
fn test_controller_and_compute_only_lists_missing_roles() {
    let mut plan = load_plan("sample_plan.json");
    plan.nodes
        .retain(|node| matches!(node.node_type, NodeType::Controller | NodeType::Compute));

    let report = validate(&plan.nodes, &plan.network_config);
    assert!(!report.is_valid);

    let coverage: Vec<_> = report.by_rule(Rule::RoleCoverage).collect();
    assert_eq!(coverage.len(), 1);
    assert_eq!(
        coverage[0].message,
        "Missing required roles in deployment: network, storage"
    );
}

#[test]
fn test_tunnel_ip_outside_tunnel_network() {
    let mut plan = load_plan("sample_plan.json");
    plan.nodes[2]
        .tunnel_nic
        .as_mut()
        .expect("compute01 has a tunnel interface")
        .ip = "10.9.9.9".to_string();

    let report = validate(&plan.nodes, &plan.network_config);
    assert!(!report.is_valid);

    let failures: Vec<_> = report
        .failures()
        .map(|d| (d.rule, d.message.as_str()))
        .collect();
    assert_eq!(
        failures,
        vec![(Rule::TunnelIp, "10.9.9.9 is an invalid tunnel IP for compute01.")]
    );
    assert_eq!(
        report.for_node("compute01").next().map(|d| d.rule),
        Some(Rule::ManagementIp)
    );
}

#[test]
fn test_floating_range_outside_external_network() {
    let mut plan = load_plan("sample_plan.json");
    plan.network_config.ext_start_ip = "10.101.0.50".to_string();
    plan.network_config.ext_end_ip = "10.100.1.200".to_string();

    let report = validate(&plan.nodes, &plan.network_config);
    assert!(!report.is_valid);
    assert_eq!(
        failing_rules(&report),
        vec![Rule::ExternalStartIp, Rule::ExternalEndIp]
    );

    let details = report.details();
    assert!(details.contains(&"10.100.0.1 is a valid external gateway IP."));
    assert!(details.contains(&"10.101.0.50 is an invalid external start IP."));
    assert!(details.contains(&"10.100.1.200 is an invalid external end IP."));
}

#[test]
fn test_empty_deployment_lists_every_role() {
    let report = validate(&[], &NetworkConfig::default());
    assert!(!report.is_valid);

    assert_eq!(
        failing_rules(&report),
        vec![
            Rule::ControllerPresent,
            Rule::RoleCoverage,
            Rule::FloatingIpInterface
        ]
    );
    assert!(report
        .details()
        .contains(&"Missing required roles in deployment: controller, network, compute, storage"));
    assert!(report.details().contains(
        &"At least one network node (or hybrid node with network role) must have an external interface for floating IP access."
    ));
}

#[test]
fn test_adding_external_interface_restores_floating_ips() {
    let mut plan = load_plan("sample_plan.json");
    plan.nodes[1].external_nic = None;

    let report = validate(&plan.nodes, &plan.network_config);
    assert!(failing_rules(&report).contains(&Rule::FloatingIpInterface));

    let ids = SequentialIds::starting_after(100);
    let updated = NodeEditor::new(&plan.nodes, &plan.network_config, &ids)
        .set_interface("2", InterfaceSlot::External, "ens5", "")
        .expect("network node may carry an external interface");
    let state = AppState::from_plan(plan)
        .apply(Action::UpdateNode {
            id: "2".to_string(),
            node: updated,
        })
        .validated();

    let report = state.validation.expect("validation stored");
    assert!(report.is_valid, "{:#?}", report.details());
    assert!(report
        .details()
        .contains(&"External interface for floating IPs is available on: network01."));
}

#[test]
fn test_growing_the_sample_deployment_stays_valid() {
    let mut state = AppState::default();
    let ids = SequentialIds::starting_after(100);

    for node_type in [NodeType::Compute, NodeType::Compute, NodeType::Storage] {
        let node =
            NodeEditor::new(&state.nodes, &state.network_config, &ids).create_node(node_type);
        state = state.apply(Action::AddNode(node));
    }

    let hostnames: Vec<_> = state.nodes.iter().map(|n| n.hostname.as_str()).collect();
    assert_eq!(
        hostnames,
        vec![
            "controller01",
            "network01",
            "compute01",
            "storage01",
            "compute02",
            "compute03",
            "storage02"
        ]
    );

    let state = state.validated();
    let report = state.validation.as_ref().expect("validation stored");
    assert!(report.is_valid, "{:#?}", report.details());
}

#[test]
fn test_converting_to_hyperconverged_node() {
    let state = AppState::default();
    let ids = SequentialIds::starting_after(100);
    let editor = NodeEditor::new(&state.nodes, &state.network_config, &ids);

    let node = editor.change_type("4", NodeType::Hybrid).unwrap();
    assert!(node.tunnel_nic.is_none());
    assert!(node.storage_disks.is_empty());

    let state = state.apply(Action::UpdateNode {
        id: "4".to_string(),
        node,
    });
    let editor = NodeEditor::new(&state.nodes, &state.network_config, &ids);
    let node = editor.set_hybrid_role("4", Role::Storage, true).unwrap();
    assert_eq!(node.tunnel_ip(), Some("192.168.100.51"));
    assert_eq!(node.storage_disks.len(), 1);

    let state = state
        .apply(Action::UpdateNode {
            id: "4".to_string(),
            node,
        })
        .validated();
    let report = state.validation.expect("validation stored");
    assert!(report.is_valid, "{:#?}", report.details());
}
