//! Whole-deployment validation.
//!
//! [`validate`] is a single exhaustive pass over the network configuration
//! and every node. It never fails and never stops early: each check appends
//! a [`Diagnostic`] and the report is valid only if no diagnostic has
//! [`Severity::Fail`]. Diagnostic messages are stable sentences that UIs may
//! display verbatim.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use stackplan_core::address::{check_ip_in_subnet, is_valid_cidr, SubnetMembership};
use stackplan_core::config::NetworkConfig;
use stackplan_core::model::{Node, NodeType, Role, RoleSet};
use tracing::{debug, info};

use crate::constraints::{self, ConstraintViolation};

/// Message of a passing report.
pub const PASSED_MESSAGE: &str = "Configuration validation passed!";
/// Message of a failing report.
pub const FAILED_MESSAGE: &str = "Configuration validation failed!";

/// Outcome class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A check passed
    Pass,
    /// A check failed; the report is invalid
    Fail,
    /// Advisory only; does not affect validity
    Info,
}

/// The check that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Management CIDR format
    ManagementCidr,
    /// Tunnel CIDR format
    TunnelCidr,
    /// External CIDR format
    ExternalCidr,
    /// Hostname and management interface name present
    RequiredFields,
    /// Hostnames unique across nodes
    DuplicateHostname,
    /// Interface names unique within a node
    UniqueInterfaceNames,
    /// Management address inside the management CIDR
    ManagementIp,
    /// Management address unique across nodes
    DuplicateManagementIp,
    /// Tunnel address inside the tunnel CIDR
    TunnelIp,
    /// Tunnel address unique across nodes
    DuplicateTunnelIp,
    /// Tunnel interface present where the roles forbid it
    TunnelForbidden,
    /// Tunnel address missing where the roles require it
    TunnelRequired,
    /// External interface without the network role
    ExternalForbidden,
    /// VIP external interface without the controller role
    VipExternalForbidden,
    /// Storage disks without the storage role
    StorageDisksForbidden,
    /// Storage role without disks
    StorageDisksMissing,
    /// External and VIP external interfaces share a name
    VipExternalNameConflict,
    /// VIP external interface carries an address
    VipExternalStaticIp,
    /// External gateway inside the external CIDR
    ExternalGateway,
    /// Floating range start inside the external CIDR
    ExternalStartIp,
    /// Floating range end inside the external CIDR
    ExternalEndIp,
    /// Floating range start not after its end
    ExternalRangeOrder,
    /// At least one controller
    ControllerPresent,
    /// Every role present
    RoleCoverage,
    /// Hybrid nodes have a role
    HybridRoles,
    /// A network-capable node exposes an external interface
    FloatingIpInterface,
}

/// One line of a validation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Outcome class
    pub severity: Severity,
    /// Hostname of the node concerned, for per-node checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Check that produced the line
    pub rule: Rule,
    /// Human readable sentence
    pub message: String,
}

/// Result of validating a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True when no check failed
    pub is_valid: bool,
    /// Fixed pass/fail summary
    pub message: String,
    /// Every emitted line, in check order
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Messages of every diagnostic, in order.
    #[must_use]
    pub fn details(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    /// Failing diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Fail)
    }

    /// Diagnostics produced by `rule`.
    pub fn by_rule(&self, rule: Rule) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }

    /// Diagnostics concerning the node with `hostname`.
    pub fn for_node<'a>(&'a self, hostname: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.node.as_deref() == Some(hostname))
    }
}

#[derive(Default)]
struct ReportBuilder {
    diagnostics: Vec<Diagnostic>,
}

impl ReportBuilder {
    fn push(&mut self, severity: Severity, rule: Rule, node: Option<&str>, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            node: node.map(str::to_string),
            rule,
            message,
        });
    }

    fn pass(&mut self, rule: Rule, node: Option<&str>, message: String) {
        self.push(Severity::Pass, rule, node, message);
    }

    fn fail(&mut self, rule: Rule, node: Option<&str>, message: String) {
        self.push(Severity::Fail, rule, node, message);
    }

    fn info(&mut self, rule: Rule, node: Option<&str>, message: String) {
        self.push(Severity::Info, rule, node, message);
    }

    fn check(&mut self, ok: bool, rule: Rule, node: Option<&str>, pass: String, fail: String) {
        if ok {
            self.pass(rule, node, pass);
        } else {
            self.fail(rule, node, fail);
        }
    }

    fn finish(self) -> ValidationReport {
        let is_valid = !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Fail);
        ValidationReport {
            is_valid,
            message: if is_valid {
                PASSED_MESSAGE
            } else {
                FAILED_MESSAGE
            }
            .to_string(),
            diagnostics: self.diagnostics,
        }
    }
}

/// Addresses already claimed on one network during a pass.
struct AddressBook {
    network: &'static str,
    cidr: String,
    seen: HashSet<u32>,
    rule: Rule,
    duplicate_rule: Rule,
}

impl AddressBook {
    fn new(network: &'static str, cidr: &str, rule: Rule, duplicate_rule: Rule) -> Self {
        Self {
            network,
            cidr: cidr.to_string(),
            seen: HashSet::new(),
            rule,
            duplicate_rule,
        }
    }

    fn claim(&mut self, report: &mut ReportBuilder, hostname: &str, ip: &str) {
        let network = self.network;
        match check_ip_in_subnet(ip, &self.cidr) {
            SubnetMembership::Member(value) => {
                if self.seen.insert(value) {
                    report.pass(
                        self.rule,
                        Some(hostname),
                        format!("{ip} is a valid {network} IP for {hostname}."),
                    );
                } else {
                    report.fail(
                        self.duplicate_rule,
                        Some(hostname),
                        format!("Duplicate {network} IP: {ip}"),
                    );
                }
            }
            _ => report.fail(
                self.rule,
                Some(hostname),
                format!("{ip} is an invalid {network} IP for {hostname}."),
            ),
        }
    }
}

/// Validate the node set against the network configuration.
#[must_use]
pub fn validate(nodes: &[Node], config: &NetworkConfig) -> ValidationReport {
    debug!(nodes = nodes.len(), "validating deployment");
    let mut report = ReportBuilder::default();

    check_cidrs(&mut report, config);

    let mut management = AddressBook::new(
        "management",
        &config.management_cidr,
        Rule::ManagementIp,
        Rule::DuplicateManagementIp,
    );
    let mut tunnel = AddressBook::new(
        "tunnel",
        &config.tunnel_cidr,
        Rule::TunnelIp,
        Rule::DuplicateTunnelIp,
    );
    let mut hostnames = HashSet::new();
    for node in nodes {
        check_node(&mut report, node, &mut hostnames, &mut management, &mut tunnel);
    }

    check_external_network(&mut report, config);
    check_role_coverage(&mut report, nodes);
    check_hybrid_roles(&mut report, nodes);
    check_floating_ip_interface(&mut report, nodes);

    let report = report.finish();
    info!(
        valid = report.is_valid,
        failures = report.failures().count(),
        "deployment validated"
    );
    report
}

fn check_cidrs(report: &mut ReportBuilder, config: &NetworkConfig) {
    for (name, cidr, rule) in [
        ("management", &config.management_cidr, Rule::ManagementCidr),
        ("tunnel", &config.tunnel_cidr, Rule::TunnelCidr),
        ("external", &config.external_cidr, Rule::ExternalCidr),
    ] {
        report.check(
            is_valid_cidr(cidr),
            rule,
            None,
            format!("{cidr} is a valid {name} CIDR subnet address."),
            format!("{cidr} is an invalid {name} CIDR subnet address."),
        );
    }
}

fn check_node<'a>(
    report: &mut ReportBuilder,
    node: &'a Node,
    hostnames: &mut HashSet<&'a str>,
    management: &mut AddressBook,
    tunnel: &mut AddressBook,
) {
    if node.hostname.is_empty() || node.management_nic.name.is_empty() {
        let name = if node.hostname.is_empty() {
            "unnamed"
        } else {
            node.hostname.as_str()
        };
        report.fail(
            Rule::RequiredFields,
            (!node.hostname.is_empty()).then_some(name),
            format!("Node {name} has missing required fields."),
        );
        return;
    }
    let hostname = node.hostname.as_str();

    if !hostnames.insert(hostname) {
        report.info(
            Rule::DuplicateHostname,
            Some(hostname),
            format!("Hostname {hostname} is used by more than one node."),
        );
    }

    check_interface_names(report, node);

    management.claim(report, hostname, &node.management_nic.ip);
    if let Some(ip) = node.tunnel_ip() {
        tunnel.claim(report, hostname, ip);
    }

    for violation in constraints::violations(node) {
        let (rule, message) = describe_violation(node, violation);
        report.fail(rule, Some(hostname), message);
    }

    if constraints::can_have_storage_disks(node) && node.storage_disks.is_empty() {
        report.info(
            Rule::StorageDisksMissing,
            Some(hostname),
            format!("Node {hostname} has the storage role but no storage disks configured."),
        );
    }

    if let (Some(external), Some(vip)) = (&node.external_nic, &node.vip_external_nic) {
        if external.name == vip.name {
            report.fail(
                Rule::VipExternalNameConflict,
                Some(hostname),
                format!(
                    "External and VIP external interfaces on {hostname} cannot use the same interface name ({}).",
                    vip.name
                ),
            );
        }
    }

    if let Some(vip) = node.vip_external_nic.as_ref().filter(|nic| nic.has_ip()) {
        report.fail(
            Rule::VipExternalStaticIp,
            Some(hostname),
            format!(
                "VIP external interface {} on {hostname} must not have a static IP address.",
                vip.name
            ),
        );
    }
}

fn check_interface_names(report: &mut ReportBuilder, node: &Node) {
    let mut seen = HashSet::new();
    let mut repeated = BTreeSet::new();
    for (_, nic) in node.interfaces() {
        let name = nic.name.as_str();
        if !name.is_empty() && !seen.insert(name) {
            repeated.insert(name);
        }
    }

    for name in repeated {
        report.fail(
            Rule::UniqueInterfaceNames,
            Some(node.hostname.as_str()),
            format!(
                "Interface name {name} is used more than once on {}.",
                node.hostname
            ),
        );
    }
}

fn describe_violation(node: &Node, violation: ConstraintViolation) -> (Rule, String) {
    let hostname = &node.hostname;
    match violation {
        ConstraintViolation::TunnelForbidden => {
            let message = if constraints::is_controller_only_hybrid(node) {
                format!(
                    "Hybrid node {hostname} with only the controller role must not have a tunnel interface."
                )
            } else if node.node_type == NodeType::Hybrid {
                format!("Hybrid node {hostname} without roles must not have a tunnel interface.")
            } else {
                format!(
                    "{} node {hostname} must not have a tunnel interface.",
                    node.node_type.title()
                )
            };
            (Rule::TunnelForbidden, message)
        }
        ConstraintViolation::TunnelRequired => (
            Rule::TunnelRequired,
            format!(
                "{} node {hostname} requires a tunnel IP address.",
                node.node_type.title()
            ),
        ),
        ConstraintViolation::ExternalForbidden => (
            Rule::ExternalForbidden,
            format!(
                "Node {hostname} must not have an external interface; only network nodes or hybrid nodes with the network role may have one."
            ),
        ),
        ConstraintViolation::VipExternalForbidden => (
            Rule::VipExternalForbidden,
            format!(
                "Node {hostname} must not have a VIP external interface; only controller nodes or hybrid nodes with the controller role may have one."
            ),
        ),
        ConstraintViolation::StorageDisksForbidden => (
            Rule::StorageDisksForbidden,
            format!(
                "Node {hostname} must not have storage disks; only storage nodes or hybrid nodes with the storage role may have them."
            ),
        ),
    }
}

fn check_external_network(report: &mut ReportBuilder, config: &NetworkConfig) {
    let cidr = &config.external_cidr;
    let gateway = check_ip_in_subnet(&config.ext_gateway_ip, cidr);
    let start = check_ip_in_subnet(&config.ext_start_ip, cidr);
    let end = check_ip_in_subnet(&config.ext_end_ip, cidr);

    for (ip, membership, label, rule) in [
        (&config.ext_gateway_ip, gateway, "gateway", Rule::ExternalGateway),
        (&config.ext_start_ip, start, "start", Rule::ExternalStartIp),
        (&config.ext_end_ip, end, "end", Rule::ExternalEndIp),
    ] {
        report.check(
            membership.is_member(),
            rule,
            None,
            format!("{ip} is a valid external {label} IP."),
            format!("{ip} is an invalid external {label} IP."),
        );
    }

    if let (Some(start), Some(end)) = (start.value(), end.value()) {
        if start > end {
            report.fail(
                Rule::ExternalRangeOrder,
                None,
                "Start IP must be less than or equal to End IP.".to_string(),
            );
        }
    }
}

fn deployment_roles(nodes: &[Node]) -> RoleSet {
    nodes.iter().flat_map(Node::effective_roles).collect()
}

fn check_role_coverage(report: &mut ReportBuilder, nodes: &[Node]) {
    let present = deployment_roles(nodes);

    if !present.contains(&Role::Controller) {
        report.fail(
            Rule::ControllerPresent,
            None,
            "At least one controller node (or hybrid node with controller role) is required."
                .to_string(),
        );
    }

    let missing: Vec<&str> = Role::all()
        .iter()
        .filter(|role| !present.contains(*role))
        .map(Role::name)
        .collect();
    if missing.is_empty() {
        report.pass(
            Rule::RoleCoverage,
            None,
            "All required roles (controller, network, compute, storage) are present in the deployment."
                .to_string(),
        );
    } else {
        report.fail(
            Rule::RoleCoverage,
            None,
            format!(
                "Missing required roles in deployment: {}",
                missing.join(", ")
            ),
        );
    }
}

fn check_hybrid_roles(report: &mut ReportBuilder, nodes: &[Node]) {
    for node in nodes.iter().filter(|n| n.node_type == NodeType::Hybrid) {
        if !node.hybrid_roles.is_some_and(|roles| roles.any()) {
            report.fail(
                Rule::HybridRoles,
                Some(node.hostname.as_str()),
                format!(
                    "Hybrid node {} must have at least one role selected.",
                    node.hostname
                ),
            );
        }
    }
}

fn check_floating_ip_interface(report: &mut ReportBuilder, nodes: &[Node]) {
    let exposed: Vec<&str> = nodes
        .iter()
        .filter(|node| node.has_role(Role::Network) && node.external_nic.is_some())
        .map(|node| node.hostname.as_str())
        .collect();

    if exposed.is_empty() {
        report.fail(
            Rule::FloatingIpInterface,
            None,
            "At least one network node (or hybrid node with network role) must have an external interface for floating IP access."
                .to_string(),
        );
    } else {
        report.pass(
            Rule::FloatingIpInterface,
            None,
            format!(
                "External interface for floating IPs is available on: {}.",
                exposed.join(", ")
            ),
        );
    }
}
