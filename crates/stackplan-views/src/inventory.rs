//! Kolla-Ansible deployment files rendered from a plan.
//!
//! Produces the multinode inventory, the `globals.yml` settings and the LVM
//! commands that prepare Cinder volume groups. Group membership follows each
//! node's effective roles, so hybrid nodes appear in every group they serve.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use stackplan_core::config::{AllocationPolicy, NetworkConfig};
use stackplan_core::model::{Node, NodeType, Role};
use stackplan_topology::constraints;
use tracing::debug;

/// Inventory groups, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryGroup {
    /// Control plane hosts
    Control,
    /// Neutron network hosts
    Network,
    /// Hypervisors
    Compute,
    /// Monitoring host
    Monitoring,
    /// Cinder volume hosts
    Storage,
}

impl InventoryGroup {
    /// Every group in file order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Control,
            Self::Network,
            Self::Compute,
            Self::Monitoring,
            Self::Storage,
        ]
    }

    /// Section name without brackets.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Monitoring => "monitoring",
            Self::Storage => "storage",
        }
    }
}

/// One host line: hostname followed by `key=value` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryHost {
    /// Inventory hostname
    pub hostname: String,
    /// Host variables in output order
    pub variables: Vec<(String, String)>,
}

impl InventoryHost {
    fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            variables: Vec::new(),
        }
    }

    fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.variables.push((key.to_string(), value.into()));
        self
    }
}

impl fmt::Display for InventoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hostname)?;
        for (key, value) in &self.variables {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// A multinode inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    groups: BTreeMap<InventoryGroup, Vec<InventoryHost>>,
}

impl Inventory {
    /// Hosts of a group, empty if none.
    #[must_use]
    pub fn hosts(&self, group: InventoryGroup) -> &[InventoryHost] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hostnames of a group.
    #[must_use]
    pub fn hostnames(&self, group: InventoryGroup) -> Vec<&str> {
        self.hosts(group)
            .iter()
            .map(|host| host.hostname.as_str())
            .collect()
    }

    fn push(&mut self, group: InventoryGroup, host: InventoryHost) {
        self.groups.entry(group).or_default().push(host);
    }

    /// The inventory as file lines. Groups are separated by a blank line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (index, group) in InventoryGroup::all().iter().enumerate() {
            if index > 0 {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", group.name()));
            lines.extend(self.hosts(*group).iter().map(ToString::to_string));
        }
        lines
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

fn tunnel_name<'a>(node: &'a Node, policy: &'a AllocationPolicy) -> &'a str {
    node.tunnel_nic
        .as_ref()
        .filter(|nic| !nic.name.is_empty())
        .map_or(policy.tunnel_interface.as_str(), |nic| nic.name.as_str())
}

/// Build the multinode inventory for `nodes`.
///
/// Dedicated controllers run playbooks locally; the first controller also
/// hosts monitoring. Nodes without a tunnel interface name fall back to the
/// policy's default tunnel interface.
#[must_use]
pub fn multinode_inventory(nodes: &[Node], policy: &AllocationPolicy) -> Inventory {
    let mut inventory = Inventory::default();

    for node in nodes {
        let management = node.management_nic.name.as_str();

        if node.has_role(Role::Controller) {
            let mut host = InventoryHost::new(&node.hostname);
            if node.node_type == NodeType::Controller {
                host = host.var("ansible_connection", "local");
            }
            inventory.push(
                InventoryGroup::Control,
                host.var("network_interface", management),
            );
        }

        if node.has_role(Role::Network) {
            let mut host = InventoryHost::new(&node.hostname)
                .var("network_interface", management)
                .var("tunnel_interface", tunnel_name(node, policy));
            if let Some(external) = &node.external_nic {
                host = host.var("neutron_external_interface", external.name.as_str());
            }
            inventory.push(InventoryGroup::Network, host);
        }

        if node.has_role(Role::Compute) {
            inventory.push(
                InventoryGroup::Compute,
                InventoryHost::new(&node.hostname)
                    .var("network_interface", management)
                    .var("tunnel_interface", tunnel_name(node, policy)),
            );
        }

        if node.has_role(Role::Storage) {
            inventory.push(
                InventoryGroup::Storage,
                InventoryHost::new(&node.hostname).var("network_interface", management),
            );
        }
    }

    if let Some(first) = nodes.iter().find(|node| node.has_role(Role::Controller)) {
        inventory.push(
            InventoryGroup::Monitoring,
            InventoryHost::new(&first.hostname)
                .var("ansible_connection", "local")
                .var("network_interface", first.management_nic.name.as_str()),
        );
    }

    debug!(
        control = inventory.hosts(InventoryGroup::Control).len(),
        network = inventory.hosts(InventoryGroup::Network).len(),
        compute = inventory.hosts(InventoryGroup::Compute).len(),
        storage = inventory.hosts(InventoryGroup::Storage).len(),
        "built multinode inventory"
    );
    inventory
}

/// `globals.yml` settings for the deployment.
///
/// The external VIP line is only emitted when an external VIP is configured.
#[must_use]
pub fn globals_yml(config: &NetworkConfig, policy: &AllocationPolicy) -> Vec<String> {
    let mut lines: Vec<String> = vec![
        "workaround_ansible_issue_8743: yes".to_string(),
        "config_strategy: \"COPY_ALWAYS\"".to_string(),
        "kolla_base_distro: \"debian\"".to_string(),
        "openstack_release: \"2025.1\"".to_string(),
        format!("kolla_internal_vip_address: \"{}\"", config.kolla_int_vip_addr),
        "kolla_container_engine: docker".to_string(),
        "network_address_family: \"ipv4\"".to_string(),
        "neutron_plugin_agent: \"openvswitch\"".to_string(),
    ];

    lines.extend(
        [
            "enable_openstack_core: \"yes\"",
            "enable_glance: \"{{ enable_openstack_core | bool }}\"",
            "enable_haproxy: \"yes\"",
            "enable_keepalived: \"{{ enable_haproxy | bool }}\"",
            "enable_keystone: \"{{ enable_openstack_core | bool }}\"",
            "enable_mariadb: \"yes\"",
            "enable_memcached: \"yes\"",
            "enable_neutron: \"{{ enable_openstack_core | bool }}\"",
            "enable_nova: \"{{ enable_openstack_core | bool }}\"",
            "enable_rabbitmq: \"{{ 'yes' if om_rpc_transport == 'rabbit' or om_notify_transport == 'rabbit' else 'no' }}\"",
            "enable_cinder: \"yes\"",
            "enable_cinder_backend_lvm: \"yes\"",
            "enable_etcd: \"yes\"",
            "enable_horizon: \"{{ enable_openstack_core | bool }}\"",
            "enable_placement: \"{{ enable_nova | bool or enable_zun | bool }}\"",
            "glance_backend_file: \"yes\"",
        ]
        .into_iter()
        .map(str::to_string),
    );
    lines.push(format!("cinder_volume_group: \"{}\"", policy.volume_group));

    if let Some(vip) = config.vip_external_ip.as_deref().filter(|ip| !ip.is_empty()) {
        lines.push(format!("kolla_external_vip_address: \"{vip}\""));
    }

    lines
}

/// Shell commands that prepare the volume groups of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LvmSetup {
    /// Node id
    pub node_id: String,
    /// Hostname the commands run on
    pub hostname: String,
    /// Type label, with roles for hybrid nodes
    pub node_type: String,
    /// Commands in execution order
    pub commands: Vec<String>,
}

/// LVM setup for every node with a storage role and configured disks.
///
/// Each disk becomes a physical volume; each distinct volume group is
/// created once over all of the node's disks assigned to it.
#[must_use]
pub fn lvm_setup(nodes: &[Node]) -> Vec<LvmSetup> {
    nodes
        .iter()
        .filter(|node| constraints::can_have_storage_disks(node) && !node.storage_disks.is_empty())
        .map(|node| {
            let mut commands = vec!["sudo apt install lvm2 thin-provisioning-tools".to_string()];
            commands.extend(
                node.storage_disks
                    .iter()
                    .map(|disk| format!("sudo pvcreate {}", disk.name)),
            );

            let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
            for disk in &node.storage_disks {
                match groups.iter_mut().find(|(vg, _)| *vg == disk.volume_group) {
                    Some((_, devices)) => devices.push(disk.name.as_str()),
                    None => groups.push((disk.volume_group.as_str(), vec![disk.name.as_str()])),
                }
            }
            commands.extend(
                groups
                    .into_iter()
                    .map(|(vg, devices)| format!("sudo vgcreate {vg} {}", devices.join(" "))),
            );
            commands.push("sudo vgs".to_string());

            debug!(
                hostname = %node.hostname,
                disks = node.storage_disks.len(),
                "rendered LVM setup"
            );
            LvmSetup {
                node_id: node.id.clone(),
                hostname: node.hostname.clone(),
                node_type: node.type_label(),
                commands,
            }
        })
        .collect()
}
