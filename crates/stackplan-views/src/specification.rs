//! Hardware sizing summary for a planned deployment.

use std::fmt;

use serde::{Deserialize, Serialize};
use stackplan_core::config::NetworkConfig;
use stackplan_core::model::{HybridRoles, Node, NodeType, Role};
use tracing::debug;

/// Deployments with fewer cores than this get a performance hint.
pub const MIN_RECOMMENDED_CPU_CORES: u32 = 16;

/// Compute nodes above which dedicated network nodes are suggested.
pub const LARGE_DEPLOYMENT_COMPUTE_NODES: usize = 5;

/// Size assumed for each configured Cinder disk.
const CINDER_DISK_GB: u32 = 80;

/// One disk line of a node specification, e.g. `200GB+ (Block storage)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    /// Size in GB
    pub size_gb: u32,
    /// The size is a lower bound
    pub at_least: bool,
    /// What the disk is for
    pub purpose: String,
}

impl DiskSpec {
    fn exact(size_gb: u32, purpose: impl Into<String>) -> Self {
        Self {
            size_gb,
            at_least: false,
            purpose: purpose.into(),
        }
    }

    fn minimum(size_gb: u32, purpose: impl Into<String>) -> Self {
        Self {
            size_gb,
            at_least: true,
            purpose: purpose.into(),
        }
    }
}

impl fmt::Display for DiskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plus = if self.at_least { "+" } else { "" };
        write!(f, "{}GB{plus} ({})", self.size_gb, self.purpose)
    }
}

/// Recommended hardware for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpecification {
    /// Hostname
    pub name: String,
    /// CPU cores
    pub cpu_cores: u32,
    /// Memory in GB
    pub ram_gb: u32,
    /// Disks, OS disk first
    pub storage: Vec<DiskSpec>,
    /// Populated interface slots
    pub network_interfaces: u32,
    /// What the node is for
    pub description: String,
}

/// Sizing for the whole deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSpecification {
    /// Per node sizing, in node order
    pub nodes: Vec<NodeSpecification>,
    /// Sum of CPU cores
    pub total_cpu_cores: u32,
    /// Sum of memory in GB
    pub total_ram_gb: u32,
    /// Sum of OS disk sizes in GB
    pub total_storage_gb: u32,
    /// Networks and addresses the site must provide
    pub network_requirements: Vec<String>,
    /// Deployment advice
    pub recommendations: Vec<String>,
}

struct BaseSpec {
    cpu_cores: u32,
    ram_gb: u32,
    storage: Vec<DiskSpec>,
    description: &'static str,
}

fn base_spec(node_type: NodeType) -> BaseSpec {
    match node_type {
        NodeType::Controller => BaseSpec {
            cpu_cores: 6,
            ram_gb: 16,
            storage: vec![DiskSpec::exact(80, "OS")],
            description: "Controller node for OpenStack management services",
        },
        NodeType::Network => BaseSpec {
            cpu_cores: 4,
            ram_gb: 10,
            storage: vec![DiskSpec::exact(80, "OS")],
            description: "Network node for Neutron networking services",
        },
        NodeType::Compute => BaseSpec {
            cpu_cores: 6,
            ram_gb: 16,
            storage: vec![
                DiskSpec::exact(100, "OS"),
                DiskSpec::exact(80, "Cinder storage"),
            ],
            description: "Compute node for hosting virtual machines",
        },
        NodeType::Storage => BaseSpec {
            cpu_cores: 4,
            ram_gb: 8,
            storage: vec![
                DiskSpec::exact(80, "OS"),
                DiskSpec::minimum(200, "Block storage"),
            ],
            description: "Dedicated storage node for Cinder volumes",
        },
        NodeType::Hybrid => BaseSpec {
            cpu_cores: 8,
            ram_gb: 24,
            storage: vec![
                DiskSpec::exact(120, "OS"),
                DiskSpec::exact(100, "Storage"),
            ],
            description: "Multi-role node combining multiple services",
        },
    }
}

/// Per role additions on top of a 2 core / 4 GB hybrid base.
const fn hybrid_increment(role: Role) -> (u32, u32) {
    match role {
        Role::Controller => (4, 12),
        Role::Network => (2, 6),
        Role::Compute => (4, 12),
        Role::Storage => (2, 4),
    }
}

fn hybrid_spec(roles: HybridRoles) -> BaseSpec {
    let enabled = roles.enabled();
    let (cpu_cores, ram_gb) = enabled
        .iter()
        .map(|role| hybrid_increment(*role))
        .fold((2, 4), |(cpu, ram), (c, r)| (cpu + c, ram + r));

    let mut storage = vec![DiskSpec::exact(100, "OS")];
    if roles.compute || roles.storage {
        storage.push(DiskSpec::exact(80, "Cinder storage"));
    }

    BaseSpec {
        cpu_cores,
        ram_gb,
        storage,
        description: "",
    }
}

/// Sizing for a single node.
#[must_use]
pub fn node_specification(node: &Node) -> NodeSpecification {
    let (spec, description) = match (node.node_type, node.hybrid_roles) {
        (NodeType::Hybrid, Some(roles)) => {
            let names: Vec<&str> = roles.enabled().iter().map(Role::name).collect();
            (
                hybrid_spec(roles),
                format!("Hybrid node: {}", names.join(", ")),
            )
        }
        (node_type, _) => {
            let spec = base_spec(node_type);
            let description = spec.description.to_string();
            (spec, description)
        }
    };

    let mut storage = spec.storage;
    if !node.storage_disks.is_empty() {
        storage.truncate(1);
        storage.extend(
            node.storage_disks
                .iter()
                .map(|disk| DiskSpec::exact(CINDER_DISK_GB, disk.volume_group.clone())),
        );
    }

    NodeSpecification {
        name: node.hostname.clone(),
        cpu_cores: spec.cpu_cores,
        ram_gb: spec.ram_gb,
        storage,
        network_interfaces: u32::try_from(node.interfaces().count()).unwrap_or(u32::MAX),
        description,
    }
}

/// Sizing, network requirements and recommendations for a deployment.
#[must_use]
pub fn system_specification(nodes: &[Node], config: &NetworkConfig) -> SystemSpecification {
    let specs: Vec<NodeSpecification> = nodes.iter().map(node_specification).collect();

    let total_cpu_cores: u32 = specs.iter().map(|s| s.cpu_cores).sum();
    let total_ram_gb: u32 = specs.iter().map(|s| s.ram_gb).sum();
    let total_storage_gb: u32 = specs
        .iter()
        .filter_map(|s| s.storage.first())
        .map(|disk| disk.size_gb)
        .sum();

    debug!(
        nodes = specs.len(),
        total_cpu_cores, total_ram_gb, total_storage_gb, "computed system specification"
    );

    SystemSpecification {
        nodes: specs,
        total_cpu_cores,
        total_ram_gb,
        total_storage_gb,
        network_requirements: network_requirements(nodes, config),
        recommendations: recommendations(nodes, config, total_cpu_cores),
    }
}

fn count_with_role(nodes: &[Node], role: Role) -> usize {
    nodes.iter().filter(|node| node.has_role(role)).count()
}

/// Networks and addresses the site must provide.
#[must_use]
pub fn network_requirements(nodes: &[Node], config: &NetworkConfig) -> Vec<String> {
    let mut requirements = vec![
        format!("Management Network: {}", config.management_cidr),
        format!("Internal VIP Address: {}", config.kolla_int_vip_addr),
    ];

    if !config.tunnel_cidr.is_empty() {
        requirements.push(format!("Tunnel Network: {}", config.tunnel_cidr));
    }

    if !config.external_cidr.is_empty() {
        requirements.push(format!("External Network: {}", config.external_cidr));
        requirements.push(format!(
            "External IP Range: {} - {}",
            config.ext_start_ip, config.ext_end_ip
        ));
        if let Ok(pool) = config.floating_ip_pool() {
            let size = u64::from(u32::from(*pool.end()))
                .checked_sub(u64::from(u32::from(*pool.start())))
                .map_or(0, |span| span + 1);
            requirements.push(format!("Floating IP Pool Size: {size} addresses"));
        }
        requirements.push(format!("External Gateway: {}", config.ext_gateway_ip));
    }

    if let Some(vip) = config.vip_external_ip.as_deref().filter(|ip| !ip.is_empty()) {
        requirements.push(format!("External VIP: {vip}"));
    }

    let nics = if count_with_role(nodes, Role::Network) > 0 {
        "2-3"
    } else {
        "2"
    };
    requirements.push(format!("Required NICs per node: {nics}"));

    requirements
}

fn recommendations(nodes: &[Node], config: &NetworkConfig, total_cpu_cores: u32) -> Vec<String> {
    let mut advice: Vec<String> = [
        "Use Debian 12 (Bookworm) with latest kernel for Kolla-Ansible 2025.1 compatibility",
        "Ensure all hosts have synchronized time (chrony/NTP service)",
        "Configure SSH key-based authentication between all nodes",
        "Use dedicated physical networks for management and tunnel traffic when possible",
        "Allocate at least 20% extra disk space beyond minimum requirements",
        "Enable container runtime (Docker) on all nodes before deployment",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    if count_with_role(nodes, Role::Controller) == 1 {
        advice.push(
            "Single controller setup: Consider HA setup for production environments".to_string(),
        );
    }
    if count_with_role(nodes, Role::Compute) > LARGE_DEPLOYMENT_COMPUTE_NODES {
        advice.push(
            "Large deployment: Consider using dedicated network nodes for better performance"
                .to_string(),
        );
    }
    if count_with_role(nodes, Role::Network) == 0 {
        advice.push(
            "No dedicated network node: Network services will run on controller/hybrid nodes"
                .to_string(),
        );
    }

    let holds_volumes = nodes
        .iter()
        .any(|node| node.has_role(Role::Storage) || node.has_role(Role::Compute));
    if holds_volumes {
        advice.push("Storage: Use SSD for OS disks and HDD/SSD for Cinder volumes".to_string());
        advice.push(
            "LVM: Ensure storage disks are not partitioned before creating LVM volumes".to_string(),
        );
    }

    if config.tunnel_cidr.is_empty() {
        advice.push(
            "Network: Consider configuring a dedicated tunnel network for better isolation"
                .to_string(),
        );
    }
    if config.external_cidr.is_empty() {
        advice.push(
            "External Network: Configure external network for floating IP access".to_string(),
        );
    }
    if total_cpu_cores < MIN_RECOMMENDED_CPU_CORES {
        advice.push(
            "Performance: Consider increasing CPU cores for better performance".to_string(),
        );
    }

    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackplan_core::model::{InterfaceSlot, NetworkInterface, StorageDisk};

    fn node(node_type: NodeType, hostname: &str) -> Node {
        Node::new(
            hostname,
            hostname,
            node_type,
            NetworkInterface::new("mn", "ens3", "172.16.100.11"),
        )
    }

    #[test]
    fn test_dedicated_base_specs() {
        let spec = node_specification(&node(NodeType::Controller, "controller01"));
        assert_eq!((spec.cpu_cores, spec.ram_gb), (6, 16));
        assert_eq!(spec.storage[0].to_string(), "80GB (OS)");
        assert_eq!(spec.network_interfaces, 1);

        let spec = node_specification(&node(NodeType::Storage, "storage01"));
        assert_eq!((spec.cpu_cores, spec.ram_gb), (4, 8));
        assert_eq!(spec.storage[1].to_string(), "200GB+ (Block storage)");
    }

    #[test]
    fn test_hybrid_spec_is_computed_from_roles() {
        let hybrid = node(NodeType::Hybrid, "hybrid01").with_hybrid_roles(
            HybridRoles::only(Role::Controller).with(Role::Compute, true),
        );
        let spec = node_specification(&hybrid);
        assert_eq!(spec.cpu_cores, 2 + 4 + 4);
        assert_eq!(spec.ram_gb, 4 + 12 + 12);
        assert_eq!(spec.description, "Hybrid node: controller, compute");
        assert_eq!(
            spec.storage
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["100GB (OS)", "80GB (Cinder storage)"]
        );

        let spec = node_specification(
            &node(NodeType::Hybrid, "hybrid02").with_hybrid_roles(HybridRoles::only(Role::Network)),
        );
        assert_eq!((spec.cpu_cores, spec.ram_gb), (4, 10));
        assert_eq!(spec.storage.len(), 1);
    }

    #[test]
    fn test_hybrid_without_flags_uses_base_spec() {
        let spec = node_specification(&node(NodeType::Hybrid, "hybrid01"));
        assert_eq!((spec.cpu_cores, spec.ram_gb), (8, 24));
    }

    #[test]
    fn test_configured_disks_replace_secondary_storage() {
        let storage = node(NodeType::Storage, "storage01")
            .with_interface(
                InterfaceSlot::Tunnel,
                NetworkInterface::new("tn", "ens4", "192.168.100.41"),
            )
            .with_disk(StorageDisk::new("sd1", "/dev/sdb", "cinder-volumes"))
            .with_disk(StorageDisk::new("sd2", "/dev/sdc", "cinder-volumes"));
        let spec = node_specification(&storage);

        assert_eq!(
            spec.storage
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["80GB (OS)", "80GB (cinder-volumes)", "80GB (cinder-volumes)"]
        );
        assert_eq!(spec.network_interfaces, 2);
    }

    #[test]
    fn test_totals_and_requirements() {
        let nodes = vec![
            node(NodeType::Controller, "controller01"),
            node(NodeType::Compute, "compute01"),
        ];
        let spec = system_specification(&nodes, &NetworkConfig::default());

        assert_eq!(spec.total_cpu_cores, 12);
        assert_eq!(spec.total_ram_gb, 32);
        assert_eq!(spec.total_storage_gb, 180);
        assert_eq!(
            spec.network_requirements,
            vec![
                "Management Network: 172.16.100.0/24",
                "Internal VIP Address: 172.16.100.254",
                "Tunnel Network: 192.168.100.0/24",
                "External Network: 10.100.0.0/24",
                "External IP Range: 10.100.0.50 - 10.100.0.200",
                "Floating IP Pool Size: 151 addresses",
                "External Gateway: 10.100.0.1",
                "External VIP: 10.100.0.254",
                "Required NICs per node: 2",
            ]
        );
    }

    #[test]
    fn test_floating_pool_size_follows_external_range() {
        let nodes = vec![node(NodeType::Controller, "controller01")];

        let reversed = NetworkConfig::default().with_external_range(
            "10.100.0.1",
            "10.100.0.200",
            "10.100.0.50",
        );
        let spec = system_specification(&nodes, &reversed);
        assert!(spec
            .network_requirements
            .contains(&"Floating IP Pool Size: 0 addresses".to_string()));

        let malformed =
            NetworkConfig::default().with_external_range("10.100.0.1", "10.100.0.50", "bogus");
        let spec = system_specification(&nodes, &malformed);
        assert!(spec
            .network_requirements
            .contains(&"External IP Range: 10.100.0.50 - bogus".to_string()));
        assert!(!spec
            .network_requirements
            .iter()
            .any(|r| r.starts_with("Floating IP Pool Size")));
    }

    #[test]
    fn test_recommendations() {
        let nodes = vec![
            node(NodeType::Controller, "controller01"),
            node(NodeType::Compute, "compute01"),
        ];
        let advice = system_specification(&nodes, &NetworkConfig::default()).recommendations;

        assert_eq!(advice.len(), 6 + 5);
        assert!(advice.iter().any(|a| a.starts_with("Single controller setup")));
        assert!(advice.iter().any(|a| a.starts_with("No dedicated network node")));
        assert!(advice.iter().any(|a| a.starts_with("LVM:")));
        assert!(advice.iter().any(|a| a.starts_with("Performance:")));
    }

    #[test]
    fn test_large_deployment_recommendation() {
        let mut nodes = vec![
            node(NodeType::Controller, "controller01"),
            node(NodeType::Controller, "controller02"),
            node(NodeType::Network, "network01"),
        ];
        for i in 1..=6 {
            nodes.push(node(NodeType::Compute, &format!("compute{i:02}")));
        }
        let config = NetworkConfig {
            tunnel_cidr: String::new(),
            ..NetworkConfig::default()
        };
        let spec = system_specification(&nodes, &config);

        assert!(spec
            .recommendations
            .iter()
            .any(|a| a.starts_with("Large deployment")));
        assert!(spec
            .recommendations
            .iter()
            .any(|a| a.starts_with("Network: Consider configuring a dedicated tunnel network")));
        assert!(!spec
            .recommendations
            .iter()
            .any(|a| a.starts_with("Single controller") || a.starts_with("Performance:")));
        assert!(spec
            .network_requirements
            .contains(&"Required NICs per node: 2-3".to_string()));
        assert!(!spec
            .network_requirements
            .iter()
            .any(|r| r.starts_with("Tunnel Network")));
    }
}
