//! Deterministic hostname and address allocation for new nodes.
//!
//! Each node type owns a block of `slots_per_type` addresses starting at
//! `offset + 1` (controller `.11-.19`, network `.21-.29`, ...). On `/16`
//! networks the block moves into its own third octet
//! (`offset / 10 + wide_third_octet_base`). When a block is exhausted the
//! first slot is returned again; the validator reports the resulting
//! duplicate.

use std::collections::HashSet;

use stackplan_core::address::base_ip_from_cidr;
use stackplan_core::config::{AllocationPolicy, NetworkConfig};
use stackplan_core::ids::IdGenerator;
use stackplan_core::model::{
    HybridRoles, InterfaceSlot, NetworkInterface, NetworkKind, Node, NodeType, Role, StorageDisk,
};
use tracing::{debug, warn};

use crate::constraints;

/// Allocates hostnames, addresses and complete default nodes.
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    policy: AllocationPolicy,
}

impl Allocator {
    /// Create an allocator for a policy.
    #[must_use]
    pub const fn new(policy: AllocationPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// Smallest unused `<type>NN` hostname among nodes of the same type.
    ///
    /// Falls back to `<type>01` when every slot is taken.
    #[must_use]
    pub fn next_hostname(&self, node_type: NodeType, existing: &[Node]) -> String {
        let prefix = node_type.name();
        let taken: HashSet<&str> = existing
            .iter()
            .filter(|node| node.node_type == node_type && node.hostname.starts_with(prefix))
            .map(|node| node.hostname.as_str())
            .collect();

        for slot in 1..=self.policy.slots_per_type {
            let candidate = format!("{prefix}{slot:02}");
            if !taken.contains(candidate.as_str()) {
                debug!(%node_type, hostname = %candidate, "allocated hostname");
                return candidate;
            }
        }

        warn!(%node_type, "hostname range exhausted, reusing first slot");
        format!("{prefix}01")
    }

    /// First address of the type's block not used by a node of the same type
    /// on the same network.
    ///
    /// Falls back to the first address of the block when all are taken.
    #[must_use]
    pub fn next_ip(
        &self,
        node_type: NodeType,
        kind: NetworkKind,
        config: &NetworkConfig,
        existing: &[Node],
    ) -> String {
        let cidr = config.cidr(kind);
        let base = base_ip_from_cidr(cidr);
        let offset = u16::from(self.policy.offsets.for_type(node_type));
        let third_octet = offset / 10 + u16::from(self.policy.wide_third_octet_base);
        let wide = is_wide(cidr);

        let candidate = |slot: u8| {
            let host = offset + u16::from(slot);
            if wide {
                format!("{base}.{third_octet}.{host}")
            } else {
                format!("{base}.{host}")
            }
        };

        let taken: HashSet<&str> = existing
            .iter()
            .filter(|node| node.node_type == node_type)
            .filter_map(|node| node.ip_on(kind))
            .filter(|ip| ip.starts_with(base.as_str()))
            .collect();

        for slot in 1..=self.policy.slots_per_type {
            let ip = candidate(slot);
            if !taken.contains(ip.as_str()) {
                debug!(%node_type, network = %kind, %ip, "allocated address");
                return ip;
            }
        }

        warn!(%node_type, network = %kind, "address range exhausted, reusing first slot");
        candidate(1)
    }

    /// Assemble a node of `node_type` with allocated hostname and addresses.
    ///
    /// Hybrid nodes start with only the compute role. A tunnel interface is
    /// added when the roles require one and storage roles get one default
    /// disk.
    #[must_use]
    pub fn new_node(
        &self,
        id: impl Into<String>,
        node_type: NodeType,
        config: &NetworkConfig,
        existing: &[Node],
        ids: &dyn IdGenerator,
    ) -> Node {
        let management = NetworkInterface::new(
            ids.next_id("mn"),
            self.policy.management_interface.clone(),
            self.next_ip(node_type, NetworkKind::Management, config, existing),
        );
        let mut node = Node::new(
            id,
            self.next_hostname(node_type, existing),
            node_type,
            management,
        );

        if node_type == NodeType::Hybrid {
            node.hybrid_roles = Some(HybridRoles::only(Role::Compute));
        }

        if constraints::requires_tunnel_interface(&node) {
            node.set_interface(
                InterfaceSlot::Tunnel,
                Some(self.tunnel_interface(node_type, config, existing, ids)),
            );
        }

        if node.has_role(Role::Storage) {
            node.storage_disks.push(self.default_disk(ids));
        }

        debug!(hostname = %node.hostname, %node_type, "created node");
        node
    }

    /// The node added by default: a hybrid node with the compute role.
    #[must_use]
    pub fn default_node(
        &self,
        id: impl Into<String>,
        config: &NetworkConfig,
        existing: &[Node],
        ids: &dyn IdGenerator,
    ) -> Node {
        self.new_node(id, NodeType::Hybrid, config, existing, ids)
    }

    /// A fresh tunnel interface with an address from `node_type`'s block.
    #[must_use]
    pub fn tunnel_interface(
        &self,
        node_type: NodeType,
        config: &NetworkConfig,
        existing: &[Node],
        ids: &dyn IdGenerator,
    ) -> NetworkInterface {
        NetworkInterface::new(
            ids.next_id("tn"),
            self.policy.tunnel_interface.clone(),
            self.next_ip(node_type, NetworkKind::Tunnel, config, existing),
        )
    }

    /// The disk seeded on storage nodes.
    #[must_use]
    pub fn default_disk(&self, ids: &dyn IdGenerator) -> StorageDisk {
        StorageDisk::new(
            ids.next_id("sd"),
            self.policy.default_disk.clone(),
            self.policy.volume_group.clone(),
        )
    }
}

fn is_wide(cidr: &str) -> bool {
    cidr.split_once('/').is_some_and(|(_, prefix)| prefix == "16")
}

/// Next hostname for `node_type` under the default policy.
#[must_use]
pub fn allocate_hostname(node_type: NodeType, existing: &[Node]) -> String {
    Allocator::default().next_hostname(node_type, existing)
}

/// Next address for `node_type` on `kind` under the default policy.
#[must_use]
pub fn allocate_ip(
    node_type: NodeType,
    kind: NetworkKind,
    config: &NetworkConfig,
    existing: &[Node],
) -> String {
    Allocator::default().next_ip(node_type, kind, config, existing)
}
