//! Which interface slots and disks a node may carry.
//!
//! Every rule derives from [`Node::effective_roles`]:
//!
//! | roles | tunnel | external | VIP external | disks |
//! |---|---|---|---|---|
//! | controller only | forbidden | forbidden | allowed | forbidden |
//! | any of network/compute/storage | required | if network | if controller | if storage |
//! | none (empty hybrid) | forbidden | forbidden | forbidden | forbidden |
//!
//! The node editor uses these predicates to gate edits and the validator
//! uses [`violations`] to reject illegal states, so both always agree.

use serde::{Deserialize, Serialize};
use stackplan_core::model::{InterfaceSlot, Node, NodeType, Role, RoleSet};

/// Legality of each optional slot for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRules {
    /// A tunnel interface may be present
    pub tunnel_allowed: bool,
    /// A tunnel interface with an address must be present
    pub tunnel_required: bool,
    /// An external interface may be present
    pub external_allowed: bool,
    /// A VIP external interface may be present
    pub vip_external_allowed: bool,
    /// Storage disks may be listed
    pub storage_disks_allowed: bool,
}

impl SlotRules {
    /// Derive the rules for a role set.
    #[must_use]
    pub fn for_roles(roles: &RoleSet) -> Self {
        let carries_workload = roles.contains(&Role::Network)
            || roles.contains(&Role::Compute)
            || roles.contains(&Role::Storage);

        Self {
            tunnel_allowed: carries_workload,
            tunnel_required: carries_workload,
            external_allowed: roles.contains(&Role::Network),
            vip_external_allowed: roles.contains(&Role::Controller),
            storage_disks_allowed: roles.contains(&Role::Storage),
        }
    }

    /// Returns true if `slot` may be populated.
    #[must_use]
    pub const fn allows(&self, slot: InterfaceSlot) -> bool {
        match slot {
            InterfaceSlot::Management => true,
            InterfaceSlot::Tunnel => self.tunnel_allowed,
            InterfaceSlot::External => self.external_allowed,
            InterfaceSlot::VipExternal => self.vip_external_allowed,
        }
    }
}

/// Rules for a node.
#[must_use]
pub fn rules_for(node: &Node) -> SlotRules {
    SlotRules::for_roles(&node.effective_roles())
}

/// Only network nodes and hybrid nodes with the network role.
#[must_use]
pub fn can_have_external_interface(node: &Node) -> bool {
    rules_for(node).external_allowed
}

/// Any node with a network, compute or storage role.
#[must_use]
pub fn can_have_tunnel_interface(node: &Node) -> bool {
    rules_for(node).tunnel_allowed
}

/// Any node with the controller role.
#[must_use]
pub fn can_have_vip_external_interface(node: &Node) -> bool {
    rules_for(node).vip_external_allowed
}

/// Any node with the storage role.
#[must_use]
pub fn can_have_storage_disks(node: &Node) -> bool {
    rules_for(node).storage_disks_allowed
}

/// Any node with a network, compute or storage role.
#[must_use]
pub fn requires_tunnel_interface(node: &Node) -> bool {
    rules_for(node).tunnel_required
}

/// Returns true if `slot` may be populated on `node`.
#[must_use]
pub fn slot_allowed(node: &Node, slot: InterfaceSlot) -> bool {
    rules_for(node).allows(slot)
}

/// A structural rule broken by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// Tunnel interface present on a node whose roles forbid it
    TunnelForbidden,
    /// Tunnel interface (or its address) missing where required
    TunnelRequired,
    /// External interface present without the network role
    ExternalForbidden,
    /// VIP external interface present without the controller role
    VipExternalForbidden,
    /// Storage disks listed without the storage role
    StorageDisksForbidden,
}

/// Every structural rule `node` currently breaks, in a fixed order.
///
/// A tunnel interface counts as present for the "forbidden" check even
/// without an address; the "required" check needs a non-empty address.
#[must_use]
pub fn violations(node: &Node) -> Vec<ConstraintViolation> {
    let rules = rules_for(node);
    let mut found = Vec::new();

    if node.tunnel_nic.is_some() && !rules.tunnel_allowed {
        found.push(ConstraintViolation::TunnelForbidden);
    }
    if rules.tunnel_required && node.tunnel_ip().is_none() {
        found.push(ConstraintViolation::TunnelRequired);
    }
    if node.external_nic.is_some() && !rules.external_allowed {
        found.push(ConstraintViolation::ExternalForbidden);
    }
    if node.vip_external_nic.is_some() && !rules.vip_external_allowed {
        found.push(ConstraintViolation::VipExternalForbidden);
    }
    if !node.storage_disks.is_empty() && !rules.storage_disks_allowed {
        found.push(ConstraintViolation::StorageDisksForbidden);
    }

    found
}

/// Returns true for a hybrid node whose only role is controller.
#[must_use]
pub fn is_controller_only_hybrid(node: &Node) -> bool {
    node.node_type == NodeType::Hybrid
        && node.effective_roles() == RoleSet::from([Role::Controller])
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackplan_core::model::{HybridRoles, NetworkInterface, StorageDisk};

    fn node(node_type: NodeType) -> Node {
        Node::new(
            "1",
            "n01",
            node_type,
            NetworkInterface::new("mn", "ens3", "172.16.100.11"),
        )
    }

    fn hybrid(roles: HybridRoles) -> Node {
        node(NodeType::Hybrid).with_hybrid_roles(roles)
    }

    fn tunnel() -> NetworkInterface {
        NetworkInterface::new("tn", "ens4", "192.168.100.11")
    }

    #[test]
    fn test_dedicated_type_table() {
        let expected = [
            (NodeType::Controller, [false, false, false, true, false]),
            (NodeType::Network, [true, true, true, false, false]),
            (NodeType::Compute, [true, true, false, false, false]),
            (NodeType::Storage, [true, true, false, false, true]),
        ];
        for (node_type, [tunnel, required, external, vip, disks]) in expected {
            let rules = rules_for(&node(node_type));
            assert_eq!(rules.tunnel_allowed, tunnel, "{node_type} tunnel");
            assert_eq!(rules.tunnel_required, required, "{node_type} required");
            assert_eq!(rules.external_allowed, external, "{node_type} external");
            assert_eq!(rules.vip_external_allowed, vip, "{node_type} vip");
            assert_eq!(rules.storage_disks_allowed, disks, "{node_type} disks");
        }
    }

    #[test]
    fn test_controller_only_hybrid() {
        let node = hybrid(HybridRoles::only(Role::Controller));
        assert!(is_controller_only_hybrid(&node));
        assert!(!can_have_tunnel_interface(&node));
        assert!(!requires_tunnel_interface(&node));
        assert!(can_have_vip_external_interface(&node));
        assert!(!can_have_external_interface(&node));
    }

    #[test]
    fn test_controller_plus_other_roles_hybrid() {
        let node = hybrid(HybridRoles::only(Role::Controller).with(Role::Storage, true));
        assert!(!is_controller_only_hybrid(&node));
        assert!(requires_tunnel_interface(&node));
        assert!(can_have_vip_external_interface(&node));
        assert!(can_have_storage_disks(&node));
        assert!(!can_have_external_interface(&node));
    }

    #[test]
    fn test_external_gating_is_unified() {
        assert!(can_have_external_interface(&node(NodeType::Network)));
        assert!(can_have_external_interface(&hybrid(HybridRoles::only(
            Role::Network
        ))));
        assert!(!can_have_external_interface(&hybrid(HybridRoles::only(
            Role::Compute
        ))));
        assert!(!can_have_external_interface(&node(NodeType::Compute)));
        assert!(!can_have_external_interface(&node(NodeType::Hybrid)));
    }

    #[test]
    fn test_empty_hybrid_allows_nothing() {
        let rules = rules_for(&hybrid(HybridRoles::none()));
        for slot in [
            InterfaceSlot::Tunnel,
            InterfaceSlot::External,
            InterfaceSlot::VipExternal,
        ] {
            assert!(!rules.allows(slot), "{slot}");
        }
        assert!(rules.allows(InterfaceSlot::Management));
        assert!(!rules.tunnel_required);
    }

    #[test]
    fn test_violations_for_controller_with_tunnel() {
        let node = node(NodeType::Controller).with_interface(InterfaceSlot::Tunnel, tunnel());
        assert_eq!(violations(&node), vec![ConstraintViolation::TunnelForbidden]);
    }

    #[test]
    fn test_violations_for_compute_without_tunnel_but_with_external() {
        let node = node(NodeType::Compute).with_interface(
            InterfaceSlot::External,
            NetworkInterface::new("en", "ens5", ""),
        );
        assert_eq!(
            violations(&node),
            vec![
                ConstraintViolation::TunnelRequired,
                ConstraintViolation::ExternalForbidden
            ]
        );
    }

    #[test]
    fn test_tunnel_without_address_is_still_missing() {
        let node = node(NodeType::Network).with_interface(
            InterfaceSlot::Tunnel,
            NetworkInterface::new("tn", "ens4", ""),
        );
        assert_eq!(violations(&node), vec![ConstraintViolation::TunnelRequired]);
    }

    #[test]
    fn test_violations_for_misplaced_vip_and_disks() {
        let node = node(NodeType::Compute)
            .with_interface(InterfaceSlot::Tunnel, tunnel())
            .with_interface(
                InterfaceSlot::VipExternal,
                NetworkInterface::new("vip", "ens6", ""),
            )
            .with_disk(StorageDisk::new("sd1", "/dev/sdb", "cinder-volumes"));
        assert_eq!(
            violations(&node),
            vec![
                ConstraintViolation::VipExternalForbidden,
                ConstraintViolation::StorageDisksForbidden
            ]
        );
    }

    #[test]
    fn test_conforming_storage_node_has_no_violations() {
        let node = node(NodeType::Storage)
            .with_interface(InterfaceSlot::Tunnel, tunnel())
            .with_disk(StorageDisk::new("sd1", "/dev/sdb", "cinder-volumes"));
        assert!(violations(&node).is_empty());
    }
}
