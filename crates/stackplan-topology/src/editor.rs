//! Node edit operations.
//!
//! A [`NodeEditor`] works on a snapshot of the node set. Every operation
//! returns an updated copy of one node; committing it back is up to the
//! caller (usually through [`crate::state::Action::UpdateNode`]). After each
//! role-affecting edit the node is conformed to the constraint rules: slots
//! the roles forbid are dropped, a required tunnel interface is allocated and
//! a storage role gained by the edit seeds a default disk.

use stackplan_core::config::NetworkConfig;
use stackplan_core::error::{Error, Result};
use stackplan_core::ids::{next_node_id, IdGenerator};
use stackplan_core::model::{
    HybridRoles, InterfaceSlot, NetworkInterface, NetworkKind, Node, NodeType, Role, RoleSet,
    StorageDisk,
};
use tracing::debug;

use crate::allocator::Allocator;
use crate::constraints;

/// Edits nodes of a deployment snapshot.
pub struct NodeEditor<'a> {
    nodes: &'a [Node],
    config: &'a NetworkConfig,
    allocator: Allocator,
    ids: &'a dyn IdGenerator,
}

impl<'a> NodeEditor<'a> {
    /// Create an editor over `nodes` using the default allocation policy.
    #[must_use]
    pub fn new(nodes: &'a [Node], config: &'a NetworkConfig, ids: &'a dyn IdGenerator) -> Self {
        Self {
            nodes,
            config,
            allocator: Allocator::default(),
            ids,
        }
    }

    /// Use a custom allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: Allocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// A new node of `node_type` with the next free id, hostname and addresses.
    #[must_use]
    pub fn create_node(&self, node_type: NodeType) -> Node {
        self.allocator.new_node(
            next_node_id(self.nodes),
            node_type,
            self.config,
            self.nodes,
            self.ids,
        )
    }

    /// The node added by default: hybrid with the compute role.
    #[must_use]
    pub fn create_default_node(&self) -> Node {
        self.allocator
            .default_node(next_node_id(self.nodes), self.config, self.nodes, self.ids)
    }

    /// Change the node's type, re-allocating its hostname and addresses.
    ///
    /// A node becoming hybrid keeps existing role flags if any are set and
    /// otherwise starts with the controller role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn change_type(&self, node_id: &str, node_type: NodeType) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        if node.node_type == node_type {
            return Ok(node);
        }

        let before = node.effective_roles();
        let others = self.others(node_id);

        node.node_type = node_type;
        node.hostname = self.allocator.next_hostname(node_type, &others);
        node.management_nic.ip =
            self.allocator
                .next_ip(node_type, NetworkKind::Management, self.config, &others);
        node.hybrid_roles = match node_type {
            NodeType::Hybrid => Some(
                node.hybrid_roles
                    .filter(HybridRoles::any)
                    .unwrap_or_else(|| HybridRoles::only(Role::Controller)),
            ),
            _ => None,
        };
        if let Some(tunnel) = node.tunnel_nic.as_mut() {
            tunnel.ip = self
                .allocator
                .next_ip(node_type, NetworkKind::Tunnel, self.config, &others);
        }

        self.conform(&mut node, &before, &others);
        debug!(node_id, hostname = %node.hostname, %node_type, "changed node type");
        Ok(node)
    }

    /// Enable or disable one role of a hybrid node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::InvalidRequest`] if the node is not hybrid.
    pub fn set_hybrid_role(&self, node_id: &str, role: Role, enabled: bool) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        if node.node_type != NodeType::Hybrid {
            return Err(Error::InvalidRequest(format!(
                "Node {} is not a hybrid node",
                node.hostname
            )));
        }

        let before = node.effective_roles();
        let mut roles = node.hybrid_roles.unwrap_or_default();
        roles.set(role, enabled);
        node.hybrid_roles = Some(roles);

        self.conform(&mut node, &before, &self.others(node_id));
        debug!(node_id, %role, enabled, "updated hybrid role");
        Ok(node)
    }

    /// Populate an empty optional slot.
    ///
    /// A tunnel interface gets the default name and an allocated address;
    /// other slots start unnamed and unaddressed. Adding to an occupied slot
    /// leaves the node unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for the management slot and
    /// [`Error::InterfaceNotAllowed`] if the node's roles forbid the slot.
    pub fn add_interface(&self, node_id: &str, slot: InterfaceSlot) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        reject_management(slot)?;
        ensure_slot_allowed(&node, slot)?;
        if node.interface(slot).is_some() {
            return Ok(node);
        }

        let nic = match slot {
            InterfaceSlot::Tunnel => self.allocator.tunnel_interface(
                node.node_type,
                self.config,
                &self.others(node_id),
                self.ids,
            ),
            _ => NetworkInterface::new(self.ids.next_id(id_prefix(slot)), "", ""),
        };
        node.set_interface(slot, Some(nic));
        debug!(node_id, %slot, "added interface");
        Ok(node)
    }

    /// Clear an optional slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for the management slot.
    pub fn remove_interface(&self, node_id: &str, slot: InterfaceSlot) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        reject_management(slot)?;
        node.set_interface(slot, None);
        debug!(node_id, %slot, "removed interface");
        Ok(node)
    }

    /// Set the name and address of the interface in `slot`, creating it if
    /// the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotAllowed`] if the node's roles forbid the
    /// slot.
    pub fn set_interface(
        &self,
        node_id: &str,
        slot: InterfaceSlot,
        name: &str,
        ip: &str,
    ) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        ensure_slot_allowed(&node, slot)?;

        let id = node
            .interface(slot)
            .map_or_else(|| self.ids.next_id(id_prefix(slot)), |nic| nic.id.clone());
        node.set_interface(slot, Some(NetworkInterface::new(id, name, ip)));
        debug!(node_id, %slot, name, ip, "updated interface");
        Ok(node)
    }

    /// Append the next `/dev/sdX` device to a storage node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the node has no storage role or
    /// device names up to `/dev/sdz` are used up.
    pub fn add_storage_disk(&self, node_id: &str) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        if !constraints::can_have_storage_disks(&node) {
            return Err(Error::InvalidRequest(format!(
                "Node {} cannot have storage disks",
                node.hostname
            )));
        }

        let letter = u8::try_from(node.storage_disks.len())
            .ok()
            .and_then(|n| b'b'.checked_add(n))
            .filter(|letter| *letter <= b'z')
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "No more disk device names available on {}",
                    node.hostname
                ))
            })?;

        let disk = StorageDisk::new(
            self.ids.next_id("sd"),
            format!("/dev/sd{}", char::from(letter)),
            self.allocator.policy().volume_group.clone(),
        );
        debug!(node_id, disk = %disk.name, "added storage disk");
        node.storage_disks.push(disk);
        Ok(node)
    }

    /// Remove a disk by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the node has no such disk.
    pub fn remove_storage_disk(&self, node_id: &str, disk_id: &str) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        let before = node.storage_disks.len();
        node.storage_disks.retain(|disk| disk.id != disk_id);
        if node.storage_disks.len() == before {
            return Err(Error::InvalidRequest(format!(
                "Disk {disk_id} not found on {}",
                node.hostname
            )));
        }
        debug!(node_id, disk_id, "removed storage disk");
        Ok(node)
    }

    /// Rename a disk device or move it to another volume group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the node has no such disk.
    pub fn set_storage_disk(
        &self,
        node_id: &str,
        disk_id: &str,
        name: &str,
        volume_group: &str,
    ) -> Result<Node> {
        let mut node = self.find(node_id)?.clone();
        let Some(disk) = node.storage_disks.iter_mut().find(|disk| disk.id == disk_id) else {
            return Err(Error::InvalidRequest(format!(
                "Disk {disk_id} not found on {}",
                node.hostname
            )));
        };
        disk.name = name.to_string();
        disk.volume_group = volume_group.to_string();
        debug!(node_id, disk_id, name, volume_group, "updated storage disk");
        Ok(node)
    }

    fn find(&self, node_id: &str) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|node| node.id == node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))
    }

    fn others(&self, node_id: &str) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|node| node.id != node_id)
            .cloned()
            .collect()
    }

    fn conform(&self, node: &mut Node, before: &RoleSet, others: &[Node]) {
        let rules = constraints::rules_for(node);

        if !rules.tunnel_allowed {
            node.tunnel_nic = None;
        } else if rules.tunnel_required {
            let node_type = node.node_type;
            if let Some(tunnel) = node.tunnel_nic.as_mut() {
                if !tunnel.has_ip() {
                    tunnel.ip =
                        self.allocator
                            .next_ip(node_type, NetworkKind::Tunnel, self.config, others);
                }
            } else {
                node.tunnel_nic = Some(self.allocator.tunnel_interface(
                    node_type,
                    self.config,
                    others,
                    self.ids,
                ));
            }
        }
        if !rules.external_allowed {
            node.external_nic = None;
        }
        if !rules.vip_external_allowed {
            node.vip_external_nic = None;
        }
        if !rules.storage_disks_allowed {
            node.storage_disks.clear();
        } else if !before.contains(&Role::Storage) && node.storage_disks.is_empty() {
            node.storage_disks.push(self.allocator.default_disk(self.ids));
        }
    }
}

fn reject_management(slot: InterfaceSlot) -> Result<()> {
    if slot == InterfaceSlot::Management {
        return Err(Error::InvalidRequest(
            "The management interface cannot be added or removed".to_string(),
        ));
    }
    Ok(())
}

fn ensure_slot_allowed(node: &Node, slot: InterfaceSlot) -> Result<()> {
    if constraints::slot_allowed(node, slot) {
        Ok(())
    } else {
        Err(Error::InterfaceNotAllowed {
            hostname: node.hostname.clone(),
            slot: slot.to_string(),
        })
    }
}

const fn id_prefix(slot: InterfaceSlot) -> &'static str {
    match slot {
        InterfaceSlot::Management => "mn",
        InterfaceSlot::Tunnel => "tn",
        InterfaceSlot::External => "en",
        InterfaceSlot::VipExternal => "vip",
    }
}
