//! Deployment data model: nodes, their interfaces and disks, and roles.
//!
//! Field names on the wire follow the planner's JSON documents
//! (`managementNic`, `hybridRoles`, `type`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::config::NetworkConfig;
use crate::error::{Error, Result};

/// Kind of node as selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Dedicated control plane node
    Controller,
    /// Dedicated Neutron network node
    Network,
    /// Dedicated hypervisor
    Compute,
    /// Dedicated Cinder volume node
    Storage,
    /// Node whose roles come from [`HybridRoles`]
    Hybrid,
}

impl NodeType {
    /// Returns the type name as used in hostnames and documents.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Hybrid => "hybrid",
        }
    }

    /// Returns all node types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Controller,
            Self::Network,
            Self::Compute,
            Self::Storage,
            Self::Hybrid,
        ]
    }

    /// The single role of a dedicated node type, `None` for hybrid.
    #[must_use]
    pub const fn dedicated_role(&self) -> Option<Role> {
        match self {
            Self::Controller => Some(Role::Controller),
            Self::Network => Some(Role::Network),
            Self::Compute => Some(Role::Compute),
            Self::Storage => Some(Role::Storage),
            Self::Hybrid => None,
        }
    }

    /// Type name with the first letter capitalised (`"Compute"`).
    #[must_use]
    pub fn title(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "controller" => Ok(Self::Controller),
            "network" => Ok(Self::Network),
            "compute" => Ok(Self::Compute),
            "storage" => Ok(Self::Storage),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(Error::InvalidRequest(format!("Unknown node type: {s}"))),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A deployment role. Ordering follows the canonical listing
/// controller, network, compute, storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Control plane services
    Controller,
    /// Neutron L3/DHCP agents
    Network,
    /// Nova compute
    Compute,
    /// Cinder LVM volumes
    Storage,
}

impl Role {
    /// Returns the role name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Storage => "storage",
        }
    }

    /// Returns every role in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Controller, Self::Network, Self::Compute, Self::Storage]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ordered set of roles.
pub type RoleSet = BTreeSet<Role>;

/// Role flags of a hybrid node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HybridRoles {
    /// Runs control plane services
    #[serde(default)]
    pub controller: bool,
    /// Runs network agents
    #[serde(default)]
    pub network: bool,
    /// Runs compute services
    #[serde(default)]
    pub compute: bool,
    /// Hosts Cinder volumes
    #[serde(default)]
    pub storage: bool,
}

impl HybridRoles {
    /// No role enabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            controller: false,
            network: false,
            compute: false,
            storage: false,
        }
    }

    /// Exactly one role enabled.
    #[must_use]
    pub fn only(role: Role) -> Self {
        Self::none().with(role, true)
    }

    /// Returns a copy with `role` set to `enabled`.
    #[must_use]
    pub fn with(mut self, role: Role, enabled: bool) -> Self {
        self.set(role, enabled);
        self
    }

    /// Sets a single role flag.
    pub fn set(&mut self, role: Role, enabled: bool) {
        match role {
            Role::Controller => self.controller = enabled,
            Role::Network => self.network = enabled,
            Role::Compute => self.compute = enabled,
            Role::Storage => self.storage = enabled,
        }
    }

    /// Returns true if `role` is enabled.
    #[must_use]
    pub const fn has(&self, role: Role) -> bool {
        match role {
            Role::Controller => self.controller,
            Role::Network => self.network,
            Role::Compute => self.compute,
            Role::Storage => self.storage,
        }
    }

    /// Returns true if at least one role is enabled.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.controller || self.network || self.compute || self.storage
    }

    /// Enabled roles in canonical order.
    #[must_use]
    pub fn enabled(&self) -> RoleSet {
        Role::all().iter().copied().filter(|role| self.has(*role)).collect()
    }
}

/// A network interface bound to one of a node's slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Interface id, unique within the plan
    pub id: String,
    /// Device name (e.g. `ens3`)
    #[serde(default)]
    pub name: String,
    /// Dotted-quad address, or empty when unaddressed
    #[serde(default)]
    pub ip: String,
}

impl NetworkInterface {
    /// Creates a new interface.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
        }
    }

    /// Returns true if the interface carries an address.
    #[must_use]
    pub fn has_ip(&self) -> bool {
        !self.ip.is_empty()
    }
}

/// A block device handed to LVM for Cinder volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDisk {
    /// Disk id, unique within the node
    pub id: String,
    /// Device path (e.g. `/dev/sdb`)
    pub name: String,
    /// LVM volume group name
    pub volume_group: String,
}

impl StorageDisk {
    /// Creates a new disk entry.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        volume_group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            volume_group: volume_group.into(),
        }
    }
}

/// Which network an address is allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Control plane / API network
    Management,
    /// Overlay network
    Tunnel,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Management => write!(f, "management"),
            Self::Tunnel => write!(f, "tunnel"),
        }
    }
}

/// The four interface slots of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceSlot {
    /// Always present
    Management,
    /// Overlay traffic
    Tunnel,
    /// Neutron external interface
    External,
    /// Interface that carries the external VIP, never statically addressed
    VipExternal,
}

impl InterfaceSlot {
    /// Returns every slot in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Management,
            Self::Tunnel,
            Self::External,
            Self::VipExternal,
        ]
    }

    /// Human readable slot label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Management => "management",
            Self::Tunnel => "tunnel",
            Self::External => "external",
            Self::VipExternal => "VIP external",
        }
    }
}

impl fmt::Display for InterfaceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A planned host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node id, unique within the plan
    pub id: String,
    /// Inventory hostname
    #[serde(default)]
    pub hostname: String,
    /// Node type
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Role flags; only meaningful for hybrid nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_roles: Option<HybridRoles>,
    /// Management interface
    pub management_nic: NetworkInterface,
    /// Tunnel interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_nic: Option<NetworkInterface>,
    /// Neutron external interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_nic: Option<NetworkInterface>,
    /// External VIP interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_external_nic: Option<NetworkInterface>,
    /// Disks handed to LVM, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_disks: Vec<StorageDisk>,
}

impl Node {
    /// Creates a node with only a management interface.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        hostname: impl Into<String>,
        node_type: NodeType,
        management_nic: NetworkInterface,
    ) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            node_type,
            hybrid_roles: None,
            management_nic,
            tunnel_nic: None,
            external_nic: None,
            vip_external_nic: None,
            storage_disks: Vec::new(),
        }
    }

    /// Set the hybrid role flags.
    #[must_use]
    pub fn with_hybrid_roles(mut self, roles: HybridRoles) -> Self {
        self.hybrid_roles = Some(roles);
        self
    }

    /// Populate an optional interface slot.
    #[must_use]
    pub fn with_interface(mut self, slot: InterfaceSlot, nic: NetworkInterface) -> Self {
        self.set_interface(slot, Some(nic));
        self
    }

    /// Append a storage disk.
    #[must_use]
    pub fn with_disk(mut self, disk: StorageDisk) -> Self {
        self.storage_disks.push(disk);
        self
    }

    /// Interface in `slot`, if present.
    #[must_use]
    pub fn interface(&self, slot: InterfaceSlot) -> Option<&NetworkInterface> {
        match slot {
            InterfaceSlot::Management => Some(&self.management_nic),
            InterfaceSlot::Tunnel => self.tunnel_nic.as_ref(),
            InterfaceSlot::External => self.external_nic.as_ref(),
            InterfaceSlot::VipExternal => self.vip_external_nic.as_ref(),
        }
    }

    /// Replace the interface in an optional slot.
    ///
    /// The management slot only accepts `Some`; `None` leaves it untouched.
    pub fn set_interface(&mut self, slot: InterfaceSlot, nic: Option<NetworkInterface>) {
        match slot {
            InterfaceSlot::Management => {
                if let Some(nic) = nic {
                    self.management_nic = nic;
                }
            }
            InterfaceSlot::Tunnel => self.tunnel_nic = nic,
            InterfaceSlot::External => self.external_nic = nic,
            InterfaceSlot::VipExternal => self.vip_external_nic = nic,
        }
    }

    /// Populated interfaces with their slots, in slot order.
    pub fn interfaces(&self) -> impl Iterator<Item = (InterfaceSlot, &NetworkInterface)> {
        InterfaceSlot::all()
            .iter()
            .filter_map(move |slot| self.interface(*slot).map(|nic| (*slot, nic)))
    }

    /// Roles this node contributes to the deployment.
    ///
    /// A dedicated node contributes its type; a hybrid node contributes its
    /// enabled flags (none when `hybrid_roles` is missing).
    #[must_use]
    pub fn effective_roles(&self) -> RoleSet {
        match self.node_type.dedicated_role() {
            Some(role) => RoleSet::from([role]),
            None => self.hybrid_roles.map(|roles| roles.enabled()).unwrap_or_default(),
        }
    }

    /// Returns true if the node carries `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        match self.node_type.dedicated_role() {
            Some(own) => own == role,
            None => self.hybrid_roles.is_some_and(|roles| roles.has(role)),
        }
    }

    /// Tunnel address when a tunnel interface with a non-empty IP exists.
    #[must_use]
    pub fn tunnel_ip(&self) -> Option<&str> {
        self.tunnel_nic
            .as_ref()
            .filter(|nic| nic.has_ip())
            .map(|nic| nic.ip.as_str())
    }

    /// IP on the given network, if any.
    #[must_use]
    pub fn ip_on(&self, kind: NetworkKind) -> Option<&str> {
        match kind {
            NetworkKind::Management => Some(self.management_nic.ip.as_str()),
            NetworkKind::Tunnel => self.tunnel_nic.as_ref().map(|nic| nic.ip.as_str()),
        }
    }

    /// Type label, with enabled roles for hybrid nodes (`"hybrid (controller, compute)"`).
    #[must_use]
    pub fn type_label(&self) -> String {
        if self.node_type == NodeType::Hybrid {
            let roles = self
                .effective_roles()
                .iter()
                .map(Role::name)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({roles})", self.node_type)
        } else {
            self.node_type.to_string()
        }
    }
}

/// A complete plan document: nodes plus network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    /// Planned nodes
    pub nodes: Vec<Node>,
    /// Network configuration
    pub network_config: NetworkConfig,
}

impl DeploymentPlan {
    /// Parses a plan from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if the document is malformed.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Serializes the plan to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
