//! Configuration structures for deployment planning.
//!
//! [`NetworkConfig`] is the operator-entered, deployment-wide network layout.
//! [`AllocationPolicy`] controls how hostnames, addresses and default
//! interfaces are handed out to new nodes.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use tracing::warn;
use validator::Validate;

use crate::address::parse_ipv4_address;
use crate::error::Result;
use crate::model::{NetworkKind, NodeType};

/// Deployment-wide network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Management network CIDR
    pub management_cidr: String,
    /// Tunnel network CIDR
    pub tunnel_cidr: String,
    /// External network CIDR
    pub external_cidr: String,
    /// Operator account used for deployment
    pub kolla_user: String,
    /// Internal (management) VIP address
    pub kolla_int_vip_addr: String,
    /// External network gateway
    pub ext_gateway_ip: String,
    /// First floating IP of the allocation pool
    pub ext_start_ip: String,
    /// Last floating IP of the allocation pool
    pub ext_end_ip: String,
    /// External VIP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_external_ip: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            management_cidr: "172.16.100.0/24".to_string(),
            tunnel_cidr: "192.168.100.0/24".to_string(),
            external_cidr: "10.100.0.0/24".to_string(),
            kolla_user: "openstack".to_string(),
            kolla_int_vip_addr: "172.16.100.254".to_string(),
            ext_gateway_ip: "10.100.0.1".to_string(),
            ext_start_ip: "10.100.0.50".to_string(),
            ext_end_ip: "10.100.0.200".to_string(),
            vip_external_ip: Some("10.100.0.254".to_string()),
        }
    }
}

impl NetworkConfig {
    /// CIDR of the management or tunnel network.
    #[must_use]
    pub fn cidr(&self, kind: NetworkKind) -> &str {
        match kind {
            NetworkKind::Management => &self.management_cidr,
            NetworkKind::Tunnel => &self.tunnel_cidr,
        }
    }

    /// Floating IP pool bounded by the external start and end addresses.
    ///
    /// The range is empty when the start lies above the end.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidIpAddress`] if either bound is malformed.
    pub fn floating_ip_pool(&self) -> Result<RangeInclusive<Ipv4Addr>> {
        let start = parse_ipv4_address(&self.ext_start_ip)?;
        let end = parse_ipv4_address(&self.ext_end_ip)?;
        Ok(start..=end)
    }

    /// Set the management network CIDR.
    #[must_use]
    pub fn with_management_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.management_cidr = cidr.into();
        self
    }

    /// Set the tunnel network CIDR.
    #[must_use]
    pub fn with_tunnel_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.tunnel_cidr = cidr.into();
        self
    }

    /// Set the external network CIDR.
    #[must_use]
    pub fn with_external_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.external_cidr = cidr.into();
        self
    }

    /// Set the external gateway and floating IP range.
    #[must_use]
    pub fn with_external_range(
        mut self,
        gateway: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.ext_gateway_ip = gateway.into();
        self.ext_start_ip = start.into();
        self.ext_end_ip = end.into();
        self
    }

    /// Set or clear the external VIP.
    #[must_use]
    pub fn with_vip_external_ip(mut self, vip: Option<String>) -> Self {
        self.vip_external_ip = vip;
        self
    }
}

/// Per-type starting offset of the address block handed to new nodes.
///
/// A node of type `T` receives `offset(T) + 1 ..= offset(T) + slots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RoleOffsets {
    /// Offset for controller nodes
    #[validate(range(max = 245))]
    #[serde(default = "default_controller_offset")]
    pub controller: u8,

    /// Offset for network nodes
    #[validate(range(max = 245))]
    #[serde(default = "default_network_offset")]
    pub network: u8,

    /// Offset for compute nodes
    #[validate(range(max = 245))]
    #[serde(default = "default_compute_offset")]
    pub compute: u8,

    /// Offset for storage nodes
    #[validate(range(max = 245))]
    #[serde(default = "default_storage_offset")]
    pub storage: u8,

    /// Offset for hybrid nodes
    #[validate(range(max = 245))]
    #[serde(default = "default_hybrid_offset")]
    pub hybrid: u8,
}

const fn default_controller_offset() -> u8 {
    10
}

const fn default_network_offset() -> u8 {
    20
}

const fn default_compute_offset() -> u8 {
    30
}

const fn default_storage_offset() -> u8 {
    40
}

const fn default_hybrid_offset() -> u8 {
    50
}

impl RoleOffsets {
    /// Create the default offset table (10/20/30/40/50).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            controller: default_controller_offset(),
            network: default_network_offset(),
            compute: default_compute_offset(),
            storage: default_storage_offset(),
            hybrid: default_hybrid_offset(),
        }
    }

    /// Offset for a node type.
    #[must_use]
    pub const fn for_type(&self, node_type: NodeType) -> u8 {
        match node_type {
            NodeType::Controller => self.controller,
            NodeType::Network => self.network,
            NodeType::Compute => self.compute,
            NodeType::Storage => self.storage,
            NodeType::Hybrid => self.hybrid,
        }
    }
}

impl Default for RoleOffsets {
    fn default() -> Self {
        Self::new()
    }
}

/// Policy for allocating hostnames, addresses and default devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AllocationPolicy {
    /// Address offsets per node type
    #[validate(nested)]
    #[serde(default)]
    pub offsets: RoleOffsets,

    /// Number of hostname suffixes and addresses tried per type
    #[validate(range(min = 1, max = 9))]
    #[serde(default = "default_slots_per_type")]
    pub slots_per_type: u8,

    /// Added to `offset / 10` to pick the third octet on `/16` networks
    #[validate(range(max = 230))]
    #[serde(default = "default_wide_third_octet_base")]
    pub wide_third_octet_base: u8,

    /// Device name for new management interfaces
    #[validate(length(min = 1))]
    #[serde(default = "default_management_interface")]
    pub management_interface: String,

    /// Device name for new tunnel interfaces
    #[validate(length(min = 1))]
    #[serde(default = "default_tunnel_interface")]
    pub tunnel_interface: String,

    /// Device path of the first disk seeded on storage nodes
    #[validate(length(min = 1))]
    #[serde(default = "default_disk")]
    pub default_disk: String,

    /// LVM volume group for seeded disks
    #[validate(length(min = 1))]
    #[serde(default = "default_volume_group")]
    pub volume_group: String,
}

const fn default_slots_per_type() -> u8 {
    9
}

const fn default_wide_third_octet_base() -> u8 {
    38
}

fn default_management_interface() -> String {
    "ens3".to_string()
}

fn default_tunnel_interface() -> String {
    "ens4".to_string()
}

fn default_disk() -> String {
    "/dev/sdb".to_string()
}

fn default_volume_group() -> String {
    "cinder-volumes".to_string()
}

impl AllocationPolicy {
    /// Create a policy with the default offsets, slot count and device names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offsets: RoleOffsets::new(),
            slots_per_type: default_slots_per_type(),
            wide_third_octet_base: default_wide_third_octet_base(),
            management_interface: default_management_interface(),
            tunnel_interface: default_tunnel_interface(),
            default_disk: default_disk(),
            volume_group: default_volume_group(),
        }
    }

    /// Validate the policy, returning it unchanged on success.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ValidationError`] if any field is out of range.
    pub fn validated(self) -> Result<Self> {
        if let Err(errors) = self.validate() {
            warn!(%errors, "rejected allocation policy");
            return Err(errors.into());
        }
        Ok(self)
    }

    /// Set the offset table.
    #[must_use]
    pub fn with_offsets(mut self, offsets: RoleOffsets) -> Self {
        self.offsets = offsets;
        self
    }

    /// Set the number of slots tried per type.
    #[must_use]
    pub const fn with_slots_per_type(mut self, slots: u8) -> Self {
        self.slots_per_type = slots;
        self
    }

    /// Set the device names used for new interfaces.
    #[must_use]
    pub fn with_interface_names(
        mut self,
        management: impl Into<String>,
        tunnel: impl Into<String>,
    ) -> Self {
        self.management_interface = management.into();
        self.tunnel_interface = tunnel.into();
        self
    }

    /// Set the seeded disk and its volume group.
    #[must_use]
    pub fn with_default_disk(
        mut self,
        disk: impl Into<String>,
        volume_group: impl Into<String>,
    ) -> Self {
        self.default_disk = disk.into();
        self.volume_group = volume_group.into();
        self
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.management_cidr, "172.16.100.0/24");
        assert_eq!(config.tunnel_cidr, "192.168.100.0/24");
        assert_eq!(config.external_cidr, "10.100.0.0/24");
        assert_eq!(config.vip_external_ip.as_deref(), Some("10.100.0.254"));
        assert_eq!(config.cidr(NetworkKind::Tunnel), "192.168.100.0/24");
    }

    #[test]
    fn test_network_config_builder() {
        let config = NetworkConfig::default()
            .with_management_cidr("10.0.0.0/16")
            .with_external_range("10.9.0.1", "10.9.0.10", "10.9.0.20")
            .with_vip_external_ip(None);

        assert_eq!(config.cidr(NetworkKind::Management), "10.0.0.0/16");
        assert_eq!(config.ext_start_ip, "10.9.0.10");
        assert!(config.vip_external_ip.is_none());
    }

    #[test]
    fn test_network_config_serialization() {
        let config = NetworkConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"managementCidr\""));
        assert!(json.contains("\"kollaIntVipAddr\""));

        let deserialized: NetworkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_floating_ip_pool() {
        let pool = NetworkConfig::default().floating_ip_pool().unwrap();
        assert_eq!(*pool.start(), Ipv4Addr::new(10, 100, 0, 50));
        assert_eq!(*pool.end(), Ipv4Addr::new(10, 100, 0, 200));

        let reversed = NetworkConfig::default()
            .with_external_range("10.100.0.1", "10.100.0.200", "10.100.0.50")
            .floating_ip_pool()
            .unwrap();
        assert!(reversed.is_empty());
    }

    #[test]
    fn test_floating_ip_pool_rejects_malformed_bounds() {
        let err = NetworkConfig::default()
            .with_external_range("10.100.0.1", "10.100.0.50", "10.100.0.300")
            .floating_ip_pool()
            .unwrap_err();
        assert_eq!(err, Error::InvalidIpAddress("10.100.0.300".to_string()));
    }

    #[test]
    fn test_role_offsets_lookup() {
        let offsets = RoleOffsets::default();
        assert_eq!(offsets.for_type(NodeType::Controller), 10);
        assert_eq!(offsets.for_type(NodeType::Hybrid), 50);
    }

    #[test]
    fn test_allocation_policy_default_is_valid() {
        let policy = AllocationPolicy::default().validated().unwrap();
        assert_eq!(policy.slots_per_type, 9);
        assert_eq!(policy.wide_third_octet_base, 38);
        assert_eq!(policy.management_interface, "ens3");
        assert_eq!(policy.tunnel_interface, "ens4");
        assert_eq!(policy.default_disk, "/dev/sdb");
        assert_eq!(policy.volume_group, "cinder-volumes");
    }

    #[test]
    fn test_allocation_policy_slot_range() {
        let mut policy = AllocationPolicy::default();
        policy.slots_per_type = 0;
        assert!(policy.validate().is_err());

        policy.slots_per_type = 10;
        assert!(policy.validate().is_err());

        policy.slots_per_type = 5;
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_allocation_policy_nested_offsets() {
        let offsets = RoleOffsets {
            hybrid: 250,
            ..RoleOffsets::default()
        };
        let err = AllocationPolicy::default()
            .with_offsets(offsets)
            .validated()
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_allocation_policy_empty_names_rejected() {
        let policy = AllocationPolicy::default().with_interface_names("", "ens4");
        assert!(policy.validated().is_err());
    }

    #[test]
    fn test_allocation_policy_partial_deserialization() {
        let policy: AllocationPolicy =
            serde_json::from_str(r#"{ "slots_per_type": 4, "offsets": { "hybrid": 60 } }"#)
                .unwrap();
        assert_eq!(policy.slots_per_type, 4);
        assert_eq!(policy.offsets.hybrid, 60);
        assert_eq!(policy.offsets.controller, 10);
        assert_eq!(policy.tunnel_interface, "ens4");
    }
}
