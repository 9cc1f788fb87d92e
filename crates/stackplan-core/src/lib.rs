//! # stackplan-core
//!
//! Core types and utilities for planning multi-node OpenStack deployments.
//!
//! This crate provides the node/interface data model, IPv4 and CIDR helpers,
//! deployment-wide network configuration and the error type shared by the
//! topology and view crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and error codes
//! - [`address`] - IPv4 address and CIDR parsing, subnet membership
//! - [`model`] - Nodes, interfaces, disks and role sets
//! - [`config`] - Network configuration and allocation policy
//! - [`ids`] - Identifier generation for nodes, interfaces and disks

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;

// Re-export commonly used types
pub use address::{
    check_ip_in_subnet, is_valid_cidr, is_valid_ip_address, parse_ipv4_address, Ipv4Cidr,
    SubnetMembership,
};
pub use config::{AllocationPolicy, NetworkConfig, RoleOffsets};
pub use error::{Error, Result};
pub use model::{
    DeploymentPlan, HybridRoles, InterfaceSlot, NetworkInterface, NetworkKind, Node, NodeType,
    Role, RoleSet, StorageDisk,
};
