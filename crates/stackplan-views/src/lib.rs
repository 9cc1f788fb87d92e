//! Derived views of a deployment plan.
//!
//! Read-only renderings of the node set and network configuration: hardware
//! sizing in [`specification`] and Kolla-Ansible inventory, `globals.yml`
//! and LVM commands in [`inventory`]. Nothing here mutates a plan.

#![deny(missing_docs)]

pub mod inventory;
pub mod specification;

pub use inventory::{
    globals_yml, lvm_setup, multinode_inventory, Inventory, InventoryGroup, InventoryHost,
    LvmSetup,
};
pub use specification::{
    network_requirements, node_specification, system_specification, DiskSpec,
    NodeSpecification, SystemSpecification,
};
