//! Topology rules, allocation and validation for multi-node OpenStack plans.
//!
//! The allocator assigns hostnames and addresses to new nodes, the
//! constraint rules decide which interface slots a node may populate, and
//! the validator checks a whole node set against a network configuration.
//! [`editor::NodeEditor`] and [`state::AppState`] build the interactive
//! editing flow on top of those pure operations.

#![deny(missing_docs)]

pub mod allocator;
pub mod constraints;
pub mod editor;
pub mod state;
pub mod validator;

pub use allocator::{allocate_hostname, allocate_ip, Allocator};
pub use constraints::{
    can_have_external_interface, can_have_storage_disks, can_have_tunnel_interface,
    can_have_vip_external_interface, requires_tunnel_interface, ConstraintViolation, SlotRules,
};
pub use editor::NodeEditor;
pub use state::{Action, AppState, View};
pub use validator::{validate, Diagnostic, Rule, Severity, ValidationReport};

/// Convenient result alias matching the shared planning error type.
pub type Result<T> = stackplan_core::Result<T>;
