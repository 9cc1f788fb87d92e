//! Explicit application state and its update function.
//!
//! Front ends hold an [`AppState`] value and replace it with the result of
//! [`AppState::apply`] for every [`Action`]. Allocation and validation
//! never see this type; they take the node slice and config directly.

use serde::{Deserialize, Serialize};
use stackplan_core::config::NetworkConfig;
use stackplan_core::model::{
    DeploymentPlan, InterfaceSlot, NetworkInterface, Node, NodeType, StorageDisk,
};
use tracing::debug;

use crate::validator::{validate, ValidationReport};

/// Top level screens of the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Node list and editor
    #[default]
    Nodes,
    /// Network configuration form
    Network,
    /// Hardware specification summary
    Specifications,
    /// Topology diagram
    Visualization,
    /// Generated deployment walkthrough
    Tutorial,
    /// Usage notes
    Help,
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the whole node set
    SetNodes(Vec<Node>),
    /// Append a node
    AddNode(Node),
    /// Replace the node with `id`
    UpdateNode {
        /// Id of the node to replace
        id: String,
        /// Replacement node
        node: Node,
    },
    /// Remove the node with this id
    RemoveNode(String),
    /// Replace the network configuration
    SetNetworkConfig(NetworkConfig),
    /// Store a validation report
    SetValidation(ValidationReport),
    /// Switch screens
    SetActiveView(View),
}

/// Everything a planner front end keeps between interactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Planned nodes
    pub nodes: Vec<Node>,
    /// Network configuration
    pub network_config: NetworkConfig,
    /// Last validation report, if validation has been run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Screen currently shown
    #[serde(default)]
    pub active_view: View,
}

impl AppState {
    /// State holding `plan`, on the nodes screen.
    #[must_use]
    pub fn from_plan(plan: DeploymentPlan) -> Self {
        Self {
            nodes: plan.nodes,
            network_config: plan.network_config,
            validation: None,
            active_view: View::default(),
        }
    }

    /// The current nodes and configuration as a plan document.
    #[must_use]
    pub fn plan(&self) -> DeploymentPlan {
        DeploymentPlan {
            nodes: self.nodes.clone(),
            network_config: self.network_config.clone(),
        }
    }

    /// Apply one action. Updates and removals for unknown ids are ignored.
    #[must_use]
    pub fn apply(mut self, action: Action) -> Self {
        match action {
            Action::SetNodes(nodes) => {
                debug!(nodes = nodes.len(), "replacing node set");
                self.nodes = nodes;
            }
            Action::AddNode(node) => {
                debug!(id = %node.id, hostname = %node.hostname, "adding node");
                self.nodes.push(node);
            }
            Action::UpdateNode { id, node } => {
                debug!(%id, "updating node");
                if let Some(slot) = self.nodes.iter_mut().find(|n| n.id == id) {
                    *slot = node;
                }
            }
            Action::RemoveNode(id) => {
                debug!(%id, "removing node");
                self.nodes.retain(|node| node.id != id);
            }
            Action::SetNetworkConfig(config) => {
                debug!("replacing network configuration");
                self.network_config = config;
            }
            Action::SetValidation(report) => {
                debug!(valid = report.is_valid, "storing validation report");
                self.validation = Some(report);
            }
            Action::SetActiveView(view) => {
                debug!(?view, "switching view");
                self.active_view = view;
            }
        }
        self
    }

    /// Validate the current nodes and store the report.
    #[must_use]
    pub fn validated(self) -> Self {
        let report = validate(&self.nodes, &self.network_config);
        self.apply(Action::SetValidation(report))
    }
}

impl Default for AppState {
    /// The four node sample deployment.
    fn default() -> Self {
        fn nic(id: &str, name: &str, ip: &str) -> NetworkInterface {
            NetworkInterface::new(id, name, ip)
        }

        let nodes = vec![
            Node::new(
                "1",
                "controller01",
                NodeType::Controller,
                nic("mn1", "ens3", "172.16.100.11"),
            )
            .with_interface(InterfaceSlot::VipExternal, nic("vip1", "ens5", "")),
            Node::new(
                "2",
                "network01",
                NodeType::Network,
                nic("mn2", "ens3", "172.16.100.21"),
            )
            .with_interface(InterfaceSlot::Tunnel, nic("tn2", "ens4", "192.168.100.21"))
            .with_interface(InterfaceSlot::External, nic("en1", "ens5", "")),
            Node::new(
                "3",
                "compute01",
                NodeType::Compute,
                nic("mn3", "ens3", "172.16.100.31"),
            )
            .with_interface(InterfaceSlot::Tunnel, nic("tn3", "ens4", "192.168.100.31")),
            Node::new(
                "4",
                "storage01",
                NodeType::Storage,
                nic("mn4", "ens3", "172.16.100.41"),
            )
            .with_interface(InterfaceSlot::Tunnel, nic("tn4", "ens4", "192.168.100.41"))
            .with_disk(StorageDisk::new("sd1", "/dev/sdb", "cinder-volumes")),
        ];

        Self {
            nodes,
            network_config: NetworkConfig::default(),
            validation: None,
            active_view: View::Nodes,
        }
    }
}
