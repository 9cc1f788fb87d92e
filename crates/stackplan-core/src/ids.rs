//! Identifier generation for nodes, interfaces and disks.
//!
//! Ids only need to be unique within a plan. Editors take an
//! [`IdGenerator`] so tests can use deterministic ids while interactive
//! callers use random ones.

use std::cell::Cell;
use uuid::Uuid;

use crate::model::Node;

/// Source of fresh ids for plan entities.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator {
    /// Return a new id. `prefix` names the entity kind (`"mn"`, `"tn"`, `"sd"`, ...).
    fn next_id(&self, prefix: &str) -> String;
}

/// Deterministic ids of the form `<prefix><n>`.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: Cell<u64>,
}

impl SequentialIds {
    /// Start counting from `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: Cell::new(0),
        }
    }

    /// Start counting after `last`.
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self {
            counter: Cell::new(last),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let next = self.counter.get() + 1;
        self.counter.set(next);
        format!("{prefix}{next}")
    }
}

/// Random UUID v4 based ids of the form `<prefix>-<uuid>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4().simple())
    }
}

/// Next node id: one more than the largest numeric id in `nodes`.
///
/// Non-numeric ids are ignored; an empty set yields `"1"`.
#[must_use]
pub fn next_node_id(nodes: &[Node]) -> String {
    let max = nodes
        .iter()
        .filter_map(|node| node.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}
