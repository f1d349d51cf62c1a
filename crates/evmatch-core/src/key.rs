//! Composite event key shared by both datasets.
//!
//! Downstream crates should *not* pass raw (u32, u64) tuples around.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the key fields every chunk schema must carry.
pub const RUN_FIELD: &str = "run";
pub const EVENT_FIELD: &str = "event";

/// (run, event) pair identifying one physical event across both datasets.
///
/// Unique within the indexed dataset; duplicate keys there yield an
/// unspecified single match (documented limitation, not a contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct CompositeKey {
    pub run: u32,
    pub event: u64,
}

impl CompositeKey {
    pub const fn new(run: u32, event: u64) -> Self {
        Self { run, event }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(run={}, event={})", self.run, self.event)
    }
}
