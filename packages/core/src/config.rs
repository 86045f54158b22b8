//! Reconciler configuration
//!
//! Deserializable from any serde format; every field has a default so a
//! partial document (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};

/// Broadcast channel capacity for domain events.
///
/// Observer lag is acceptable: subscribers track current state, not history.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Upper bound for ancestry walks over a snapshot
const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconcilerConfig {
    /// Spaces whose saves are skipped (shipped read-only content)
    pub read_only_spaces: Vec<String>,

    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,

    /// Trigger a cloud push after every completed save
    pub push_to_cloud: bool,

    /// Stop ancestry walks after this many steps
    pub max_ancestor_depth: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            read_only_spaces: Vec::new(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            push_to_cloud: true,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }
}

impl ReconcilerConfig {
    pub fn with_read_only_space(mut self, space_id: impl Into<String>) -> Self {
        self.read_only_spaces.push(space_id.into());
        self
    }

    pub fn with_push_to_cloud(mut self, enabled: bool) -> Self {
        self.push_to_cloud = enabled;
        self
    }

    pub fn is_read_only(&self, space_id: &str) -> bool {
        self.read_only_spaces.iter().any(|s| s == space_id)
    }

    /// Channel capacity clamped to the minimum tokio accepts
    pub fn channel_capacity(&self) -> usize {
        self.event_channel_capacity.max(1)
    }
}
