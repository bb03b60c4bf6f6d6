//! Store mutation events

use serde::{Deserialize, Serialize};
use tether_core::Presence;

/// One store mutation, delivered to subscribers and replicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: String,
    /// The new snapshot; absent iff the entry was removed
    pub presence: Option<Presence>,
    pub removed: bool,
}

impl PresenceEvent {
    /// An update event carrying the current snapshot
    #[must_use]
    pub fn updated(user_id: impl Into<String>, presence: Presence) -> Self {
        Self {
            user_id: user_id.into(),
            presence: Some(presence),
            removed: false,
        }
    }

    /// A removal event
    #[must_use]
    pub fn removed(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            presence: None,
            removed: true,
        }
    }
}
