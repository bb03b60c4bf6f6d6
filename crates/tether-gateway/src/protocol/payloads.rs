//! Frame payload definitions

use serde::{Deserialize, Serialize};
use tether_core::PublicPresence;

/// Payload of op 1 (Hello)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Expected heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (30 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 30_000;

    #[must_use]
    pub fn new(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload of op 2 (Initialize)
///
/// Clients may send a list, a single id, or both; the union forms the
/// connection's subscription set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializePayload {
    #[serde(default)]
    pub subscribe_to_ids: Vec<String>,
    #[serde(default)]
    pub subscribe_to_id: Option<String>,
}

impl InitializePayload {
    /// The deduplicated, empty-filtered subscription set
    #[must_use]
    pub fn subscription_set(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .subscribe_to_id
            .iter()
            .chain(self.subscribe_to_ids.iter())
            .filter(|id| !id.is_empty())
            .cloned()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Payload of op 0 events (`INIT_STATE`, `PRESENCE_UPDATE`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEnvelope {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PublicPresence>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

impl PresenceEnvelope {
    /// An envelope carrying a presence snapshot
    #[must_use]
    pub fn update(user_id: impl Into<String>, data: PublicPresence) -> Self {
        Self {
            user_id: user_id.into(),
            data: Some(data),
            removed: false,
        }
    }

    /// An envelope signalling a removal
    #[must_use]
    pub fn removal(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            data: None,
            removed: true,
        }
    }
}
