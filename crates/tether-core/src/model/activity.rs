//! Open activity record
//!
//! The upstream adds activity fields over time, so the type is an open
//! record: the fields the relay inspects are typed, everything else
//! lands in `extras` and round-trips verbatim as part of one flat JSON
//! object.

use crate::cdn;
use crate::json;
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Spotify's activity type ("listening")
const ACTIVITY_TYPE_LISTENING: i64 = 2;

/// One activity from a presence payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Value>,
    /// Every other upstream field, preserved untouched
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Activity {
    /// Parse one raw activity entry; malformed entries yield `None` and
    /// are dropped by the builder.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(activity) => Some(activity),
            Err(err) => {
                tracing::debug!(error = %err, "skipping undecodable activity entry");
                None
            }
        }
    }

    /// Whether this is the Spotify activity.
    ///
    /// Type 2 OR name "Spotify" — the upstream omits the type field in
    /// some payloads.
    #[must_use]
    pub fn is_spotify(&self) -> bool {
        self.kind == Some(ACTIVITY_TYPE_LISTENING) || self.name.as_deref() == Some("Spotify")
    }

    /// The Spotify track id; `sync_id` is the wire name, `track_id` is
    /// accepted as an alias.
    #[must_use]
    pub fn track_id(&self) -> &str {
        if let Some(sync_id) = self.sync_id.as_deref() {
            if !sync_id.is_empty() {
                return sync_id;
            }
        }
        self.extras.get("track_id").map(json::get_str).unwrap_or("")
    }

    /// The party id from `party.id`, or `""`.
    #[must_use]
    pub fn party_id(&self) -> &str {
        self.party
            .as_ref()
            .and_then(|party| json::get_nested(party, &["id"]))
            .map(json::get_str)
            .unwrap_or("")
    }

    /// Parsed activity timestamps.
    #[must_use]
    pub fn parsed_timestamps(&self) -> Timestamps {
        self.timestamps
            .as_ref()
            .map(Timestamps::from_value)
            .unwrap_or_default()
    }

    /// A string field of the `assets` sub-object, or `""`.
    #[must_use]
    pub fn asset_str(&self, key: &str) -> &str {
        self.assets
            .as_ref()
            .and_then(|assets| json::get_nested(assets, &[key]))
            .map(json::get_str)
            .unwrap_or("")
    }

    /// Apply emoji and asset-URL enrichment in place.
    ///
    /// Runs on the builder's owned copy before the presence is stored;
    /// published activities are never mutated.
    pub fn enrich(&mut self) {
        if let Some(emoji) = &self.emoji {
            self.emoji = Some(cdn::enrich_emoji(emoji));
        }
        if let Some(assets) = &self.assets {
            let application_id = self.application_id.as_deref().unwrap_or_default();
            self.assets = Some(cdn::enrich_activity_assets(application_id, assets));
        }
    }
}
