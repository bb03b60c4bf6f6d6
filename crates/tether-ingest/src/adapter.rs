//! Event routing
//!
//! Translates raw upstream events into store mutations. Decode failures
//! and missing fields are logged and dropped — nothing on this path is
//! allowed to crash or to surface an error to the upstream client.

use crate::event_kind::EventKind;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tether_common::spawn_logged;
use tether_core::builder;
use tether_core::{json, RawPresence};
use tether_store::PresenceStore;
use tokio::sync::mpsc;

/// Full raw payloads are logged at most this many times per process;
/// afterwards only summary fields are logged.
const RAW_LOG_LIMIT: u32 = 3;

/// Default buffer of the upstream event channel
const EVENT_BUFFER: usize = 256;

/// One raw event from the upstream gateway
#[derive(Debug, Clone)]
pub struct RawGatewayEvent {
    pub kind: EventKind,
    pub payload: Value,
}

/// Sender half handed to the upstream client
#[derive(Debug, Clone)]
pub struct IngestHandle {
    sender: mpsc::Sender<RawGatewayEvent>,
}

impl IngestHandle {
    /// The channel the upstream client delivers events into
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<RawGatewayEvent> {
        self.sender.clone()
    }
}

/// Routes upstream gateway events into the presence store.
pub struct Ingestor {
    store: Arc<PresenceStore>,
    raw_log_count: AtomicU32,
}

impl Ingestor {
    #[must_use]
    pub fn new(store: Arc<PresenceStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            raw_log_count: AtomicU32::new(0),
        })
    }

    /// Spawn the consuming loop and return the channel seam the upstream
    /// client plugs into.
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> IngestHandle {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let ingestor = self.clone();
        spawn_logged("upstream-ingest", async move {
            ingestor.run(rx).await;
        });
        IngestHandle { sender: tx }
    }

    /// Consume events until the upstream channel closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<RawGatewayEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event.kind, &event.payload);
        }
        tracing::info!("upstream event channel closed, ingest stopped");
    }

    /// Route one raw event still carrying its string tag. Unknown tags
    /// and undecodable payloads are dropped.
    pub fn handle_raw(&self, tag: &str, raw: &str) {
        let Some(kind) = EventKind::parse(tag) else {
            tracing::trace!(event = tag, "ignoring unhandled upstream event");
            return;
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => self.handle_event(kind, &payload),
            Err(err) => {
                tracing::warn!(event = tag, error = %err, "failed to decode upstream payload");
            }
        }
    }

    /// Route one decoded event.
    pub fn handle_event(&self, kind: EventKind, payload: &Value) {
        let Some(payload) = payload.as_object() else {
            tracing::warn!(event = %kind, "upstream payload is not an object");
            return;
        };
        self.log_event(kind, payload);

        match kind {
            EventKind::PresenceUpdate => self.handle_presence_update(payload),
            EventKind::GuildMemberAdd | EventKind::GuildMemberUpdate => {
                self.merge_member_identity(payload);
            }
            EventKind::GuildMemberRemove => self.handle_member_remove(payload),
            EventKind::GuildMembersChunk => self.handle_members_chunk(payload),
        }
    }

    /// PRESENCE_UPDATE: build a fresh snapshot; merge identity over the
    /// previous entry so fields the upstream omitted are not lost.
    fn handle_presence_update(&self, payload: &Map<String, Value>) {
        let (user, member) = builder::extract_raw_identity(payload);
        match builder::build_presence_from_raw(payload, user, member) {
            RawPresence::Upsert {
                user_id,
                mut presence,
            } => {
                if let Some(prev) = self.store.get(&user_id) {
                    presence.discord_user = prev.discord_user.merge(presence.discord_user);
                }
                self.store.set(&user_id, presence);
            }
            RawPresence::Remove { user_id } => {
                self.store.remove(&user_id);
                tracing::info!(user_id = %user_id, "removed presence (offline)");
            }
            RawPresence::Ignore => {
                tracing::debug!("presence update without resolvable user id");
            }
        }
    }

    /// GUILD_MEMBER_ADD / GUILD_MEMBER_UPDATE: merge identity fields
    /// without touching presence state or broadcasting.
    fn merge_member_identity(&self, payload: &Map<String, Value>) {
        let (user, member) = builder::extract_raw_identity(payload);
        let Some(user) = user else {
            tracing::warn!("member event without user object");
            return;
        };
        let user_id = json::field_string(user, "id");
        if user_id.is_empty() {
            tracing::warn!("member event user object missing id");
            return;
        }

        let incoming = builder::discord_user_from_raw(Some(user), member);
        self.store.update_quiet(&user_id, move |mut presence| {
            presence.discord_user = presence.discord_user.merge(incoming);
            presence
        });
    }

    /// GUILD_MEMBER_REMOVE: drop the tracked presence.
    fn handle_member_remove(&self, payload: &Map<String, Value>) {
        let user_id = payload
            .get("user")
            .and_then(|user| user.get("id"))
            .map(json::get_string_lossy)
            .unwrap_or_default();
        if user_id.is_empty() {
            return;
        }
        self.store.remove(&user_id);
        tracing::info!(user_id = %user_id, "removed presence (member left)");
    }

    /// GUILD_MEMBERS_CHUNK: merge member identities quietly, then import
    /// presences. Each presence lands with `set_quiet` + `broadcast` so
    /// the write is atomic while subscribers still see one event per
    /// user.
    fn handle_members_chunk(&self, payload: &Map<String, Value>) {
        let member_lookup = build_member_lookup(payload);

        for member in member_lookup.values() {
            self.merge_member_identity(member);
        }

        let Some(Value::Array(presences)) = payload.get("presences") else {
            tracing::warn!("members chunk missing presences array");
            return;
        };

        let mut imported = 0usize;
        for entry in presences {
            let Some(presence_payload) = entry.as_object() else {
                continue;
            };
            let user_id = presence_payload
                .get("user")
                .and_then(|user| user.get("id"))
                .map(json::get_string_lossy)
                .unwrap_or_default();
            let member = member_lookup.get(&user_id).copied();
            let user = presence_payload.get("user").and_then(Value::as_object);

            match builder::build_presence_from_raw(presence_payload, user, member) {
                RawPresence::Upsert { user_id, presence } => {
                    self.store.set_quiet(&user_id, presence);
                    self.store.broadcast(&user_id);
                    imported += 1;
                }
                RawPresence::Remove { user_id } => {
                    self.store.remove(&user_id);
                }
                RawPresence::Ignore => {}
            }
        }

        tracing::info!(
            members = member_lookup.len(),
            presences = presences.len(),
            imported = imported,
            "guild members chunk processed"
        );
    }

    /// Structured event logging with a bounded number of full payloads.
    fn log_event(&self, kind: EventKind, payload: &Map<String, Value>) {
        let user_id = payload
            .get("user")
            .and_then(|user| user.get("id"))
            .map(json::get_string_lossy)
            .unwrap_or_default();
        let activities = payload
            .get("activities")
            .and_then(Value::as_array)
            .map(Vec::len);
        let members = payload
            .get("members")
            .and_then(Value::as_array)
            .map(Vec::len);

        if self.raw_log_count.fetch_add(1, Ordering::Relaxed) < RAW_LOG_LIMIT {
            let raw = serde_json::to_string(payload).unwrap_or_default();
            tracing::info!(
                event = %kind,
                user_id = %user_id,
                activities = ?activities,
                members = ?members,
                payload = %raw,
                "gateway event received"
            );
        } else {
            tracing::debug!(
                event = %kind,
                user_id = %user_id,
                activities = ?activities,
                members = ?members,
                "gateway event received"
            );
        }
    }
}

/// Index the chunk's `members` array by user id
fn build_member_lookup(payload: &Map<String, Value>) -> HashMap<String, &Map<String, Value>> {
    let Some(Value::Array(members)) = payload.get("members") else {
        return HashMap::new();
    };

    let mut lookup = HashMap::with_capacity(members.len());
    for entry in members {
        let Some(member) = entry.as_object() else {
            continue;
        };
        let user_id = member
            .get("user")
            .and_then(|user| user.get("id"))
            .map(json::get_string_lossy)
            .unwrap_or_default();
        if !user_id.is_empty() {
            lookup.insert(user_id, member);
        }
    }
    lookup
}
