//! Best-effort event replication
//!
//! A replicator pushes store events to an external pub/sub bus (for
//! multi-node fan-out). Dispatch is fire-and-forget on isolated tasks:
//! a slow, failing, or panicking replicator never touches the hot path.

use crate::event::PresenceEvent;
use async_trait::async_trait;

/// Best-effort publisher of store events.
#[async_trait]
pub trait Replicator: Send + Sync {
    /// Publish one event. Errors are logged by the dispatcher and
    /// otherwise ignored.
    async fn publish(&self, event: &PresenceEvent) -> anyhow::Result<()>;
}
