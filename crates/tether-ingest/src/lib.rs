//! # tether-ingest
//!
//! The gateway adapter: consumes raw JSON events from the upstream
//! real-time gateway (whatever client library delivers them) and routes
//! them into the presence builder and store. The upstream client itself
//! is an external collaborator — it plugs into the [`IngestHandle`]
//! channel seam.

mod adapter;
mod event_kind;

pub use adapter::{IngestHandle, Ingestor, RawGatewayEvent};
pub use event_kind::EventKind;
