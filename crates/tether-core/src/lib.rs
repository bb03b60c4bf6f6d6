//! # tether-core
//!
//! The presence domain: loose-JSON extraction helpers, CDN enrichment,
//! public-flags decoding, the typed presence model with its cached public
//! projection, and the builder that reconciles raw upstream payloads into
//! presence snapshots.
//!
//! Everything in this crate is pure: no I/O, no locking, no clocks. The
//! store and the servers sit on top.

pub mod builder;
pub mod cdn;
pub mod flags;
pub mod json;
pub mod model;

// Re-export the domain types at crate root
pub use builder::{build_presence_from_raw, extract_raw_identity, RawPresence};
pub use flags::{flag_names, PublicFlags};
pub use model::{
    Activity, ClientPlatform, DiscordUser, Presence, PublicClients, PublicPresence, PublicUser,
    Spotify, Status, Timestamps,
};
