//! Presence domain entities
//!
//! Typed model for the reconciled presence snapshot and its public
//! projection.

mod activity;
mod presence;
mod public;
mod spotify;
mod status;
mod user;

pub use activity::Activity;
pub use presence::Presence;
pub use public::{PublicClients, PublicPresence, PublicUser};
pub use spotify::{Spotify, Timestamps};
pub use status::{ClientPlatform, Status};
pub use user::DiscordUser;
