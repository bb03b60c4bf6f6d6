//! Reconciled presence snapshot

use crate::model::{Activity, ClientPlatform, DiscordUser, PublicPresence, Spotify, Status};
use serde::{Deserialize, Serialize};

/// The reconciled current state of one tracked user.
///
/// This is the internal form: platform booleans plus everything derived
/// from them. The externally visible shape is the cached
/// [`PublicPresence`], rebuilt by [`Presence::normalize`] on every write
/// so the two can never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub active_on_desktop: bool,
    #[serde(default)]
    pub active_on_mobile: bool,
    #[serde(default)]
    pub active_on_web: bool,
    #[serde(default)]
    pub active_on_embedded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_clients: Vec<ClientPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_active_client: Option<ClientPlatform>,
    #[serde(default)]
    pub listening_to_spotify: bool,
    #[serde(default)]
    pub spotify: Option<Spotify>,
    #[serde(default)]
    pub discord_user: DiscordUser,
    #[serde(default)]
    pub discord_status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_user_if_exists: Option<String>,

    /// Cached public projection; rebuilt by [`Presence::normalize`] on
    /// every store write, not part of the wire form. Read-only for
    /// consumers — set it only through `normalize`.
    #[serde(skip)]
    pub public: PublicPresence,
}

impl Presence {
    /// The snapshot an absent user starts from in read-modify-write
    /// paths.
    #[must_use]
    pub fn offline() -> Self {
        Self::default()
    }

    /// Whether this platform is active.
    #[must_use]
    pub fn active_on(&self, platform: ClientPlatform) -> bool {
        match platform {
            ClientPlatform::Desktop => self.active_on_desktop,
            ClientPlatform::Mobile => self.active_on_mobile,
            ClientPlatform::Web => self.active_on_web,
            ClientPlatform::Embedded => self.active_on_embedded,
        }
    }

    /// Set one platform boolean.
    pub fn set_active_on(&mut self, platform: ClientPlatform, active: bool) {
        match platform {
            ClientPlatform::Desktop => self.active_on_desktop = active,
            ClientPlatform::Mobile => self.active_on_mobile = active,
            ClientPlatform::Web => self.active_on_web = active,
            ClientPlatform::Embedded => self.active_on_embedded = active,
        }
    }

    /// Recompute every derived field and rebuild the cached public
    /// projection. Idempotent; every store write passes through here.
    pub fn normalize(&mut self) {
        self.active_clients = ClientPlatform::ALL
            .into_iter()
            .filter(|platform| self.active_on(*platform))
            .collect();
        self.primary_active_client = self.active_clients.first().copied();
        self.listening_to_spotify = self.spotify.is_some();
        let projection = PublicPresence::project(self);
        self.public = projection;
    }
}
