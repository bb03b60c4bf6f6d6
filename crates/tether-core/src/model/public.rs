//! Public projection
//!
//! The externally visible shape of a presence, served verbatim by the
//! HTTP snapshot endpoint and carried in socket events. Internal
//! platform booleans never appear here; the Spotify activity is exposed
//! only through the top-level `spotify` object.

use crate::flags;
use crate::model::{Activity, ClientPlatform, DiscordUser, Presence, Spotify, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Externally visible presence shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicPresence {
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub clients: PublicClients,
    #[serde(default)]
    pub discord_user: PublicUser,
    #[serde(default)]
    pub spotify: Option<Spotify>,
}

/// Active-client grouping of the public shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicClients {
    #[serde(default)]
    pub active: Vec<ClientPlatform>,
    /// First active platform, or `""` when none
    #[serde(default)]
    pub primary: String,
}

/// Public user identity; identical to [`DiscordUser`] except that
/// `public_flags` is serialized as semantic labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub global_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub discriminator: String,
    #[serde(default)]
    pub avatar_decoration_data: Option<Value>,
    #[serde(default)]
    pub primary_guild: Option<Value>,
    #[serde(default)]
    pub collectibles: Option<Value>,
    #[serde(default)]
    pub display_name_styles: Option<Value>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub public_flags: Vec<String>,
}

impl PublicPresence {
    /// Build the public projection of an internal presence.
    #[must_use]
    pub fn project(presence: &Presence) -> Self {
        Self {
            status: presence.discord_status,
            activities: presence
                .activities
                .iter()
                .filter(|activity| !activity.is_spotify())
                .cloned()
                .collect(),
            clients: PublicClients {
                active: presence.active_clients.clone(),
                primary: presence
                    .primary_active_client
                    .map(|platform| platform.as_str().to_string())
                    .unwrap_or_default(),
            },
            discord_user: PublicUser::from(&presence.discord_user),
            spotify: presence.spotify.clone(),
        }
    }
}

impl From<&DiscordUser> for PublicUser {
    fn from(user: &DiscordUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            global_name: user.global_name.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            avatar_url: user.avatar_url.clone(),
            discriminator: user.discriminator.clone(),
            avatar_decoration_data: user.avatar_decoration_data.clone(),
            primary_guild: user.primary_guild.clone(),
            collectibles: user.collectibles.clone(),
            display_name_styles: user.display_name_styles.clone(),
            bot: user.bot,
            public_flags: flags::flag_names(user.public_flags)
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
