//! Public Discord user identity
//!
//! Different upstream events carry different subsets of these fields, so
//! the merge policy is "never lose information a previous event
//! provided": non-empty strings win, non-zero flags win, non-null opaque
//! objects win, and `bot` is sticky once true.

use crate::cdn;
use crate::json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public identity fields relayed for a tracked user.
///
/// The four `Option<Value>` fields are opaque pass-throughs: whatever
/// the upstream sends flows out unchanged apart from an additive derived
/// URL (see [`crate::cdn`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
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
    pub public_flags: u64,
}

impl DiscordUser {
    /// Merge `incoming` over `self`, field by field.
    ///
    /// `avatar_url` is always recomputed afterwards so it can never go
    /// stale relative to `avatar` / `discriminator`.
    #[must_use]
    pub fn merge(mut self, incoming: DiscordUser) -> DiscordUser {
        self.id = merge_string(self.id, incoming.id);
        self.username = merge_string(self.username, incoming.username);
        self.global_name = merge_string(self.global_name, incoming.global_name);
        self.display_name = merge_string(self.display_name, incoming.display_name);
        self.avatar = merge_string(self.avatar, incoming.avatar);
        self.discriminator = merge_string(self.discriminator, incoming.discriminator);
        self.avatar_decoration_data =
            merge_value(self.avatar_decoration_data, incoming.avatar_decoration_data);
        self.primary_guild = merge_value(self.primary_guild, incoming.primary_guild);
        self.collectibles = merge_value(self.collectibles, incoming.collectibles);
        self.display_name_styles =
            merge_value(self.display_name_styles, incoming.display_name_styles);

        self.bot = self.bot || incoming.bot;
        if incoming.public_flags != 0 {
            self.public_flags = incoming.public_flags;
        }

        if self.display_name.is_empty() {
            self.display_name =
                json::first_non_empty(&[&self.global_name, &self.username]).to_string();
        }

        self.recompute_avatar_url();
        self
    }

    /// Recompute the derived `avatar_url` from the current identity
    /// fields.
    pub fn recompute_avatar_url(&mut self) {
        self.avatar_url = cdn::avatar_url(&self.id, &self.avatar, &self.discriminator);
    }
}

/// Non-empty string wins
fn merge_string(target: String, source: String) -> String {
    if source.is_empty() {
        target
    } else {
        source
    }
}

/// Non-null opaque object wins
fn merge_value(target: Option<Value>, source: Option<Value>) -> Option<Value> {
    match source {
        Some(Value::Null) | None => target,
        some => some,
    }
}
