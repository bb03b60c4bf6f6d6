//! Presence builder
//!
//! Reconciles one raw gateway payload (plus whatever identity fragments
//! the event carried) into a fresh [`Presence`] snapshot. All enrichment
//! and Spotify reconciliation happens here, on owned values, before the
//! store ever sees the result — published snapshots are immutable.

use crate::cdn;
use crate::json;
use crate::model::{Activity, ClientPlatform, DiscordUser, Presence, Spotify, Status};
use serde_json::{Map, Value};

/// Outcome of building a presence from a raw payload
#[derive(Debug, Clone, PartialEq)]
pub enum RawPresence {
    /// A live snapshot to store for `user_id`
    Upsert { user_id: String, presence: Presence },
    /// Offline status: remove any cached entry for `user_id`
    Remove { user_id: String },
    /// No user id could be resolved; nothing to do
    Ignore,
}

/// Build a presence snapshot from one PRESENCE_UPDATE-like payload.
///
/// `user` and `member` are identity fragments the caller already
/// extracted (e.g. the chunk member matching this presence); missing
/// sides are recovered from the payload itself.
#[must_use]
pub fn build_presence_from_raw(
    payload: &Map<String, Value>,
    user: Option<&Map<String, Value>>,
    member: Option<&Map<String, Value>>,
) -> RawPresence {
    let mut user_id = payload
        .get("user")
        .and_then(|u| u.get("id"))
        .map(json::get_string_lossy)
        .unwrap_or_default();
    if user_id.is_empty() {
        if let Some(user) = user {
            user_id = json::field_string(user, "id");
        }
    }

    let status = payload
        .get("status")
        .map(|v| Status::parse(json::get_str(v)))
        .unwrap_or(Status::Offline);

    if user_id.is_empty() {
        return RawPresence::Ignore;
    }
    if status.is_offline() {
        return RawPresence::Remove { user_id };
    }

    let mut presence = Presence {
        discord_status: status,
        ..Default::default()
    };

    let client_status = payload.get("client_status");
    for platform in ClientPlatform::ALL {
        presence.set_active_on(platform, client_status_active(client_status, platform));
    }

    presence.activities = parse_activities(payload.get("activities"));
    presence.spotify = patch_spotify(None, &presence.activities);

    // Fill identity fragments the caller didn't have from the payload,
    // then choose the richest user object available.
    let (payload_user, payload_member) = extract_raw_identity(payload);
    let user = user.or(payload_user);
    let member = member.or(payload_member);
    let picked = pick_user_map(user, member);
    presence.discord_user = discord_user_from_raw(picked, member);

    presence.normalize();
    RawPresence::Upsert { user_id, presence }
}

/// The user/member objects of an already-parsed payload.
///
/// Some upstream events are themselves a member object (no `member`
/// wrapper); those are recognized by their member-only keys.
#[must_use]
pub fn extract_raw_identity(
    payload: &Map<String, Value>,
) -> (Option<&Map<String, Value>>, Option<&Map<String, Value>>) {
    let user = payload.get("user").and_then(Value::as_object);
    let member = payload
        .get("member")
        .and_then(Value::as_object)
        .or_else(|| looks_like_member(payload).then_some(payload));
    (user, member)
}

/// Build a [`DiscordUser`] from raw user/member objects, applying
/// member-level overrides and derived-URL enrichment.
#[must_use]
pub fn discord_user_from_raw(
    user: Option<&Map<String, Value>>,
    member: Option<&Map<String, Value>>,
) -> DiscordUser {
    let empty = Map::new();
    let user = user.unwrap_or(&empty);

    let mut identity = DiscordUser {
        id: json::field_string(user, "id"),
        username: json::field_string(user, "username"),
        global_name: json::field_string(user, "global_name"),
        display_name: json::field_string(user, "display_name"),
        avatar: json::field_string(user, "avatar"),
        discriminator: json::field_string(user, "discriminator"),
        bot: json::field_bool(user, "bot"),
        public_flags: json::field_i64(user, "public_flags").max(0) as u64,
        avatar_decoration_data: enriched_opaque(user, "avatar_decoration_data", cdn::enrich_avatar_decoration),
        primary_guild: enriched_opaque(user, "primary_guild", cdn::enrich_primary_guild),
        collectibles: opaque(user, "collectibles"),
        display_name_styles: opaque(user, "display_name_styles"),
        ..Default::default()
    };

    // Member-level overrides: guild identity beats account identity.
    if let Some(member) = member {
        let member_display = json::field_string(member, "display_name");
        if !member_display.is_empty() {
            identity.display_name = member_display;
        }
        let member_avatar = json::field_string(member, "avatar");
        if !member_avatar.is_empty() {
            identity.avatar = member_avatar;
        }
        identity.avatar_decoration_data = prefer(
            enriched_opaque(member, "avatar_decoration_data", cdn::enrich_avatar_decoration),
            identity.avatar_decoration_data,
        );
        identity.primary_guild = prefer(
            enriched_opaque(member, "primary_guild", cdn::enrich_primary_guild),
            identity.primary_guild,
        );
        identity.collectibles = prefer(opaque(member, "collectibles"), identity.collectibles);
        identity.display_name_styles =
            prefer(opaque(member, "display_name_styles"), identity.display_name_styles);
    }

    if identity.display_name.is_empty() {
        identity.display_name =
            json::first_non_empty(&[&identity.global_name, &identity.username]).to_string();
    }

    identity.recompute_avatar_url();
    identity
}

/// Whether `platform` is reported active: the key must exist and carry a
/// non-empty string value.
fn client_status_active(client_status: Option<&Value>, platform: ClientPlatform) -> bool {
    client_status
        .and_then(|status| json::get_nested(status, &[platform.as_str()]))
        .map(|value| !json::get_str(value).is_empty())
        .unwrap_or(false)
}

/// Parse and enrich the raw activities array; undecodable entries drop.
fn parse_activities(raw: Option<&Value>) -> Vec<Activity> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Activity::from_value)
        .map(|mut activity| {
            activity.enrich();
            activity
        })
        .collect()
}

/// Reconcile the Spotify object from the activity list.
///
/// The whole `timestamps` object is replaced atomically (playback
/// position changes continuously); other fields only move forward on
/// non-empty replacements. No Spotify activity with a track id means no
/// Spotify object.
fn patch_spotify(prev: Option<Spotify>, activities: &[Activity]) -> Option<Spotify> {
    let activity = activities
        .iter()
        .find(|activity| activity.is_spotify() && !activity.track_id().is_empty())?;

    let mut spotify = prev.unwrap_or_default();
    spotify.track_id = activity.track_id().to_string();
    spotify.timestamps = activity.parsed_timestamps();

    overwrite_non_empty(&mut spotify.party_id, activity.party_id());
    overwrite_non_empty(&mut spotify.song, activity.details.as_deref().unwrap_or_default());
    overwrite_non_empty(&mut spotify.artist, activity.state.as_deref().unwrap_or_default());
    overwrite_non_empty(&mut spotify.album, activity.asset_str("large_text"));

    let large_image = activity.asset_str("large_image");
    if !large_image.is_empty() {
        spotify.album_art = cdn::spotify_album_art_url(large_image);
    }

    Some(spotify)
}

fn overwrite_non_empty(target: &mut String, source: &str) {
    if !source.is_empty() {
        *target = source.to_string();
    }
}

/// Choose the richest user object: prefer the presence's own `user` when
/// it carries identity beyond an id, then the member's `user`, then
/// whichever side exists at all.
fn pick_user_map<'a>(
    user: Option<&'a Map<String, Value>>,
    member: Option<&'a Map<String, Value>>,
) -> Option<&'a Map<String, Value>> {
    let member_user = member.and_then(|m| m.get("user")).and_then(Value::as_object);
    if user.is_some_and(has_identity_fields) {
        return user;
    }
    if member_user.is_some_and(has_identity_fields) {
        return member_user;
    }
    user.or(member_user)
}

/// Identity data beyond a bare id
fn has_identity_fields(user: &Map<String, Value>) -> bool {
    const STRING_FIELDS: [&str; 5] =
        ["username", "avatar", "global_name", "display_name", "discriminator"];
    if STRING_FIELDS.iter().any(|key| !json::field_string(user, key).is_empty()) {
        return true;
    }
    if json::field_i64(user, "public_flags") != 0 {
        return true;
    }
    const OPAQUE_FIELDS: [&str; 4] = [
        "avatar_decoration_data",
        "primary_guild",
        "collectibles",
        "display_name_styles",
    ];
    OPAQUE_FIELDS
        .iter()
        .any(|key| user.get(*key).is_some_and(|v| !v.is_null()))
}

/// Member-only keys that identify a bare member payload
fn looks_like_member(payload: &Map<String, Value>) -> bool {
    const MEMBER_KEYS: [&str; 4] = ["roles", "joined_at", "nick", "communication_disabled_until"];
    MEMBER_KEYS.iter().any(|key| payload.contains_key(*key))
}

/// A non-null opaque field, cloned through untouched
fn opaque(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

/// A non-null opaque field run through an enrichment function
fn enriched_opaque(
    map: &Map<String, Value>,
    key: &str,
    enrich: fn(&Value) -> Value,
) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).map(|v| enrich(v))
}

/// Non-null preferred side wins
fn prefer(preferred: Option<Value>, fallback: Option<Value>) -> Option<Value> {
    match preferred {
        Some(Value::Null) | None => fallback,
        some => some,
    }
}
