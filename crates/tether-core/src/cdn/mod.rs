//! CDN URL enrichment
//!
//! Derives display URLs from raw upstream asset references at ingestion
//! time so that reads never have to. All functions are pure and
//! idempotent: inputs that are not objects or lack the required keys are
//! returned unchanged.

use crate::json;
use serde_json::Value;

const CDN_BASE: &str = "https://cdn.discordapp.com";
const MEDIA_PROXY_BASE: &str = "https://media.discordapp.net";

/// Transform a `spotify:<hash>` asset reference into the album-art URL.
///
/// Non-Spotify references are returned unchanged.
#[must_use]
pub fn spotify_album_art_url(asset: &str) -> String {
    match asset.strip_prefix("spotify:") {
        Some(hash) => format!("https://i.scdn.co/image/{hash}"),
        None => asset.to_string(),
    }
}

/// Add `avatar_decoration_url` to an avatar-decoration object.
///
/// Requires an `asset` field; anything else passes through untouched.
#[must_use]
pub fn enrich_avatar_decoration(raw: &Value) -> Value {
    let Some(mut decoration) = json::to_object(raw) else {
        return raw.clone();
    };
    let asset = json::field_string(&decoration, "asset");
    if asset.is_empty() {
        return raw.clone();
    }
    decoration.insert(
        "avatar_decoration_url".to_string(),
        Value::String(format!(
            "{CDN_BASE}/avatar-decoration-presets/{asset}.png?size=240&passthrough=true"
        )),
    );
    Value::Object(decoration)
}

/// Add `emoji_url` to a custom-emoji object.
///
/// Unicode emoji carry no `id` and are returned unchanged. Animated
/// emoji resolve to `.gif`, static ones to `.png`.
#[must_use]
pub fn enrich_emoji(raw: &Value) -> Value {
    let Some(mut emoji) = json::to_object(raw) else {
        return raw.clone();
    };
    let id = json::field_string(&emoji, "id");
    if id.is_empty() {
        return raw.clone();
    }
    let ext = if json::field_bool(&emoji, "animated") {
        "gif"
    } else {
        "png"
    };
    emoji.insert(
        "emoji_url".to_string(),
        Value::String(format!("{CDN_BASE}/emojis/{id}.{ext}?size=32")),
    );
    Value::Object(emoji)
}

/// Add `badge_url` to a primary-guild object.
///
/// Both `identity_guild_id` and `badge` are required.
#[must_use]
pub fn enrich_primary_guild(raw: &Value) -> Value {
    let Some(mut guild) = json::to_object(raw) else {
        return raw.clone();
    };
    let guild_id = json::field_string(&guild, "identity_guild_id");
    let badge = json::field_string(&guild, "badge");
    if guild_id.is_empty() || badge.is_empty() {
        return raw.clone();
    }
    guild.insert(
        "badge_url".to_string(),
        Value::String(format!("{CDN_BASE}/clan-badges/{guild_id}/{badge}.png?size=32")),
    );
    Value::Object(guild)
}

/// Add `large_image_url` / `small_image_url` to an activity `assets`
/// object.
///
/// `mp:external/` references resolve through the media proxy; everything
/// else needs an application id to resolve as an app asset.
#[must_use]
pub fn enrich_activity_assets(application_id: &str, assets: &Value) -> Value {
    let Some(mut enriched) = json::to_object(assets) else {
        return assets.clone();
    };

    let large = json::field_string(&enriched, "large_image");
    if let Some(url) = activity_asset_url(application_id, &large) {
        enriched.insert("large_image_url".to_string(), Value::String(url));
    }
    let small = json::field_string(&enriched, "small_image");
    if let Some(url) = activity_asset_url(application_id, &small) {
        enriched.insert("small_image_url".to_string(), Value::String(url));
    }

    Value::Object(enriched)
}

/// Resolve one activity asset reference, or `None` when unresolvable.
fn activity_asset_url(application_id: &str, asset: &str) -> Option<String> {
    if asset.is_empty() {
        return None;
    }
    if let Some(rest) = asset.strip_prefix("mp:") {
        if rest.starts_with("external/") {
            return Some(format!("{MEDIA_PROXY_BASE}/{rest}"));
        }
    }
    if application_id.is_empty() {
        return None;
    }
    Some(format!("{CDN_BASE}/app-assets/{application_id}/{asset}.webp"))
}

/// The CDN URL for a user's avatar.
///
/// Custom avatars: animated hashes (`a_` prefix) resolve to `.gif` at
/// size 64, static hashes to `.webp` at size 256. Without a custom
/// avatar the default-avatar index is `(id >> 22) % 6` for the new
/// username system (empty or `"0"` discriminator) and
/// `discriminator % 5` for the legacy system.
#[must_use]
pub fn avatar_url(user_id: &str, avatar: &str, discriminator: &str) -> String {
    if !avatar.is_empty() {
        let (ext, size) = if avatar.starts_with("a_") {
            ("gif", 64)
        } else {
            ("webp", 256)
        };
        return format!("{CDN_BASE}/avatars/{user_id}/{avatar}.{ext}?size={size}");
    }

    let index = if discriminator.is_empty() || discriminator == "0" {
        let id: u64 = user_id.parse().unwrap_or(0);
        (id >> 22) % 6
    } else {
        discriminator.parse::<u64>().unwrap_or(0) % 5
    };
    format!("{CDN_BASE}/embed/avatars/{index}.png?size=128")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spotify_album_art_url() {
        assert_eq!(
            spotify_album_art_url("spotify:abc123hash"),
            "https://i.scdn.co/image/abc123hash"
        );
        assert_eq!(spotify_album_art_url("plainasset"), "plainasset");
    }

    #[test]
    fn test_enrich_avatar_decoration() {
        let raw = json!({"asset": "a_decor", "sku_id": "1"});
        let enriched = enrich_avatar_decoration(&raw);
        assert_eq!(
            enriched["avatar_decoration_url"],
            "https://cdn.discordapp.com/avatar-decoration-presets/a_decor.png?size=240&passthrough=true"
        );
        // Original keys are preserved.
        assert_eq!(enriched["sku_id"], "1");

        // No asset: unchanged.
        let bare = json!({"sku_id": "1"});
        assert_eq!(enrich_avatar_decoration(&bare), bare);
        // Non-object: unchanged.
        assert_eq!(enrich_avatar_decoration(&json!("x")), json!("x"));
    }

    #[test]
    fn test_enrich_emoji_custom_static() {
        let enriched = enrich_emoji(&json!({"id": "99", "name": "pog"}));
        assert_eq!(
            enriched["emoji_url"],
            "https://cdn.discordapp.com/emojis/99.png?size=32"
        );
    }

    #[test]
    fn test_enrich_emoji_animated() {
        let enriched = enrich_emoji(&json!({"id": "99", "animated": true}));
        assert_eq!(
            enriched["emoji_url"],
            "https://cdn.discordapp.com/emojis/99.gif?size=32"
        );
    }

    #[test]
    fn test_enrich_emoji_unicode_unchanged() {
        let unicode = json!({"name": "🔥"});
        assert_eq!(enrich_emoji(&unicode), unicode);
    }

    #[test]
    fn test_enrich_primary_guild() {
        let raw = json!({"identity_guild_id": "42", "badge": "abc", "tag": "TTT"});
        let enriched = enrich_primary_guild(&raw);
        assert_eq!(
            enriched["badge_url"],
            "https://cdn.discordapp.com/clan-badges/42/abc.png?size=32"
        );

        // Both fields required.
        let partial = json!({"identity_guild_id": "42"});
        assert_eq!(enrich_primary_guild(&partial), partial);
    }

    #[test]
    fn test_enrich_activity_assets_app_asset() {
        let assets = json!({"large_image": "bigimg", "small_image": "smallimg"});
        let enriched = enrich_activity_assets("777", &assets);
        assert_eq!(
            enriched["large_image_url"],
            "https://cdn.discordapp.com/app-assets/777/bigimg.webp"
        );
        assert_eq!(
            enriched["small_image_url"],
            "https://cdn.discordapp.com/app-assets/777/smallimg.webp"
        );
    }

    #[test]
    fn test_enrich_activity_assets_media_proxy() {
        let assets = json!({"large_image": "mp:external/xyz/https/example.com/a.png"});
        let enriched = enrich_activity_assets("", &assets);
        assert_eq!(
            enriched["large_image_url"],
            "https://media.discordapp.net/external/xyz/https/example.com/a.png"
        );
    }

    #[test]
    fn test_enrich_activity_assets_unresolvable() {
        // No application id and not a media-proxy reference: no URL added.
        let assets = json!({"large_image": "bigimg"});
        let enriched = enrich_activity_assets("", &assets);
        assert!(enriched.get("large_image_url").is_none());
    }

    #[test]
    fn test_avatar_url_custom_static() {
        assert_eq!(
            avatar_url("123", "deadbeef", "0"),
            "https://cdn.discordapp.com/avatars/123/deadbeef.webp?size=256"
        );
    }

    #[test]
    fn test_avatar_url_custom_animated() {
        assert_eq!(
            avatar_url("123", "a_deadbeef", "0"),
            "https://cdn.discordapp.com/avatars/123/a_deadbeef.gif?size=64"
        );
    }

    #[test]
    fn test_avatar_url_default_new_system() {
        // (672569780716175370 >> 22) % 6 == 160271601102 % 6
        let id: u64 = 672569780716175370;
        let index = (id >> 22) % 6;
        assert_eq!(
            avatar_url("672569780716175370", "", ""),
            format!("https://cdn.discordapp.com/embed/avatars/{index}.png?size=128")
        );
        // Small ids shift to zero.
        assert_eq!(
            avatar_url("1", "", ""),
            "https://cdn.discordapp.com/embed/avatars/0.png?size=128"
        );
    }

    #[test]
    fn test_avatar_url_default_legacy_discriminator() {
        assert_eq!(
            avatar_url("123", "", "0007"),
            "https://cdn.discordapp.com/embed/avatars/2.png?size=128"
        );
    }

    #[test]
    fn test_enrichment_idempotent() {
        let raw = json!({"asset": "a_decor"});
        let once = enrich_avatar_decoration(&raw);
        let twice = enrich_avatar_decoration(&once);
        assert_eq!(once, twice);

        let assets = json!({"large_image": "img"});
        let once = enrich_activity_assets("1", &assets);
        let twice = enrich_activity_assets("1", &once);
        assert_eq!(once, twice);
    }
}
