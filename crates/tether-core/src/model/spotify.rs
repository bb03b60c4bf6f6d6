//! Spotify playback state and activity timestamps

use crate::json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity timestamps, all optional Unix-millisecond instants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<i64>,
}

impl Timestamps {
    /// Read a `timestamps` sub-object from raw JSON; non-numeric or
    /// missing fields stay `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let read = |key: &str| value.get(key).and_then(json::opt_i64);
        Self {
            start: read("start"),
            end: read("end"),
            created_at: read("created_at"),
            changed_at: read("changed_at"),
        }
    }
}

/// Current Spotify playback, exposed through the top-level `spotify`
/// object of the public projection.
///
/// Empty strings mean "not provided"; reconciliation never overwrites a
/// non-empty field with an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spotify {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub track_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub party_id: String,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub song: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub artist: String,
    #[serde(rename = "album_art_url", default, skip_serializing_if = "String::is_empty")]
    pub album_art: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub album: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamps_from_value() {
        let ts = Timestamps::from_value(&json!({"start": 100, "end": 200}));
        assert_eq!(ts.start, Some(100));
        assert_eq!(ts.end, Some(200));
        assert_eq!(ts.created_at, None);

        // Floats and numeric strings are tolerated.
        let ts = Timestamps::from_value(&json!({"start": 100.0, "end": "200"}));
        assert_eq!(ts.start, Some(100));
        assert_eq!(ts.end, Some(200));

        let ts = Timestamps::from_value(&json!("not an object"));
        assert_eq!(ts, Timestamps::default());
    }

    #[test]
    fn test_timestamps_serde_omits_absent() {
        let ts = Timestamps {
            start: Some(1),
            ..Default::default()
        };
        let value = serde_json::to_value(ts).unwrap();
        assert_eq!(value, json!({"start": 1}));
    }

    #[test]
    fn test_spotify_serde_field_names() {
        let spotify = Spotify {
            track_id: "abc".into(),
            album_art: "https://i.scdn.co/image/hash".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&spotify).unwrap();
        assert_eq!(value["track_id"], "abc");
        assert_eq!(value["album_art_url"], "https://i.scdn.co/image/hash");
        assert!(value.get("song").is_none());
    }

    #[test]
    fn test_spotify_roundtrip() {
        let spotify = Spotify {
            track_id: "abc".into(),
            party_id: "spotify:1".into(),
            timestamps: Timestamps {
                start: Some(100),
                end: Some(200),
                ..Default::default()
            },
            song: "Song".into(),
            artist: "Artist".into(),
            album_art: "url".into(),
            album: "Album".into(),
        };
        let json = serde_json::to_string(&spotify).unwrap();
        let decoded: Spotify = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, spotify);
    }
}
