//! Wire types for room API responses

use serde::{Deserialize, Serialize};

/// Artwork tier requested for the currently playing song
pub const ARTWORK_FULL: &str = "500x500";

/// Artwork tier requested for queue entries
pub const ARTWORK_THUMB: &str = "150x150";

/// Response for the room sync endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SyncStateResponse {
    /// Currently playing song, absent when the room is silent
    #[serde(default)]
    pub current_song: Option<SongPayload>,

    /// Authoritative playback position at fetch time, in seconds
    #[serde(default)]
    pub seek_position_seconds: f64,

    /// Whether room playback is paused
    #[serde(default)]
    pub is_paused: bool,

    /// Wall-clock instant the current song started (RFC 3339)
    #[serde(default)]
    pub song_start_time: Option<String>,

    /// Upcoming songs in server order
    #[serde(default)]
    pub next_songs: Vec<SongPayload>,

    /// Number of participants in the room
    #[serde(default)]
    pub member_count: u32,
}

/// A song as delivered by the room API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongPayload {
    /// Catalog identifier for the song
    pub id: String,

    /// Song name
    pub name: String,

    /// Artist display string
    pub artists: String,

    /// Artwork variants by resolution tier
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailPayload>,

    /// Flat artwork fallback when no tier matches
    #[serde(default)]
    pub image_url: Option<String>,

    /// Who added the song
    pub added_by_user_id: String,
    pub added_by_username: String,

    /// Duration in seconds
    pub duration: f64,

    /// Default playable stream
    #[serde(default)]
    pub download_url: Option<String>,

    /// Quality-tagged playable streams
    #[serde(default)]
    pub download_urls: Vec<StreamVariantPayload>,
}

impl SongPayload {
    /// Resolve one artwork variant for the given resolution tier, falling back
    /// to the flat image field when no tier matches.
    pub fn artwork_at(&self, tier: &str) -> Option<String> {
        self.thumbnails
            .iter()
            .find(|t| t.quality == tier)
            .map(|t| t.url.clone())
            .or_else(|| self.image_url.clone())
    }
}

/// One artwork variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailPayload {
    pub quality: String,
    pub url: String,
}

/// One playable stream at a specific quality tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamVariantPayload {
    pub quality: String,
    pub url: String,
    #[serde(default)]
    pub bitrate: u32,
}

/// Response for skip and queue mutation endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionResponse {
    /// Advisory message to surface to the user
    #[serde(default)]
    pub message: Option<String>,
}

/// Request body for the queue-add endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AddToQueueRequest {
    pub song_id: String,
    pub user_id: String,
    pub username: String,
}

/// Error body returned by the room API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_json() -> serde_json::Value {
        serde_json::json!({
            "id": "s1",
            "name": "Midnight in Tokyo",
            "artists": "Neon Syndicate",
            "thumbnails": [
                { "quality": "150x150", "url": "https://img.example/s1/150.jpg" },
                { "quality": "500x500", "url": "https://img.example/s1/500.jpg" }
            ],
            "added_by_user_id": "u1",
            "added_by_username": "Alex_R",
            "duration": 215,
            "download_url": "https://cdn.example/s1/default.mp3",
            "download_urls": [
                { "quality": "160kbps", "url": "https://cdn.example/s1/160.mp3", "bitrate": 160 },
                { "quality": "320kbps", "url": "https://cdn.example/s1/320.mp3", "bitrate": 320 }
            ]
        })
    }

    #[test]
    fn test_decode_sync_state() {
        let payload = serde_json::json!({
            "current_song": song_json(),
            "seek_position_seconds": 42.5,
            "is_paused": false,
            "song_start_time": "2025-06-01T12:00:00Z",
            "next_songs": [song_json()],
            "member_count": 4
        });

        let state: SyncStateResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(state.current_song.as_ref().unwrap().id, "s1");
        assert_eq!(state.seek_position_seconds, 42.5);
        assert!(!state.is_paused);
        assert_eq!(state.next_songs.len(), 1);
        assert_eq!(state.member_count, 4);
    }

    #[test]
    fn test_decode_silent_room() {
        let state: SyncStateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(state.current_song.is_none());
        assert_eq!(state.seek_position_seconds, 0.0);
        assert!(state.next_songs.is_empty());
    }

    #[test]
    fn test_artwork_tier_resolution() {
        let song: SongPayload = serde_json::from_value(song_json()).unwrap();
        assert_eq!(
            song.artwork_at(ARTWORK_FULL).as_deref(),
            Some("https://img.example/s1/500.jpg")
        );
        assert_eq!(
            song.artwork_at(ARTWORK_THUMB).as_deref(),
            Some("https://img.example/s1/150.jpg")
        );
    }

    #[test]
    fn test_artwork_falls_back_to_image_url() {
        let mut value = song_json();
        value["thumbnails"] = serde_json::json!([]);
        value["image_url"] = serde_json::json!("https://img.example/s1.jpg");

        let song: SongPayload = serde_json::from_value(value).unwrap();
        assert_eq!(
            song.artwork_at(ARTWORK_FULL).as_deref(),
            Some("https://img.example/s1.jpg")
        );
    }
}
