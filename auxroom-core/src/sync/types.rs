//! Domain types for playback synchronization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::room::types::{SongPayload, SyncStateResponse, ARTWORK_FULL, ARTWORK_THUMB};

/// Who added a song to the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub user_id: String,
    pub username: String,
}

/// One playable stream at a specific quality tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamVariant {
    pub quality: String,
    pub url: String,
    pub bitrate: u32,
}

/// A song as known to the client
///
/// Immutable once built; the same id appearing in different snapshots refers
/// to the same entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// One artwork variant, resolved at construction for the required tier
    pub artwork: Option<String>,
    pub added_by: Attribution,
    /// Duration in seconds, authoritative from the catalog
    pub duration: f64,
    /// Default playable stream
    pub stream_url: Option<String>,
    /// Quality-tagged playable streams
    pub streams: Vec<StreamVariant>,
}

impl Song {
    /// Build a song from its wire payload, resolving artwork for `artwork_tier`
    pub fn from_payload(payload: &SongPayload, artwork_tier: &str) -> Self {
        Self {
            id: payload.id.clone(),
            title: payload.name.clone(),
            artist: payload.artists.clone(),
            artwork: payload.artwork_at(artwork_tier),
            added_by: Attribution {
                user_id: payload.added_by_user_id.clone(),
                username: payload.added_by_username.clone(),
            },
            duration: payload.duration,
            stream_url: payload.download_url.clone(),
            streams: payload
                .download_urls
                .iter()
                .map(|v| StreamVariant {
                    quality: v.quality.clone(),
                    url: v.url.clone(),
                    bitrate: v.bitrate,
                })
                .collect(),
        }
    }

    /// Resolve the stream to play for a quality preference
    ///
    /// Exact match on the quality tag, falling back to the default stream.
    pub fn stream_for(&self, quality: &str) -> Option<&str> {
        self.streams
            .iter()
            .find(|v| v.quality == quality)
            .map(|v| v.url.as_str())
            .or(self.stream_url.as_deref())
    }
}

/// Whether playback mirrors the room or has diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    /// Mirroring the authoritative room state
    Live,
    /// Diverged onto a private queue and position
    Local,
}

impl PlayMode {
    pub fn is_live(self) -> bool {
        matches!(self, PlayMode::Live)
    }
}

/// One poll's worth of authoritative room state
///
/// Never mutated after construction; superseded by the next poll.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub current_song: Option<Song>,
    /// Wall-clock instant the current song started
    pub started_at: Option<DateTime<Utc>>,
    pub paused: bool,
    /// Playback position at fetch time, in seconds
    pub seek_position: f64,
    /// Upcoming songs in server order
    pub queue: Vec<Song>,
    pub member_count: u32,
}

impl From<&SyncStateResponse> for RoomSnapshot {
    fn from(resp: &SyncStateResponse) -> Self {
        Self {
            current_song: resp
                .current_song
                .as_ref()
                .map(|p| Song::from_payload(p, ARTWORK_FULL)),
            started_at: resp.song_start_time.as_deref().and_then(|s| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            paused: resp.is_paused,
            seek_position: resp.seek_position_seconds,
            queue: resp
                .next_songs
                .iter()
                .map(|p| Song::from_payload(p, ARTWORK_THUMB))
                .collect(),
            member_count: resp.member_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SongPayload {
        serde_json::from_value(serde_json::json!({
            "id": "s1",
            "name": "Solar Sailer",
            "artists": "Daft Punk",
            "thumbnails": [
                { "quality": "150x150", "url": "https://img.example/s1/150.jpg" },
                { "quality": "500x500", "url": "https://img.example/s1/500.jpg" }
            ],
            "added_by_user_id": "u2",
            "added_by_username": "Sarah.J",
            "duration": 240,
            "download_url": "https://cdn.example/s1/default.mp3",
            "download_urls": [
                { "quality": "160kbps", "url": "https://cdn.example/s1/160.mp3", "bitrate": 160 },
                { "quality": "320kbps", "url": "https://cdn.example/s1/320.mp3", "bitrate": 320 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_from_payload_resolves_artwork_tier() {
        let song = Song::from_payload(&payload(), ARTWORK_FULL);
        assert_eq!(song.artwork.as_deref(), Some("https://img.example/s1/500.jpg"));
        assert_eq!(song.title, "Solar Sailer");
        assert_eq!(song.added_by.username, "Sarah.J");

        let thumb = Song::from_payload(&payload(), ARTWORK_THUMB);
        assert_eq!(thumb.artwork.as_deref(), Some("https://img.example/s1/150.jpg"));
    }

    #[test]
    fn test_stream_for_exact_match_then_default() {
        let song = Song::from_payload(&payload(), ARTWORK_FULL);
        assert_eq!(
            song.stream_for("320kbps"),
            Some("https://cdn.example/s1/320.mp3")
        );
        assert_eq!(
            song.stream_for("96kbps"),
            Some("https://cdn.example/s1/default.mp3")
        );
    }

    #[test]
    fn test_snapshot_from_response() {
        let resp: SyncStateResponse = serde_json::from_value(serde_json::json!({
            "current_song": serde_json::to_value(payload()).unwrap(),
            "seek_position_seconds": 42.0,
            "is_paused": true,
            "song_start_time": "2025-06-01T12:00:00Z",
            "next_songs": [serde_json::to_value(payload()).unwrap()],
            "member_count": 3
        }))
        .unwrap();

        let snapshot = RoomSnapshot::from(&resp);
        let current = snapshot.current_song.unwrap();
        // Current song gets the full-resolution tier, queue entries the thumbnail tier
        assert_eq!(current.artwork.as_deref(), Some("https://img.example/s1/500.jpg"));
        assert_eq!(
            snapshot.queue[0].artwork.as_deref(),
            Some("https://img.example/s1/150.jpg")
        );
        assert!(snapshot.paused);
        assert_eq!(snapshot.seek_position, 42.0);
        assert!(snapshot.started_at.is_some());
        assert_eq!(snapshot.member_count, 3);
    }

    #[test]
    fn test_snapshot_tolerates_bad_start_time() {
        let resp: SyncStateResponse = serde_json::from_value(serde_json::json!({
            "song_start_time": "not a timestamp"
        }))
        .unwrap();

        let snapshot = RoomSnapshot::from(&resp);
        assert!(snapshot.started_at.is_none());
    }
}
