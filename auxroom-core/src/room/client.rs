//! Room API HTTP Client

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::code::RoomCode;
use super::types::*;
use crate::user::UserIdentity;

/// Default room server base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection timeout for room API requests
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Request timeout, kept below the sync poll interval
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when communicating with the room server
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Room server is not reachable")]
    Unreachable,

    #[error("{0}")]
    Api(String),
}

/// Client for the room REST API
#[derive(Debug, Clone)]
pub struct RoomClient {
    http: Client,
    base_url: String,
}

impl RoomClient {
    /// Create a new RoomClient against the default server
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new RoomClient with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { http, base_url }
    }

    fn url(&self, room: &RoomCode, path: &str) -> String {
        format!("{}/rooms/{}{}", self.base_url, room.as_str(), path)
    }

    /// Send a request, mapping connection failures and API error bodies
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, RoomError> {
        let resp = req.send().await.map_err(|e| {
            if e.is_connect() {
                RoomError::Unreachable
            } else {
                RoomError::Http(e)
            }
        })?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let detail = resp
            .json::<ErrorDetail>()
            .await
            .ok()
            .and_then(|e| e.detail)
            .unwrap_or_else(|| format!("API error (HTTP {})", status.as_u16()));
        warn!(%status, %detail, "Room API request rejected");
        Err(RoomError::Api(detail))
    }

    /// Fetch the authoritative room state
    #[instrument(skip(self), fields(room = %room))]
    pub async fn sync_state(&self, room: &RoomCode) -> Result<SyncStateResponse, RoomError> {
        let resp = self.send(self.http.get(self.url(room, "/sync"))).await?;
        let state: SyncStateResponse = resp.json().await?;
        debug!(
            has_song = state.current_song.is_some(),
            member_count = state.member_count,
            "Fetched room sync state"
        );
        Ok(state)
    }

    /// Request a server-mediated skip vote
    pub async fn request_skip(
        &self,
        room: &RoomCode,
        user_id: &str,
    ) -> Result<ActionResponse, RoomError> {
        let resp = self
            .send(
                self.http
                    .post(self.url(room, "/skip"))
                    .query(&[("requesting_user_id", user_id)]),
            )
            .await?;
        Ok(resp.json().await?)
    }

    /// Add a song to the shared room queue
    pub async fn add_to_queue(
        &self,
        room: &RoomCode,
        song_id: &str,
        identity: &UserIdentity,
    ) -> Result<ActionResponse, RoomError> {
        let resp = self
            .send(self.http.post(self.url(room, "/queue")).json(&AddToQueueRequest {
                song_id: song_id.to_string(),
                user_id: identity.user_id.clone(),
                username: identity.username.clone(),
            }))
            .await?;
        Ok(resp.json().await?)
    }

    /// Remove a song from the shared room queue
    pub async fn remove_from_queue(
        &self,
        room: &RoomCode,
        song_id: &str,
        user_id: &str,
    ) -> Result<ActionResponse, RoomError> {
        let resp = self
            .send(
                self.http
                    .delete(self.url(room, &format!("/queue/{}", song_id)))
                    .query(&[("requesting_user_id", user_id)]),
            )
            .await?;
        Ok(resp.json().await?)
    }

    /// Join a room
    pub async fn join_room(&self, room: &RoomCode, identity: &UserIdentity) -> Result<(), RoomError> {
        self.send(
            self.http.post(self.url(room, "/join")).query(&[
                ("user_id", identity.user_id.as_str()),
                ("username", identity.username.as_str()),
            ]),
        )
        .await?;
        Ok(())
    }

    /// Leave a room
    pub async fn leave_room(&self, room: &RoomCode, user_id: &str) -> Result<(), RoomError> {
        self.send(
            self.http
                .post(self.url(room, "/leave"))
                .query(&[("user_id", user_id)]),
        )
        .await?;
        Ok(())
    }

    /// Toggle room-wide pause (honored by the server for the room host)
    pub async fn toggle_pause(
        &self,
        room: &RoomCode,
        user_id: &str,
    ) -> Result<ActionResponse, RoomError> {
        let resp = self
            .send(
                self.http
                    .post(self.url(room, "/pause"))
                    .query(&[("requesting_user_id", user_id)]),
            )
            .await?;
        Ok(resp.json().await?)
    }
}

impl Default for RoomClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn room() -> RoomCode {
        RoomCode::default_room()
    }

    #[tokio::test]
    async fn test_sync_state_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms/DEFAULT/sync"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_song": {
                    "id": "s1",
                    "name": "Nightcall",
                    "artists": "Kavinsky",
                    "added_by_user_id": "u3",
                    "added_by_username": "Guest_99",
                    "duration": 258,
                    "download_url": "https://cdn.example/s1.mp3"
                },
                "seek_position_seconds": 12.0,
                "is_paused": true,
                "next_songs": [],
                "member_count": 7
            })))
            .mount(&server)
            .await;

        let client = RoomClient::with_base_url(server.uri());
        let state = client.sync_state(&room()).await.unwrap();

        assert_eq!(state.current_song.unwrap().name, "Nightcall");
        assert_eq!(state.seek_position_seconds, 12.0);
        assert!(state.is_paused);
        assert_eq!(state.member_count, 7);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms/DEFAULT/skip"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "detail": "Vote already cast" })),
            )
            .mount(&server)
            .await;

        let client = RoomClient::with_base_url(server.uri());
        let err = client.request_skip(&room(), "u1").await.unwrap_err();

        match err {
            RoomError::Api(detail) => assert_eq!(detail, "Vote already cast"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_returns_advisory_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms/DEFAULT/skip"))
            .and(query_param("requesting_user_id", "u1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "1 of 3 votes" })),
            )
            .mount(&server)
            .await;

        let client = RoomClient::with_base_url(server.uri());
        let resp = client.request_skip(&room(), "u1").await.unwrap();
        assert_eq!(resp.message.as_deref(), Some("1 of 3 votes"));
    }

    #[tokio::test]
    async fn test_add_to_queue_sends_attribution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms/DEFAULT/queue"))
            .and(body_json(json!({
                "song_id": "s9",
                "user_id": "u1",
                "username": "alex"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Added" })))
            .mount(&server)
            .await;

        let client = RoomClient::with_base_url(server.uri());
        let identity = UserIdentity::new("u1", "alex");
        let resp = client.add_to_queue(&room(), "s9", &identity).await.unwrap();
        assert_eq!(resp.message.as_deref(), Some("Added"));
    }

    #[tokio::test]
    async fn test_join_room_passes_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms/DEFAULT/join"))
            .and(query_param("user_id", "u1"))
            .and(query_param("username", "alex"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = RoomClient::with_base_url(server.uri());
        let identity = UserIdentity::new("u1", "alex");
        client.join_room(&room(), &identity).await.unwrap();
    }
}
