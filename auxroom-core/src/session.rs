//! Player session orchestration
//!
//! Wires the sync engine to the room API and the media sink: one poll loop
//! against the room's sync endpoint, one loop draining sink events, both
//! cancelled deterministically on leave. All engine access is serialized
//! through a single mutex so no two triggers interleave mid-transition.

use std::sync::{Arc, Once};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::room::client::{RoomClient, RoomError};
use crate::room::code::RoomCode;
use crate::sink::{MediaSink, SinkEvent};
use crate::sync::engine::{PlayerStatus, SkipOutcome, SyncEngine};
use crate::sync::types::RoomSnapshot;
use crate::user::UserIdentity;

/// Poll cadence for the room sync endpoint
const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(3);

static TRACING_INIT: Once = Once::new();

/// Install a global tracing subscriber (once per process)
///
/// Embedding applications that manage their own subscriber can skip this.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("auxroom_core=debug".parse().unwrap())
                    .add_directive("hyper=off".parse().unwrap())
                    .add_directive("reqwest=off".parse().unwrap()),
            )
            .with_writer(std::io::stderr)
            .init();
    });
}

/// Severity of a transient user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Callback interface for session events
pub trait SessionCallback: Send + Sync {
    /// The player state projection changed
    fn on_status(&self, status: PlayerStatus);

    /// A transient message should be surfaced to the user
    fn on_notice(&self, notice: Notice);
}

type SharedCallback = Arc<RwLock<Option<Arc<dyn SessionCallback>>>>;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Preferred stream quality tag, matched exactly against stream variants
    pub stream_quality: String,
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stream_quality: "320kbps".to_string(),
            poll_interval: SYNC_POLL_INTERVAL,
        }
    }
}

/// One participant's player session in a room
///
/// Created by [`PlayerSession::join`]; lives until [`PlayerSession::leave`]
/// or drop, either of which stops both background loops.
pub struct PlayerSession {
    engine: Arc<Mutex<SyncEngine>>,
    client: RoomClient,
    room: RoomCode,
    identity: UserIdentity,
    callback: SharedCallback,
    /// Handle for cancelling the poll loop
    poll_cancel: Mutex<Option<oneshot::Sender<()>>>,
    /// Handle for cancelling the sink event loop
    events_cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl PlayerSession {
    /// Join a room and start the poll and sink-event loops
    pub async fn join(
        client: RoomClient,
        room: RoomCode,
        identity: UserIdentity,
        sink: Box<dyn MediaSink>,
        sink_events: mpsc::UnboundedReceiver<SinkEvent>,
        config: SessionConfig,
    ) -> Result<Self, RoomError> {
        client.join_room(&room, &identity).await?;
        info!(room = %room, user = %identity.username, "Joined room");

        let session = Self {
            engine: Arc::new(Mutex::new(SyncEngine::new(sink, config.stream_quality))),
            client,
            room,
            identity,
            callback: Arc::new(RwLock::new(None)),
            poll_cancel: Mutex::new(None),
            events_cancel: Mutex::new(None),
        };
        session.start_poll_loop(config.poll_interval);
        session.start_sink_event_loop(sink_events);
        Ok(session)
    }

    /// Set the event callback
    pub fn set_callback(&self, callback: Arc<dyn SessionCallback>) {
        *self.callback.write() = Some(callback);
    }

    /// Current player state projection
    pub fn status(&self) -> PlayerStatus {
        self.engine.lock().status()
    }

    /// Skip ahead
    ///
    /// Applies the local transition when one exists, otherwise falls back to
    /// the server-mediated skip vote.
    pub async fn skip(&self) {
        let outcome = self.engine.lock().skip();
        match outcome {
            Ok(SkipOutcome::Advanced) => self.emit_status(),
            Ok(SkipOutcome::NotReady) => {
                self.emit_notice(Notice::info(
                    "Song not loaded yet, please wait for everyone to finish listening to previous songs",
                ));
            }
            Ok(SkipOutcome::VoteRequested) => {
                match self.client.request_skip(&self.room, &self.identity.user_id).await {
                    Ok(resp) => {
                        if let Some(message) = resp.message {
                            self.emit_notice(Notice::info(message));
                        }
                    }
                    Err(err) => {
                        warn!(%err, "Failed to skip song");
                        self.emit_notice(action_failure(&err, "Failed to skip song"));
                    }
                }
            }
            Err(err) => {
                warn!(%err, "Playback failed while skipping");
                self.emit_notice(Notice::error("Playback failed"));
                self.emit_status();
            }
        }
    }

    /// Seek the local playback clock; diverges from live if needed
    pub fn seek(&self, secs: f64) {
        self.engine.lock().seek(secs);
        self.emit_status();
    }

    /// Return to the shared timeline
    pub fn go_live(&self) {
        if let Err(err) = self.engine.lock().go_live() {
            warn!(%err, "Playback failed while returning to live");
            self.emit_notice(Notice::error("Playback failed"));
        }
        self.emit_status();
    }

    /// Toggle local play/pause
    pub fn play_pause(&self) {
        if let Err(err) = self.engine.lock().play_pause() {
            warn!(%err, "Playback failed");
            self.emit_notice(Notice::error("Playback failed"));
        }
        self.emit_status();
    }

    /// Change the preferred stream quality for the current and future songs
    pub fn set_stream_quality(&self, quality: &str) {
        if let Err(err) = self.engine.lock().set_stream_quality(quality) {
            warn!(%err, "Playback failed while switching quality");
            self.emit_notice(Notice::error("Playback failed"));
        }
    }

    /// Add a song to the shared room queue
    pub async fn add_to_queue(&self, song_id: &str) {
        match self
            .client
            .add_to_queue(&self.room, song_id, &self.identity)
            .await
        {
            Ok(resp) => {
                if let Some(message) = resp.message {
                    self.emit_notice(Notice::success(message));
                }
            }
            Err(err) => {
                warn!(%err, "Failed to add song to queue");
                self.emit_notice(action_failure(&err, "Failed to add song to queue"));
            }
        }
    }

    /// Remove a song from the shared room queue
    pub async fn remove_from_queue(&self, song_id: &str) {
        match self
            .client
            .remove_from_queue(&self.room, song_id, &self.identity.user_id)
            .await
        {
            Ok(resp) => {
                if let Some(message) = resp.message {
                    self.emit_notice(Notice::success(message));
                }
            }
            Err(err) => {
                warn!(%err, "Failed to remove song from queue");
                self.emit_notice(action_failure(&err, "Failed to remove song from queue"));
            }
        }
    }

    /// Stop both loops and leave the room
    pub async fn leave(&self) {
        self.stop_loops();
        if let Err(err) = self.client.leave_room(&self.room, &self.identity.user_id).await {
            warn!(%err, "Failed to leave room cleanly");
        }
        info!(room = %self.room, "Left room");
    }

    fn start_poll_loop(&self, interval: Duration) {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        *self.poll_cancel.lock() = Some(cancel_tx);

        let client = self.client.clone();
        let room = self.room.clone();
        let engine = Arc::clone(&self.engine);
        let callback = Arc::clone(&self.callback);

        tokio::spawn(async move {
            debug!("Sync poll loop started");
            loop {
                if poll_cancelled(&mut cancel_rx) {
                    break;
                }

                match client.sync_state(&room).await {
                    Ok(state) => {
                        // A response that lands after teardown must not touch
                        // state or fire callbacks.
                        if poll_cancelled(&mut cancel_rx) {
                            break;
                        }
                        let snapshot = RoomSnapshot::from(&state);
                        let result = engine.lock().merge_snapshot(snapshot);
                        if let Err(err) = result {
                            warn!(%err, "Playback failed while applying snapshot");
                            emit_notice(&callback, Notice::error("Playback failed"));
                        }
                        emit_status(&engine, &callback);
                    }
                    Err(err) => {
                        warn!(%err, "Failed to sync with room");
                        if poll_cancelled(&mut cancel_rx) {
                            break;
                        }
                        emit_notice(&callback, Notice::error("Failed to sync with room"));
                    }
                }

                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!("Sync poll loop ended");
        });
    }

    fn start_sink_event_loop(&self, mut events: mpsc::UnboundedReceiver<SinkEvent>) {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        *self.events_cancel.lock() = Some(cancel_tx);

        let engine = Arc::clone(&self.engine);
        let callback = Arc::clone(&self.callback);

        tokio::spawn(async move {
            debug!("Sink event loop started");
            loop {
                let event = tokio::select! {
                    _ = &mut cancel_rx => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                match event {
                    SinkEvent::TimeUpdate(secs) => {
                        engine.lock().tick(secs);
                        emit_status(&engine, &callback);
                    }
                    SinkEvent::Ended => {
                        debug!("Sink reported end of stream");
                        let result = engine.lock().song_ended();
                        if let Err(err) = result {
                            warn!(%err, "Playback failed after song end");
                            emit_notice(&callback, Notice::error("Playback failed"));
                        }
                        emit_status(&engine, &callback);
                    }
                }
            }
            debug!("Sink event loop ended");
        });
    }

    fn stop_loops(&self) {
        if let Some(tx) = self.poll_cancel.lock().take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.events_cancel.lock().take() {
            let _ = tx.send(());
        }
    }

    fn emit_status(&self) {
        emit_status(&self.engine, &self.callback);
    }

    fn emit_notice(&self, notice: Notice) {
        emit_notice(&self.callback, notice);
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.stop_loops();
    }
}

/// Cancellation check usable between suspension points
///
/// Anything other than an empty channel (fired or dropped) counts as
/// cancelled.
fn poll_cancelled(cancel_rx: &mut oneshot::Receiver<()>) -> bool {
    !matches!(
        cancel_rx.try_recv(),
        Err(oneshot::error::TryRecvError::Empty)
    )
}

fn emit_status(engine: &Mutex<SyncEngine>, callback: &SharedCallback) {
    let status = engine.lock().status();
    if let Some(cb) = callback.read().as_ref() {
        cb.on_status(status);
    }
}

fn emit_notice(callback: &SharedCallback, notice: Notice) {
    if let Some(cb) = callback.read().as_ref() {
        cb.on_notice(notice);
    }
}

/// Map an action failure to a user notice, preferring the server's detail
fn action_failure(err: &RoomError, fallback: &str) -> Notice {
    match err {
        RoomError::Api(detail) => Notice::error(detail.clone()),
        _ => Notice::error(fallback),
    }
}
