//! Playback reconciliation engine
//!
//! Owns the client's playback state and reconciles it against periodic room
//! snapshots and user actions, deciding on every trigger whether the client
//! keeps mirroring the room (Live) or stays on its private timeline (Local).
//! The engine drives the media sink directly; transition choices come from
//! [`super::policy`].

use tracing::{debug, info, warn};

use crate::drift::{self, DriftSample};
use crate::sink::{MediaSink, SinkError};

use super::policy::{self, EndAction, SkipAction};
use super::queue::LocalQueue;
use super::types::{PlayMode, RoomSnapshot, Song};

/// Result of a user-initiated skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// Playback advanced locally
    Advanced,
    /// Nothing queued to skip into; advise the user and change nothing
    NotReady,
    /// No local advance possible; the caller should request a skip vote
    VoteRequested,
}

/// Projection of the engine state for the presentation layer
#[derive(Debug, Clone)]
pub struct PlayerStatus {
    pub current_song: Option<Song>,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub progress_percent: f64,
    pub playing: bool,
    pub mode: PlayMode,
    pub out_of_sync: bool,
    /// Server mirror while Live, the private queue while Local
    pub queue: Vec<Song>,
    pub member_count: u32,
}

/// The playback reconciliation state machine
///
/// One engine exists per player session. All mutation happens through the
/// methods below, each triggered by exactly one event (poll merge, sink
/// notification, user action), so state can never be half-updated.
pub struct SyncEngine {
    sink: Box<dyn MediaSink>,

    mode: PlayMode,
    current_song: Option<Song>,
    /// Client-side clock, authoritative for rendering progress
    position_secs: f64,
    playing_locally: bool,
    last_snapshot: Option<RoomSnapshot>,
    local_queue: LocalQueue,

    /// Cached server view for drift detection and the return to live
    server_song: Option<Song>,
    server_position: f64,
    server_paused: bool,
    member_count: u32,

    /// Preferred stream quality tag (injected configuration)
    stream_quality: String,

    /// Media binding bookkeeping
    bound_url: Option<String>,
    bound_song_id: Option<String>,
    initial_seek_done: bool,
    synced_once: bool,
}

impl SyncEngine {
    pub fn new(sink: Box<dyn MediaSink>, stream_quality: impl Into<String>) -> Self {
        Self {
            sink,
            mode: PlayMode::Live,
            current_song: None,
            position_secs: 0.0,
            playing_locally: true,
            last_snapshot: None,
            local_queue: LocalQueue::new(),
            server_song: None,
            server_position: 0.0,
            server_paused: false,
            member_count: 0,
            stream_quality: stream_quality.into(),
            bound_url: None,
            bound_song_id: None,
            initial_seek_done: false,
            synced_once: false,
        }
    }

    // ===== Snapshot merge =====

    /// Reconcile one room snapshot against the current state
    pub fn merge_snapshot(&mut self, snapshot: RoomSnapshot) -> Result<(), SinkError> {
        self.member_count = snapshot.member_count;

        let Some(server_song) = snapshot.current_song.clone() else {
            debug!("Room reports no current song");
            self.current_song = None;
            self.server_song = None;
            self.server_position = 0.0;
            self.server_paused = false;
            if self.mode.is_live() {
                self.local_queue.replace_all(Vec::new());
            }
            self.last_snapshot = Some(snapshot);
            return Ok(());
        };

        self.server_song = Some(server_song.clone());
        self.server_position = snapshot.seek_position;
        self.server_paused = snapshot.paused;

        if !self.synced_once {
            // First snapshot of the session: adopt the room wholesale.
            info!(song = %server_song.title, "Joining live playback");
            self.synced_once = true;
            self.mode = PlayMode::Live;
            self.position_secs = snapshot.seek_position;
            self.current_song = Some(server_song);
            self.playing_locally = !snapshot.paused;
            self.local_queue.replace_all(snapshot.queue.clone());
            self.last_snapshot = Some(snapshot);
            return self.bind_current();
        }

        match self.mode {
            PlayMode::Live => {
                let song_changed = self
                    .current_song
                    .as_ref()
                    .map(|s| s.id != server_song.id)
                    .unwrap_or(true);
                let paused = snapshot.paused;
                let seek_position = snapshot.seek_position;

                // Mirror: queue additions, removals and reorders on the
                // server propagate immediately.
                self.local_queue.replace_all(snapshot.queue.clone());
                self.last_snapshot = Some(snapshot);

                if song_changed {
                    debug!(song = %server_song.title, "Live song changed, following the room");
                    self.position_secs = seek_position;
                    self.current_song = Some(server_song);
                    self.bind_current()?;
                    self.sink.set_position(self.position_secs);
                }

                // The bound song matches the room's; follow its pause flag.
                self.set_playing(!paused)?;
            }
            PlayMode::Local => {
                // Never yank the song out from under a diverged listener;
                // only let new songs trickle into the tail of their queue.
                let appended = self.local_queue.append_missing(snapshot.queue.clone());
                if appended > 0 {
                    debug!(appended, "Appended new room songs to the local queue");
                }
                self.last_snapshot = Some(snapshot);
            }
        }

        Ok(())
    }

    // ===== Playback transitions =====

    /// Handle the sink's end-of-stream notification
    pub fn song_ended(&mut self) -> Result<(), SinkError> {
        let decision = policy::on_song_end(
            self.mode,
            self.local_queue.is_empty(),
            self.server_queue_is_empty(),
            self.server_song.is_some(),
        );

        match decision {
            EndAction::AdvanceServer => {
                // Optimistic advance into the mirrored head; authoritative
                // until the next poll confirms or supersedes it. The queue
                // itself is left for the poll to refresh.
                let Some(next) = self.server_queue().into_iter().next() else {
                    return Ok(());
                };
                info!(song = %next.title, "Song ended, following the server queue");
                self.position_secs = 0.0;
                self.current_song = Some(next);
                self.bind_current()
            }
            EndAction::AdvanceLocal => self.advance_local(),
            EndAction::ReturnToLive => {
                info!("Local queue exhausted, returning to live");
                self.rejoin_live()
            }
            EndAction::Stay => Ok(()),
        }
    }

    /// Handle a user-initiated skip
    pub fn skip(&mut self) -> Result<SkipOutcome, SinkError> {
        match policy::on_skip(
            self.mode,
            self.local_queue.is_empty(),
            self.server_queue_is_empty(),
        ) {
            SkipAction::AdvanceLocal => {
                self.advance_local()?;
                Ok(SkipOutcome::Advanced)
            }
            SkipAction::NotReady => Ok(SkipOutcome::NotReady),
            SkipAction::Fork => {
                self.fork_server_queue()?;
                Ok(SkipOutcome::Advanced)
            }
            SkipAction::RequestVote => Ok(SkipOutcome::VoteRequested),
        }
    }

    /// Handle a user-initiated seek
    ///
    /// Any manual seek is a divergence: leaving Live snapshots the server
    /// queue into the local queue first.
    pub fn seek(&mut self, secs: f64) {
        if policy::seek_forks(self.mode) {
            let queue = self.server_queue();
            debug!(forked = queue.len(), "Manual seek diverges from live");
            self.local_queue.replace_all(queue);
            self.mode = PlayMode::Local;
        }
        self.position_secs = secs.max(0.0);
        self.sink.set_position(self.position_secs);
    }

    /// Explicitly return to the shared timeline
    ///
    /// No-op until a server song has been cached from a snapshot.
    pub fn go_live(&mut self) -> Result<(), SinkError> {
        if !policy::can_go_live(self.server_song.is_some()) {
            return Ok(());
        }
        info!("Returning to live playback");
        self.rejoin_live()
    }

    /// Toggle local play/pause, independent of the room while diverged
    pub fn play_pause(&mut self) -> Result<(), SinkError> {
        let playing = !self.playing_locally;
        self.set_playing(playing)
    }

    /// Record a clock tick from the sink
    pub fn tick(&mut self, clock_secs: f64) {
        if self.current_song.is_some() {
            self.position_secs = clock_secs;
        }
    }

    /// Change the preferred stream quality and rebind the current song
    ///
    /// A same-song rebind keeps the sink's audible position.
    pub fn set_stream_quality(&mut self, quality: impl Into<String>) -> Result<(), SinkError> {
        let quality = quality.into();
        if quality == self.stream_quality {
            return Ok(());
        }
        debug!(%quality, "Stream quality changed");
        self.stream_quality = quality;
        self.bind_current()
    }

    // ===== State queries =====

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    pub fn position(&self) -> f64 {
        self.position_secs
    }

    pub fn is_playing(&self) -> bool {
        self.playing_locally
    }

    pub fn local_queue(&self) -> &LocalQueue {
        &self.local_queue
    }

    pub fn member_count(&self) -> u32 {
        self.member_count
    }

    /// Whether this client has drifted from the room
    ///
    /// Recomputed on demand, never stored; gates the return-to-live
    /// affordance only.
    pub fn out_of_sync(&self) -> bool {
        let songs_differ = match (&self.current_song, &self.server_song) {
            (Some(local), Some(server)) => local.id != server.id,
            (None, None) => false,
            _ => true,
        };

        drift::is_out_of_sync(DriftSample {
            mode: self.mode,
            songs_differ,
            time_delta_secs: (self.position_secs - self.server_position).abs(),
            play_state_differs: self.playing_locally != !self.server_paused,
        })
    }

    /// Project the state for the presentation layer
    pub fn status(&self) -> PlayerStatus {
        let duration = self.current_song.as_ref().map(|s| s.duration).unwrap_or(0.0);
        let progress = if duration > 0.0 {
            (self.position_secs / duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        PlayerStatus {
            current_song: self.current_song.clone(),
            position_secs: self.position_secs,
            duration_secs: duration,
            progress_percent: progress,
            playing: self.playing_locally,
            mode: self.mode,
            out_of_sync: self.out_of_sync(),
            queue: match self.mode {
                PlayMode::Live => self.server_queue(),
                PlayMode::Local => self.local_queue.to_vec(),
            },
            member_count: self.member_count,
        }
    }

    // ===== Internals =====

    fn server_queue(&self) -> Vec<Song> {
        self.last_snapshot
            .as_ref()
            .map(|s| s.queue.clone())
            .unwrap_or_default()
    }

    fn server_queue_is_empty(&self) -> bool {
        self.last_snapshot
            .as_ref()
            .map(|s| s.queue.is_empty())
            .unwrap_or(true)
    }

    /// Pop and bind the local queue head
    fn advance_local(&mut self) -> Result<(), SinkError> {
        let Some(next) = self.local_queue.pop_front() else {
            return Ok(());
        };
        debug!(song = %next.title, remaining = self.local_queue.len(), "Advancing the local queue");
        self.position_secs = 0.0;
        self.current_song = Some(next);
        self.bind_current()
    }

    /// Take a private copy of the server queue and step away from the room
    fn fork_server_queue(&mut self) -> Result<(), SinkError> {
        let mut queue = self.server_queue();
        if queue.is_empty() {
            return Ok(());
        }
        let next = queue.remove(0);
        info!(song = %next.title, forked = queue.len(), "Skipping ahead of the room");
        self.mode = PlayMode::Local;
        self.position_secs = 0.0;
        self.current_song = Some(next);
        self.local_queue.replace_all(queue);
        self.bind_current()
    }

    /// Rejoin the shared timeline at the cached server song and position
    fn rejoin_live(&mut self) -> Result<(), SinkError> {
        let Some(song) = self.server_song.clone() else {
            return Ok(());
        };
        self.mode = PlayMode::Live;
        self.position_secs = self.server_position;
        self.current_song = Some(song);
        self.local_queue.replace_all(Vec::new());
        self.playing_locally = !self.server_paused;
        self.bind_current()?;
        // Force the clock even when the song was already bound.
        self.sink.set_position(self.position_secs);
        if self.playing_locally {
            self.sink.play()?;
        } else {
            self.sink.pause();
        }
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), SinkError> {
        if self.playing_locally == playing {
            return Ok(());
        }
        self.playing_locally = playing;
        if self.current_song.is_some() {
            if playing {
                self.sink.play()?;
            } else {
                self.sink.pause();
            }
        }
        Ok(())
    }

    /// Bind the current song's stream to the sink
    ///
    /// Issues a load only when the resolved URL differs from the bound one.
    /// The first bind of the session seeks the sink to the stored position; a
    /// same-song rebind (quality change) keeps the sink's own clock; any
    /// other bind seeks to the position chosen by the transition.
    fn bind_current(&mut self) -> Result<(), SinkError> {
        let (song_id, title, url) = match &self.current_song {
            Some(song) => match song.stream_for(&self.stream_quality) {
                Some(url) => (song.id.clone(), song.title.clone(), url.to_string()),
                None => {
                    warn!(song = %song.title, "No playable stream for song");
                    return Err(SinkError::Load(format!("no playable stream for {}", song.id)));
                }
            },
            None => return Ok(()),
        };

        if self.bound_url.as_deref() == Some(url.as_str()) {
            return Ok(());
        }

        let same_song = self.bound_song_id.as_deref() == Some(song_id.as_str());
        let previous_clock = self.sink.position();

        debug!(song = %title, same_song, "Binding stream to sink");
        self.sink.load(&url)?;
        self.bound_url = Some(url);
        self.bound_song_id = Some(song_id);

        if !self.initial_seek_done {
            self.sink.set_position(self.position_secs);
            self.initial_seek_done = true;
        } else if same_song {
            // Quality-driven rebind mid-song: keep the audible position.
            self.sink.set_position(previous_clock);
            self.position_secs = previous_clock;
        } else {
            self.sink.set_position(self.position_secs);
        }

        if self.playing_locally {
            self.sink.play()?;
        }
        Ok(())
    }
}
