//! Media sink seam
//!
//! The engine drives playback through this trait so the reconciliation logic
//! stays independent of any particular audio backend.

use thiserror::Error;

/// Errors reported by a media sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to load stream: {0}")]
    Load(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

/// A controllable audio output
///
/// Implementations decode and play a stream URL and own the playback clock.
/// Commands are issued by the sync engine; completion and clock notifications
/// flow back as [`SinkEvent`]s over a channel owned by the session.
pub trait MediaSink: Send {
    /// Bind a stream URL, replacing whatever was loaded before
    fn load(&mut self, url: &str) -> Result<(), SinkError>;

    /// Start or resume audible playback
    fn play(&mut self) -> Result<(), SinkError>;

    /// Pause audible playback
    fn pause(&mut self);

    /// Current playback clock in seconds
    fn position(&self) -> f64;

    /// Force the playback clock to the given position
    fn set_position(&mut self, secs: f64);
}

/// Notifications emitted by a media sink implementation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkEvent {
    /// The bound stream played to completion
    Ended,

    /// Periodic clock tick with the current position in seconds
    TimeUpdate(f64),
}
