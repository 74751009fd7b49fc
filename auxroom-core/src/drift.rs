//! Shared-timeline drift detection
//!
//! Decides whether this client has drifted far enough from the room to offer
//! the return-to-live affordance. The flag only gates the affordance; it never
//! triggers automatic correction.

use crate::sync::types::PlayMode;

/// Position divergence tolerated while locally diverged (seconds)
const POSITION_TOLERANCE_SECS: f64 = 7.0;

/// Position divergence tolerated when the play/pause state disagrees (seconds)
const PLAY_STATE_TOLERANCE_SECS: f64 = 5.0;

/// Inputs for one drift evaluation, sampled from the current state
#[derive(Debug, Clone, Copy)]
pub struct DriftSample {
    pub mode: PlayMode,
    /// Bound song differs from the room's current song
    pub songs_differ: bool,
    /// Absolute difference between the local and server clocks, in seconds
    pub time_delta_secs: f64,
    /// Local play/pause state differs from the room's
    pub play_state_differs: bool,
}

/// Evaluate whether the client is out of sync with the room
pub fn is_out_of_sync(sample: DriftSample) -> bool {
    if sample.songs_differ {
        return true;
    }

    (!sample.mode.is_live() && sample.time_delta_secs > POSITION_TOLERANCE_SECS)
        || (sample.play_state_differs && sample.time_delta_secs > PLAY_STATE_TOLERANCE_SECS)
}
