//! Transition policy
//!
//! Pure decision functions for how playback advances on song end, user skip,
//! seek, and the explicit return to live. The engine applies the decisions;
//! nothing here touches state or the media sink.

use super::types::PlayMode;

/// What to do when the bound song plays to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    /// Live: bind the server-queue head and keep mirroring
    AdvanceServer,
    /// Local: pop and bind the local-queue head
    AdvanceLocal,
    /// Local queue exhausted: rejoin the shared timeline
    ReturnToLive,
    /// Nothing to advance to
    Stay,
}

/// Decide the song-end transition
pub fn on_song_end(
    mode: PlayMode,
    local_queue_empty: bool,
    server_queue_empty: bool,
    server_song_cached: bool,
) -> EndAction {
    match mode {
        PlayMode::Live if !server_queue_empty => EndAction::AdvanceServer,
        PlayMode::Live => EndAction::Stay,
        PlayMode::Local if !local_queue_empty => EndAction::AdvanceLocal,
        PlayMode::Local if server_song_cached => EndAction::ReturnToLive,
        PlayMode::Local => EndAction::Stay,
    }
}

/// What to do on a user-initiated skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipAction {
    /// Local with queued songs: pop and bind the local-queue head
    AdvanceLocal,
    /// Local with an empty queue: advise the user, change nothing
    NotReady,
    /// Live with queued songs: take a private copy of the server queue and
    /// step away from the shared timeline
    Fork,
    /// Live with an empty server queue: fall back to a skip vote
    RequestVote,
}

/// Decide the skip transition
pub fn on_skip(mode: PlayMode, local_queue_empty: bool, server_queue_empty: bool) -> SkipAction {
    match mode {
        PlayMode::Local if !local_queue_empty => SkipAction::AdvanceLocal,
        PlayMode::Local => SkipAction::NotReady,
        PlayMode::Live if !server_queue_empty => SkipAction::Fork,
        PlayMode::Live => SkipAction::RequestVote,
    }
}

/// A manual seek is a divergence: leaving Live forks the server queue first
pub fn seek_forks(mode: PlayMode) -> bool {
    mode.is_live()
}

/// Returning to live requires a cached server song to rejoin
pub fn can_go_live(server_song_cached: bool) -> bool {
    server_song_cached
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlayMode::{Live, Local};

    #[test]
    fn test_song_end_decisions() {
        // Live follows the server queue while it has content
        assert_eq!(on_song_end(Live, true, false, true), EndAction::AdvanceServer);
        assert_eq!(on_song_end(Live, true, true, true), EndAction::Stay);

        // Local drains its own queue first
        assert_eq!(on_song_end(Local, false, false, true), EndAction::AdvanceLocal);

        // Exhausted local queue returns to live, but only with a cached song
        assert_eq!(on_song_end(Local, true, false, true), EndAction::ReturnToLive);
        assert_eq!(on_song_end(Local, true, false, false), EndAction::Stay);
    }

    #[test]
    fn test_skip_decisions() {
        assert_eq!(on_skip(Local, false, false), SkipAction::AdvanceLocal);
        assert_eq!(on_skip(Local, true, false), SkipAction::NotReady);
        assert_eq!(on_skip(Live, true, false), SkipAction::Fork);
        assert_eq!(on_skip(Live, true, true), SkipAction::RequestVote);
    }

    #[test]
    fn test_seek_forks_only_from_live() {
        assert!(seek_forks(Live));
        assert!(!seek_forks(Local));
    }

    #[test]
    fn test_go_live_needs_cached_song() {
        assert!(can_go_live(true));
        assert!(!can_go_live(false));
    }
}
