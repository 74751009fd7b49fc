//! Playback synchronization: state machine, queue, and transition policy

pub mod engine;
pub mod policy;
pub mod queue;
pub mod types;

pub use engine::{PlayerStatus, SkipOutcome, SyncEngine};
pub use queue::LocalQueue;
pub use types::{Attribution, PlayMode, RoomSnapshot, Song, StreamVariant};
