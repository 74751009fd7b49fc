//! Auxroom - Core Library
//!
//! Client core for shared listening rooms: every participant hears one
//! server-driven queue, while each may diverge locally (seek, skip ahead,
//! build a private queue) and return to the live stream on demand.

pub mod drift;
pub mod room;
pub mod session;
pub mod sink;
pub mod sync;
pub mod user;

// Re-exports for convenience
pub use room::{RoomClient, RoomCode, RoomError};
pub use session::{
    init_tracing, Notice, NoticeLevel, PlayerSession, SessionCallback, SessionConfig,
};
pub use sink::{MediaSink, SinkError, SinkEvent};
pub use sync::{PlayMode, PlayerStatus, Song, SyncEngine};
pub use user::{generate_user_id, UserIdentity};
