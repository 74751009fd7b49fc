//! Room API access: HTTP client, room codes, and wire types

pub mod client;
pub mod code;
pub mod types;

pub use client::{RoomClient, RoomError};
pub use code::RoomCode;
