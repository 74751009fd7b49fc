//! Room Code Parsing
//!
//! Rooms are addressed by short human-friendly codes chosen by the server.

use std::fmt;

/// Maximum accepted room code length
const MAX_CODE_LENGTH: usize = 16;

/// The shared room every client lands in when none was chosen
const DEFAULT_ROOM: &str = "DEFAULT";

/// A room code that can be shared to join a room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parse a room code from user input
    ///
    /// Normalizes to uppercase alphanumerics and validates length.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized: String = input
            .chars()
            .filter(|c| c.is_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if normalized.is_empty() || normalized.len() > MAX_CODE_LENGTH {
            return None;
        }

        Some(RoomCode(normalized))
    }

    /// The default shared room
    pub fn default_room() -> Self {
        RoomCode(DEFAULT_ROOM.to_string())
    }

    /// Get the room code as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let code = RoomCode::parse("vibe-42").unwrap();
        assert_eq!(code.as_str(), "VIBE42");

        let code = RoomCode::parse(" default ").unwrap();
        assert_eq!(code.as_str(), "DEFAULT");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(RoomCode::parse("").is_none());
        assert!(RoomCode::parse("---").is_none()); // Nothing left after filtering
        assert!(RoomCode::parse("ABCDEFGHIJKLMNOPQ").is_none()); // Too long (17 chars)
    }

    #[test]
    fn test_default_room() {
        assert_eq!(RoomCode::default_room().as_str(), "DEFAULT");
        assert_eq!(format!("{}", RoomCode::default_room()), "DEFAULT");
    }
}
