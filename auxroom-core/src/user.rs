//! Participant identity
//!
//! User ids are generated client-side; persisting them across sessions is the
//! embedding application's concern.

use rand::Rng;

/// Characters used in the random id suffix
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random id suffix
const SUFFIX_LENGTH: usize = 9;

/// Who this client is within a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stable client-generated identifier
    pub user_id: String,
    /// Display name chosen by the user
    pub username: String,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// Generate a unique user id of the form `user_<epoch-millis>_<suffix>`
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("user_{}_{}", current_time_ms(), suffix)
}

/// Get current time in milliseconds since UNIX epoch
fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_user_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), SUFFIX_LENGTH);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_user_id();
        let b = generate_user_id();
        assert_ne!(a, b);
    }
}
