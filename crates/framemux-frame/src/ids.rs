//! Reserved frame identifiers.
//!
//! Identifier 1 belongs to session control and is registered by every
//! dispatcher before anything else. All other identifiers are free for
//! application handlers.

/// Session lifecycle (connect, keepalive, disconnect).
pub const SESSION_CONTROL: u8 = 1;

/// Returns a human-readable name for an identifier.
pub fn id_name(id: u8) -> &'static str {
    match id {
        SESSION_CONTROL => "SESSION_CONTROL",
        _ => "USER",
    }
}

/// Returns true if the identifier is reserved for built-in use.
pub fn is_reserved(id: u8) -> bool {
    id == SESSION_CONTROL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_control_is_reserved() {
        assert!(is_reserved(SESSION_CONTROL));
        assert_eq!(id_name(SESSION_CONTROL), "SESSION_CONTROL");
    }

    #[test]
    fn other_ids_are_user() {
        for id in [0u8, 2, 5, 255] {
            assert!(!is_reserved(id));
            assert_eq!(id_name(id), "USER");
        }
    }
}
