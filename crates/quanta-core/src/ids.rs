//! Identifier scheme for durable and placeholder records.
//!
//! Durable identifiers are bare UUID v4 strings handed out by a store.
//! Placeholder identifiers are synthesized when a durable write fails and
//! always carry [`PLACEHOLDER_PREFIX`], so callers (and tests) can tell a
//! degraded-mode record apart from a stored one.

use uuid::Uuid;

/// Prefix reserved for identifiers that were never written to a store.
pub const PLACEHOLDER_PREFIX: &str = "placeholder-";

/// Generate a fresh durable identifier.
pub fn durable_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a placeholder identifier for the given entity kind.
///
/// The result looks like `placeholder-session-<uuid>`. Every call yields a
/// new value; two placeholders never collide.
pub fn placeholder_id(entity: &str) -> String {
    format!("{}{}-{}", PLACEHOLDER_PREFIX, entity, Uuid::new_v4())
}

/// Check whether an identifier was synthesized in degraded mode.
pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_ids_are_detected() {
        let id = placeholder_id("session");
        assert!(id.starts_with("placeholder-session-"));
        assert!(is_placeholder_id(&id));
    }

    #[test]
    fn test_durable_ids_are_not_placeholders() {
        let id = durable_id();
        assert!(!is_placeholder_id(&id));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_placeholder_ids_never_repeat() {
        let a = placeholder_id("message");
        let b = placeholder_id("message");
        assert_ne!(a, b);
    }
}
