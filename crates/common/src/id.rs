//! Row identifiers.
//!
//! Every row (users, content, reactions) is keyed by a lowercase ULID, so ids
//! sort by creation time and `until_id` pagination is a plain string compare.

use ulid::Ulid;

/// Length of a generated id.
pub const ID_LEN: usize = 26;

/// ID generator for entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generate a new lowercase ULID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Whether `id` could have been produced by [`IdGenerator::generate`].
    ///
    /// Used to reject malformed path parameters before touching the database.
    #[must_use]
    pub fn is_valid(id: &str) -> bool {
        id.len() == ID_LEN && Ulid::from_string(&id.to_uppercase()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique_and_lowercase() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), ID_LEN);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_is_valid() {
        let id = IdGenerator::new().generate();
        assert!(IdGenerator::is_valid(&id));
        assert!(!IdGenerator::is_valid("not-an-id"));
        assert!(!IdGenerator::is_valid(""));
        // Right length, but 'u' is outside the Crockford alphabet.
        assert!(!IdGenerator::is_valid("uuuuuuuuuuuuuuuuuuuuuuuuuu"));
    }
}
