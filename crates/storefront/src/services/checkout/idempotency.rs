//! Client-supplied idempotency keys.

use thiserror::Error;

/// HTTP header carrying the idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Errors that can occur when parsing an [`IdempotencyKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdempotencyKeyError {
    #[error("idempotency key must not be empty")]
    Empty,
    #[error("idempotency key must be at most {max} characters")]
    TooLong { max: usize },
    #[error("idempotency key must be printable ASCII")]
    InvalidCharacter,
}

/// A token that makes repeated checkout submissions return the same order.
///
/// Keys are scoped to the customer: two customers may use the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Maximum key length.
    pub const MAX_LEN: usize = 255;

    /// Parse a key, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, too long, or not printable ASCII.
    pub fn parse(raw: &str) -> Result<Self, IdempotencyKeyError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(IdempotencyKeyError::Empty);
        }
        if key.len() > Self::MAX_LEN {
            return Err(IdempotencyKeyError::TooLong { max: Self::MAX_LEN });
        }
        if !key.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(IdempotencyKeyError::InvalidCharacter);
        }
        Ok(Self(key.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(IdempotencyKey::parse("  abc-123 ").unwrap().as_str(), "abc-123");
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert_eq!(IdempotencyKey::parse("   "), Err(IdempotencyKeyError::Empty));
        assert_eq!(
            IdempotencyKey::parse(&"k".repeat(256)),
            Err(IdempotencyKeyError::TooLong { max: 255 })
        );
        assert_eq!(
            IdempotencyKey::parse("two words"),
            Err(IdempotencyKeyError::InvalidCharacter)
        );
    }
}
