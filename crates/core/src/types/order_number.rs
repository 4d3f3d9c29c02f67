//! Human-readable order number.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building or parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// Input does not start with the order prefix.
    #[error("order number must start with \"{prefix}-\"")]
    MissingPrefix {
        /// Expected prefix.
        prefix: &'static str,
    },
    /// The date segment is not a valid `YYYYMMDD` date.
    #[error("order number has an invalid date segment")]
    InvalidDate,
    /// The token segment has the wrong length or alphabet.
    #[error("order number token must be {len} characters from the Crockford base32 alphabet")]
    InvalidToken {
        /// Expected token length.
        len: usize,
    },
}

/// An order number such as `BK-20261018-7QK2M9XA`.
///
/// The date is the UTC day the order was placed; the token is random.
/// Uniqueness is enforced by storage, not by this type.
///
/// ## Examples
///
/// ```
/// use bookshelf_core::OrderNumber;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
/// let number = OrderNumber::new(date, "7QK2M9XA").unwrap();
/// assert_eq!(number.as_str(), "BK-20261018-7QK2M9XA");
/// assert_eq!(OrderNumber::parse("BK-20261018-7QK2M9XA").unwrap(), number);
///
/// assert!(OrderNumber::new(date, "lowercase").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix of every order number.
    pub const PREFIX: &'static str = "BK";

    /// Length of the random token segment.
    pub const TOKEN_LEN: usize = 8;

    /// Crockford base32 alphabet (no I, L, O, U).
    pub const TOKEN_ALPHABET: &'static [u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

    /// Build an order number from a placement date and a random token.
    ///
    /// # Errors
    ///
    /// Returns `OrderNumberError::InvalidToken` if the token is not
    /// `TOKEN_LEN` characters from `TOKEN_ALPHABET`.
    pub fn new(date: NaiveDate, token: &str) -> Result<Self, OrderNumberError> {
        validate_token(token)?;
        Ok(Self(format!(
            "{}-{}-{token}",
            Self::PREFIX,
            date.format("%Y%m%d")
        )))
    }

    /// Parse an `OrderNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, date or token segment is malformed.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let missing_prefix = OrderNumberError::MissingPrefix {
            prefix: Self::PREFIX,
        };
        let rest = s
            .strip_prefix(Self::PREFIX)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or(missing_prefix)?;
        let (date, token) = rest.split_once('-').ok_or(OrderNumberError::InvalidDate)?;
        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| OrderNumberError::InvalidDate)?;
        Self::new(date, token)
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn validate_token(token: &str) -> Result<(), OrderNumberError> {
    let valid = token.len() == OrderNumber::TOKEN_LEN
        && token
            .bytes()
            .all(|b| OrderNumber::TOKEN_ALPHABET.contains(&b));
    if valid {
        Ok(())
    } else {
        Err(OrderNumberError::InvalidToken {
            len: OrderNumber::TOKEN_LEN,
        })
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn test_new_formats_date_and_token() {
        let number = OrderNumber::new(date(), "ABCDEFGH").unwrap();
        assert_eq!(number.as_str(), "BK-20260105-ABCDEFGH");
    }

    #[test]
    fn test_token_length_enforced() {
        assert!(matches!(
            OrderNumber::new(date(), "ABC"),
            Err(OrderNumberError::InvalidToken { len: 8 })
        ));
    }

    #[test]
    fn test_ambiguous_letters_rejected() {
        // I, L, O and U are excluded from Crockford base32.
        assert!(OrderNumber::new(date(), "ABCDEFGI").is_err());
        assert!(OrderNumber::new(date(), "0000000O").is_err());
    }

    #[test]
    fn test_parse_rejects_legacy_format() {
        assert!(matches!(
            OrderNumber::parse("ORD-12-1760745600"),
            Err(OrderNumberError::MissingPrefix { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        assert_eq!(
            OrderNumber::parse("BK-20261345-ABCDEFGH"),
            Err(OrderNumberError::InvalidDate)
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let number = OrderNumber::new(date(), "Z9Y8X7W6").unwrap();
        assert_eq!(number.as_str().parse::<OrderNumber>().unwrap(), number);
    }
}
