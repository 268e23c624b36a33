//! Path segment parsing.

use crate::error::ApiError;

/// How a record is addressed in the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    /// All-digit segment.
    Id(u64),
    /// Symbolic code, `[A-Za-z0-9_-]+` with at least one non-digit.
    Code(String),
}

impl ResourceKey {
    /// Classify a segment.
    ///
    /// Digits select by id and must fit in `u64`. Anything else that is a
    /// valid code selects by code. Other segments address nothing.
    pub fn parse(segment: &str) -> Result<Self, ApiError> {
        if is_digits(segment) {
            return parse_id(segment).map(ResourceKey::Id);
        }
        if !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Ok(ResourceKey::Code(segment.to_string()));
        }
        Err(ApiError::UnknownKey(segment.to_string()))
    }
}

/// Parse a numeric path segment.
pub fn parse_id(segment: &str) -> Result<u64, ApiError> {
    if !is_digits(segment) {
        return Err(ApiError::InvalidId(segment.to_string()));
    }
    segment
        .parse()
        .map_err(|_| ApiError::InvalidId(segment.to_string()))
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_key() {
        assert_eq!(ResourceKey::parse("42").unwrap(), ResourceKey::Id(42));
        assert_eq!(
            ResourceKey::parse("oak-chair_2").unwrap(),
            ResourceKey::Code("oak-chair_2".into())
        );
        assert_eq!(
            ResourceKey::parse("007x").unwrap(),
            ResourceKey::Code("007x".into())
        );
        assert!(matches!(
            ResourceKey::parse("oak chair"),
            Err(ApiError::UnknownKey(_))
        ));
        assert!(matches!(ResourceKey::parse("стул"), Err(ApiError::UnknownKey(_))));
        assert!(matches!(
            ResourceKey::parse("99999999999999999999999"),
            Err(ApiError::InvalidId(_))
        ));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("0").unwrap(), 0);
        assert_eq!(parse_id("18446744073709551615").unwrap(), u64::MAX);
        assert!(parse_id("+5").is_err());
        assert!(parse_id("-5").is_err());
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }
}
