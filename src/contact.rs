//! Cardholder name and email transforms.

use crate::field::{FieldError, FieldErrorCode, FieldInput};
use regex::Regex;
use std::sync::LazyLock;

/// RFC-light email shape: something@something.tld, no whitespace, one `@`.
/// Full RFC 5322 acceptance is the server's problem; this catches the typos
/// worth catching client-side.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern compiles"));

/// Transforms raw holder-name text into field state.
///
/// Anything non-empty after trimming is accepted; emptiness is only ever a
/// lazy error, so the field never flashes red mid-entry.
pub fn transform_holder_name(raw: &str) -> FieldInput<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Empty));
    }
    FieldInput::valid(raw, trimmed.to_owned())
}

/// Transforms raw email text into field state.
///
/// Empty input is lazy; a non-empty string that does not look like an email
/// is surfaced immediately.
///
/// # Example
///
/// ```
/// use cardform::contact::transform_email;
///
/// assert!(transform_email("test@example.com").is_valid());
/// assert!(!transform_email("not-an-email").is_valid());
/// ```
pub fn transform_email(raw: &str) -> FieldInput<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Empty));
    }
    if !EMAIL_PATTERN.is_match(trimmed) {
        return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::Malformed));
    }
    FieldInput::valid(raw, trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_name_valid() {
        let input = transform_holder_name("JANE DOE");
        assert!(input.is_valid());
        assert_eq!(input.value().unwrap(), "JANE DOE");
    }

    #[test]
    fn test_holder_name_trims() {
        let input = transform_holder_name("  JANE DOE  ");
        assert_eq!(input.value().unwrap(), "JANE DOE");
        assert_eq!(input.raw(), "  JANE DOE  ");
    }

    #[test]
    fn test_holder_name_empty_is_lazy() {
        for raw in ["", "   "] {
            let err = transform_holder_name(raw).error().unwrap();
            assert_eq!(err.code, FieldErrorCode::Empty);
            assert!(err.lazy);
        }
    }

    #[test]
    fn test_email_valid() {
        for raw in ["test@example.com", "a.b+c@sub.example.co.jp"] {
            assert!(transform_email(raw).is_valid(), "{raw}");
        }
    }

    #[test]
    fn test_email_empty_is_lazy() {
        let err = transform_email("").error().unwrap();
        assert_eq!(err.code, FieldErrorCode::Empty);
        assert!(err.lazy);
    }

    #[test]
    fn test_email_malformed_is_immediate() {
        for raw in ["plain", "two@@example.com", "no-at.example.com", "x@y", "a b@example.com"] {
            let err = transform_email(raw).error().unwrap();
            assert_eq!(err.code, FieldErrorCode::Malformed, "for {raw:?}");
            assert!(!err.lazy);
        }
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let first = transform_email("test@example.com");
        let again = transform_email(first.value().unwrap());
        assert_eq!(first.value(), again.value());
    }
}
