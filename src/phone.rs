//! Region-aware phone number normalization.
//!
//! Phone validation delegates to a [`PhoneNumberStrategy`]: the heuristics
//! for "how long is a plausible national number here" are locale-dependent
//! and belong to whoever embeds the form, so the strategy is a seam rather
//! than a hard-coded table. The built-in [`ExampleLengthStrategy`] compares
//! the entered digits against a per-region example national-number length
//! and emits E.164.
//!
//! Error visibility: an empty field is lazy; digits beyond what the region
//! can hold are surfaced immediately (no amount of further typing fixes
//! that); anything else that does not normalize stays lazy, because many
//! valid numbers are shorter than the example length.

use crate::field::{FieldError, FieldErrorCode, FieldInput};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ISO 3166-1 alpha-2 region with its international calling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCode {
    region: [u8; 2],
    calling_code: u16,
}

impl CountryCode {
    /// Built-in regions, alphabetical by alpha-2 code.
    pub const ALL: [CountryCode; 10] = [
        CountryCode::new(*b"AU", 61),
        CountryCode::new(*b"CA", 1),
        CountryCode::new(*b"DE", 49),
        CountryCode::new(*b"FR", 33),
        CountryCode::new(*b"GB", 44),
        CountryCode::new(*b"IT", 39),
        CountryCode::new(*b"JP", 81),
        CountryCode::new(*b"KR", 82),
        CountryCode::new(*b"SG", 65),
        CountryCode::new(*b"US", 1),
    ];

    const fn new(region: [u8; 2], calling_code: u16) -> Self {
        Self {
            region,
            calling_code,
        }
    }

    /// Looks up a built-in region by alpha-2 code, case-insensitively.
    pub fn from_region(region: &str) -> Option<Self> {
        let upper = region.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|c| c.region() == upper)
    }

    /// The alpha-2 region code, e.g. `"JP"`.
    pub fn region(&self) -> &str {
        // Region bytes are always ASCII uppercase by construction
        std::str::from_utf8(&self.region).unwrap_or("??")
    }

    /// The international calling code, e.g. `81`.
    #[inline]
    pub const fn calling_code(&self) -> u16 {
        self.calling_code
    }

    /// The dialing-code display form, e.g. `"+81"`.
    pub fn dialing_display(&self) -> String {
        format!("+{}", self.calling_code)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{})", self.region(), self.calling_code)
    }
}

/// Outcome of a strategy's attempt to normalize a phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneOutcome {
    /// Normalized to E.164, e.g. `"+819012345678"`.
    Normalized(String),
    /// More digits than the region can hold.
    TooLong,
    /// Not (yet) a plausible number for the region.
    Invalid,
}

/// Pluggable normalization heuristics for phone input.
pub trait PhoneNumberStrategy: Send + Sync {
    /// Attempts to normalize raw input for the given region.
    fn normalize(&self, raw: &str, country: CountryCode) -> PhoneOutcome;
}

/// Default strategy: national digit count must equal the region's example
/// number length.
///
/// A leading `0` trunk prefix is dropped before comparison, as is a leading
/// `+<calling code>` when the user typed the international form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExampleLengthStrategy;

impl ExampleLengthStrategy {
    /// Example national-number length for a region (trunk prefix excluded).
    fn example_length(country: CountryCode) -> usize {
        match country.region() {
            "JP" => 10,
            "DE" => 11,
            "IT" => 10,
            "SG" => 8,
            "AU" | "FR" => 9,
            _ => 10,
        }
    }

    fn national_digits(raw: &str, country: CountryCode) -> Option<String> {
        let trimmed = raw.trim();
        let (rest, international) = match trimmed.strip_prefix('+') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };
        if !rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
        {
            return None;
        }
        let mut digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
        if international {
            let prefix = country.calling_code().to_string();
            digits = digits.strip_prefix(&prefix)?.to_owned();
        }
        if let Some(stripped) = digits.strip_prefix('0') {
            digits = stripped.to_owned();
        }
        Some(digits)
    }
}

impl PhoneNumberStrategy for ExampleLengthStrategy {
    fn normalize(&self, raw: &str, country: CountryCode) -> PhoneOutcome {
        let Some(digits) = Self::national_digits(raw, country) else {
            return PhoneOutcome::Invalid;
        };
        let example = Self::example_length(country);
        match digits.len() {
            n if n > example => PhoneOutcome::TooLong,
            n if n == example => {
                PhoneOutcome::Normalized(format!("+{}{}", country.calling_code(), digits))
            }
            _ => PhoneOutcome::Invalid,
        }
    }
}

/// Transforms raw phone text into field state using the given strategy.
///
/// # Example
///
/// ```
/// use cardform::phone::{transform_phone, CountryCode, ExampleLengthStrategy};
///
/// let jp = CountryCode::from_region("JP").unwrap();
/// let input = transform_phone("090-1234-5678", jp, &ExampleLengthStrategy);
/// assert_eq!(input.value().unwrap(), "+819012345678");
/// ```
pub fn transform_phone(
    raw: &str,
    country: CountryCode,
    strategy: &dyn PhoneNumberStrategy,
) -> FieldInput<String> {
    if raw.trim().is_empty() {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Empty));
    }
    match strategy.normalize(raw, country) {
        PhoneOutcome::Normalized(e164) => FieldInput::valid(raw, e164),
        PhoneOutcome::TooLong => {
            FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::TooLong))
        }
        // Room to keep typing: many valid numbers are shorter than the
        // example length
        PhoneOutcome::Invalid => {
            FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Malformed))
        }
    }
}
