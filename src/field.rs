//! Per-field input state shared by all validators.
//!
//! Every field transform is a pure function from raw text (plus contextual
//! data) to a [`FieldInput`], an immutable snapshot that is replaced wholesale
//! on each keystroke. Errors carry a lazy/immediate visibility flag: a lazy
//! error is computed but withheld from display until the user has had a full
//! opportunity to complete the field (blur or submit).

use std::fmt;

/// The fields a card form can hold, in primary-field advancement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Primary account number.
    Number,
    /// Expiration month/year.
    Expiration,
    /// Security code.
    Cvc,
    /// Cardholder name.
    HolderName,
    /// Contact email.
    Email,
    /// Contact phone number.
    PhoneNumber,
}

impl FieldKind {
    /// Fixed focus-advancement order: number, expiration, cvc, holder name,
    /// email, phone.
    pub const ORDER: [FieldKind; 6] = [
        FieldKind::Number,
        FieldKind::Expiration,
        FieldKind::Cvc,
        FieldKind::HolderName,
        FieldKind::Email,
        FieldKind::PhoneNumber,
    ];
}

/// Why a field's current text does not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorCode {
    /// Nothing entered yet.
    Empty,
    /// Fewer digits than the shortest acceptable form.
    TooShort,
    /// More characters than any acceptable form.
    TooLong,
    /// Luhn checksum failed.
    ChecksumFailed,
    /// Detected brand is not in the accepted-brands list.
    BrandNotAccepted,
    /// Month outside 1-12.
    InvalidMonth,
    /// Month/year is in the past.
    Expired,
    /// Length does not match the brand's security-code length.
    WrongLength,
    /// Input does not match the field's expected shape.
    Malformed,
}

impl fmt::Display for FieldErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Empty => "field is empty",
            Self::TooShort => "input is too short",
            Self::TooLong => "input is too long",
            Self::ChecksumFailed => "checksum failed",
            Self::BrandNotAccepted => "card brand is not accepted",
            Self::InvalidMonth => "month must be 01-12",
            Self::Expired => "card is expired",
            Self::WrongLength => "wrong length",
            Self::Malformed => "input is malformed",
        };
        f.write_str(text)
    }
}

/// A validation error with its display visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    /// What went wrong.
    pub code: FieldErrorCode,
    /// True while the error should be withheld from display.
    pub lazy: bool,
}

impl FieldError {
    /// An error withheld until blur/submit.
    #[inline]
    pub const fn lazy(code: FieldErrorCode) -> Self {
        Self { code, lazy: true }
    }

    /// An error surfaced immediately.
    #[inline]
    pub const fn immediate(code: FieldErrorCode) -> Self {
        Self { code, lazy: false }
    }

    /// The same error with the lazy flag cleared.
    #[inline]
    pub const fn promoted(self) -> Self {
        Self {
            code: self.code,
            lazy: false,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl std::error::Error for FieldError {}

/// Immutable per-field state: the raw text, the normalized value when the
/// text validates, and the error when it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInput<T> {
    raw: String,
    value: Option<T>,
    error: Option<FieldError>,
}

impl<T> FieldInput<T> {
    /// A valid field holding a normalized value.
    pub fn valid(raw: impl Into<String>, value: T) -> Self {
        Self {
            raw: raw.into(),
            value: Some(value),
            error: None,
        }
    }

    /// An invalid field holding an error.
    pub fn invalid(raw: impl Into<String>, error: FieldError) -> Self {
        Self {
            raw: raw.into(),
            value: None,
            error: Some(error),
        }
    }

    /// The text exactly as entered.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized value, when valid.
    #[inline]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The validation error, when invalid.
    #[inline]
    pub fn error(&self) -> Option<FieldError> {
        self.error
    }

    /// The error only once it should be shown (immediate, or promoted).
    #[inline]
    pub fn displayed_error(&self) -> Option<FieldError> {
        self.error.filter(|e| !e.lazy)
    }

    /// True when the field holds a normalized value and no error.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && self.error.is_none()
    }

    /// The same state with any lazy error promoted to immediate.
    ///
    /// Used by validate-now (submit without prior interaction) to flip every
    /// field's error visibility at once.
    pub fn with_errors_promoted(self) -> Self {
        Self {
            error: self.error.map(FieldError::promoted),
            ..self
        }
    }
}

impl<T> Default for FieldInput<T> {
    fn default() -> Self {
        Self::invalid("", FieldError::lazy(FieldErrorCode::Empty))
    }
}
