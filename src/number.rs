//! Card number value object and the number-field transform.
//!
//! The PAN is held in a fixed-size array that is zeroed on drop, and the
//! `Debug`/`Display` impls only ever show the masked form. Validation runs
//! the checks in severity order: digit count against the detected brand's
//! lengths, Luhn checksum, then membership in the accepted-brands list once
//! one is known.

use crate::brand::{CardBrand, MAX_PAN_DIGITS};
use crate::detect::detect_brand;
use crate::field::{FieldError, FieldErrorCode, FieldInput};
use crate::luhn;
use crate::mask;
use std::fmt;
use zeroize::Zeroize;

/// A validated primary account number with secure memory handling.
///
/// # Security
///
/// - Digits live in a fixed array zeroed on drop
/// - `Debug` and `Display` show only the masked form
/// - The full number is reachable only through [`CardNumber::unmasked`]
#[derive(Clone, PartialEq, Eq)]
pub struct CardNumber {
    digits: [u8; MAX_PAN_DIGITS],
    digit_count: u8,
    brand: CardBrand,
}

impl CardNumber {
    fn new(brand: CardBrand, digits: [u8; MAX_PAN_DIGITS], digit_count: u8) -> Self {
        Self {
            digits,
            digit_count,
            brand,
        }
    }

    /// The brand detected from this number's prefix.
    #[inline]
    pub const fn brand(&self) -> CardBrand {
        self.brand
    }

    /// The number of digits.
    #[inline]
    pub const fn len(&self) -> usize {
        self.digit_count as usize
    }

    /// True when the number holds no digits. Never the case for a value
    /// produced by [`transform_number`].
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.digit_count == 0
    }

    /// The last four digits, safe for display.
    pub fn last_four(&self) -> String {
        let len = self.len();
        let start = len.saturating_sub(4);
        self.digits[start..len]
            .iter()
            .map(|&d| (b'0' + d) as char)
            .collect()
    }

    /// The masked form, e.g. `************4242`.
    pub fn masked(&self) -> String {
        mask::mask_digits(&self.digits[..self.len()])
    }

    /// The full number as a string.
    ///
    /// # Security Warning
    ///
    /// Exposes the full PAN. Only the token-request assembly should call
    /// this; never log the result.
    pub fn unmasked(&self) -> String {
        self.digits[..self.len()]
            .iter()
            .map(|&d| (b'0' + d) as char)
            .collect()
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardNumber")
            .field("brand", &self.brand)
            .field("number", &self.masked())
            .finish()
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.brand, self.masked())
    }
}

impl Drop for CardNumber {
    fn drop(&mut self) {
        self.digits.zeroize();
    }
}

/// Transforms raw number-field text into field state.
///
/// `accepted` is the accepted-brands list once fetched; pass `None` while it
/// is still unknown. An undetected brand validates on generic length and
/// Luhn rules until a list is known, after which it is rejected (a service
/// never accepts a brand it cannot name).
///
/// Error visibility: too-short input stays lazy while more digits may
/// arrive, as does a failed checksum below the brand's maximum length;
/// everything past the maximum, a failed checksum at full length, and a
/// rejected brand are immediate.
///
/// # Example
///
/// ```
/// use cardform::number::transform_number;
/// use cardform::CardBrand;
///
/// let input = transform_number("4242 4242 4242 4242", None);
/// assert!(input.is_valid());
/// assert_eq!(input.value().unwrap().brand(), CardBrand::Visa);
/// ```
pub fn transform_number(raw: &str, accepted: Option<&[CardBrand]>) -> FieldInput<CardNumber> {
    let mut digits = [0u8; MAX_PAN_DIGITS];
    let mut count = 0usize;

    for c in raw.chars().filter(char::is_ascii_digit) {
        if count >= MAX_PAN_DIGITS {
            return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::TooLong));
        }
        digits[count] = (c as u8) - b'0';
        count += 1;
    }

    if count == 0 {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Empty));
    }

    let brand = detect_brand(&digits[..count]);

    if count > brand.max_length() {
        return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::TooLong));
    }
    if count < brand.min_length() {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::TooShort));
    }

    if !luhn::validate(&digits[..count]) {
        // Below the maximum the user may still be typing a longer number
        let error = if count < brand.max_length() {
            FieldError::lazy(FieldErrorCode::ChecksumFailed)
        } else {
            FieldError::immediate(FieldErrorCode::ChecksumFailed)
        };
        return FieldInput::invalid(raw, error);
    }

    if let Some(accepted) = accepted {
        if brand == CardBrand::Unknown || !accepted.contains(&brand) {
            return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::BrandNotAccepted));
        }
    }

    FieldInput::valid(raw, CardNumber::new(brand, digits, count as u8))
}
