//! Security code (CVC/CVV/CID) value object and transform.
//!
//! Validation is a pure length check against the current brand: 4 digits for
//! Amex, 3 for everything else, either while the brand is still undetected.
//! The code is stored zeroed-on-drop and masked in all output, like the PAN.

use crate::brand::CardBrand;
use crate::field::{FieldError, FieldErrorCode, FieldInput};
use std::fmt;
use zeroize::Zeroize;

const MAX_CVC_DIGITS: usize = 4;

/// A validated security code.
#[derive(Clone, PartialEq, Eq)]
pub struct Cvc {
    digits: [u8; MAX_CVC_DIGITS],
    length: u8,
}

impl Cvc {
    /// The code as a string, for token-request assembly only.
    pub fn unmasked(&self) -> String {
        self.digits[..self.length as usize]
            .iter()
            .map(|&d| (b'0' + d) as char)
            .collect()
    }

    /// The number of digits (3 or 4).
    #[inline]
    pub const fn len(&self) -> usize {
        self.length as usize
    }

    /// True when the code holds no digits. Never the case for a value
    /// produced by [`transform_cvc`].
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Debug for Cvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cvc")
            .field("value", &"***")
            .field("length", &self.length)
            .finish()
    }
}

impl fmt::Display for Cvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", "*".repeat(self.length as usize))
    }
}

impl Drop for Cvc {
    fn drop(&mut self) {
        self.digits.zeroize();
    }
}

/// Transforms raw security-code text into field state for the given brand.
///
/// Empty input is a lazy error; any other length mismatch for the brand, or
/// a non-digit character, is immediate. When the brand changes (a `34` prefix
/// turns the number into Amex) the form re-runs this transform so a
/// previously valid 3-digit code is re-flagged.
///
/// # Example
///
/// ```
/// use cardform::cvc::transform_cvc;
/// use cardform::CardBrand;
///
/// assert!(transform_cvc("123", CardBrand::Visa).is_valid());
/// assert!(transform_cvc("1234", CardBrand::Amex).is_valid());
/// assert!(!transform_cvc("123", CardBrand::Amex).is_valid());
/// ```
pub fn transform_cvc(raw: &str, brand: CardBrand) -> FieldInput<Cvc> {
    if raw.is_empty() {
        return FieldInput::invalid(raw, FieldError::lazy(FieldErrorCode::Empty));
    }
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::Malformed));
    }
    if !brand.cvc_lengths().contains(&(raw.len() as u8)) {
        return FieldInput::invalid(raw, FieldError::immediate(FieldErrorCode::WrongLength));
    }

    let mut digits = [0u8; MAX_CVC_DIGITS];
    for (i, c) in raw.chars().enumerate() {
        digits[i] = (c as u8) - b'0';
    }

    FieldInput::valid(
        raw,
        Cvc {
            digits,
            length: raw.len() as u8,
        },
    )
}
