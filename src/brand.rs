//! Card brand definitions and per-brand validation tables.
//!
//! Each brand carries the rules the rest of the engine consults: which PAN
//! lengths it issues, how long its security code is, and how its digits are
//! grouped for display. The brand itself is always derived from the digit
//! prefix (see [`crate::detect`]), never set directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported card brands/networks.
///
/// `Unknown` is a first-class member: a PAN whose prefix matches no documented
/// rule set still flows through formatting and validation with generic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardBrand {
    /// Visa - prefix 4, length 16
    Visa,
    /// Mastercard - prefix 51-55, 2221-2720, length 16
    #[serde(rename = "MasterCard")]
    Mastercard,
    /// JCB - prefix 353-358, length 16
    #[serde(rename = "JCB")]
    Jcb,
    /// American Express - prefix 34, 37, length 15
    #[serde(rename = "American Express")]
    Amex,
    /// Diners Club - prefix 300-305, 36, 38, length 14
    #[serde(rename = "Diners Club")]
    DinersClub,
    /// Discover - prefix 6011, 65, length 16
    Discover,
    /// Prefix matched no documented rule set.
    #[serde(rename = "Unknown", other)]
    Unknown,
}

/// Maximum number of digits in any supported PAN.
pub const MAX_PAN_DIGITS: usize = 16;

/// Minimum number of digits in any supported PAN.
pub const MIN_PAN_DIGITS: usize = 14;

impl CardBrand {
    /// Returns the valid PAN lengths for this brand.
    #[inline]
    pub const fn valid_lengths(&self) -> &'static [u8] {
        match self {
            Self::Visa | Self::Mastercard | Self::Jcb | Self::Discover => &[16],
            Self::Amex => &[15],
            Self::DinersClub => &[14],
            Self::Unknown => &[14, 15, 16],
        }
    }

    /// Returns true if the given digit count is valid for this brand.
    #[inline]
    pub const fn is_valid_length(&self, length: usize) -> bool {
        let valid = self.valid_lengths();
        let mut i = 0;
        while i < valid.len() {
            if valid[i] as usize == length {
                return true;
            }
            i += 1;
        }
        false
    }

    /// Returns the smallest PAN length this brand issues.
    #[inline]
    pub const fn min_length(&self) -> usize {
        self.valid_lengths()[0] as usize
    }

    /// Returns the largest PAN length this brand issues.
    #[inline]
    pub const fn max_length(&self) -> usize {
        let valid = self.valid_lengths();
        valid[valid.len() - 1] as usize
    }

    /// Returns the accepted security-code lengths for this brand.
    ///
    /// Amex prints a 4-digit code on the front; everyone else uses 3 digits.
    /// For an undetected brand both are accepted.
    #[inline]
    pub const fn cvc_lengths(&self) -> &'static [u8] {
        match self {
            Self::Amex => &[4],
            Self::Unknown => &[3, 4],
            _ => &[3],
        }
    }

    /// Returns the digit grouping used when displaying this brand's PAN.
    ///
    /// Amex groups 4-6-5, Diners 4-6-4, everything else 4-4-4-4.
    #[inline]
    pub const fn groups(&self) -> &'static [usize] {
        match self {
            Self::Amex => &[4, 6, 5],
            Self::DinersClub => &[4, 6, 4],
            _ => &[4, 4, 4, 4],
        }
    }

    /// Returns a human-readable name for the brand.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::Jcb => "JCB",
            Self::Amex => "American Express",
            Self::DinersClub => "Diners Club",
            Self::Discover => "Discover",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
