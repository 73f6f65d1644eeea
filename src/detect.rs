//! Card brand detection using IIN prefix matching.
//!
//! The Issuer Identification Number (IIN) is the leading digits of a PAN.
//! This module classifies a digit prefix into a [`CardBrand`] using ordered
//! pattern matching; the first matching rule wins.
//!
//! Detection is re-evaluated on every number-field change rather than cached:
//! some brands are identified from a single digit (`4` is already Visa) while
//! others need two or three (`35` alone is still [`CardBrand::Unknown`]; only
//! `353`..`358` is JCB).

use crate::brand::CardBrand;

/// Detects the card brand from a sequence of digits.
///
/// Total over all inputs: a prefix outside every documented range (including
/// a prefix that is still too short to decide) yields [`CardBrand::Unknown`].
/// Once a rule matches, appending further digits never changes the result.
///
/// # Arguments
///
/// * `digits` - A slice of digits (0-9); any length, typically the PAN so far.
///
/// # Example
///
/// ```
/// use cardform::detect::detect_brand;
/// use cardform::CardBrand;
///
/// assert_eq!(detect_brand(&[4]), CardBrand::Visa);
/// assert_eq!(detect_brand(&[3, 5]), CardBrand::Unknown);
/// assert_eq!(detect_brand(&[3, 5, 3]), CardBrand::Jcb);
/// ```
#[inline]
pub fn detect_brand(digits: &[u8]) -> CardBrand {
    // Match on prefixes - order matters for overlapping ranges
    match digits {
        // Visa: 4
        [4, ..] => CardBrand::Visa,

        // Mastercard: 51-55 or 2221-2720
        [5, 1..=5, ..] => CardBrand::Mastercard,
        [2, 2, 2, 1..=9, ..] => CardBrand::Mastercard, // 2221-2229
        [2, 2, 3..=9, _, ..] => CardBrand::Mastercard, // 2230-2299
        [2, 3..=6, _, _, ..] => CardBrand::Mastercard, // 2300-2699
        [2, 7, 0..=1, _, ..] => CardBrand::Mastercard, // 2700-2719
        [2, 7, 2, 0, ..] => CardBrand::Mastercard,     // 2720

        // American Express: 34 or 37
        [3, 4, ..] | [3, 7, ..] => CardBrand::Amex,

        // Diners Club: 300-305, 36, 38
        [3, 0, 0..=5, ..] => CardBrand::DinersClub,
        [3, 6, ..] | [3, 8, ..] => CardBrand::DinersClub,

        // JCB: 353-358
        [3, 5, 3..=8, ..] => CardBrand::Jcb,

        // Discover: 6011 or 65
        [6, 0, 1, 1, ..] => CardBrand::Discover,
        [6, 5, ..] => CardBrand::Discover,

        _ => CardBrand::Unknown,
    }
}

/// Detects the card brand from raw text, ignoring non-digit characters.
///
/// Convenience wrapper used by the formatter and the number transform, which
/// both receive delimiter-laden input.
#[inline]
pub fn detect_brand_str(input: &str) -> CardBrand {
    let digits: Vec<u8> = input
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(|c| (c as u8) - b'0')
        .collect();
    detect_brand(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(s: &str) -> CardBrand {
        detect_brand_str(s)
    }

    #[test]
    fn test_visa_single_digit() {
        assert_eq!(detect("4"), CardBrand::Visa);
        assert_eq!(detect("4242424242424242"), CardBrand::Visa);
    }

    #[test]
    fn test_mastercard_51_55() {
        assert_eq!(detect("51"), CardBrand::Mastercard);
        assert_eq!(detect("55"), CardBrand::Mastercard);
        assert_eq!(detect("5555555555554444"), CardBrand::Mastercard);
        // 50 and 56 are not Mastercard
        assert_eq!(detect("50"), CardBrand::Unknown);
        assert_eq!(detect("56"), CardBrand::Unknown);
    }

    #[test]
    fn test_mastercard_2_series() {
        assert_eq!(detect("2221"), CardBrand::Mastercard);
        assert_eq!(detect("2720"), CardBrand::Mastercard);
        assert_eq!(detect("2300"), CardBrand::Mastercard);
        assert_eq!(detect("2699"), CardBrand::Mastercard);
        // Just outside the range
        assert_eq!(detect("2220"), CardBrand::Unknown);
        assert_eq!(detect("2721"), CardBrand::Unknown);
    }

    #[test]
    fn test_amex() {
        assert_eq!(detect("34"), CardBrand::Amex);
        assert_eq!(detect("37"), CardBrand::Amex);
        assert_eq!(detect("378282246310005"), CardBrand::Amex);
    }

    #[test]
    fn test_diners() {
        assert_eq!(detect("300"), CardBrand::DinersClub);
        assert_eq!(detect("305"), CardBrand::DinersClub);
        assert_eq!(detect("36"), CardBrand::DinersClub);
        assert_eq!(detect("38"), CardBrand::DinersClub);
        assert_eq!(detect("30569309025904"), CardBrand::DinersClub);
        // 306-309 are not Diners here
        assert_eq!(detect("306"), CardBrand::Unknown);
    }

    #[test]
    fn test_jcb_needs_three_digits() {
        assert_eq!(detect("3"), CardBrand::Unknown);
        assert_eq!(detect("35"), CardBrand::Unknown);
        assert_eq!(detect("353"), CardBrand::Jcb);
        assert_eq!(detect("358"), CardBrand::Jcb);
        assert_eq!(detect("3530111333300000"), CardBrand::Jcb);
        assert_eq!(detect("352"), CardBrand::Unknown);
        assert_eq!(detect("359"), CardBrand::Unknown);
    }

    #[test]
    fn test_discover() {
        assert_eq!(detect("6011"), CardBrand::Discover);
        assert_eq!(detect("65"), CardBrand::Discover);
        assert_eq!(detect("6011111111111117"), CardBrand::Discover);
        // 60 alone is undecided, 64 never matches
        assert_eq!(detect("60"), CardBrand::Unknown);
        assert_eq!(detect("601"), CardBrand::Unknown);
        assert_eq!(detect("64"), CardBrand::Unknown);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(detect(""), CardBrand::Unknown);
        assert_eq!(detect("1"), CardBrand::Unknown);
        assert_eq!(detect("9999"), CardBrand::Unknown);
    }

    #[test]
    fn test_detection_stable_under_appends() {
        // Once a brand matches, appending digits never un-matches it
        let mut prefix = String::from("4");
        for d in "242424242424242".chars() {
            assert_eq!(detect(&prefix), CardBrand::Visa);
            prefix.push(d);
        }
        assert_eq!(detect(&prefix), CardBrand::Visa);
    }

    #[test]
    fn test_ignores_delimiters() {
        assert_eq!(detect("4242 4242"), CardBrand::Visa);
        assert_eq!(detect("3782 822463"), CardBrand::Amex);
    }
}
