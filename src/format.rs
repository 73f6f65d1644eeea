//! Edit-aware input formatting for the card number and expiration fields.
//!
//! The functions here sit between raw keystroke-level text and the validated
//! field state: given the text as it stands after an edit, plus where the edit
//! happened and how many characters it inserted, they return the corrected
//! text the input field should display.
//!
//! Invariants:
//!
//! - Output contains only the input's digits, in order, interleaved with
//!   delimiters at the positions fixed by the active grouping.
//! - The grouping for the number field is recomputed from the detected brand
//!   on every call (Amex and Diners group differently from the common
//!   4-4-4-4); expiration always groups 2-2 as `MM/YY`.
//! - A delimiter is appended the moment a group completes, except once the
//!   maximum digit count is reached.
//! - Deleting a delimiter also deletes the digit before it, so backspacing
//!   over `"1234/"` collapses to `"123"` instead of bouncing back.
//! - Digits past the maximum for the active grouping are silently dropped.
//! - Re-running a formatter on its own output is a fixed point.

use crate::brand::CardBrand;
use crate::detect::detect_brand;

/// Delimiter between digit groups of a card number.
pub const PAN_DELIMITER: char = ' ';

/// Delimiter between month and year of an expiration date.
pub const EXPIRATION_DELIMITER: char = '/';

const EXPIRATION_GROUPS: &[usize] = &[2, 2];

/// Reformats the card number field after an edit.
///
/// `text` is the field content after the raw edit was applied, `edit_start`
/// the index where the edit began, and `inserted` how many characters the
/// edit inserted (`0` for a deletion).
///
/// # Example
///
/// ```
/// use cardform::format::reformat_pan;
///
/// // Completing a group appends the delimiter
/// assert_eq!(reformat_pan("4242", 3, 1), "4242 ");
/// // Backspacing the delimiter drops the digit before it
/// assert_eq!(reformat_pan("4242", 4, 0), "424");
/// // Amex regroups as 4-6-5
/// assert_eq!(reformat_pan("37828224631", 10, 1), "3782 822463 1");
/// ```
pub fn reformat_pan(text: &str, edit_start: usize, inserted: usize) -> String {
    let mut digits = extract_digits(text);
    let brand = detect_brand(&digits);
    reformat(
        &mut digits,
        text,
        edit_start,
        inserted,
        brand.groups(),
        PAN_DELIMITER,
        brand.max_length(),
    )
}

/// Reformats the expiration field after an edit.
///
/// Always groups as `MM/YY`. A leading digit of 2-9 can only mean a
/// single-digit month, so it is auto-prefixed with `0`.
///
/// # Example
///
/// ```
/// use cardform::format::reformat_expiration;
///
/// assert_eq!(reformat_expiration("1", 0, 1), "1");
/// assert_eq!(reformat_expiration("12", 1, 1), "12/");
/// assert_eq!(reformat_expiration("2", 0, 1), "02/");
/// assert_eq!(reformat_expiration("1234", 3, 1), "12/34");
/// ```
pub fn reformat_expiration(text: &str, edit_start: usize, inserted: usize) -> String {
    let mut digits = extract_digits(text);
    if let Some(&first) = digits.first() {
        if first >= 2 {
            digits.insert(0, 0);
        }
    }
    reformat(
        &mut digits,
        text,
        edit_start,
        inserted,
        EXPIRATION_GROUPS,
        EXPIRATION_DELIMITER,
        4,
    )
}

/// Formats a complete digit string for display with the brand's grouping.
///
/// Unlike the edit-aware functions this never appends a trailing delimiter;
/// it is meant for rendering stored values, not live input.
///
/// # Example
///
/// ```
/// use cardform::format::format_pan_display;
/// use cardform::CardBrand;
///
/// assert_eq!(
///     format_pan_display("4242424242424242", CardBrand::Visa),
///     "4242 4242 4242 4242"
/// );
/// assert_eq!(
///     format_pan_display("378282246310005", CardBrand::Amex),
///     "3782 822463 10005"
/// );
/// ```
pub fn format_pan_display(input: &str, brand: CardBrand) -> String {
    let digits = extract_digits(input);
    let mut out = apply_groups(&digits, brand.groups(), PAN_DELIMITER, usize::MAX);
    if out.ends_with(PAN_DELIMITER) {
        out.pop();
    }
    out
}

/// Strips everything but digits from an input string.
pub fn strip_delimiters(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn extract_digits(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| c.is_ascii_digit())
        .map(|c| (c as u8) - b'0')
        .collect()
}

fn reformat(
    digits: &mut Vec<u8>,
    text: &str,
    edit_start: usize,
    inserted: usize,
    groups: &[usize],
    delimiter: char,
    max_digits: usize,
) -> String {
    digits.truncate(max_digits);

    // A deletion that removed only a delimiter leaves the digits unchanged,
    // and canonical formatting would immediately re-insert it at the same
    // spot. Drop the digit before the deletion point instead, so backspace
    // makes progress.
    if inserted == 0 && delimiter_at(digits, groups, delimiter, max_digits, edit_start) {
        let preceding = text[..edit_start.min(text.len())]
            .chars()
            .filter(|c| c.is_ascii_digit())
            .count();
        if preceding > 0 && preceding <= digits.len() {
            digits.remove(preceding - 1);
        }
    }

    apply_groups(digits, groups, delimiter, max_digits)
}

/// Returns true when canonical formatting of `digits` places a delimiter at
/// byte index `position`.
fn delimiter_at(
    digits: &[u8],
    groups: &[usize],
    delimiter: char,
    max_digits: usize,
    position: usize,
) -> bool {
    let canonical = apply_groups(digits, groups, delimiter, max_digits);
    canonical
        .chars()
        .nth(position)
        .is_some_and(|c| c == delimiter)
}

fn apply_groups(digits: &[u8], groups: &[usize], delimiter: char, max_digits: usize) -> String {
    let mut result = String::with_capacity(digits.len() + groups.len());
    let mut pos = 0;

    for &size in groups {
        if pos >= digits.len() {
            break;
        }
        if !result.is_empty() {
            result.push(delimiter);
        }
        let end = (pos + size).min(digits.len());
        for &d in &digits[pos..end] {
            result.push((b'0' + d) as char);
        }
        pos = end;
    }

    // Append the trailing delimiter when the last group just completed and
    // more digits can still arrive
    if pos == digits.len() && digits.len() < max_digits && !digits.is_empty() {
        let consumed: usize = complete_group_digits(groups, digits.len());
        if consumed == digits.len() {
            result.push(delimiter);
        }
    }

    result
}

/// Number of digits covered by whole groups up to `len` digits.
fn complete_group_digits(groups: &[usize], len: usize) -> usize {
    let mut covered = 0;
    for &size in groups {
        if covered + size <= len {
            covered += size;
        } else {
            break;
        }
    }
    covered
}
