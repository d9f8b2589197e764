// SPDX-License-Identifier: MIT

//! Phone number display formatting
//!
//! Numbers are rendered as `(DD) DDDDD-DDDD`: a two digit area code followed
//! by up to nine subscriber digits. Partial input renders progressively so the
//! helpers can be applied on every keystroke.

/// Number of digits a complete phone number carries
pub const MAX_DIGITS: usize = 11;

/// Length of a complete formatted number, `(DD) DDDDD-DDDD`
pub const FORMATTED_LEN: usize = 15;

/// Keep only ASCII digits
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Render raw input as a display phone number
///
/// Digits beyond the eleventh are dropped.
pub fn format(raw: &str) -> String {
    let digits = digits_only(raw);
    let digits = &digits[..digits.len().min(MAX_DIGITS)];

    match digits.len() {
        0..=2 => digits.to_string(),
        3..=7 => format!("({}) {}", &digits[..2], &digits[2..]),
        _ => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
    }
}

/// Strip display formatting back to digits
pub fn unformat(formatted: &str) -> String {
    digits_only(formatted)
}

/// Whether the input is a complete, fully formatted number
pub fn is_complete(formatted: &str) -> bool {
    formatted.len() == FORMATTED_LEN && format(formatted) == formatted
}
