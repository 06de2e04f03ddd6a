//! Spreadsheet column labels (`A`, `Z`, `AA`, ...) and their 1-based indices.
//!
//! Labels use bijective base-26: there is no zero digit, so `Z` is 26 and
//! `AA` is 27.

use crate::error::InvalidColumnLabel;

/// Converts a column label to its 1-based index. Lowercase is accepted.
pub fn letter_to_index(label: &str) -> Result<u32, InvalidColumnLabel> {
    let invalid = || InvalidColumnLabel {
        label: label.to_string(),
    };

    if label.is_empty() {
        return Err(invalid());
    }

    let mut index: u32 = 0;
    for ch in label.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return Err(invalid());
        }
        let digit = ch as u32 - 'A' as u32 + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)?;
    }

    Ok(index)
}

/// Converts a 1-based column index back to its label.
pub fn index_to_letter(index: u32) -> String {
    debug_assert!(index > 0, "column indices are 1-based");

    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
