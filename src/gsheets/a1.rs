//! A1 reference parsing and formatting.
//!
//! Converts between spreadsheet cell references ("B4", "AA100") and 1-based
//! row/column coordinates. Column letters are positional base-26 without a zero
//! digit: A=1 ... Z=26, AA=27.
//!
//! ```
//! use gsheets_mcp::a1::{decode, encode};
//!
//! let cell = decode("B4").unwrap();
//! assert_eq!((cell.row, cell.column), (4, 2));
//! assert_eq!(encode(cell), "B4");
//! ```

use crate::error::{Result, SheetsError};
use std::fmt;
use std::str::FromStr;

/// A 1-based cell position. Only obtainable by decoding an A1 reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoordinate {
    pub row: u32,
    pub column: u32,
}

impl CellCoordinate {
    /// The top-left cell of a sheet.
    pub const ORIGIN: CellCoordinate = CellCoordinate { row: 1, column: 1 };

    /// Offset by a zero-based number of rows and columns.
    pub(crate) fn offset(self, rows: u32, columns: u32) -> CellCoordinate {
        CellCoordinate {
            row: self.row.saturating_add(rows),
            column: self.column.saturating_add(columns),
        }
    }
}

/// Parse an A1 reference: `[A-Z]+[1-9][0-9]*`. Rows with leading zeros are
/// rejected so every accepted reference encodes back to itself.
pub fn decode(reference: &str) -> Result<CellCoordinate> {
    let invalid = || SheetsError::InvalidReference(reference.to_string());

    let split = reference
        .find(|c: char| !c.is_ascii_uppercase())
        .ok_or_else(invalid)?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty()
        || digits.is_empty()
        || digits.starts_with('0')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let column = letters_to_column(letters).ok_or_else(invalid)?;
    let row: u32 = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }

    Ok(CellCoordinate { row, column })
}

/// Format a coordinate back into A1 notation.
pub fn encode(coord: CellCoordinate) -> String {
    format!("{}{}", column_to_letters(coord.column), coord.row)
}

/// 1 -> "A", 26 -> "Z", 27 -> "AA". Column 0 has no letters.
pub fn column_to_letters(column: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// "A" -> 1, "AA" -> 27. `None` on overflow or non-uppercase input.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add(u32::from(b - b'A') + 1)
    })
}

/// A1 range spanning `rows` x `columns` cells from `origin`, e.g. `A1:C3`.
pub fn range_a1(origin: CellCoordinate, rows: u32, columns: u32) -> String {
    let end = origin.offset(rows.saturating_sub(1), columns.saturating_sub(1));
    format!("{}:{}", encode(origin), encode(end))
}

impl fmt::Display for CellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(*self))
    }
}

impl FromStr for CellCoordinate {
    type Err = SheetsError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_references() {
        assert_eq!(decode("A1").unwrap(), CellCoordinate { row: 1, column: 1 });
        assert_eq!(decode("B4").unwrap(), CellCoordinate { row: 4, column: 2 });
        assert_eq!(decode("Z10").unwrap(), CellCoordinate { row: 10, column: 26 });
        assert_eq!(decode("AA1").unwrap().column, 27);
        assert_eq!(decode("AZ1").unwrap().column, 52);
        assert_eq!(decode("BA1").unwrap().column, 53);
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in ["", "4B", "B0", "B", "12", "b4", "B4C", "B-4", " B4", "B04x"] {
            match decode(bad) {
                Err(SheetsError::InvalidReference(text)) => assert_eq!(text, bad),
                other => panic!("expected InvalidReference for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn rejects_column_overflow() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(decode(&huge).is_err());
    }

    #[test]
    fn encode_inverts_decode() {
        for reference in ["A1", "B4", "C4", "Z26", "AA27", "ZZ702", "AAA1000", "XFD1048576"] {
            assert_eq!(encode(decode(reference).unwrap()), reference);
        }
    }

    #[test]
    fn column_letters_roundtrip_over_a_span() {
        for column in 1..=2000 {
            let letters = column_to_letters(column);
            assert_eq!(letters_to_column(&letters), Some(column));
        }
    }

    #[test]
    fn leading_zero_rows_are_rejected() {
        for bad in ["B04", "A01", "C007"] {
            assert!(
                matches!(decode(bad), Err(SheetsError::InvalidReference(_))),
                "{}",
                bad
            );
        }
        assert_eq!(encode(decode("B40").unwrap()), "B40");
    }

    #[test]
    fn range_spans_bounding_box() {
        assert_eq!(range_a1(CellCoordinate::ORIGIN, 3, 2), "A1:B3");
        assert_eq!(range_a1(CellCoordinate::ORIGIN, 1, 1), "A1:A1");
        assert_eq!(range_a1(decode("C2").unwrap(), 2, 27), "C2:AC3");
    }
}
