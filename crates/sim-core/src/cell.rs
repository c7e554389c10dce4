//! Cell addressing, numeric parsing and formatting for table values.
//!
//! Cell contents are free-form strings that may carry currency symbols,
//! percent signs or thousands separators. Only digits, `.` and a leading `-`
//! survive parsing.

use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Fully qualified address of one cell.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub table: String,
    pub row: String,
    pub column: String,
}

impl CellRef {
    pub fn new(table: &str, row: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            row: row.to_string(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{} / {}]", self.table, self.row, self.column)
    }
}

/// Failure to obtain a number from a cell.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CellError {
    /// Row or column not present in the table.
    #[error("missing cell {0}")]
    MissingCell(CellRef),
    /// Cell present but its contents do not parse as a number.
    #[error("malformed number {raw:?} in {cell}")]
    MalformedNumber { cell: CellRef, raw: String },
}

impl CellError {
    pub fn cell(&self) -> &CellRef {
        match self {
            CellError::MissingCell(cell) => cell,
            CellError::MalformedNumber { cell, .. } => cell,
        }
    }
}

/// Raw contents that could not be read as a number.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("not a number: {0:?}")]
pub struct NotANumber(pub String);

/// Parse a free-form numeric cell.
///
/// A `-` is kept only when it precedes every retained digit, so "1-2" parses
/// as `12` while "-$1,200.50" parses as `-1200.5`. Only the leading numeric
/// run is read: "1.2.3" parses as `1.2`.
pub fn parse_number(raw: &str) -> Result<f64, NotANumber> {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() || c == '.' {
            cleaned.push(c);
        } else if c == '-' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }
    match numeric_prefix(&cleaned).parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(NotANumber(raw.to_string())),
    }
}

/// Longest `-?digits[.digits]` prefix. `s` holds ASCII only.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    &s[..end]
}

/// Round to `precision` decimal places and render for storage.
pub fn format_value(value: f64, precision: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => d
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string(),
        None => "0".to_string(),
    }
}

/// Render a whole-number value (population, facility counts).
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    format!("{}", value.round() as i64)
}

/// Round a value the same way [`format_value`] would, keeping it numeric.
pub fn round_to(value: f64, precision: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_currency_and_separators() {
        assert_eq!(parse_number("$1,284,040.50").unwrap(), 1_284_040.5);
        assert_eq!(parse_number("45%").unwrap(), 45.0);
        assert_eq!(parse_number("  0.62 ").unwrap(), 0.62);
    }

    #[test]
    fn keeps_only_leading_minus() {
        assert_eq!(parse_number("-$1,200.50").unwrap(), -1200.5);
        assert_eq!(parse_number("1-2").unwrap(), 12.0);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(parse_number("").is_err());
        assert!(parse_number("n/a").is_err());
        assert!(parse_number("-").is_err());
        assert!(parse_number(".").is_err());
    }

    #[test]
    fn reads_leading_numeric_run() {
        assert_eq!(parse_number("1.2.3").unwrap(), 1.2);
        assert_eq!(parse_number("1..5").unwrap(), 1.0);
        assert_eq!(parse_number("v2.0.1").unwrap(), 2.0);
        assert_eq!(parse_number(".5").unwrap(), 0.5);
    }

    #[test]
    fn formats_with_precision() {
        assert_eq!(format_value(0.123456, 4), "0.1235");
        assert_eq!(format_value(1111.0, 4), "1111");
        assert_eq!(format_value(f64::NAN, 4), "0");
        assert_eq!(format_count(1_234_567.6), "1234568");
        assert!((round_to(0.123456, 4) - 0.1235).abs() < 1e-12);
    }

    #[test]
    fn cell_ref_display() {
        let c = CellRef::new("metrics", "GDP", "Value");
        assert_eq!(c.to_string(), "metrics[GDP / Value]");
    }

    proptest! {
        #[test]
        fn formatted_values_parse_back(v in -1.0e9f64..1.0e9) {
            let s = format_value(v, 4);
            let back = parse_number(&s).unwrap();
            prop_assert!((back - v).abs() <= 0.00005 + 1e-9);
        }
    }
}
