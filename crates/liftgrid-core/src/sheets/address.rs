//! A1 notation.
//!
//! The rest of the crate works with 0-based `(row, column)` pairs. These
//! helpers are the only place that adds one to the row and turns the
//! column into letters.

use std::fmt;
use std::str::FromStr;

/// Bijective base-26 column letters: `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letters(column: usize) -> String {
    let mut n = column + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letters`]. `None` for anything but ASCII letters.
fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// A single cell, optionally qualified by sheet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAddress {
    pub sheet: Option<String>,
    /// 0-based.
    pub row: usize,
    /// 0-based.
    pub column: usize,
}

impl CellAddress {
    pub fn new(row: usize, column: usize) -> Self {
        Self {
            sheet: None,
            row,
            column,
        }
    }

    pub fn on_sheet(mut self, sheet: Option<&str>) -> Self {
        self.sheet = sheet.filter(|s| !s.is_empty()).map(str::to_owned);
        self
    }

    /// The address without sheet prefix, e.g. `B3`.
    pub fn a1(&self) -> String {
        format!("{}{}", column_letters(self.column), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                write!(f, "{sheet}!")?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        f.write_str(&self.a1())
    }
}

impl FromStr for CellAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_owned());

        let (sheet, cell) = match s.rsplit_once('!') {
            Some((sheet, cell)) => {
                let sheet = sheet
                    .strip_prefix('\'')
                    .and_then(|q| q.strip_suffix('\''))
                    .map(|q| q.replace("''", "'"))
                    .unwrap_or_else(|| sheet.to_owned());
                (Some(sheet), cell)
            }
            None => (None, s),
        };

        let split = cell.find(|c: char| c.is_ascii_digit()).ok_or_else(err)?;
        let (letters, digits) = cell.split_at(split);
        let column = column_index(letters).ok_or_else(err)?;
        let row: usize = digits.parse().map_err(|_| err())?;
        if row == 0 {
            return Err(err());
        }

        Ok(Self {
            sheet,
            row: row - 1,
            column,
        })
    }
}

/// Top-left cell of an A1 range such as `B2:Z1000` or `Week1!C:H`.
///
/// Grid coordinates are relative to this cell; a column-only start
/// begins at row 1.
pub fn range_origin(range: &str) -> Result<CellAddress, AddressParseError> {
    let start = range.split(':').next().unwrap_or_default();
    let cell = start.rsplit_once('!').map_or(start, |(_, cell)| cell);
    if !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_alphabetic()) {
        let column = column_index(cell).ok_or_else(|| AddressParseError(range.to_owned()))?;
        return Ok(CellAddress::new(0, column));
    }
    let mut origin: CellAddress = cell
        .parse()
        .map_err(|_| AddressParseError(range.to_owned()))?;
    origin.sheet = None;
    Ok(origin)
}

/// Error returned when parsing an invalid A1 address.
#[derive(Debug, Clone)]
pub struct AddressParseError(pub String);

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell address: {:?}", self.0)
    }
}

impl std::error::Error for AddressParseError {}
