//! Cell values and wide rows as they come out of the archive or a CSV feed.

use std::collections::BTreeMap;
use std::fmt;

static NULL_CELL: Cell = Cell::Null;

/// A single untyped value from a source row.
///
/// Archive scans produce `Int`/`Float`/`Text` according to the SQLite storage class of the
/// value; CSV feeds produce `Text` only. The typed accessors convert between the two worlds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// `true` for `Null` and for blank text (CSV feeds write missing values as empty fields).
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Int(value) => Some(*value as f64),
            Cell::Float(value) => Some(*value),
            Cell::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Null => None,
            Cell::Int(value) => Some(*value),
            Cell::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Cell::Float(_) => None,
            Cell::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        match self {
            Cell::Text(text) => Some(text.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Integer flags stored as 0/1 (`RHBN`, `REAL_TIME`, `FULL_MONTH`).
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i64().map(|value| value != 0)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NA"),
            Cell::Int(value) => write!(f, "{}", value),
            Cell::Float(value) => write!(f, "{}", value),
            Cell::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(value as i64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// One row of a wide source table, keyed by column name.
///
/// Column order is not preserved; the reshape only ever looks columns up by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideRow {
    cells: BTreeMap<String, Cell>,
}

impl WideRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.insert(column.into(), cell.into());
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Like [`WideRow::get`], but an absent column reads as `Null`.
    pub fn cell(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.cell(column).as_text()
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        self.cell(column).as_f64()
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.cell(column).as_i64()
    }
}

impl FromIterator<(String, Cell)> for WideRow {
    fn from_iter<I: IntoIterator<Item = (String, Cell)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
