//! Generic wide → long reshape over a [`ColumnSpec`], and its inverse.

use crate::tidy::cell::{Cell, WideRow};
use crate::tidy::column_spec::{ColumnSpec, Subfield};
use std::collections::BTreeMap;

static NULL_CELL: Cell = Cell::Null;

/// One observation of one quantity: the id cells of the wide row it came from plus the
/// sub-field cells of that quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub ids: BTreeMap<String, Cell>,
    pub quantity: String,
    pub fields: BTreeMap<Subfield, Cell>,
}

impl LongRow {
    pub fn id(&self, column: &str) -> &Cell {
        self.ids.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn field(&self, subfield: Subfield) -> &Cell {
        self.fields.get(&subfield).unwrap_or(&NULL_CELL)
    }

    pub fn value(&self) -> Option<f64> {
        self.field(Subfield::Value).as_f64()
    }

    pub fn grade(&self) -> Option<String> {
        self.field(Subfield::Grade).as_text()
    }

    pub fn symbol(&self) -> Option<String> {
        self.field(Subfield::Symbol).as_text()
    }

    pub fn code(&self) -> Option<String> {
        self.field(Subfield::Code).as_text()
    }
}

/// Converts wide rows into one [`LongRow`] per (wide row, quantity).
///
/// A quantity is emitted for a wide row when at least one of its source columns is present
/// in that row, whatever the cell values are: a null value with a grade is still emitted,
/// and filtering is left to the caller. Id columns missing from a row read as `Null`.
pub fn reshape(rows: &[WideRow], id_columns: &[&str], spec: &ColumnSpec) -> Vec<LongRow> {
    let groups = spec.grouped();
    let mut long_rows = Vec::with_capacity(rows.len() * groups.len());

    for row in rows {
        let ids: BTreeMap<String, Cell> = id_columns
            .iter()
            .map(|column| (column.to_string(), row.cell(column).clone()))
            .collect();

        for (quantity, entries) in &groups {
            let fields: BTreeMap<Subfield, Cell> = entries
                .iter()
                .filter_map(|entry| {
                    row.get(&entry.source)
                        .map(|cell| (entry.subfield, cell.clone()))
                })
                .collect();

            if fields.is_empty() {
                continue;
            }
            long_rows.push(LongRow {
                ids: ids.clone(),
                quantity: quantity.to_string(),
                fields,
            });
        }
    }

    long_rows
}

/// Pivots long rows back into wide rows using the same spec.
///
/// Consecutive long rows with identical ids belong to the same wide row unless a quantity
/// repeats, which starts a new one. That is exactly how [`reshape`] emits them, so
/// `pivot_wider(reshape(rows))` reproduces `rows` for rows made of id and spec columns.
pub fn pivot_wider(long_rows: &[LongRow], spec: &ColumnSpec) -> Vec<WideRow> {
    let mut wide_rows: Vec<WideRow> = Vec::new();
    let mut current_ids: Option<&BTreeMap<String, Cell>> = None;
    let mut seen_quantities: Vec<&str> = Vec::new();

    for long in long_rows {
        let starts_new_row = current_ids != Some(&long.ids)
            || seen_quantities.contains(&long.quantity.as_str());

        if starts_new_row {
            let row: WideRow = long
                .ids
                .iter()
                .map(|(column, cell)| (column.clone(), cell.clone()))
                .collect();
            wide_rows.push(row);
            current_ids = Some(&long.ids);
            seen_quantities.clear();
        }
        seen_quantities.push(&long.quantity);

        if let Some(row) = wide_rows.last_mut() {
            for (subfield, cell) in &long.fields {
                if let Some(source) = spec.source(&long.quantity, *subfield) {
                    row.insert(source, cell.clone());
                }
            }
        }
    }

    wide_rows
}

/// Number of non-null cells in the spec's source columns, across all rows.
pub fn count_measured_cells(rows: &[WideRow], spec: &ColumnSpec) -> usize {
    rows.iter()
        .map(|row| {
            spec.entries()
                .iter()
                .filter(|entry| row.get(&entry.source).is_some_and(|cell| !cell.is_null()))
                .count()
        })
        .sum()
}

/// Number of non-null sub-field cells across long rows.
pub fn count_long_cells(long_rows: &[LongRow]) -> usize {
    long_rows
        .iter()
        .map(|row| row.fields.values().filter(|cell| !cell.is_null()).count())
        .sum()
}
