//! The column-spec table that drives the wide → long reshape, and the flag splitter that
//! derives such a table from compound column names.
//!
//! A source table encodes two things in its column names: the measured quantity (a day of
//! the month, `LEVEL`, `MIN`, ...) and the sub-field of that quantity (the value itself, or
//! one of its flags). The reshape never parses names at runtime; it only consults a
//! [`ColumnSpec`], which is built once per layout.

use std::fmt;

/// The sub-fields a quantity can carry in a wide layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subfield {
    Value,
    Grade,
    Symbol,
    Code,
    /// Month of an extreme (annual statistics).
    Month,
    /// Day of an extreme (monthly and annual statistics).
    Day,
}

impl Subfield {
    pub const ALL: [Subfield; 6] = [
        Subfield::Value,
        Subfield::Grade,
        Subfield::Symbol,
        Subfield::Code,
        Subfield::Month,
        Subfield::Day,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Subfield::Value => "VALUE",
            Subfield::Grade => "GRADE",
            Subfield::Symbol => "SYMBOL",
            Subfield::Code => "CODE",
            Subfield::Month => "MONTH",
            Subfield::Day => "DAY",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Subfield> {
        Subfield::ALL
            .into_iter()
            .find(|subfield| subfield.suffix().eq_ignore_ascii_case(suffix))
    }
}

impl fmt::Display for Subfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Splits a compound column name into `(quantity, subfield)`.
///
/// A name without a recognised suffix denotes the quantity's value:
/// `LEVEL` is `(LEVEL, Value)`, `LEVEL_GRADE` is `(LEVEL, Grade)` and `DRAINAGE_AREA` is
/// `(DRAINAGE_AREA, Value)` because `AREA` is not a sub-field.
pub fn split_column_name(name: &str) -> (String, Subfield) {
    match name.rsplit_once('_') {
        Some((quantity, suffix)) if !quantity.is_empty() => match Subfield::from_suffix(suffix) {
            Some(subfield) => (quantity.to_string(), subfield),
            None => (name.to_string(), Subfield::Value),
        },
        _ => (name.to_string(), Subfield::Value),
    }
}

/// One `(quantity, subfield) → source column` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntry {
    pub quantity: String,
    pub subfield: Subfield,
    pub source: String,
}

/// Ordered table of [`SpecEntry`] values. Quantities keep the order in which they were
/// first added, which is also the order of the reshaped output within a wide row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
    entries: Vec<SpecEntry>,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the source column for `(quantity, subfield)`.
    pub fn with(
        mut self,
        quantity: impl Into<String>,
        subfield: Subfield,
        source: impl Into<String>,
    ) -> Self {
        let quantity = quantity.into();
        let source = source.into();
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.quantity == quantity && entry.subfield == subfield)
        {
            Some(entry) => entry.source = source,
            None => self.entries.push(SpecEntry {
                quantity,
                subfield,
                source,
            }),
        }
        self
    }

    /// Builds the table from compound column names with [`split_column_name`], skipping the
    /// id columns.
    pub fn from_column_names<I, S>(names: I, id_columns: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| !id_columns.contains(&name.as_ref()))
            .fold(ColumnSpec::new(), |spec, name| {
                let (quantity, subfield) = split_column_name(name.as_ref());
                spec.with(quantity, subfield, name.as_ref())
            })
    }

    /// The day-of-month layout of the archive's daily tables: `FLOW1..FLOW31` for values,
    /// `FLOW_SYMBOL1..FLOW_SYMBOL31` for symbols. The quantity is the day number.
    pub fn day_columns(prefix: &str, subfields: &[Subfield]) -> Self {
        let mut spec = ColumnSpec::new();
        for day in 1..=31 {
            for subfield in subfields {
                let source = match subfield {
                    Subfield::Value => format!("{}{}", prefix, day),
                    other => format!("{}_{}{}", prefix, other.suffix(), day),
                };
                spec = spec.with(day.to_string(), *subfield, source);
            }
        }
        spec
    }

    pub fn entries(&self) -> &[SpecEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct quantities in first-seen order.
    pub fn quantities(&self) -> Vec<&str> {
        let mut quantities: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !quantities.contains(&entry.quantity.as_str()) {
                quantities.push(&entry.quantity);
            }
        }
        quantities
    }

    /// Entries grouped by quantity, in first-seen order.
    pub fn grouped(&self) -> Vec<(&str, Vec<&SpecEntry>)> {
        self.quantities()
            .into_iter()
            .map(|quantity| {
                let entries = self
                    .entries
                    .iter()
                    .filter(|entry| entry.quantity == quantity)
                    .collect();
                (quantity, entries)
            })
            .collect()
    }

    pub fn source(&self, quantity: &str, subfield: Subfield) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.quantity == quantity && entry.subfield == subfield)
            .map(|entry| entry.source.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_name_is_value() {
        assert_eq!(split_column_name("LEVEL"), ("LEVEL".to_string(), Subfield::Value));
    }

    #[test]
    fn test_split_flag_suffix() {
        assert_eq!(
            split_column_name("LEVEL_GRADE"),
            ("LEVEL".to_string(), Subfield::Grade)
        );
        assert_eq!(
            split_column_name("FLOW_CODE"),
            ("FLOW".to_string(), Subfield::Code)
        );
        assert_eq!(
            split_column_name("MIN_MONTH"),
            ("MIN".to_string(), Subfield::Month)
        );
    }

    #[test]
    fn test_split_unknown_suffix_stays_in_quantity() {
        assert_eq!(
            split_column_name("DRAINAGE_AREA"),
            ("DRAINAGE_AREA".to_string(), Subfield::Value)
        );
        assert_eq!(
            split_column_name("_GRADE"),
            ("_GRADE".to_string(), Subfield::Value)
        );
    }

    #[test]
    fn test_from_column_names_skips_ids() {
        let spec = ColumnSpec::from_column_names(
            ["STATION_NUMBER", "Date", "LEVEL", "LEVEL_GRADE", "FLOW", "FLOW_SYMBOL"],
            &["STATION_NUMBER", "Date"],
        );
        assert_eq!(spec.quantities(), vec!["LEVEL", "FLOW"]);
        assert_eq!(spec.source("LEVEL", Subfield::Grade), Some("LEVEL_GRADE"));
        assert_eq!(spec.source("FLOW", Subfield::Value), Some("FLOW"));
        assert_eq!(spec.source("FLOW", Subfield::Grade), None);
        assert_eq!(spec.len(), 4);
    }

    #[test]
    fn test_day_columns_layout() {
        let spec = ColumnSpec::day_columns("FLOW", &[Subfield::Value, Subfield::Symbol]);
        assert_eq!(spec.len(), 62);
        assert_eq!(spec.quantities().len(), 31);
        assert_eq!(spec.source("1", Subfield::Value), Some("FLOW1"));
        assert_eq!(spec.source("31", Subfield::Symbol), Some("FLOW_SYMBOL31"));
    }

    #[test]
    fn test_with_replaces_existing_entry() {
        let spec = ColumnSpec::new()
            .with("MIN", Subfield::Day, "MIN_DAY")
            .with("MIN", Subfield::Day, "FIRST_DAY_MIN");
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.source("MIN", Subfield::Day), Some("FIRST_DAY_MIN"));
    }
}
