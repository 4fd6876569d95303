//! Turns a station selection request into a concrete set of station identifiers.

use crate::error::HydatError;
use crate::stations::directory::StationDirectory;
use std::collections::BTreeSet;

/// Placeholder some callers pass to mean "every station"; it is rejected.
pub const ALL_STATIONS_SENTINEL: &str = "ALL";

/// The outcome of resolving a request against a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationSelection {
    /// What the caller asked for: the explicit list, or the stations of the requested
    /// jurisdictions, or the whole directory.
    pub requested: BTreeSet<String>,
    /// The requested stations present in the directory.
    pub matched: BTreeSet<String>,
    /// Explicitly requested identifiers that are not in the directory.
    pub unknown: BTreeSet<String>,
}

/// Trims, upper-cases and deduplicates identifiers or jurisdiction codes. Blank entries
/// are dropped.
pub fn normalize_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    ids.into_iter()
        .map(|id| id.trim().to_ascii_uppercase())
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn check_sentinel<'a>(ids: impl IntoIterator<Item = &'a String>) -> Result<(), HydatError> {
    if ids.into_iter().any(|id| id.eq_ignore_ascii_case(ALL_STATIONS_SENTINEL)) {
        return Err(HydatError::invalid(
            "Deprecated behaviour. Omit the station_number = \"ALL\" argument to select all stations",
        ));
    }
    Ok(())
}

/// Resolves an explicit list, else a jurisdiction list, else the whole directory.
///
/// Unknown explicit identifiers are not an error; they end up in
/// [`StationSelection::unknown`] and are reported as missing later.
///
/// # Errors
///
/// [`HydatError::InvalidArgument`] when the explicit list contains the `"ALL"` sentinel.
pub fn resolve(
    directory: &StationDirectory,
    explicit: Option<&[String]>,
    jurisdictions: Option<&[String]>,
) -> Result<StationSelection, HydatError> {
    if let Some(ids) = explicit {
        let requested: BTreeSet<String> = normalize_ids(ids.iter().map(String::as_str))
            .into_iter()
            .collect();
        check_sentinel(&requested)?;
        let (matched, unknown): (BTreeSet<String>, BTreeSet<String>) = requested
            .iter()
            .cloned()
            .partition(|id| directory.contains(id));
        return Ok(StationSelection {
            requested,
            matched,
            unknown,
        });
    }

    let matched = match jurisdictions {
        Some(codes) => directory.in_jurisdictions(&normalize_ids(codes.iter().map(String::as_str))),
        None => directory.ids(),
    };
    Ok(StationSelection {
        requested: matched.clone(),
        matched,
        unknown: BTreeSet::new(),
    })
}
