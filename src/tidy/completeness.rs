use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt;

/// Above this many missing stations the report only carries a count.
pub const DETAIL_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    PartialWithDetail { missing: Vec<String> },
    PartialSummaryOnly { missing_count: usize },
}

/// Which requested stations produced no data.
///
/// `unknown` lists the requested identifiers that were not in the station directory at all;
/// they are also counted as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessReport {
    pub status: Completeness,
    pub unknown: Vec<String>,
}

impl CompletenessReport {
    pub fn complete() -> Self {
        Self {
            status: Completeness::Complete,
            unknown: Vec::new(),
        }
    }

    pub fn with_unknown<I, S>(mut self, unknown: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unknown = unknown.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == Completeness::Complete
    }

    pub fn missing_count(&self) -> usize {
        match &self.status {
            Completeness::Complete => 0,
            Completeness::PartialWithDetail { missing } => missing.len(),
            Completeness::PartialSummaryOnly { missing_count } => *missing_count,
        }
    }

    /// The user-facing message, `None` when nothing is missing.
    pub fn message(&self) -> Option<String> {
        match &self.status {
            Completeness::Complete => None,
            Completeness::PartialWithDetail { missing } => Some(format!(
                "The following station(s) were not retrieved: {}\n\
                 Check station number typos or if it is a valid station in the network",
                missing.join(", ")
            )),
            Completeness::PartialSummaryOnly { .. } => Some(format!(
                "More than {} stations from the initial query were not returned. \
                 Ensure realtime and active status are correctly specified.",
                DETAIL_LIMIT
            )),
        }
    }

    pub fn log(&self, query: &str) {
        match self.message() {
            None => info!("{}: all requested stations returned data", query),
            Some(message) => warn!("{}: {}", query, message),
        }
        if !self.unknown.is_empty() && self.unknown.len() <= DETAIL_LIMIT {
            warn!(
                "{}: not in the station directory: {}",
                query,
                self.unknown.join(", ")
            );
        }
    }
}

impl fmt::Display for CompletenessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}", message),
            None => write!(f, "All stations successfully retrieved"),
        }
    }
}

/// Compares the requested and obtained station sets.
pub fn report(requested: &BTreeSet<String>, obtained: &BTreeSet<String>) -> CompletenessReport {
    let missing: Vec<String> = requested.difference(obtained).cloned().collect();

    let status = if missing.is_empty() {
        Completeness::Complete
    } else if missing.len() <= DETAIL_LIMIT {
        Completeness::PartialWithDetail { missing }
    } else {
        Completeness::PartialSummaryOnly {
            missing_count: missing.len(),
        }
    };

    CompletenessReport {
        status,
        unknown: Vec::new(),
    }
}
