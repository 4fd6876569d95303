//! Contains [`HydatFrame`], the result type of every query.

use crate::tidy::completeness::CompletenessReport;
use polars::prelude::{DataFrame, Expr, LazyFrame, PolarsResult};

/// A tidy table plus the completeness report of the query that produced it.
///
/// The report never appears as rows of the table. Inspect it with
/// [`HydatFrame::report`] or [`HydatFrame::is_complete`].
///
/// # Example
///
/// ```no_run
/// # use hydat::Hydat;
/// use polars::prelude::{col, lit};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let hydat = Hydat::new().await?;
/// let flows = hydat
///     .daily_flows()
///     .station_number(&["08MF005", "05AA008"])
///     .start_date("1990-01-01")
///     .call()
///     .await?;
///
/// if !flows.is_complete() {
///     println!("{}", flows.report);
/// }
/// let high = flows.filter(col("Value").gt(lit(1000.0))).frame.collect()?;
/// println!("{}", high);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HydatFrame {
    /// The tidy table.
    pub frame: LazyFrame,
    /// Which requested stations produced no rows.
    pub report: CompletenessReport,
}

impl HydatFrame {
    pub fn new(frame: LazyFrame, report: CompletenessReport) -> Self {
        Self { frame, report }
    }

    /// Applies a lazy filter; the report is carried over unchanged.
    pub fn filter(&self, predicate: Expr) -> HydatFrame {
        HydatFrame::new(self.frame.clone().filter(predicate), self.report.clone())
    }

    pub fn is_complete(&self) -> bool {
        self.report.is_complete()
    }

    pub fn collect(self) -> PolarsResult<DataFrame> {
        self.frame.collect()
    }
}
