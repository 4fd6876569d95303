use chrono::NaiveDate;

/// Combines separately stored year / month / day pieces into a date.
///
/// Any missing or out-of-range piece yields `None` instead of an error: a MEAN statistic
/// has no day of occurrence, and the archive occasionally carries impossible days.
pub fn occurrence_date(year: Option<i64>, month: Option<i64>, day: Option<i64>) -> Option<NaiveDate> {
    let year = i32::try_from(year?).ok()?;
    let month = u32::try_from(month?).ok()?;
    let day = u32::try_from(day?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
