use chrono::NaiveDateTime;

/// A point of a realtime series that the merger can position in time.
pub trait SeriesPoint {
    fn timestamp(&self) -> NaiveDateTime;

    /// Whether the point carries a measured value (as opposed to only flags).
    fn has_value(&self) -> bool;
}

/// The merged series of one station.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSeries<T> {
    pub station_number: String,
    pub observations: Vec<T>,
}

impl<T> MergedSeries<T> {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// Merges a high-resolution and a low-resolution series of one station.
///
/// The cut-off is the earliest timestamp at which the high-resolution series carries a
/// value. Low-resolution points strictly before it are kept, then the high-resolution
/// points from it onwards. The merge is range-based: a gap inside the high-resolution
/// range is not back-filled from the low-resolution series.
pub fn merge<T: SeriesPoint>(station_number: &str, high_res: Vec<T>, low_res: Vec<T>) -> MergedSeries<T> {
    let cutoff = high_res
        .iter()
        .filter(|point| point.has_value())
        .map(SeriesPoint::timestamp)
        .min();

    let observations = match cutoff {
        None => low_res,
        Some(_) if low_res.is_empty() => high_res,
        Some(cutoff) => {
            let mut merged: Vec<T> = low_res
                .into_iter()
                .filter(|point| point.timestamp() < cutoff)
                .collect();
            merged.extend(high_res.into_iter().filter(|point| point.timestamp() >= cutoff));
            merged
        }
    };

    MergedSeries {
        station_number: station_number.to_string(),
        observations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        at: NaiveDateTime,
        value: Option<f64>,
    }

    impl SeriesPoint for Point {
        fn timestamp(&self) -> NaiveDateTime {
            self.at
        }

        fn has_value(&self) -> bool {
            self.value.is_some()
        }
    }

    fn day(d: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid test timestamp")
    }

    fn point(d: u32, hour: u32, value: Option<f64>) -> Point {
        Point { at: day(d, hour), value }
    }

    #[test]
    fn test_hourly_overrides_from_cutoff() {
        let daily: Vec<Point> = (1..=10).map(|d| point(d, 0, Some(d as f64))).collect();
        let hourly: Vec<Point> = (8..=10)
            .flat_map(|d| (0..24).map(move |h| point(d, h, Some(100.0))))
            .collect();

        let merged = merge("08MF005", hourly, daily);

        assert_eq!(merged.station_number, "08MF005");
        assert_eq!(merged.len(), 7 + 72);
        assert!(merged.observations[..7].iter().all(|p| p.at < day(8, 0)));
        assert!(merged.observations[7..].iter().all(|p| p.value == Some(100.0)));
    }

    #[test]
    fn test_no_usable_hourly_keeps_daily() {
        let daily = vec![point(1, 0, Some(1.0)), point(2, 0, Some(2.0))];
        let hourly = vec![point(2, 5, None)];
        let merged = merge("A", hourly, daily.clone());
        assert_eq!(merged.observations, daily);
    }

    #[test]
    fn test_empty_daily_keeps_hourly() {
        let hourly = vec![point(3, 1, Some(1.0)), point(3, 2, Some(2.0))];
        let merged = merge("A", hourly.clone(), Vec::new());
        assert_eq!(merged.observations, hourly);
    }

    #[test]
    fn test_both_empty_is_tagged_empty_series() {
        let merged = merge::<Point>("05AA008", Vec::new(), Vec::new());
        assert!(merged.is_empty());
        assert_eq!(merged.station_number, "05AA008");
    }

    #[test]
    fn test_merge_is_range_based() {
        let daily = vec![point(1, 0, Some(1.0)), point(2, 0, Some(2.0)), point(3, 0, Some(3.0))];
        let hourly = vec![point(1, 12, Some(10.0)), point(3, 12, Some(30.0))];
        let merged = merge("A", hourly, daily);
        // day 2 sits inside the hourly range and is not back-filled
        let values: Vec<Option<f64>> = merged.observations.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(1.0), Some(10.0), Some(30.0)]);
    }
}
