use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{TradeDate, ValidationError};

/// One dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: TradeDate,
    pub value: f64,
}

/// Immutable date-ordered series for one instrument or index.
///
/// Points are held in ascending date order; each date appears once.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SeriesPoint>", into = "Vec<SeriesPoint>")]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    /// Build a series from points in any order.
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, ValidationError> {
        let mut points = points;
        for point in &points {
            if !point.value.is_finite() {
                return Err(ValidationError::NonFiniteValue {
                    field: "series value",
                });
            }
        }

        points.sort_by_key(|point| point.date);
        if let Some(pair) = points.windows(2).find(|pair| pair[0].date == pair[1].date) {
            return Err(ValidationError::DuplicateDate {
                date: pair[0].date.display(),
            });
        }

        Ok(Self { points })
    }

    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (TradeDate, f64)>,
    ) -> Result<Self, ValidationError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| SeriesPoint { date, value })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in ascending date order.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn first_date(&self) -> Option<TradeDate> {
        self.points.first().map(|point| point.date)
    }

    pub fn last_date(&self) -> Option<TradeDate> {
        self.points.last().map(|point| point.date)
    }

    /// Values from the latest date backwards.
    pub fn values_most_recent_first(&self) -> Vec<f64> {
        self.points.iter().rev().map(|point| point.value).collect()
    }

    /// Values keyed by date, for alignment against another series.
    pub fn by_date(&self) -> BTreeMap<TradeDate, f64> {
        self.points
            .iter()
            .map(|point| (point.date, point.value))
            .collect()
    }
}

impl TryFrom<Vec<SeriesPoint>> for TimeSeries {
    type Error = ValidationError;

    fn try_from(value: Vec<SeriesPoint>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimeSeries> for Vec<SeriesPoint> {
    fn from(value: TimeSeries) -> Self {
        value.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u8) -> TradeDate {
        TradeDate::from_ymd(2025, 1, day).expect("valid date")
    }

    #[test]
    fn sorts_points_ascending() {
        let series = TimeSeries::from_pairs([(date(3), 3.0), (date(1), 1.0), (date(2), 2.0)])
            .expect("valid series");
        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);
        assert_eq!(series.values_most_recent_first(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = TimeSeries::from_pairs([(date(1), 1.0), (date(1), 2.0)]).expect_err("must fail");
        assert!(matches!(err, ValidationError::DuplicateDate { .. }));
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = TimeSeries::from_pairs([(date(1), f64::NAN)]).expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }
}
