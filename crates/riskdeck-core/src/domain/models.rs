use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, ValidationError};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// How a gauge reading should be interpreted downstream.
///
/// For `Stress` gauges (volatility, dollar, yields) a high reading is bad news; for `Asset`
/// gauges a low reading is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Stress,
    Asset,
}

/// Statically configured dashboard instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub label: String,
    pub symbol: Symbol,
    pub class: RiskClass,
}

impl Instrument {
    pub fn new(label: impl Into<String>, symbol: &str, class: RiskClass) -> Result<Self, ValidationError> {
        Ok(Self {
            label: label.into(),
            symbol: Symbol::parse(symbol)?,
            class,
        })
    }
}

/// One trading day's closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub close: f64,
}

/// Chronological daily closes for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSeries {
    pub symbol: Symbol,
    points: Vec<ClosePoint>,
}

impl InstrumentSeries {
    /// Build a series, rejecting out-of-order dates and non-finite closes.
    pub fn new(symbol: Symbol, points: Vec<ClosePoint>) -> Result<Self, ValidationError> {
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(ValidationError::NonFiniteClose { index });
            }
            if index > 0 && points[index - 1].date >= point.date {
                return Err(ValidationError::SeriesNotIncreasing { index });
            }
        }

        Ok(Self { symbol, points })
    }

    pub fn points(&self) -> &[ClosePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Gauge payload for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    /// Last close.
    pub price: f64,
    /// Percent change of the last close against the previous one.
    pub change: f64,
    /// Relative strength index in [0, 100].
    pub indicator: f64,
    pub history: InstrumentSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatioStatus {
    Supportive,
    Bearish,
}

impl RatioStatus {
    /// Ratios strictly above 100 read as supportive.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 100.0 {
            Self::Supportive
        } else {
            Self::Bearish
        }
    }
}

impl Display for RatioStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Supportive => "SUPPORTIVE",
            Self::Bearish => "BEARISH",
        })
    }
}

/// Latest published put/call open-interest ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioResult {
    /// Date label exactly as the report printed it.
    pub date: String,
    pub ratio: f64,
    pub status: RatioStatus,
    /// Calendar day whose single-day query produced the row.
    #[serde(with = "iso_date")]
    pub requested: Date,
    /// Number of days probed, including the successful one.
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn point(date: Date, close: f64) -> ClosePoint {
        ClosePoint { date, close }
    }

    #[test]
    fn series_rejects_repeated_dates() {
        let symbol = Symbol::parse("EWT").expect("valid");
        let err = InstrumentSeries::new(
            symbol,
            vec![point(date!(2024 - 03 - 01), 50.0), point(date!(2024 - 03 - 01), 51.0)],
        )
        .expect_err("must fail");
        assert_eq!(err, ValidationError::SeriesNotIncreasing { index: 1 });
    }

    #[test]
    fn series_rejects_nan_close() {
        let symbol = Symbol::parse("EWT").expect("valid");
        let err = InstrumentSeries::new(symbol, vec![point(date!(2024 - 03 - 01), f64::NAN)])
            .expect_err("must fail");
        assert_eq!(err, ValidationError::NonFiniteClose { index: 0 });
    }

    #[test]
    fn status_threshold_is_strict() {
        assert_eq!(RatioStatus::from_ratio(100.0), RatioStatus::Bearish);
        assert_eq!(RatioStatus::from_ratio(100.01), RatioStatus::Supportive);
        assert_eq!(RatioStatus::from_ratio(64.3), RatioStatus::Bearish);
    }

    #[test]
    fn ratio_serializes_status_and_iso_date() {
        let result = RatioResult {
            date: String::from("2024/03/01"),
            ratio: 112.5,
            status: RatioStatus::Supportive,
            requested: date!(2024 - 03 - 01),
            attempts: 1,
        };
        let json = serde_json::to_value(&result).expect("serializes");
        assert_eq!(json["status"], "SUPPORTIVE");
        assert_eq!(json["requested"], "2024-03-01");
    }
}
