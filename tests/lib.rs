// Shared fixtures for the behavior tests
pub use riskdeck_core::{
    ClosePoint, DataUnavailable, InstrumentSeries, RatioResult, RatioStatus, Symbol,
};
pub use std::sync::Arc;

use time::macros::date;
use time::Date;

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

/// Consecutive calendar days starting at `start`, one close each.
pub fn daily_series(symbol: Symbol, start: Date, closes: &[f64]) -> InstrumentSeries {
    let points = (0_i64..)
        .zip(closes)
        .map(|(offset, close)| ClosePoint {
            date: start + time::Duration::days(offset),
            close: *close,
        })
        .collect();
    InstrumentSeries::new(symbol, points).expect("valid series")
}

/// A ratio published on 2024-03-08 and found on the first probe.
pub fn published_ratio(value: f64) -> RatioResult {
    RatioResult {
        date: String::from("2024/03/08"),
        ratio: value,
        status: RatioStatus::from_ratio(value),
        requested: date!(2024 - 03 - 08),
        attempts: 1,
    }
}
