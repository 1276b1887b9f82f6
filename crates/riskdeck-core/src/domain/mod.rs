//! # Domain Models
//!
//! Validated types shared by the fetchers, the indicator engine and the dashboard.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated price-source ticker |
//! | [`Instrument`] | Configured instrument with its [`RiskClass`] tag |
//! | [`InstrumentSeries`] | Chronological daily closes |
//! | [`IndicatorResult`] | Price, percent change, RSI and history |
//! | [`RatioResult`] | Put/call ratio with [`RatioStatus`] |
//!
//! Series construction enforces strictly increasing dates and finite closes:
//!
//! ```rust
//! use riskdeck_core::{ClosePoint, InstrumentSeries, Symbol, ValidationError};
//! use time::macros::date;
//!
//! let symbol = Symbol::parse("EWT").unwrap();
//! let points = vec![
//!     ClosePoint { date: date!(2024 - 01 - 03), close: 48.1 },
//!     ClosePoint { date: date!(2024 - 01 - 02), close: 48.0 },
//! ];
//! let err = InstrumentSeries::new(symbol, points).unwrap_err();
//! assert!(matches!(err, ValidationError::SeriesNotIncreasing { index: 1 }));
//! ```

mod models;
mod symbol;

pub use models::{
    ClosePoint, IndicatorResult, Instrument, InstrumentSeries, RatioResult, RatioStatus, RiskClass,
};
pub use symbol::Symbol;
