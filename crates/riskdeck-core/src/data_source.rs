//! Fetcher contracts consumed by the dashboard.
//!
//! | Trait | Output | Production implementation |
//! |-------|--------|---------------------------|
//! | [`PriceSource`] | [`InstrumentSeries`] | [`YahooChartAdapter`](crate::adapters::YahooChartAdapter) |
//! | [`RatioSource`] | [`RatioResult`] | [`TaifexRatioAdapter`](crate::adapters::TaifexRatioAdapter) |
//!
//! Both return [`DataUnavailable`] for every failure; no transport error crosses this seam.

use std::future::Future;
use std::pin::Pin;

use crate::domain::{InstrumentSeries, RatioResult, Symbol};
use crate::DataUnavailable;

/// Daily closing prices for one instrument over the fixed lookback window.
pub trait PriceSource: Send + Sync {
    fn fetch_series<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentSeries, DataUnavailable>> + Send + 'a>>;
}

/// Latest published put/call ratio.
pub trait RatioSource: Send + Sync {
    fn fetch_ratio<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<RatioResult, DataUnavailable>> + Send + 'a>>;
}
