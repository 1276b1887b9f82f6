//! Upstream adapters.
//!
//! - [`YahooChartAdapter`]: daily closes per instrument
//! - [`TaifexRatioAdapter`]: put/call open-interest ratio with backward date probing

pub mod taifex;
pub mod yahoo;

pub use taifex::TaifexRatioAdapter;
pub use yahoo::YahooChartAdapter;
