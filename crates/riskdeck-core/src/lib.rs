//! # Riskdeck Core
//!
//! Data acquisition, indicator and caching core of the riskdeck market-sentiment dashboard.
//!
//! ## Overview
//!
//! - **Series fetching**: six months of daily closes per instrument from the Yahoo chart API
//! - **Indicator engine**: 14-period RSI (simple-average variant) plus last close and % change
//! - **Resilient ratio fetching**: TAIFEX put/call open-interest ratio, probing back up to a
//!   week for the latest published day
//! - **Result cache**: per-kind TTLs, success-only caching, single-flight per key
//! - **Dashboard**: one refresh cycle producing a serializable snapshot
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo chart and TAIFEX report adapters |
//! | [`cache`] | TTL result cache and the dashboard's typed caches |
//! | [`clock`] | Injectable monotonic and wall clock |
//! | [`config`] | Static configuration with file and env overrides |
//! | [`dashboard`] | Refresh cycle and snapshot types |
//! | [`data_source`] | Fetcher traits |
//! | [`domain`] | Symbols, instruments, series and results |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`indicator`] | RSI and percent change |
//! | [`retry`] | Bounded backward probing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use riskdeck_core::{load_config, Dashboard, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     let dashboard = Dashboard::from_config(&config, Arc::new(SystemClock));
//!
//!     let snapshot = dashboard.refresh().await;
//!     println!("{}", serde_json::to_string(&snapshot)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Refresh driver  │  (riskdeck-service)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Dashboard     │────▶│  Market cache    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Price / ratio   │────▶│ HTTP client      │
//! │ sources         │     │ (reqwest)        │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Indicator engine│
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every fetch or computation failure is a [`DataUnavailable`]. It never aborts a refresh;
//! the affected panel is reported as unavailable and the cycle continues:
//!
//! ```rust
//! use riskdeck_core::{relative_strength, DataUnavailable};
//!
//! let rising: Vec<f64> = (0..20).map(f64::from).collect();
//! assert!(matches!(
//!     relative_strength(&rising, 14),
//!     Err(DataUnavailable::UndefinedIndicator(_))
//! ));
//! ```

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicator;
pub mod retry;

pub use adapters::{TaifexRatioAdapter, YahooChartAdapter};

pub use cache::{CachePolicy, MarketCache, ResultCache, RATIO_CACHE_KEY};

pub use clock::{Clock, ManualClock, SystemClock};

pub use config::{load_config, AlertConfig, DashboardConfig, RatioConfig, TimingConfig};

pub use dashboard::{Dashboard, DashboardSnapshot, InstrumentPanel, PanelState, StressAlert};

pub use data_source::{PriceSource, RatioSource};

pub use domain::{
    ClosePoint, IndicatorResult, Instrument, InstrumentSeries, RatioResult, RatioStatus, RiskClass,
    Symbol,
};

pub use error::{ConfigError, DataUnavailable, ValidationError};

pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

pub use indicator::{compute_indicator, percent_change, relative_strength, RSI_PERIOD};

pub use retry::{backward_days, Exhausted, Found, ProbeWalk};
