//! One refresh cycle: every configured gauge plus the put/call ratio, through the cache.

use std::sync::Arc;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{TaifexRatioAdapter, YahooChartAdapter};
use crate::cache::MarketCache;
use crate::clock::Clock;
use crate::config::{AlertConfig, DashboardConfig};
use crate::data_source::{PriceSource, RatioSource};
use crate::domain::{IndicatorResult, Instrument, RatioResult, Symbol};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::indicator::compute_indicator;
use crate::DataUnavailable;

/// Either the data or why it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState<T> {
    Ready(T),
    Unavailable { code: &'static str, reason: String },
}

impl<T> PanelState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }
}

impl<T> From<Result<T, DataUnavailable>> for PanelState<T> {
    fn from(value: Result<T, DataUnavailable>) -> Self {
        match value {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Unavailable {
                code: error.code(),
                reason: error.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentPanel {
    pub instrument: Instrument,
    #[serde(flatten)]
    pub state: PanelState<IndicatorResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressAlert {
    pub symbol: Symbol,
    pub price: f64,
    pub threshold: f64,
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub cycle_id: Uuid,
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub panels: Vec<InstrumentPanel>,
    pub ratio: PanelState<RatioResult>,
    pub stress_alert: Option<StressAlert>,
}

impl DashboardSnapshot {
    pub fn unavailable_count(&self) -> usize {
        let panels = self
            .panels
            .iter()
            .filter(|panel| panel.state.ready().is_none())
            .count();
        panels + usize::from(self.ratio.ready().is_none())
    }
}

pub struct Dashboard {
    instruments: Vec<Instrument>,
    alert: AlertConfig,
    prices: Arc<dyn PriceSource>,
    ratio: Arc<dyn RatioSource>,
    cache: MarketCache,
    clock: Arc<dyn Clock>,
}

impl Dashboard {
    pub fn new(
        config: &DashboardConfig,
        prices: Arc<dyn PriceSource>,
        ratio: Arc<dyn RatioSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instruments: config.instruments.clone(),
            alert: config.alert.clone(),
            prices,
            ratio,
            cache: MarketCache::new(config.cache_policy(), Arc::clone(&clock)),
            clock,
        }
    }

    /// Production wiring: reqwest transport, Yahoo charts, TAIFEX report.
    pub fn from_config(config: &DashboardConfig, clock: Arc<dyn Clock>) -> Self {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let prices = YahooChartAdapter::new(Arc::clone(&http_client), config.http_timeout());
        let ratio = TaifexRatioAdapter::new(http_client, Arc::clone(&clock), config.http_timeout())
            .with_horizon_days(config.ratio.horizon_days);

        Self::new(config, Arc::new(prices), Arc::new(ratio), clock)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    async fn indicator_for(&self, symbol: &Symbol) -> Result<IndicatorResult, DataUnavailable> {
        self.cache
            .indicator(symbol, || async {
                let series = self.prices.fetch_series(symbol).await?;
                compute_indicator(&series)
            })
            .await
    }

    /// Run one cycle. Instruments are fetched one after another; a failure only marks its own
    /// panel unavailable.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let cycle_id = Uuid::new_v4();
        info!(%cycle_id, instruments = self.instruments.len(), "refresh cycle started");

        let mut panels = Vec::with_capacity(self.instruments.len());
        for instrument in &self.instruments {
            let result = self.indicator_for(&instrument.symbol).await;
            if let Err(error) = &result {
                warn!(%cycle_id, symbol = %instrument.symbol, %error, "instrument unavailable");
            }
            panels.push(InstrumentPanel {
                instrument: instrument.clone(),
                state: result.into(),
            });
        }

        let stress_alert = self.stress_alert(cycle_id, &panels).await;

        let ratio = self.cache.ratio(|| self.ratio.fetch_ratio()).await;
        if let Err(error) = &ratio {
            warn!(%cycle_id, %error, "put/call ratio unavailable");
        }

        let snapshot = DashboardSnapshot {
            cycle_id,
            generated_at: self
                .clock
                .utc_now()
                .format(&Rfc3339)
                .unwrap_or_else(|_| String::from("unknown")),
            stress_alert,
            panels,
            ratio: ratio.into(),
        };

        info!(
            %cycle_id,
            unavailable = snapshot.unavailable_count(),
            alert = snapshot.stress_alert.is_some(),
            "refresh cycle finished"
        );
        snapshot
    }

    /// Risk quick-screen. The alert instrument is read from its panel when it has one and is
    /// fetched through the indicator cache otherwise.
    async fn stress_alert(&self, cycle_id: Uuid, panels: &[InstrumentPanel]) -> Option<StressAlert> {
        let symbol = &self.alert.symbol;
        let price = match panels.iter().find(|panel| &panel.instrument.symbol == symbol) {
            Some(panel) => panel.state.ready().map(|result| result.price),
            None => match self.indicator_for(symbol).await {
                Ok(result) => Some(result.price),
                Err(error) => {
                    warn!(%cycle_id, %symbol, %error, "stress screen unavailable");
                    None
                }
            },
        };

        price
            .filter(|price| *price > self.alert.threshold)
            .map(|price| StressAlert {
                symbol: symbol.clone(),
                price,
                threshold: self.alert.threshold,
            })
    }

    /// Forget every cached result; the next refresh refetches everything.
    pub async fn invalidate_all(&self) {
        info!("cache invalidated");
        self.cache.invalidate_all().await;
    }

    pub async fn purge_expired(&self) {
        self.cache.purge_expired().await;
    }
}
