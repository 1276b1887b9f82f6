use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::data_source::PriceSource;
use crate::domain::{ClosePoint, InstrumentSeries, Symbol};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::indicator::MIN_SERIES_POINTS;
use crate::DataUnavailable;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const LOOKBACK_RANGE: &str = "6mo";
const BAR_INTERVAL: &str = "1d";

/// Series fetcher backed by the Yahoo Finance chart endpoint.
///
/// One request per call, no retry. The caller re-invokes on its next refresh.
#[derive(Clone)]
pub struct YahooChartAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl YahooChartAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: String::from(CHART_BASE_URL),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, symbol: &Symbol) -> String {
        format!(
            "{}/{}?range={}&interval={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(symbol.as_str()),
            LOOKBACK_RANGE,
            BAR_INTERVAL
        )
    }

    /// Fetch six months of daily closes for `symbol`.
    pub async fn fetch(&self, symbol: &Symbol) -> Result<InstrumentSeries, DataUnavailable> {
        let request = HttpRequest::get(self.endpoint(symbol))
            .with_browser_headers()
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout(self.timeout);

        debug!(symbol = %symbol, url = %request.url, "fetching chart");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| {
                debug!(symbol = %symbol, timed_out = e.timed_out(), error = %e, "chart request failed");
                if e.timed_out() {
                    DataUnavailable::Transport(format!("yahoo: timed out: {}", e.message()))
                } else {
                    DataUnavailable::Transport(format!("yahoo: {}", e.message()))
                }
            })?;

        if !response.is_success() {
            return Err(DataUnavailable::Status(response.status));
        }

        let body = response
            .text()
            .map_err(|e| DataUnavailable::Parse(format!("yahoo chart is not UTF-8: {e}")))?;
        let series = parse_chart(symbol, body)?;

        if series.len() < MIN_SERIES_POINTS {
            return Err(DataUnavailable::InsufficientHistory {
                got: series.len(),
                need: MIN_SERIES_POINTS,
            });
        }

        debug!(symbol = %symbol, points = series.len(), "chart normalized");
        Ok(series)
    }
}

impl Default for YahooChartAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()), Duration::from_secs(10))
    }
}

impl PriceSource for YahooChartAdapter {
    fn fetch_series<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentSeries, DataUnavailable>> + Send + 'a>> {
        Box::pin(self.fetch(symbol))
    }
}

/// Reduce a chart payload to one close per exchange-local trading date.
///
/// Only the first quote block's `close` column is read. Bars without a close are skipped; when
/// two bars fall on the same local date (a live intraday bar next to the settled one) the later
/// bar wins.
fn parse_chart(symbol: &Symbol, body: &str) -> Result<InstrumentSeries, DataUnavailable> {
    let chart: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DataUnavailable::Parse(format!("yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error {
        return Err(DataUnavailable::Parse(format!(
            "yahoo chart API error: {}",
            error.describe()
        )));
    }

    let result = chart
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| DataUnavailable::Parse(String::from("no chart data in response")))?;

    let offset = UtcOffset::from_whole_seconds(result.meta.gmtoffset.unwrap_or(0))
        .map_err(|e| DataUnavailable::Parse(format!("invalid gmtoffset: {e}")))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    let mut rows: Vec<(i64, f64)> = timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| close.filter(|c| c.is_finite()).map(|c| (ts, c)))
        .collect();
    rows.sort_by_key(|(ts, _)| *ts);

    let mut points: Vec<ClosePoint> = Vec::with_capacity(rows.len());
    for (ts, close) in rows {
        let date = OffsetDateTime::from_unix_timestamp(ts)
            .map_err(|e| DataUnavailable::Parse(format!("invalid timestamp {ts}: {e}")))?
            .to_offset(offset)
            .date();

        match points.last_mut() {
            Some(last) if last.date == date => last.close = close,
            _ => points.push(ClosePoint { date, close }),
        }
    }

    Ok(InstrumentSeries::new(symbol.clone(), points)?)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChartError {
    Detailed {
        code: Option<String>,
        description: Option<String>,
    },
    Text(String),
}

impl ChartError {
    fn describe(&self) -> String {
        match self {
            Self::Detailed { code, description } => format!(
                "{}: {}",
                code.as_deref().unwrap_or("unknown"),
                description.as_deref().unwrap_or("no description")
            ),
            Self::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn endpoint_encodes_symbol_and_fixes_window() {
        let adapter = YahooChartAdapter::new(Arc::new(ScriptedHttpClient::default()), Duration::from_secs(1))
            .with_base_url("https://chart.test/v8/finance/chart/");
        assert_eq!(
            adapter.endpoint(&symbol("^VIX")),
            "https://chart.test/v8/finance/chart/%5EVIX?range=6mo&interval=1d"
        );
    }

    #[test]
    fn buckets_by_exchange_local_date() {
        // 2024-03-01 21:00 UTC is already 2024-03-02 in a UTC+8 market.
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":28800},
            "timestamp":[1709240400,1709326800],
            "indicators":{"quote":[{"close":[10.0,11.0]}]}}],"error":null}}"#;

        let series = parse_chart(&symbol("EWT"), body).expect("parses");
        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date!(2024 - 03 - 01), date!(2024 - 03 - 02)]);
    }

    #[test]
    fn duplicate_dates_keep_latest_bar() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},
            "timestamp":[1709251200,1709290000],
            "indicators":{"quote":[{"close":[10.0,10.5]}]}}],"error":null}}"#;

        let series = parse_chart(&symbol("EWT"), body).expect("parses");
        assert_eq!(series.closes(), vec![10.5]);
    }

    #[test]
    fn api_error_object_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(&symbol("ZZZZ"), body).expect_err("must fail");
        assert!(err.to_string().contains("Not Found"));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(404, "nope"))]));
        let adapter = YahooChartAdapter::new(client, Duration::from_secs(1));

        let err = adapter.fetch(&symbol("EWT")).await.expect_err("must fail");
        assert_eq!(err, DataUnavailable::Status(404));
    }
}
