use std::future::Future;
use std::io::Write;
use std::time::Duration;

use riskdeck_core::Dashboard;
use tokio::io::{AsyncBufRead, Lines};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::output;

/// Refresh on every tick and write each snapshot to `writer`.
///
/// Any line read from `commands` forces a cache-cold refresh and restarts the period. Once
/// `commands` ends only the timer drives refreshes. Returns when `shutdown` completes.
pub async fn drive<R, W, S>(
    dashboard: &Dashboard,
    refresh_every: Duration,
    mut commands: Lines<R>,
    writer: &mut W,
    shutdown: S,
) -> Result<(), ServiceError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    info!(
        instruments = dashboard.instruments().len(),
        refresh_secs = refresh_every.as_secs(),
        "refresh loop started"
    );

    let mut ticker = tokio::time::interval(refresh_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut commands_open = true;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => {}
            line = commands.next_line(), if commands_open => match line {
                Ok(Some(_)) => {
                    info!("manual refresh requested");
                    dashboard.invalidate_all().await;
                    ticker.reset();
                }
                Ok(None) => {
                    commands_open = false;
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, "stdin closed; manual refresh disabled");
                    commands_open = false;
                    continue;
                }
            },
        }

        let snapshot = dashboard.refresh().await;
        if let Err(err) = output::render(writer, &snapshot) {
            warn!(error = %err, "failed to write snapshot");
        }
        dashboard.purge_expired().await;
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use riskdeck_core::{
        ClosePoint, DashboardConfig, DataUnavailable, Instrument, InstrumentSeries, ManualClock,
        PriceSource, RatioResult, RatioSource, RatioStatus, RiskClass, Symbol,
    };
    use time::macros::date;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;

    #[derive(Default)]
    struct CountingPrices {
        calls: AtomicUsize,
    }

    impl PriceSource for CountingPrices {
        fn fetch_series<'a>(
            &'a self,
            symbol: &'a Symbol,
        ) -> Pin<Box<dyn Future<Output = Result<InstrumentSeries, DataUnavailable>> + Send + 'a>>
        {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let points = (0_i64..20)
                    .map(|offset| ClosePoint {
                        date: date!(2024 - 01 - 01) + time::Duration::days(offset),
                        close: if offset % 2 == 0 { 15.0 } else { 16.0 },
                    })
                    .collect();
                InstrumentSeries::new(symbol.clone(), points)
                    .map_err(|err| DataUnavailable::Parse(err.to_string()))
            })
        }
    }

    #[derive(Default)]
    struct CountingRatio {
        calls: AtomicUsize,
    }

    impl RatioSource for CountingRatio {
        fn fetch_ratio<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<RatioResult, DataUnavailable>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(RatioResult {
                    date: String::from("2024/03/08"),
                    ratio: 118.2,
                    status: RatioStatus::from_ratio(118.2),
                    requested: date!(2024 - 03 - 08),
                    attempts: 1,
                })
            })
        }
    }

    fn dashboard(prices: Arc<CountingPrices>, ratio: Arc<CountingRatio>) -> Dashboard {
        let config = DashboardConfig {
            instruments: vec![Instrument::new("VIX", "^VIX", RiskClass::Stress).expect("valid")],
            ..DashboardConfig::default()
        };
        Dashboard::new(&config, prices, ratio, Arc::new(ManualClock::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_and_each_command_line_emit_one_snapshot() {
        let prices = Arc::new(CountingPrices::default());
        let ratio = Arc::new(CountingRatio::default());
        let dashboard = dashboard(prices.clone(), ratio.clone());
        let commands = BufReader::new(&b"refresh\n"[..]).lines();
        let mut written = Vec::new();

        drive(
            &dashboard,
            Duration::from_secs(3_600),
            commands,
            &mut written,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .expect("driver stops cleanly");

        let text = String::from_utf8(written).expect("utf-8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            assert_eq!(value["panels"][0]["state"], "ready");
        }
        // The command line invalidated the cache, so both sources ran twice.
        assert_eq!(prices.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ratio.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_keep_refreshing_after_commands_end() {
        let prices = Arc::new(CountingPrices::default());
        let ratio = Arc::new(CountingRatio::default());
        let dashboard = dashboard(prices, ratio);
        let commands = BufReader::new(&b""[..]).lines();
        let mut written = Vec::new();

        drive(
            &dashboard,
            Duration::from_secs(60),
            commands,
            &mut written,
            tokio::time::sleep(Duration::from_secs(150)),
        )
        .await
        .expect("driver stops cleanly");

        // Ticks at 0s, 60s and 120s.
        let text = String::from_utf8(written).expect("utf-8");
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wins_over_a_pending_tick() {
        let dashboard = dashboard(Arc::default(), Arc::default());
        let commands = BufReader::new(&b"refresh\n"[..]).lines();
        let mut written = Vec::new();

        drive(
            &dashboard,
            Duration::from_secs(60),
            commands,
            &mut written,
            std::future::ready(()),
        )
        .await
        .expect("driver stops cleanly");

        assert!(written.is_empty());
    }
}
