//! Static dashboard configuration.
//!
//! Resolution order: built-in defaults, then `riskdeck.toml` (or the file named by
//! `RISKDECK_CONFIG`), then individual environment overrides. A `.env` file is loaded first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::adapters::taifex::DEFAULT_HORIZON_DAYS;
use crate::cache::CachePolicy;
use crate::domain::{Instrument, RiskClass, Symbol};
use crate::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "riskdeck.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Gauges, in display order.
    pub instruments: Vec<Instrument>,
    pub timing: TimingConfig,
    pub ratio: RatioConfig,
    pub alert: AlertConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub refresh_secs: u64,
    pub price_ttl_secs: u64,
    pub ratio_ttl_secs: u64,
    pub http_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    /// Calendar days probed, today included.
    pub horizon_days: u32,
}

/// Risk quick-screen: flag when this instrument's price is above the threshold.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub symbol: Symbol,
    pub threshold: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            timing: TimingConfig::default(),
            ratio: RatioConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 60,
            price_ttl_secs: 60,
            ratio_ttl_secs: 3_600,
            http_timeout_ms: 10_000,
        }
    }
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            symbol: Symbol::from_static("^VIX"),
            threshold: 20.0,
        }
    }
}

fn default_instruments() -> Vec<Instrument> {
    [
        ("VIX", "^VIX", RiskClass::Stress),
        ("US Dollar Index", "DX-Y.NYB", RiskClass::Stress),
        ("US 10Y Yield", "^TNX", RiskClass::Stress),
        ("Taiwan (EWT)", "EWT", RiskClass::Asset),
        ("USD/JPY", "JPY=X", RiskClass::Stress),
        ("Bitcoin", "BTC-USD", RiskClass::Asset),
    ]
    .into_iter()
    .filter_map(|(label, symbol, class)| Instrument::new(label, symbol, class).ok())
    .collect()
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.timing.refresh_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.http_timeout_ms)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            price_ttl: Duration::from_secs(self.timing.price_ttl_secs),
            ratio_ttl: Duration::from_secs(self.timing.ratio_ttl_secs),
        }
    }

    /// Apply `RISKDECK_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let timing = [
            ("RISKDECK_REFRESH_SECS", &mut self.timing.refresh_secs),
            ("RISKDECK_PRICE_TTL_SECS", &mut self.timing.price_ttl_secs),
            ("RISKDECK_RATIO_TTL_SECS", &mut self.timing.ratio_ttl_secs),
            ("RISKDECK_HTTP_TIMEOUT_MS", &mut self.timing.http_timeout_ms),
        ];
        for (name, slot) in timing {
            if let Some(raw) = lookup(name) {
                *slot = parse_positive(name, &raw)?;
            }
        }

        if let Some(raw) = lookup("RISKDECK_STRESS_THRESHOLD") {
            self.alert.threshold = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or(ConfigError::InvalidEnv {
                    name: "RISKDECK_STRESS_THRESHOLD",
                    expected: "a finite number",
                    value: raw,
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.instruments.is_empty() {
            issues.push(String::from("at least one instrument is required"));
        }
        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if !seen.insert(&instrument.symbol) {
                issues.push(format!("duplicate instrument symbol '{}'", instrument.symbol));
            }
        }

        let durations = [
            ("timing.refresh_secs", self.timing.refresh_secs),
            ("timing.price_ttl_secs", self.timing.price_ttl_secs),
            ("timing.ratio_ttl_secs", self.timing.ratio_ttl_secs),
            ("timing.http_timeout_ms", self.timing.http_timeout_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                issues.push(format!("{field} must be greater than zero"));
            }
        }
        if self.ratio.horizon_days == 0 {
            issues.push(String::from("ratio.horizon_days must be greater than zero"));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues.join("; ")))
        }
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidEnv {
            name,
            expected: "an integer > 0",
            value: raw.to_owned(),
        })
}

fn config_path() -> Option<PathBuf> {
    match std::env::var("RISKDECK_CONFIG") {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
        _ => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            default.exists().then(|| default.to_path_buf())
        }
    }
}

/// Load configuration from `.env`, the optional config file and the environment.
pub fn load_config() -> Result<DashboardConfig, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("no .env file loaded: {}", e);
    }

    let mut config = match config_path() {
        Some(path) => {
            let origin = path.display().to_string();
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: origin.clone(),
                source,
            })?;
            DashboardConfig::from_toml_str(&contents, &origin)?
        }
        None => DashboardConfig::default(),
    };

    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
