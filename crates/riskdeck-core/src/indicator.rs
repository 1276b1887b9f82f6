//! Momentum indicator engine.
//!
//! RSI here is the simple-moving-average variant: average gain and loss are plain arithmetic
//! means over the trailing window, without Wilder's recursive smoothing.

use crate::domain::{IndicatorResult, InstrumentSeries};
use crate::DataUnavailable;

/// Trailing window of the dashboard RSI.
pub const RSI_PERIOD: usize = 14;

/// Closes needed for one full RSI window (one more than the window, for the first difference).
pub const MIN_SERIES_POINTS: usize = RSI_PERIOD + 1;

/// Relative strength index of the last `period` price changes, in [0, 100].
///
/// Fails when fewer than `period + 1` closes are given, or when the window holds no losses:
/// the gain/loss ratio is then undefined and no reading is produced.
pub fn relative_strength(closes: &[f64], period: usize) -> Result<f64, DataUnavailable> {
    if period == 0 || closes.len() < period + 1 {
        return Err(DataUnavailable::InsufficientHistory {
            got: closes.len(),
            need: period + 1,
        });
    }

    let window = &closes[closes.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0_f64, 0.0_f64), |(gains, losses), change| {
            (gains + change.max(0.0), losses + (-change).max(0.0))
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Err(DataUnavailable::UndefinedIndicator(
            "no losses in the lookback window",
        ));
    }

    let rs = avg_gain / avg_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);
    if !value.is_finite() {
        return Err(DataUnavailable::UndefinedIndicator("non-finite relative strength"));
    }

    Ok(value.clamp(0.0, 100.0))
}

/// Percent change from `previous` to `last`.
pub fn percent_change(previous: f64, last: f64) -> Result<f64, DataUnavailable> {
    if previous == 0.0 {
        return Err(DataUnavailable::ZeroPreviousClose);
    }
    Ok((last - previous) / previous * 100.0)
}

/// Gauge payload for a series: last close, percent change and RSI-14.
pub fn compute_indicator(series: &InstrumentSeries) -> Result<IndicatorResult, DataUnavailable> {
    let closes = series.closes();
    if closes.len() < MIN_SERIES_POINTS {
        return Err(DataUnavailable::InsufficientHistory {
            got: closes.len(),
            need: MIN_SERIES_POINTS,
        });
    }

    let last = closes[closes.len() - 1];
    let previous = closes[closes.len() - 2];

    Ok(IndicatorResult {
        price: last,
        change: percent_change(previous, last)?,
        indicator: relative_strength(&closes, RSI_PERIOD)?,
        history: series.clone(),
    })
}

#[cfg(test)]
mod tests {
    use time::{Date, Duration, Month};

    use super::*;
    use crate::domain::{ClosePoint, Symbol};

    fn series(closes: &[f64]) -> InstrumentSeries {
        let start = Date::from_calendar_date(2024, Month::January, 1).expect("valid date");
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| ClosePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        InstrumentSeries::new(Symbol::parse("EWT").expect("valid"), points).expect("valid series")
    }

    fn zigzag(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn mixed_series_stays_inside_bounds() {
        for len in [15, 16, 40, 126] {
            let value = relative_strength(&zigzag(len), RSI_PERIOD).expect("defined");
            assert!(value > 0.0 && value < 100.0, "len={len} value={value}");
        }
    }

    #[test]
    fn uses_only_the_trailing_window() {
        // A crash long before the window must not leak into the reading.
        let mut closes = vec![500.0, 10.0];
        closes.extend([10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0]);

        let value = relative_strength(&closes, RSI_PERIOD).expect("defined");
        assert!((value - 50.0).abs() < 1e-9, "value={value}");
    }

    #[test]
    fn known_value_matches_hand_computation() {
        // 14 changes: ten +1, four -1 -> avg gain 10/14, avg loss 4/14, rs 2.5.
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().expect("seeded");
            closes.push(if i < 10 { last + 1.0 } else { last - 1.0 });
        }

        let value = relative_strength(&closes, RSI_PERIOD).expect("defined");
        assert!((value - (100.0 - 100.0 / 3.5)).abs() < 1e-9);
    }

    #[test]
    fn all_losses_reads_zero() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert_eq!(relative_strength(&closes, RSI_PERIOD), Ok(0.0));
    }

    #[test]
    fn monotonic_rise_is_undefined_not_one_hundred() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let err = relative_strength(&closes, RSI_PERIOD).expect_err("no losses");
        assert!(matches!(err, DataUnavailable::UndefinedIndicator(_)));
    }

    #[test]
    fn constant_series_has_zero_change_and_no_indicator() {
        let closes = vec![42.0; 20];
        assert_eq!(percent_change(closes[18], closes[19]), Ok(0.0));
        assert!(matches!(
            compute_indicator(&series(&closes)),
            Err(DataUnavailable::UndefinedIndicator(_))
        ));
    }

    #[test]
    fn zero_previous_close_is_rejected() {
        assert_eq!(percent_change(0.0, 5.0), Err(DataUnavailable::ZeroPreviousClose));
    }

    #[test]
    fn short_series_is_rejected() {
        let err = compute_indicator(&series(&zigzag(14))).expect_err("too short");
        assert_eq!(err, DataUnavailable::InsufficientHistory { got: 14, need: 15 });
    }

    #[test]
    fn result_carries_price_change_and_history() {
        let closes = zigzag(30);
        let result = compute_indicator(&series(&closes)).expect("defined");

        assert_eq!(result.price, closes[29]);
        let expected_change = (closes[29] - closes[28]) / closes[28] * 100.0;
        assert!((result.change - expected_change).abs() < 1e-12);
        assert_eq!(result.history.len(), 30);
    }
}
