use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::macros::{format_description, offset};
use time::{Date, UtcOffset};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::data_source::RatioSource;
use crate::domain::{RatioResult, RatioStatus};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::backward_days;
use crate::DataUnavailable;

const REPORT_URL: &str = "https://www.taifex.com.tw/cht/3/pcRatioDown";

/// The exchange publishes on Taipei calendar days.
pub const EXCHANGE_OFFSET: UtcOffset = offset!(+8);

/// Today plus the six days before it.
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// Header fragment of the open-interest put/call ratio column.
const OI_RATIO_HEADER: &str = "未平倉量比率";

/// Put/call open-interest ratio from the TAIFEX daily report.
///
/// The report only has rows for trading days and today's row may not be out yet, so each
/// call walks backward one calendar day at a time, one single-day query per day, and returns
/// the first day that has a row.
#[derive(Clone)]
pub struct TaifexRatioAdapter {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    url: String,
    timeout: Duration,
    horizon_days: u32,
}

impl TaifexRatioAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            http_client,
            clock,
            url: String::from(REPORT_URL),
            timeout,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    /// Latest ratio, probing back from today's exchange date.
    pub async fn fetch(&self) -> Result<RatioResult, DataUnavailable> {
        self.fetch_from(self.clock.today_at(EXCHANGE_OFFSET)).await
    }

    /// Latest ratio published on or before `today`, within the horizon.
    pub async fn fetch_from(&self, today: Date) -> Result<RatioResult, DataUnavailable> {
        let walk = backward_days(today, self.horizon_days);

        match walk.first_success(|_, date| self.fetch_day(date)).await {
            Ok(found) => {
                info!(
                    date = %found.value.date_label,
                    ratio = found.value.ratio,
                    offset = found.offset,
                    "put/call ratio resolved"
                );
                Ok(RatioResult {
                    status: RatioStatus::from_ratio(found.value.ratio),
                    date: found.value.date_label,
                    ratio: found.value.ratio,
                    requested: found.candidate,
                    attempts: found.offset + 1,
                })
            }
            Err(exhausted) => {
                warn!(
                    attempts = exhausted.attempts,
                    last_error = ?exhausted.last_error,
                    "no put/call report within horizon"
                );
                Err(DataUnavailable::HorizonExhausted {
                    attempts: exhausted.attempts,
                })
            }
        }
    }

    /// One single-day query. `Ok(None)` means the report has no row for that day.
    async fn fetch_day(&self, date: Date) -> Result<Option<ReportRow>, DataUnavailable> {
        let day = format_query_date(date)?;
        let request = HttpRequest::post(self.url.as_str())
            .with_browser_headers()
            .with_form(&[("queryStartDate", day.as_str()), ("queryEndDate", day.as_str())])
            .with_timeout(self.timeout);

        debug!(date = %day, "requesting put/call report");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| {
                debug!(date = %day, timed_out = e.timed_out(), error = %e, "report request failed");
                if e.timed_out() {
                    DataUnavailable::Transport(format!("taifex: timed out: {}", e.message()))
                } else {
                    DataUnavailable::Transport(format!("taifex: {}", e.message()))
                }
            })?;

        if !response.is_success() {
            return Err(DataUnavailable::Status(response.status));
        }

        parse_report(&response.body)
    }
}

impl Default for TaifexRatioAdapter {
    fn default() -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::default()),
            Arc::new(SystemClock),
            Duration::from_secs(10),
        )
    }
}

impl RatioSource for TaifexRatioAdapter {
    fn fetch_ratio<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<RatioResult, DataUnavailable>> + Send + 'a>> {
        Box::pin(self.fetch())
    }
}

fn format_query_date(date: Date) -> Result<String, DataUnavailable> {
    date.format(format_description!("[year]/[month]/[day]"))
        .map_err(|e| DataUnavailable::Parse(format!("cannot format query date: {e}")))
}

/// Last row of a report: the authoritative values for the queried day.
#[derive(Debug, Clone, PartialEq)]
struct ReportRow {
    date_label: String,
    ratio: f64,
}

/// Decode and parse a report body, UTF-8 first and Big5 second.
fn parse_report(body: &[u8]) -> Result<Option<ReportRow>, DataUnavailable> {
    let without_bom = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);

    let primary = std::str::from_utf8(without_bom)
        .map_err(|e| DataUnavailable::Parse(format!("report is not UTF-8: {e}")))
        .and_then(parse_table);

    match primary {
        Ok(row) => Ok(row),
        Err(primary_error) => {
            let (text, _) = encoding_rs::BIG5.decode_without_bom_handling(body);
            parse_table(&text).map_err(|fallback_error| {
                DataUnavailable::Parse(format!("{primary_error}; big5 fallback: {fallback_error}"))
            })
        }
    }
}

fn parse_table(text: &str) -> Result<Option<ReportRow>, DataUnavailable> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let Some(first) = lines.next() else {
        return Ok(None);
    };
    if first.starts_with('<') {
        return Err(DataUnavailable::Parse(String::from(
            "report endpoint returned markup instead of a table",
        )));
    }

    let first_cells = split_csv_line(first);
    let has_header = !first_cells
        .first()
        .is_some_and(|cell| cell.starts_with(|c: char| c.is_ascii_digit()));

    let ratio_column = if has_header {
        if first_cells.len() < 2 {
            return Err(DataUnavailable::Parse(format!("unexpected report header '{first}'")));
        }
        first_cells
            .iter()
            .position(|cell| cell.contains(OI_RATIO_HEADER))
            .unwrap_or(first_cells.len() - 1)
    } else {
        first_cells.len().saturating_sub(1)
    };

    let last = if has_header { lines.last() } else { lines.last().or(Some(first)) };
    let Some(last) = last else {
        return Ok(None);
    };

    let cells = split_csv_line(last);
    let date_label = cells
        .first()
        .filter(|cell| !cell.is_empty())
        .cloned()
        .ok_or_else(|| DataUnavailable::Parse(format!("row without date: '{last}'")))?;
    let raw_ratio = cells.get(ratio_column).ok_or_else(|| {
        DataUnavailable::Parse(format!("row has no column {ratio_column}: '{last}'"))
    })?;
    let ratio = raw_ratio
        .replace([',', '%'], "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| DataUnavailable::Parse(format!("ratio '{raw_ratio}' is not a number")))?;

    Ok(Some(ReportRow { date_label, ratio }))
}

/// Split one CSV line, honoring double quotes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut current).trim().to_owned()),
            _ => current.push(ch),
        }
    }
    cells.push(current.trim().to_owned());
    cells
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    const HEADER: &str = "日期,賣權成交量,買權成交量,買賣權成交量比率%,賣權未平倉量,買權未平倉量,買賣權未平倉量比率%";

    #[test]
    fn query_date_uses_slashes() {
        assert_eq!(format_query_date(date!(2024 - 03 - 05)).as_deref(), Ok("2024/03/05"));
    }

    #[test]
    fn picks_open_interest_ratio_from_last_row() {
        let body = format!(
            "{HEADER}\n2024/03/04,100,200,50.00,300,250,120.00\n2024/03/05,150,120,125.00,310,400,77.50\n"
        );

        let row = parse_report(body.as_bytes()).expect("parses").expect("has a row");
        assert_eq!(row.date_label, "2024/03/05");
        assert_eq!(row.ratio, 77.5);
    }

    #[test]
    fn header_only_report_is_empty() {
        let body = format!("\u{feff}{HEADER}\r\n\r\n");
        assert_eq!(parse_report(body.as_bytes()), Ok(None));
        assert_eq!(parse_report(b""), Ok(None));
    }

    #[test]
    fn big5_payload_falls_back_to_legacy_decoding() {
        let text = format!("{HEADER}\n2024/03/05,150,120,125.00,310,400,131.25\n");
        let (bytes, _, unmappable) = encoding_rs::BIG5.encode(&text);
        assert!(!unmappable);
        assert!(std::str::from_utf8(&bytes).is_err());

        let row = parse_report(&bytes).expect("fallback parses").expect("has a row");
        assert_eq!(row.ratio, 131.25);
    }

    #[test]
    fn markup_is_a_parse_failure() {
        let err = parse_report(b"<html><body>busy</body></html>").expect_err("must fail");
        assert!(matches!(err, DataUnavailable::Parse(_)));
    }

    #[test]
    fn quoted_cells_with_thousands_separators() {
        assert_eq!(
            split_csv_line(r#"2024/03/05,"1,234","x ""y""",  9 "#),
            vec!["2024/03/05", "1,234", r#"x "y""#, "9"]
        );
    }

    #[test]
    fn headerless_single_row_uses_last_column() {
        let row = parse_report(b"2024/03/05,1,2,3,4,5,101.5")
            .expect("parses")
            .expect("has a row");
        assert_eq!(row.ratio, 101.5);
    }
}
