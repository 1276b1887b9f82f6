use std::io::Write;

use riskdeck_core::DashboardSnapshot;

use crate::error::ServiceError;

/// Write one snapshot as a single NDJSON line and flush.
pub fn render<W: Write>(writer: &mut W, snapshot: &DashboardSnapshot) -> Result<(), ServiceError> {
    let payload = serde_json::to_string(snapshot).map_err(std::io::Error::from)?;
    writeln!(writer, "{payload}")?;
    writer.flush()?;
    Ok(())
}
