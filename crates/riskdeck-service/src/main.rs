mod driver;
mod error;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use riskdeck_core::{load_config, Dashboard, SystemClock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::driver::drive;
use crate::error::ServiceError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riskdeck=info,riskdeck_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "riskdeck stopped");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Refresh on every tick; a line on stdin forces a cache-cold refresh; Ctrl-C exits.
async fn run() -> Result<(), ServiceError> {
    let config = load_config()?;
    info!(refresh_secs = config.timing.refresh_secs, "riskdeck starting");

    let dashboard = Dashboard::from_config(&config, Arc::new(SystemClock));
    let commands = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C; stopping");
        }
    };

    drive(
        &dashboard,
        config.refresh_interval(),
        commands,
        &mut std::io::stdout(),
        shutdown,
    )
    .await
}
