//! `amen`: follow a daily Bible reading plan from the command line.

mod app;
mod cli;
mod error;

use std::process::ExitCode;

use amen_config::Config;
use amen_progress::SystemClock;
use clap::Parser;
use exn::ResultExt;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::Cli;
use crate::error::{ErrorKind, Result};

const DEFAULT_LOG_FILTER: &str = "amen=info";

fn main() -> ExitCode {
    // Only readable while this is the process's sole thread.
    let local = SystemClock::local();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        },
    };
    match runtime.block_on(run(cli, local)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            if err.is_retryable() {
                eprintln!("This may be temporary; try again.");
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli, local: Option<SystemClock>) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(store = %config.store.path.display(), plan = %config.plan.id, "Loaded configuration");
    let clock = system_clock(config.plan.utc_offset_minutes, local)?;
    tracing::debug!(offset = %clock.offset(), "Using clock");
    let app = App::open(config, clock, cli.dry_run).await?;
    let result = app.run(cli.command).await;
    app.close().await;
    result
}

/// The configured offset, else the local one, else UTC.
fn system_clock(offset_minutes: Option<i32>, local: Option<SystemClock>) -> Result<SystemClock> {
    if let Some(minutes) = offset_minutes {
        let offset = UtcOffset::from_whole_seconds(minutes * 60).or_raise(|| ErrorKind::Config)?;
        return Ok(SystemClock::new(offset));
    }
    Ok(local.unwrap_or_else(|| {
        tracing::warn!("Local UTC offset unavailable; days follow UTC");
        SystemClock::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::configured(Some(540), None, 9)]
    #[case::configured_wins(Some(-300), Some(SystemClock::default()), -5)]
    #[case::local(None, Some(SystemClock::new(UtcOffset::from_hms(2, 0, 0).unwrap())), 2)]
    #[case::fallback(None, None, 0)]
    fn test_system_clock(#[case] minutes: Option<i32>, #[case] local: Option<SystemClock>, #[case] hours: i8) {
        let clock = system_clock(minutes, local).unwrap();
        assert_eq!(clock.offset().whole_hours(), hours);
    }
}
