//! # Tide Tracker Application Entry Point
//!
//! This binary fetches the tide predictions for the configured datum and units,
//! prints the coverage notice, chart and high/low table, and optionally keeps
//! refreshing on an interval.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tide_tracker::config::Config;
use tide_tracker::refresh::{RefreshOutcome, Refresher};
use tide_tracker::tide_data::{NoaaClient, TideError};
use tide_tracker::{QueryOptions, STATION};

/// Tide predictions for a fixed NOAA station.
#[derive(Parser, Debug)]
#[command(name = "tide-tracker", version, about)]
struct Args {
    /// Vertical datum (e.g. MLLW, MSL); defaults to the config file value
    #[arg(long)]
    datum: Option<String>,

    /// Unit system: "english" or "metric"; defaults to the config file value
    #[arg(long)]
    units: Option<String>,

    /// Path of the TOML configuration file
    #[arg(long, default_value = "tide-config.toml")]
    config: PathBuf,

    /// Refresh every MINUTES (1 to 10080) instead of exiting after the first load
    #[arg(
        long,
        value_name = "MINUTES",
        value_parser = clap::value_parser!(u64).range(1..=MAX_WATCH_MINUTES)
    )]
    watch: Option<u64>,
}

/// One week.
const MAX_WATCH_MINUTES: u64 = 7 * 24 * 60;

fn watch_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.clamp(1, MAX_WATCH_MINUTES).saturating_mul(60))
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);
    let options = config.query_options(args.datum, args.units);

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, options, args.watch))
}

async fn run(config: Config, options: QueryOptions, watch: Option<u64>) -> anyhow::Result<()> {
    let refresher = Refresher::new(
        NoaaClient::new(config.api.base_url.clone()),
        config.display.chart_rows,
    );
    info!(
        "Station {} ({}) at {:.4}, {:.4}; datum {}, units {}",
        STATION.id, STATION.name, STATION.latitude, STATION.longitude, options.datum, options.units
    );

    // Initial load: a failure here is the program's result
    let first = refresher.refresh(&options, Local::now()).await;
    let Some(minutes) = watch else {
        let outcome = first.context("Failed to load tide predictions")?;
        show(outcome);
        return Ok(());
    };

    report(first);
    let mut interval = tokio::time::interval(watch_period(minutes));
    interval.tick().await; // first tick completes immediately
    loop {
        interval.tick().await;
        report(refresher.refresh(&options, Local::now()).await);
    }
}

fn show(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Rendered(view) => println!("{view}"),
        RefreshOutcome::Stale { generation, latest } => {
            info!("Refresh #{generation} superseded by #{latest}, nothing to show");
        }
    }
}

/// Watch mode: a failed refresh is reported and the last chart stays current.
fn report(result: Result<RefreshOutcome, TideError>) {
    match result {
        Ok(outcome) => show(outcome),
        Err(e) => error!("Failed to load tide predictions: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_defaults_to_single_load() {
        let args = Args::try_parse_from(["tide-tracker"]).unwrap();
        assert_eq!(args.watch, None);
        assert_eq!(args.config, PathBuf::from("tide-config.toml"));
    }

    #[test]
    fn test_watch_minutes_within_range() {
        let args = Args::try_parse_from(["tide-tracker", "--watch", "30"]).unwrap();
        assert_eq!(args.watch, Some(30));
        assert_eq!(watch_period(30), Duration::from_secs(1800));
    }

    #[test]
    fn test_watch_minutes_out_of_range_rejected() {
        assert!(Args::try_parse_from(["tide-tracker", "--watch", "0"]).is_err());
        assert!(Args::try_parse_from(["tide-tracker", "--watch", "10081"]).is_err());
        assert!(Args::try_parse_from(["tide-tracker", "--watch", "18446744073709551615"]).is_err());
    }

    #[test]
    fn test_watch_period_never_overflows() {
        assert_eq!(watch_period(0), Duration::from_secs(60));
        assert_eq!(watch_period(u64::MAX), Duration::from_secs(MAX_WATCH_MINUTES * 60));
    }
}
