//! # Hourly / High-Low Reconciliation
//!
//! Subordinate tide stations only publish high/low predictions, so asking NOAA for
//! an hourly series either fails or comes back empty. This module hides that
//! coverage gap from the rest of the application:
//!
//! - The hourly series is requested optimistically. Failure or an empty answer is
//!   recorded as [`HourlyOutcome::Degraded`] and only logged.
//! - The high/low series is always requested afterwards. Its failure aborts the load.
//! - The hourly series drives the chart trace when present; otherwise the high/low
//!   points double as the trace.
//!
//! The caller always gets the best data available, or a single error explaining why
//! there is nothing to show.

use crate::tide_data::{PredictionSource, TideError};
use crate::{PredictionPoint, QueryOptions, Resolution, SeriesPair, TimeWindow};
use chrono::{DateTime, Duration, TimeZone};
use log::{info, warn};
use std::fmt;

/// Days on each side of "now" covered by a load.
pub const WINDOW_HALF_DAYS: i64 = 7;

/// Compute the 14-day request window around `now`.
///
/// Dates are taken in `now`'s own time zone, so passing `Local::now()` yields
/// station-local calendar days when the tracker runs in the station's zone.
pub fn compute_window<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    let today = now.date_naive();
    TimeWindow {
        begin: today - Duration::days(WINDOW_HALF_DAYS),
        end: today + Duration::days(WINDOW_HALF_DAYS),
    }
}

/// Result of the optional hourly request.
#[derive(Debug)]
pub enum HourlyOutcome {
    /// NOAA returned at least one hourly point
    Available(Vec<PredictionPoint>),
    /// No usable hourly data; the reason is kept for logging only
    Degraded(String),
}

impl HourlyOutcome {
    /// Classify the hourly fetch. An empty series counts as unsupported, same as an error.
    pub fn from_fetch(result: Result<Vec<PredictionPoint>, TideError>) -> Self {
        match result {
            Ok(points) if points.is_empty() => {
                HourlyOutcome::Degraded("hourly predictions empty".to_string())
            }
            Ok(points) => HourlyOutcome::Available(points),
            Err(e) => HourlyOutcome::Degraded(e.to_string()),
        }
    }

    pub fn supports_hourly(&self) -> bool {
        matches!(self, HourlyOutcome::Available(_))
    }

    fn into_points(self) -> Vec<PredictionPoint> {
        match self {
            HourlyOutcome::Available(points) => points,
            HourlyOutcome::Degraded(_) => Vec::new(),
        }
    }
}

/// User-facing statement of what the station provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverageNotice {
    HourlyAndExtrema,
    ExtremaOnly,
}

impl CoverageNotice {
    pub fn for_series(series: &SeriesPair) -> Self {
        if series.supports_hourly {
            CoverageNotice::HourlyAndExtrema
        } else {
            CoverageNotice::ExtremaOnly
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CoverageNotice::HourlyAndExtrema => "Hourly and high/low predictions available",
            CoverageNotice::ExtremaOnly => "Only high/low predictions available for this station",
        }
    }
}

impl fmt::Display for CoverageNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything one successful load produced.
#[derive(Clone, Debug)]
pub struct TideLoad {
    pub window: TimeWindow,
    pub options: QueryOptions,
    pub series: SeriesPair,
    pub notice: CoverageNotice,
}

/// Fetch both series for `window` and reconcile them.
///
/// The two requests run one after the other. The high/low request is issued no
/// matter how the hourly one ended, and its error is the only one returned.
pub async fn load_tide_data<S: PredictionSource>(
    source: &S,
    window: TimeWindow,
    options: &QueryOptions,
) -> Result<TideLoad, TideError> {
    let hourly = HourlyOutcome::from_fetch(
        source
            .fetch_predictions(&window, Resolution::Hourly, options)
            .await,
    );
    if let HourlyOutcome::Degraded(reason) = &hourly {
        warn!("Hourly predictions unavailable ({reason}), using high/low only");
    }

    let markers = source
        .fetch_predictions(&window, Resolution::HighLow, options)
        .await?;

    let series = SeriesPair::reconcile(hourly.into_points(), markers);
    let notice = CoverageNotice::for_series(&series);
    info!(
        "Loaded {} trace points and {} high/low markers ({}..{}): {}",
        series.primary.len(),
        series.markers.len(),
        window.begin,
        window.end,
        notice
    );

    Ok(TideLoad {
        window,
        options: options.clone(),
        series,
        notice,
    })
}
