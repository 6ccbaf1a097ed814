//! # Tide Tracker Core Library
//!
//! This library provides the data structures and pipeline for the tide tracker
//! application: fetching NOAA CO-OPS tide predictions for a single fixed station,
//! reconciling the hourly curve with the high/low extrema, and shaping the result
//! into a chart and a table.
//!
//! ## Data Flow
//! 1. **Window**: a 14-day range (7 days back, 7 days ahead) is computed on every load
//! 2. **Hourly**: optimistic request for the continuous hourly series (may be missing
//!    for subordinate stations, never fatal)
//! 3. **High/Low**: mandatory request for the extrema; failure aborts the load
//! 4. **Reconcile**: hourly drives the chart trace when present, otherwise the
//!    extrema double as the trace
//! 5. **Present**: chart data, table rows and a coverage notice are rendered
//!
//! ## Core Types
//!
//! - [`PredictionPoint`]: a single predicted height at a station-local timestamp
//! - [`TimeWindow`]: the inclusive date range sent to the API
//! - [`QueryOptions`]: datum and unit system chosen by the user
//! - [`SeriesPair`]: the reconciled primary trace plus classified markers

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Module declarations
pub mod config;
pub mod fallback;
pub mod refresh;
pub mod renderer;
pub mod tide_data;


/// Identifier sent to NOAA in the `application` query parameter.
pub const APPLICATION: &str = "tide_tracker";

/// Timestamp layout used by the predictions API for `lst_ldt` responses.
pub const NOAA_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A fixed NOAA tide station.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Station {
    /// NOAA station ID
    pub id: &'static str,
    /// Human-readable station name
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// The station every request is made for. Not user-configurable.
pub const STATION: Station = Station {
    id: "8418150",
    name: "Portland, ME",
    latitude: 43.6567,
    longitude: -70.2467,
};

/// Classification of an extrema prediction.
///
/// NOAA tags high/low turning points with `"H"` and `"L"`. Any other tag is kept
/// verbatim so that it is never mistaken for a high or a low.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
    Other(String),
}

impl TideKind {
    /// Classify the `type` field of a prediction.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "H" => TideKind::High,
            "L" => TideKind::Low,
            other => TideKind::Other(other.to_string()),
        }
    }

    /// Label shown in the table type column and the chart legend.
    pub fn label(&self) -> &str {
        match self {
            TideKind::High => "High",
            TideKind::Low => "Low",
            TideKind::Other(tag) => tag,
        }
    }
}

/// A single predicted water level.
///
/// `time` is station-local civil time (daylight saving already applied by NOAA)
/// exactly as received, e.g. `"2024-06-01 04:12"`. `kind` is only present for
/// points fetched in high/low mode.
///
/// # Example
/// ```
/// use tide_tracker::{PredictionPoint, TideKind};
///
/// let high = PredictionPoint::new("2024-06-01 04:12", 9.87).with_kind(TideKind::High);
/// assert!(high.local_time().is_some());
/// assert_eq!(high.kind, Some(TideKind::High));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub time: String,
    pub height: f64,
    pub kind: Option<TideKind>,
}

impl PredictionPoint {
    pub fn new(time: impl Into<String>, height: f64) -> Self {
        PredictionPoint {
            time: time.into(),
            height,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: TideKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Parse the station-local timestamp. `None` if NOAA sent something unexpected.
    pub fn local_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.time.trim(), NOAA_TIME_FORMAT).ok()
    }
}

/// Inclusive date range of a prediction request.
///
/// Built by [`fallback::compute_window`]; never stored between loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Distance between the first and last date of the window.
    pub fn span(&self) -> Duration {
        self.end - self.begin
    }
}

/// Prediction resolution requested from NOAA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// One value per hour (`interval=60`)
    Hourly,
    /// High/low turning points only (`interval=hilo`)
    HighLow,
}

impl Resolution {
    /// Value of the `interval` query parameter.
    pub fn interval(&self) -> &'static str {
        match self {
            Resolution::Hourly => "60",
            Resolution::HighLow => "hilo",
        }
    }
}

/// Datum and unit system for the next fetch.
///
/// Both are passed through to NOAA untouched; only [`renderer::unit_label`]
/// interprets `units`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub datum: String,
    pub units: String,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            datum: "MLLW".to_string(),
            units: "english".to_string(),
        }
    }
}

/// Reconciled output of one load.
///
/// `markers` always holds the high/low predictions. `primary` holds the hourly
/// series when the station publishes one; otherwise it shares the markers
/// allocation so the extrema double as the chart trace.
#[derive(Clone, Debug)]
pub struct SeriesPair {
    pub primary: Arc<Vec<PredictionPoint>>,
    pub markers: Arc<Vec<PredictionPoint>>,
    pub supports_hourly: bool,
}

impl SeriesPair {
    /// Pick the chart trace: hourly when non-empty, markers otherwise.
    pub fn reconcile(hourly: Vec<PredictionPoint>, markers: Vec<PredictionPoint>) -> Self {
        let markers = Arc::new(markers);
        if hourly.is_empty() {
            SeriesPair {
                primary: Arc::clone(&markers),
                markers,
                supports_hourly: false,
            }
        } else {
            SeriesPair {
                primary: Arc::new(hourly),
                markers,
                supports_hourly: true,
            }
        }
    }
}
