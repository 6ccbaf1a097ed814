//! # NOAA Tide Prediction Fetching
//!
//! This module handles all network operations for fetching tide predictions from
//! the NOAA CO-OPS Data API. It turns a logical query (window, resolution, datum,
//! units) into a request, executes it, and returns validated [`PredictionPoint`]s
//! or a typed failure.
//!
//! ## Data Source
//!
//! ### NOAA CO-OPS Data API
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Product**: `predictions`, JSON format
//! - **Time zone**: `lst_ldt` (station local time, daylight saving applied)
//! - **Interval**: `60` for the hourly curve, `hilo` for high/low turning points
//!
//! ### Response Shapes
//! ```json
//! {"predictions": [{"t": "2024-06-01 04:12", "v": "9.870", "type": "H"}]}
//! {"error": {"message": "No data was found."}}
//! ```
//!
//! ## Error Handling
//!
//! - **Transport failures**: connection, TLS and timeout problems surface as [`TideError::Http`]
//! - **API errors**: non-success status or an `error` payload become [`TideError::Acquisition`]
//!   carrying NOAA's own message when there is one
//! - **Validation problems**: a missing `predictions` array or a malformed entry is
//!   logged and skipped, never fatal
//!
//! Every call makes exactly one request; there are no retries and no caching.

use crate::{PredictionPoint, QueryOptions, Resolution, TideKind, TimeWindow, APPLICATION, STATION};
use log::{debug, warn};
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while acquiring predictions.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// NOAA rejected the request; the message is shown to the user as-is
    #[error("{0}")]
    Acquisition(String),

    /// Response body was not JSON
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured base URL could not be parsed
    #[error("invalid request URL {0}")]
    InvalidUrl(String),
}

/// Production endpoint of the CO-OPS Data API.
pub const DEFAULT_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_ZONE: &str = "lst_ldt";

/// Anything that can answer a prediction query.
///
/// [`NoaaClient`] is the real implementation; the reconciliation layer is written
/// against this trait so coverage decisions can be exercised without a network.
#[allow(async_fn_in_trait)]
pub trait PredictionSource {
    async fn fetch_predictions(
        &self,
        window: &TimeWindow,
        resolution: Resolution,
        options: &QueryOptions,
    ) -> Result<Vec<PredictionPoint>, TideError>;
}

/// Build the predictions request for `window`.
///
/// `resolution` of `None` leaves out the `interval` parameter, which makes NOAA
/// fall back to its default 6-minute spacing.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tide_tracker::{tide_data, QueryOptions, Resolution, TimeWindow};
///
/// let window = TimeWindow {
///     begin: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
///     end: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
/// };
/// let url = tide_data::build_request_url(
///     tide_data::DEFAULT_BASE_URL,
///     &window,
///     Some(Resolution::HighLow),
///     &QueryOptions::default(),
/// )
/// .unwrap();
/// assert!(url.as_str().contains("begin_date=20240601"));
/// assert!(url.as_str().contains("interval=hilo"));
/// ```
pub fn build_request_url(
    base: &str,
    window: &TimeWindow,
    resolution: Option<Resolution>,
    options: &QueryOptions,
) -> Result<Url, TideError> {
    let begin = window.begin.format(DATE_FORMAT).to_string();
    let end = window.end.format(DATE_FORMAT).to_string();

    let mut params = vec![
        ("product", "predictions"),
        ("application", APPLICATION),
        ("begin_date", begin.as_str()),
        ("end_date", end.as_str()),
        ("datum", options.datum.as_str()),
        ("station", STATION.id),
        ("time_zone", TIME_ZONE),
        ("units", options.units.as_str()),
        ("format", "json"),
    ];
    if let Some(resolution) = resolution {
        params.push(("interval", resolution.interval()));
    }

    Url::parse_with_params(base, &params).map_err(|e| TideError::InvalidUrl(format!("{base}: {e}")))
}

/// Parse a successful response body into prediction points.
///
/// An `error` payload fails with its message. A body without a `predictions`
/// array yields an empty sequence.
pub fn parse_predictions(body: &str) -> Result<Vec<PredictionPoint>, TideError> {
    let payload: Value = serde_json::from_str(body)?;

    if let Some(message) = error_message(&payload) {
        return Err(TideError::Acquisition(message));
    }

    let Some(entries) = payload.get("predictions").and_then(Value::as_array) else {
        warn!("Response has no predictions array, treating it as empty");
        return Ok(Vec::new());
    };

    Ok(entries.iter().filter_map(to_point).collect())
}

/// HTTP client for the CO-OPS Data API.
#[derive(Clone, Debug)]
pub struct NoaaClient {
    client: Client,
    base_url: String,
}

impl NoaaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured `reqwest` client (proxy, timeouts, TLS settings).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        NoaaClient {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for NoaaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PredictionSource for NoaaClient {
    async fn fetch_predictions(
        &self,
        window: &TimeWindow,
        resolution: Resolution,
        options: &QueryOptions,
    ) -> Result<Vec<PredictionPoint>, TideError> {
        let url = build_request_url(&self.base_url, window, Some(resolution), options)?;
        debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            // NOAA sometimes explains a rejection in the body; prefer that over the bare status.
            // An unreadable body still reports the status.
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(TideError::Acquisition(message));
        }

        let body = response.text().await?;
        let points = parse_predictions(&body)?;
        debug!(
            "Received {} {:?} predictions for station {}",
            points.len(),
            resolution,
            STATION.id
        );
        Ok(points)
    }
}

// -- Private Implementation --

/// Extract the message of an `error` payload, if the body is one.
fn error_message(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        error => Some(
            error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown API error")
                .to_string(),
        ),
    }
}

/// Convert one `{t, v, type?}` entry. Entries without a timestamp or a numeric
/// height are dropped.
fn to_point(entry: &Value) -> Option<PredictionPoint> {
    let time = entry.get("t").and_then(Value::as_str);
    let height = match entry.get("v") {
        Some(Value::String(v)) => v.trim().parse::<f64>().ok(),
        Some(Value::Number(v)) => v.as_f64(),
        _ => None,
    }
    .filter(|v| v.is_finite());

    match (time, height) {
        (Some(time), Some(height)) => Some(PredictionPoint {
            time: time.to_string(),
            height,
            kind: entry
                .get("type")
                .and_then(Value::as_str)
                .map(TideKind::from_tag),
        }),
        _ => {
            warn!("Dropping malformed prediction entry: {entry}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn june_window() -> TimeWindow {
        TimeWindow {
            begin: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        }
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_request_has_exactly_the_documented_parameters() {
        let options = QueryOptions {
            datum: "MSL".to_string(),
            units: "metric".to_string(),
        };
        let url = build_request_url(
            DEFAULT_BASE_URL,
            &june_window(),
            Some(Resolution::Hourly),
            &options,
        )
        .unwrap();
        let params = query_map(&url);

        assert_eq!(url.query_pairs().count(), 10);
        assert_eq!(params["product"], "predictions");
        assert_eq!(params["application"], APPLICATION);
        assert_eq!(params["begin_date"], "20240601");
        assert_eq!(params["end_date"], "20240615");
        assert_eq!(params["datum"], "MSL");
        assert_eq!(params["station"], "8418150");
        assert_eq!(params["time_zone"], "lst_ldt");
        assert_eq!(params["units"], "metric");
        assert_eq!(params["format"], "json");
        assert_eq!(params["interval"], "60");
    }

    #[test]
    fn test_interval_follows_resolution() {
        let options = QueryOptions::default();
        let window = june_window();

        let hilo =
            build_request_url(DEFAULT_BASE_URL, &window, Some(Resolution::HighLow), &options)
                .unwrap();
        assert_eq!(query_map(&hilo)["interval"], "hilo");

        let unspecified = build_request_url(DEFAULT_BASE_URL, &window, None, &options).unwrap();
        let params = query_map(&unspecified);
        assert_eq!(params.len(), 9);
        assert!(!params.contains_key("interval"));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = build_request_url("not a url", &june_window(), None, &QueryOptions::default());
        assert!(matches!(result, Err(TideError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_extrema() {
        let body = r#"{"predictions":[
            {"t":"2024-06-01 04:12","v":"9.870","type":"H"},
            {"t":"2024-06-01 10:31","v":"-0.412","type":"L"}
        ]}"#;
        let points = parse_predictions(body).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, "2024-06-01 04:12");
        assert_eq!(points[0].height, 9.87);
        assert_eq!(points[0].kind, Some(TideKind::High));
        assert_eq!(points[1].height, -0.412);
        assert_eq!(points[1].kind, Some(TideKind::Low));
    }

    #[test]
    fn test_parse_hourly_has_no_kind() {
        let body = r#"{"predictions":[
            {"t":"2024-06-01 00:00","v":"5.1"},
            {"t":"2024-06-01 01:00","v":"6.0"}
        ]}"#;
        let points = parse_predictions(body).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.kind.is_none()));
    }

    #[test]
    fn test_empty_predictions_is_success() {
        let points = parse_predictions(r#"{"predictions":[]}"#).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_error_payload_message_is_kept_exactly() {
        let err = parse_predictions(r#"{"error":{"message":"No data was found."}}"#).unwrap_err();
        assert!(matches!(err, TideError::Acquisition(_)));
        assert_eq!(err.to_string(), "No data was found.");
    }

    #[test]
    fn test_missing_predictions_array_becomes_empty() {
        assert!(parse_predictions(r#"{"metadata":{}}"#).unwrap().is_empty());
        assert!(parse_predictions(r#"{"predictions":"oops"}"#).unwrap().is_empty());
        assert!(parse_predictions("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let body = r#"{"predictions":[
            {"t":"2024-06-01 00:00","v":""},
            {"t":"2024-06-01 01:00","v":"NaN"},
            {"v":"1.0"},
            {"t":"2024-06-01 02:00","v":2.5}
        ]}"#;
        let points = parse_predictions(body).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].height, 2.5);
    }

    #[test]
    fn test_non_json_body_is_decode_error() {
        let err = parse_predictions("<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, TideError::Decode(_)));
    }
}
