//! # Tide Data Presentation
//!
//! This module shapes a reconciled [`SeriesPair`] into what the output surfaces
//! need and renders it to the terminal:
//!
//! - [`map_chart`]: trace points plus color-coded high/low markers
//! - [`map_table`]: one row per high/low prediction, in the order NOAA sent them
//! - [`TideChart`]: ASCII chart of the mapped data
//! - [`ChartSlot`]: owner of the single live chart

use crate::{PredictionPoint, SeriesPair, TideKind};
use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};
use std::fmt;

/// Unit label for heights. Only `"metric"` means meters.
pub fn unit_label(units: &str) -> &'static str {
    if units == "metric" {
        "m"
    } else {
        "ft"
    }
}

/// Format a height with two decimals and its unit, e.g. `"3.14 ft"`.
pub fn format_height(value: f64, units: &str) -> String {
    format!("{:.2} {}", value, unit_label(units))
}

/// How a marker is drawn on the chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerStyle {
    pub label: &'static str,
    /// CSS-style hex color for graphical surfaces
    pub color: &'static str,
    /// Glyph used by the terminal chart
    pub glyph: char,
}

const HIGH_STYLE: MarkerStyle = MarkerStyle {
    label: "High",
    color: "#d62728",
    glyph: 'H',
};

const LOW_STYLE: MarkerStyle = MarkerStyle {
    label: "Low",
    color: "#1f77b4",
    glyph: 'L',
};

const UNCLASSIFIED_STYLE: MarkerStyle = MarkerStyle {
    label: "Other",
    color: "#7f7f7f",
    glyph: 'o',
};

impl MarkerStyle {
    pub fn for_kind(kind: Option<&TideKind>) -> Self {
        match kind {
            Some(TideKind::High) => HIGH_STYLE,
            Some(TideKind::Low) => LOW_STYLE,
            _ => UNCLASSIFIED_STYLE,
        }
    }
}

/// A high/low point positioned on the chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartMarker {
    pub time: NaiveDateTime,
    pub height: f64,
    pub style: MarkerStyle,
}

/// Chart-ready data: the line trace and the marker overlay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartData {
    pub trace: Vec<(NaiveDateTime, f64)>,
    pub markers: Vec<ChartMarker>,
}

impl ChartData {
    /// Earliest and latest timestamp over trace and markers.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let times = self
            .trace
            .iter()
            .map(|(t, _)| *t)
            .chain(self.markers.iter().map(|m| m.time));
        times.fold(None, |range, t| match range {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }

    /// Lowest and highest height over trace and markers.
    pub fn height_range(&self) -> Option<(f64, f64)> {
        let heights = self
            .trace
            .iter()
            .map(|(_, h)| *h)
            .chain(self.markers.iter().map(|m| m.height));
        heights.fold(None, |range, h| match range {
            None => Some((h, h)),
            Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
        })
    }
}

/// Convert the reconciled series into chart data.
///
/// Points with an unreadable timestamp are left out of the chart.
pub fn map_chart(series: &SeriesPair) -> ChartData {
    let trace = series
        .primary
        .iter()
        .filter_map(|p| with_time(p).map(|t| (t, p.height)))
        .collect();
    let markers = series
        .markers
        .iter()
        .filter_map(|p| {
            with_time(p).map(|time| ChartMarker {
                time,
                height: p.height,
                style: MarkerStyle::for_kind(p.kind.as_ref()),
            })
        })
        .collect();

    ChartData { trace, markers }
}

fn with_time(point: &PredictionPoint) -> Option<NaiveDateTime> {
    let time = point.local_time();
    if time.is_none() {
        warn!("Skipping prediction with unreadable time {:?}", point.time);
    }
    time
}

/// One line of the high/low table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub time: String,
    pub kind: String,
    pub height: String,
}

/// Build table rows for the high/low predictions, keeping NOAA's order.
pub fn map_table(markers: &[PredictionPoint], units: &str) -> Vec<TableRow> {
    markers
        .iter()
        .map(|p| TableRow {
            time: p.time.clone(),
            kind: p.kind.as_ref().map(|k| k.label().to_string()).unwrap_or_default(),
            height: format_height(p.height, units),
        })
        .collect()
}

/// Render table rows as aligned text.
pub fn render_table(rows: &[TableRow]) -> String {
    let mut out = format!("{:<18}{:<6}{:>10}\n", "Time", "Type", "Height");
    for row in rows {
        out.push_str(&format!("{:<18}{:<6}{:>10}\n", row.time, row.kind, row.height));
    }
    out
}

/// A chart that must be released before another one takes its place.
pub trait ChartHandle {
    fn destroy(self);
}

/// Owner of the one live chart.
///
/// [`ChartSlot::replace`] destroys the current chart before installing the new
/// one, so two charts never coexist.
#[derive(Debug)]
pub struct ChartSlot<C: ChartHandle> {
    current: Option<C>,
}

impl<C: ChartHandle> ChartSlot<C> {
    pub fn new() -> Self {
        ChartSlot { current: None }
    }

    pub fn replace(&mut self, chart: C) -> &C {
        self.clear();
        self.current.insert(chart)
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.destroy();
        }
    }

    pub fn current(&self) -> Option<&C> {
        self.current.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}

impl<C: ChartHandle> Default for ChartSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ChartHandle> Drop for ChartSlot<C> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Width of the plotting area in terminal columns (8 per day over 14 days).
pub const CHART_COLUMNS: usize = 112;
const Y_AXIS_WIDTH: usize = 10; // Space for Y-axis labels

/// One decimal when it fits in `width`, scientific notation otherwise.
fn axis_label(value: f64, width: usize) -> String {
    let fixed = format!("{value:.1}");
    if fixed.chars().count() <= width {
        return fixed;
    }
    let scientific = format!("{value:.1e}");
    if scientific.chars().count() <= width {
        scientific
    } else {
        format!("{value:.0e}")
    }
}

/// A rendered terminal chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TideChart {
    lines: Vec<String>,
}

impl TideChart {
    /// Draw `chart` on a grid of `rows` lines.
    ///
    /// The trace is plotted with `•`, high and low markers with their glyphs on
    /// top of it. A `|` below the grid marks each midnight.
    pub fn render(chart: &ChartData, units: &str, rows: usize) -> Self {
        let (Some((start, end)), Some((min_height, max_height))) =
            (chart.time_range(), chart.height_range())
        else {
            return TideChart {
                lines: vec!["(no predictions to chart)".to_string()],
            };
        };

        let rows = rows.max(2);
        let span_secs = (end - start).num_seconds().max(1) as f64;
        let range = (max_height - min_height).max(f64::EPSILON);

        let to_column = |t: NaiveDateTime| {
            let fraction = (t - start).num_seconds() as f64 / span_secs;
            ((fraction * (CHART_COLUMNS - 1) as f64).round() as usize).min(CHART_COLUMNS - 1)
        };
        let to_row = |height: f64| {
            let normalized = (height - min_height) / range;
            (((1.0 - normalized) * (rows - 1) as f64).round() as usize).min(rows - 1)
        };

        let mut grid = vec![vec![' '; CHART_COLUMNS + Y_AXIS_WIDTH]; rows];

        // Y-axis labels on every other row, bottom row always labelled
        for row in (0..rows).step_by(2).chain(std::iter::once(rows - 1)) {
            let value = max_height - row as f64 * range / (rows - 1) as f64;
            let label = axis_label(value, Y_AXIS_WIDTH - 2);
            let pad = Y_AXIS_WIDTH - 2 - label.chars().count();
            for (i, ch) in label.chars().enumerate() {
                grid[row][pad + i] = ch;
            }
            grid[row][Y_AXIS_WIDTH - 1] = '│';
        }

        for &(time, height) in &chart.trace {
            grid[to_row(height)][Y_AXIS_WIDTH + to_column(time)] = '•';
        }
        for marker in &chart.markers {
            let column = Y_AXIS_WIDTH + to_column(marker.time);
            grid[to_row(marker.height)][column] = marker.style.glyph;
        }

        let mut lines: Vec<String> = grid
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect();

        // Day boundaries below the chart
        let mut axis = vec![' '; CHART_COLUMNS];
        let mut midnight = start.date().and_hms_opt(0, 0, 0).unwrap_or(start);
        if midnight < start {
            midnight += Duration::days(1);
        }
        while midnight <= end {
            axis[to_column(midnight)] = '|';
            midnight += Duration::days(1);
        }
        let padding = " ".repeat(Y_AXIS_WIDTH);
        lines.push(format!("{}{}", padding, axis.into_iter().collect::<String>()));

        let first = start.format("%b %-d").to_string();
        let last = end.format("%b %-d").to_string();
        let gap = CHART_COLUMNS.saturating_sub(first.len() + last.len());
        lines.push(format!("{}{}{}{}", padding, first, " ".repeat(gap), last));

        lines.push(format!(
            "{}• predicted ({})   {} {}   {} {}",
            padding,
            unit_label(units),
            HIGH_STYLE.glyph,
            HIGH_STYLE.label,
            LOW_STYLE.glyph,
            LOW_STYLE.label
        ));

        TideChart { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for TideChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl ChartHandle for TideChart {
    fn destroy(self) {
        debug!("Releasing chart ({} lines)", self.lines.len());
    }
}
