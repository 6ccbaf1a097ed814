//! # Refresh Cycle
//!
//! One refresh computes a fresh window, loads and reconciles both series, maps
//! them for the chart and the table, and swaps the new chart into the single
//! chart slot.
//!
//! Refreshes may overlap (a periodic refresh firing while a slow one is still
//! waiting on NOAA). Each refresh takes a generation number when it starts; a
//! refresh that finishes after a newer one has started is discarded instead of
//! overwriting newer data.

use crate::fallback::{compute_window, load_tide_data, CoverageNotice, TideLoad};
use crate::renderer::{
    map_chart, map_table, render_table, ChartData, ChartSlot, TableRow, TideChart,
};
use crate::tide_data::{PredictionSource, TideError};
use crate::{QueryOptions, STATION};
use chrono::{DateTime, TimeZone};
use log::{debug, info};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a refresh produced for display.
#[derive(Clone, Debug)]
pub struct TideView {
    pub generation: u64,
    pub load: TideLoad,
    pub chart: ChartData,
    pub table: Vec<TableRow>,
    /// Text of the chart now held by the slot
    pub chart_text: String,
}

impl TideView {
    pub fn notice(&self) -> CoverageNotice {
        self.load.notice
    }
}

impl fmt::Display for TideView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tide predictions for {} (station {}), {} to {}, datum {}",
            STATION.name,
            STATION.id,
            self.load.window.begin,
            self.load.window.end,
            self.load.options.datum
        )?;
        writeln!(f, "{}", self.load.notice)?;
        writeln!(f)?;
        write!(f, "{}", self.chart_text)?;
        writeln!(f)?;
        write!(f, "{}", render_table(&self.table))
    }
}

/// Result of a refresh that did not fail.
#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    /// Data was rendered and the chart slot now holds the new chart
    Rendered(TideView),
    /// A newer refresh started while this one was loading; nothing was rendered
    Stale { generation: u64, latest: u64 },
}

/// Drives refreshes against a prediction source and owns the live chart.
pub struct Refresher<S> {
    source: S,
    chart_rows: usize,
    generation: AtomicU64,
    chart: Mutex<ChartSlot<TideChart>>,
}

impl<S: PredictionSource> Refresher<S> {
    pub fn new(source: S, chart_rows: usize) -> Self {
        Refresher {
            source,
            chart_rows,
            generation: AtomicU64::new(0),
            chart: Mutex::new(ChartSlot::new()),
        }
    }

    /// Load, reconcile and render the predictions around `now`.
    ///
    /// A failed high/low request is returned as the error and leaves the current
    /// chart untouched. Results of superseded refreshes are dropped, failures
    /// included.
    pub async fn refresh<Tz: TimeZone>(
        &self,
        options: &QueryOptions,
        now: DateTime<Tz>,
    ) -> Result<RefreshOutcome, TideError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let window = compute_window(&now);
        debug!("Refresh #{generation} for {}..{}", window.begin, window.end);

        let result = load_tide_data(&self.source, window, options).await;

        let latest = self.generation.load(Ordering::SeqCst);
        if latest != generation {
            info!("Discarding refresh #{generation}, superseded by #{latest}");
            return Ok(RefreshOutcome::Stale { generation, latest });
        }

        let load = result?;
        let chart = map_chart(&load.series);
        let table = map_table(&load.series.markers, &options.units);
        let rendered = TideChart::render(&chart, &options.units, self.chart_rows);
        let chart_text = rendered.to_string();
        self.slot().replace(rendered);

        Ok(RefreshOutcome::Rendered(TideView {
            generation,
            load,
            chart,
            table,
            chart_text,
        }))
    }

    /// Copy of the chart currently on display.
    pub fn current_chart(&self) -> Option<TideChart> {
        self.slot().current().cloned()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn slot(&self) -> MutexGuard<'_, ChartSlot<TideChart>> {
        self.chart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
