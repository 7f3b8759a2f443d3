/// Data layer: core types, loading, and the trend pipeline.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (+ MetricSchema)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection → matching records
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  trend    │  group → aggregate → smooth → mom / yoy
///   └──────────┘
///        │
///        ├──────────► kpi     latest-period summary
///        └──────────► export  delimited download
/// ```

pub mod export;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod trend;

use crate::error::{Result, TrendError};
use filter::{filter_records, FilterSelection};
use kpi::{summarize, KpiSummary};
use model::Dataset;
use trend::{build_trend, TrendOptions, TrendSeries};

/// Everything the chart, cards and export need for one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendView {
    pub series: TrendSeries,
    pub kpis: KpiSummary,
}

/// Run the full pipeline for one selection. Never mutates `dataset`.
pub fn compute_view(dataset: &Dataset, selection: &FilterSelection) -> Result<TrendView> {
    let spec = dataset
        .metrics
        .get(&selection.metric)
        .ok_or_else(|| TrendError::UnknownMetric(selection.metric.clone()))?;
    let smoothing_window = selection.smoothing_window()?;

    let records = filter_records(dataset, selection)?;

    let options = TrendOptions {
        per_geography: selection.is_multi_geo().then_some(selection.geo_level),
        smoothing_window,
    };
    let series = build_trend(&records, spec, &options);
    let kpis = summarize(&series, selection, records.len()).ok_or(TrendError::NoMatchingRows)?;

    log::debug!(
        "{} / {} / {} geos / {}..={}: {} records → {} rows",
        selection.property_type,
        selection.metric,
        selection.geographies.len(),
        selection.period.start,
        selection.period.end,
        records.len(),
        series.len()
    );

    Ok(TrendView { series, kpis })
}
