use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::metrics::{AggFunc, Change, MetricSpec};
use super::model::{GeoLevel, Record};

// ---------------------------------------------------------------------------
// TrendSeries – the derived, display-ready table
// ---------------------------------------------------------------------------

/// One row of a trend: a period (and geography in multi-geography mode)
/// with its aggregated value and percentage changes. `None` is "missing".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub period_end: NaiveDate,
    pub geography: Option<String>,
    pub value: Option<f64>,
    pub mom: Option<f64>,
    pub yoy: Option<f64>,
}

/// Rows sorted ascending by `(period_end, geography)`, one row per key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub metric: String,
    /// Set only in multi-geography mode; then every row carries a geography.
    pub geo_level: Option<GeoLevel>,
    pub rows: Vec<TrendRow>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_multi_geo(&self) -> bool {
        self.geo_level.is_some()
    }

    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.period_end).max()
    }

    /// Distinct geographies, sorted. Empty in single-geography mode.
    pub fn geographies(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|r| r.geography.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows of one geography line, in period order. `None` selects the
    /// collapsed series of single-geography mode.
    pub fn line<'a>(&'a self, geography: Option<&'a str>) -> impl Iterator<Item = &'a TrendRow> {
        self.rows
            .iter()
            .filter(move |r| r.geography.as_deref() == geography)
    }
}

// ---------------------------------------------------------------------------
// Trend builder
// ---------------------------------------------------------------------------

/// Options that vary per interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendOptions {
    /// Group per geography at this level (multi-geography mode).
    pub per_geography: Option<GeoLevel>,
    /// Trailing moving-average window, if smoothing is on.
    pub smoothing_window: Option<usize>,
}

type GroupKey = (NaiveDate, Option<String>);

/// Aggregate filtered records into a trend for one metric.
///
/// Values are reduced per group with the metric's aggregation, optionally
/// smoothed, then MoM and YoY are taken from the precomputed companion
/// columns when the metric has them, or computed from the (smoothed) value
/// series by row lag otherwise.
pub fn build_trend(records: &[&Record], spec: &MetricSpec, options: &TrendOptions) -> TrendSeries {
    let grouped = group_reduce(records, spec.column, spec.agg, options.per_geography);
    let keys: Vec<GroupKey> = grouped.keys().cloned().collect();
    let mut values: Vec<Option<f64>> = grouped.into_values().collect();

    let lines = line_positions(&keys);

    if let Some(window) = options.smoothing_window {
        values = rolling_mean(&values, &lines, window);
    }

    let [mom, yoy] = Change::ALL.map(|change| match spec.companion(change) {
        Some(column) => {
            let companion = group_reduce(records, column, spec.agg, options.per_geography);
            keys.iter()
                .map(|k| companion.get(k).copied().flatten())
                .collect::<Vec<_>>()
        }
        None => lagged_change(&values, &lines, change.lag()),
    });

    let rows = keys
        .into_iter()
        .zip(values)
        .zip(mom.into_iter().zip(yoy))
        .map(|(((period_end, geography), value), (mom, yoy))| TrendRow {
            period_end,
            geography,
            value,
            mom,
            yoy,
        })
        .collect();

    TrendSeries {
        metric: spec.name.clone(),
        geo_level: options.per_geography,
        rows,
    }
}

/// Reduce one column per `(period_end[, geography])`. The map order is the
/// output row order.
fn group_reduce(
    records: &[&Record],
    column: usize,
    agg: AggFunc,
    per_geography: Option<GeoLevel>,
) -> BTreeMap<GroupKey, Option<f64>> {
    let mut groups: BTreeMap<GroupKey, Vec<Option<f64>>> = BTreeMap::new();
    for r in records {
        let geography = match per_geography {
            Some(level) => match r.geography(level) {
                Some(g) => Some(g.to_string()),
                None => continue,
            },
            None => None,
        };
        groups
            .entry((r.period_end, geography))
            .or_default()
            .push(r.value(column));
    }

    groups
        .into_iter()
        .map(|(key, cells)| (key, agg.reduce(cells)))
        .collect()
}

/// Row positions of each geography line, each in ascending period order.
fn line_positions(keys: &[GroupKey]) -> Vec<Vec<usize>> {
    let mut lines: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for (i, (_, geography)) in keys.iter().enumerate() {
        lines.entry(geography.as_deref()).or_default().push(i);
    }
    lines.into_values().collect()
}

/// Trailing mean over up to `window` rows of the same line. Leading rows use
/// the shorter history available; missing values are skipped.
fn rolling_mean(values: &[Option<f64>], lines: &[Vec<usize>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for line in lines {
        for (pos, &row) in line.iter().enumerate() {
            let from = (pos + 1).saturating_sub(window);
            out[row] = AggFunc::Mean.reduce(line[from..=pos].iter().map(|&i| values[i]));
        }
    }
    out
}

/// `(value[t] / value[t - lag] - 1) * 100` within each line.
fn lagged_change(values: &[Option<f64>], lines: &[Vec<usize>], lag: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for line in lines {
        for (pos, &row) in line.iter().enumerate().skip(lag) {
            out[row] = pct_change(values[row], values[line[pos - lag]]);
        }
    }
    out
}

/// Percentage change; missing when either side is missing or the prior is zero.
pub fn pct_change(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    match (current, prior) {
        (Some(c), Some(p)) if p != 0.0 => Some((c / p - 1.0) * 100.0),
        _ => None,
    }
}
