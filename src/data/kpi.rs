use chrono::NaiveDate;
use serde::Serialize;

use super::filter::FilterSelection;
use super::metrics::{agg_func, AggFunc};
use super::trend::TrendSeries;
use crate::format::MISSING;

/// Headline numbers for the latest period of a trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub latest_period: NaiveDate,
    pub metric: String,
    pub value: Option<f64>,
    pub mom: Option<f64>,
    pub yoy: Option<f64>,
    /// "3 regions", or the single selected geography.
    pub scope: String,
    pub filtered_rows: usize,
}

/// Summarise the latest period of `series`.
///
/// In multi-geography mode the value is summed (count-like metrics) or
/// averaged across geographies, and MoM/YoY are averaged; missing entries are
/// skipped. Returns `None` for an empty series.
pub fn summarize(
    series: &TrendSeries,
    selection: &FilterSelection,
    filtered_rows: usize,
) -> Option<KpiSummary> {
    let latest_period = series.latest_period()?;
    let latest: Vec<_> = series
        .rows
        .iter()
        .filter(|r| r.period_end == latest_period)
        .collect();

    let (value, mom, yoy, scope) = match series.geo_level {
        Some(level) => (
            agg_func(&series.metric).reduce(latest.iter().map(|r| r.value)),
            AggFunc::Mean.reduce(latest.iter().map(|r| r.mom)),
            AggFunc::Mean.reduce(latest.iter().map(|r| r.yoy)),
            format!("{} {}", selection.geographies.len(), level.plural()),
        ),
        None => {
            let row = latest.first()?;
            let scope = selection
                .geographies
                .iter()
                .next()
                .cloned()
                .unwrap_or_else(|| MISSING.to_string());
            (row.value, row.mom, row.yoy, scope)
        }
    };

    Some(KpiSummary {
        latest_period,
        metric: series.metric.clone(),
        value,
        mom,
        yoy,
        scope,
        filtered_rows,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::filter::{PeriodRange, DEFAULT_SMOOTHING_WINDOW};
    use crate::data::model::GeoLevel;
    use crate::data::trend::TrendRow;

    fn date(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 28).unwrap()
    }

    fn selection(metric: &str, geos: &[&str]) -> FilterSelection {
        FilterSelection {
            property_type: "Single Family Residential".to_string(),
            geo_level: GeoLevel::Region,
            geographies: geos.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
            metric: metric.to_string(),
            period: PeriodRange { start: date(1), end: date(2) },
            smoothing: false,
            window: DEFAULT_SMOOTHING_WINDOW,
            show_yoy: true,
        }
    }

    fn row(m: u32, geo: Option<&str>, value: Option<f64>, mom: Option<f64>, yoy: Option<f64>) -> TrendRow {
        TrendRow {
            period_end: date(m),
            geography: geo.map(str::to_string),
            value,
            mom,
            yoy,
        }
    }

    #[test]
    fn count_metric_sums_latest_values_across_geographies() {
        let series = TrendSeries {
            metric: "HOMES_SOLD".to_string(),
            geo_level: Some(GeoLevel::Region),
            rows: vec![
                row(1, Some("Austin, TX"), Some(10.0), None, None),
                row(1, Some("Denver, CO"), Some(20.0), None, None),
                row(2, Some("Austin, TX"), Some(30.0), Some(2.0), None),
                row(2, Some("Denver, CO"), Some(50.0), None, Some(4.0)),
            ],
        };
        let sel = selection("HOMES_SOLD", &["Austin, TX", "Denver, CO"]);

        let kpi = summarize(&series, &sel, 40).unwrap();
        assert_eq!(kpi.latest_period, date(2));
        assert_eq!(kpi.value, Some(80.0));
        assert_eq!(kpi.mom, Some(2.0));
        assert_eq!(kpi.yoy, Some(4.0));
        assert_eq!(kpi.scope, "2 regions");
        assert_eq!(kpi.filtered_rows, 40);
    }

    #[test]
    fn price_metric_averages_latest_values() {
        let series = TrendSeries {
            metric: "MEDIAN_SALE_PRICE".to_string(),
            geo_level: Some(GeoLevel::City),
            rows: vec![
                row(2, Some("Austin"), Some(400_000.0), None, None),
                row(2, Some("Denver"), Some(600_000.0), None, None),
            ],
        };
        let sel = selection("MEDIAN_SALE_PRICE", &["Austin", "Denver"]);

        let kpi = summarize(&series, &sel, 2).unwrap();
        assert_eq!(kpi.value, Some(500_000.0));
        assert_eq!(kpi.mom, None);
        assert_eq!(kpi.scope, "2 cities");
    }

    #[test]
    fn single_geography_reports_its_own_row() {
        let series = TrendSeries {
            metric: "MEDIAN_SALE_PRICE".to_string(),
            geo_level: None,
            rows: vec![
                row(1, None, Some(1.0), None, None),
                row(2, None, Some(2.0), Some(100.0), None),
            ],
        };

        let kpi = summarize(&series, &selection("MEDIAN_SALE_PRICE", &["Boise, ID"]), 2).unwrap();
        assert_eq!(kpi.value, Some(2.0));
        assert_eq!(kpi.mom, Some(100.0));
        assert_eq!(kpi.yoy, None);
        assert_eq!(kpi.scope, "Boise, ID");

        let kpi = summarize(&series, &selection("MEDIAN_SALE_PRICE", &[]), 2).unwrap();
        assert_eq!(kpi.scope, MISSING);
    }

    #[test]
    fn empty_series_has_no_summary() {
        let series = TrendSeries {
            metric: "INVENTORY".to_string(),
            geo_level: None,
            rows: Vec::new(),
        };
        assert!(summarize(&series, &selection("INVENTORY", &[]), 0).is_none());
    }
}
