use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::model::{ColumnInfo, ColumnKind};

// ---------------------------------------------------------------------------
// Metric classifier
// ---------------------------------------------------------------------------

/// Metrics counting events or units. These are summed across geographies;
/// everything else (prices, ratios, days on market) is averaged.
pub const COUNT_LIKE_METRICS: [&str; 5] = [
    "HOMES_SOLD",
    "PENDING_SALES",
    "NEW_LISTINGS",
    "INVENTORY",
    "PRICE_DROPS",
];

/// Identifier-like columns that happen to be numeric.
pub const ID_COLUMNS: [&str; 3] = ["TABLE_ID", "REGION_TYPE_ID", "PROPERTY_TYPE_ID"];
pub const ID_SUFFIX: &str = "_ID";

/// Preferred metric when the dataset carries it.
pub const DEFAULT_METRIC: &str = "MEDIAN_SALE_PRICE";

/// How values inside one group are reduced to a single number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Mean,
}

impl AggFunc {
    /// Reduce skipping missing inputs. Zero non-missing inputs give `None`.
    pub fn reduce<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let (sum, n) = values
            .into_iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            return None;
        }
        match self {
            AggFunc::Sum => Some(sum),
            AggFunc::Mean => Some(sum / n as f64),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_count_like(metric_name: &str) -> bool {
    COUNT_LIKE_METRICS.contains(&metric_name)
}

/// Aggregation for a metric. Unknown names fall back to [`AggFunc::Mean`].
pub fn agg_func(metric_name: &str) -> AggFunc {
    if is_count_like(metric_name) {
        AggFunc::Sum
    } else {
        AggFunc::Mean
    }
}

// ---------------------------------------------------------------------------
// Derived changes and their companion columns
// ---------------------------------------------------------------------------

/// A percentage change derived from a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    MonthOverMonth,
    YearOverYear,
}

impl Change {
    pub const ALL: [Change; 2] = [Change::MonthOverMonth, Change::YearOverYear];

    /// Suffix of the precomputed companion column.
    pub fn suffix(self) -> &'static str {
        match self {
            Change::MonthOverMonth => "_MOM",
            Change::YearOverYear => "_YOY",
        }
    }

    /// How many rows back the comparison point sits in a sorted series.
    pub fn lag(self) -> usize {
        match self {
            Change::MonthOverMonth => 1,
            Change::YearOverYear => 12,
        }
    }

    pub fn companion_name(self, metric: &str) -> String {
        format!("{metric}{}", self.suffix())
    }
}

fn is_derived(name: &str) -> bool {
    Change::ALL.iter().any(|c| name.ends_with(c.suffix()))
}

fn is_identifier(name: &str) -> bool {
    name.ends_with(ID_SUFFIX) || ID_COLUMNS.contains(&name)
}

// ---------------------------------------------------------------------------
// Base-metric discovery
// ---------------------------------------------------------------------------

/// Numeric columns that can be charted directly: not a `_MOM`/`_YOY`
/// companion and not an identifier. Sorted, without duplicates.
pub fn discover_base_metrics(columns: &[ColumnInfo]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .map(|c| c.name.as_str())
        .filter(|name| !is_derived(name) && !is_identifier(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// MetricSchema – base metric → companion columns, resolved once at load
// ---------------------------------------------------------------------------

/// Everything the trend builder needs to know about one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: String,
    /// Position of the metric in each record's values.
    pub column: usize,
    /// Numeric `<metric>_MOM` column, if the source carries one.
    pub mom_column: Option<usize>,
    /// Numeric `<metric>_YOY` column, if the source carries one.
    pub yoy_column: Option<usize>,
    pub agg: AggFunc,
}

impl MetricSpec {
    pub fn companion(&self, change: Change) -> Option<usize> {
        match change {
            Change::MonthOverMonth => self.mom_column,
            Change::YearOverYear => self.yoy_column,
        }
    }
}

/// The selectable metric universe of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSchema {
    metrics: BTreeMap<String, MetricSpec>,
}

impl MetricSchema {
    /// Resolve companions for each base metric against the actual columns.
    ///
    /// A companion that exists but is not numeric is ignored, so that change
    /// is computed from the series instead.
    pub fn build(
        base_metrics: &[String],
        columns: &[ColumnInfo],
        numeric_columns: &BTreeMap<String, usize>,
    ) -> Self {
        let mut metrics = BTreeMap::new();

        for name in base_metrics {
            let Some(&column) = numeric_columns.get(name) else {
                continue;
            };

            let resolve = |change: Change| {
                let companion = change.companion_name(name);
                match numeric_columns.get(&companion) {
                    Some(&idx) => Some(idx),
                    None => {
                        if columns.iter().any(|c| c.name == companion) {
                            log::warn!("{companion} is not numeric; {change:?} will be computed");
                        }
                        None
                    }
                }
            };

            let spec = MetricSpec {
                name: name.clone(),
                column,
                mom_column: resolve(Change::MonthOverMonth),
                yoy_column: resolve(Change::YearOverYear),
                agg: agg_func(name),
            };
            metrics.insert(name.clone(), spec);
        }

        MetricSchema { metrics }
    }

    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.metrics.get(name)
    }

    /// Metric names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// [`DEFAULT_METRIC`] if present, otherwise the first name.
    pub fn default_metric(&self) -> Option<&str> {
        if self.metrics.contains_key(DEFAULT_METRIC) {
            return Some(DEFAULT_METRIC);
        }
        self.names().next()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(name: &str) -> ColumnInfo {
        ColumnInfo::new(name, ColumnKind::Numeric)
    }

    fn index(columns: &[ColumnInfo]) -> BTreeMap<String, usize> {
        columns
            .iter()
            .filter(|c| c.is_numeric())
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect()
    }

    #[test]
    fn count_like_metrics_sum_everything_else_means() {
        for name in COUNT_LIKE_METRICS {
            assert!(is_count_like(name));
            assert_eq!(agg_func(name), AggFunc::Sum);
        }
        for name in ["MEDIAN_SALE_PRICE", "AVG_SALE_TO_LIST", "MEDIAN_DOM", "homes_sold", ""] {
            assert!(!is_count_like(name));
            assert_eq!(agg_func(name), AggFunc::Mean);
        }
    }

    #[test]
    fn reduce_skips_missing_values() {
        let values = [Some(2.0), None, Some(4.0)];
        assert_eq!(AggFunc::Sum.reduce(values), Some(6.0));
        assert_eq!(AggFunc::Mean.reduce(values), Some(3.0));
        assert_eq!(AggFunc::Sum.reduce([None, None]), None);
        assert_eq!(AggFunc::Mean.reduce(std::iter::empty()), None);
    }

    #[test]
    fn discovery_excludes_derived_and_identifier_columns() {
        let columns = vec![
            ColumnInfo::new("PERIOD_END", ColumnKind::Date),
            ColumnInfo::new("REGION", ColumnKind::Text),
            numeric("MEDIAN_SALE_PRICE_YOY"),
            numeric("MEDIAN_SALE_PRICE"),
            numeric("HOMES_SOLD"),
            numeric("MEDIAN_SALE_PRICE_MOM"),
            numeric("TABLE_ID"),
            numeric("PARENT_METRO_REGION_METRO_CODE_ID"),
            numeric("HOMES_SOLD"),
            ColumnInfo::new("STATE_CODE", ColumnKind::Text),
        ];

        let base = discover_base_metrics(&columns);
        assert_eq!(base, vec!["HOMES_SOLD", "MEDIAN_SALE_PRICE"]);
    }

    #[test]
    fn discovery_is_independent_of_column_order() {
        let mut columns = vec![numeric("B"), numeric("A_YOY"), numeric("C"), numeric("A")];
        let forward = discover_base_metrics(&columns);
        columns.reverse();
        assert_eq!(forward, discover_base_metrics(&columns));
        assert_eq!(forward, vec!["A", "B", "C"]);
    }

    #[test]
    fn schema_resolves_numeric_companions_only() {
        let columns = vec![
            numeric("MEDIAN_SALE_PRICE"),
            numeric("MEDIAN_SALE_PRICE_MOM"),
            ColumnInfo::new("MEDIAN_SALE_PRICE_YOY", ColumnKind::Text),
            numeric("HOMES_SOLD"),
        ];
        let base = discover_base_metrics(&columns);
        let schema = MetricSchema::build(&base, &columns, &index(&columns));

        let price = schema.get("MEDIAN_SALE_PRICE").unwrap();
        assert_eq!(price.column, 0);
        assert_eq!(price.mom_column, Some(1));
        assert_eq!(price.yoy_column, None);
        assert_eq!(price.agg, AggFunc::Mean);

        let sold = schema.get("HOMES_SOLD").unwrap();
        assert_eq!(sold.companion(Change::MonthOverMonth), None);
        assert_eq!(sold.agg, AggFunc::Sum);

        assert_eq!(schema.default_metric(), Some(DEFAULT_METRIC));
    }

    #[test]
    fn default_metric_falls_back_to_first_name() {
        let columns = vec![numeric("PENDING_SALES"), numeric("INVENTORY")];
        let base = discover_base_metrics(&columns);
        let schema = MetricSchema::build(&base, &columns, &index(&columns));
        assert_eq!(schema.default_metric(), Some("INVENTORY"));
        assert_eq!(schema.len(), 2);
    }
}
