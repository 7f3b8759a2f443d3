use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::metrics::{discover_base_metrics, MetricSchema};

// ---------------------------------------------------------------------------
// Column names and kinds
// ---------------------------------------------------------------------------

pub const PERIOD_END: &str = "PERIOD_END";
pub const PROPERTY_TYPE: &str = "PROPERTY_TYPE";
pub const REGION: &str = "REGION";
pub const CITY: &str = "CITY";

/// Columns with a fixed role; never treated as metrics.
pub const KEY_COLUMNS: [&str; 4] = [PERIOD_END, PROPERTY_TYPE, REGION, CITY];

/// How a source column was typed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Text,
    Numeric,
}

/// One column of the source file as seen by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }
}

// ---------------------------------------------------------------------------
// GeoLevel – which geography column drives filtering and grouping
// ---------------------------------------------------------------------------

/// The two categorical geography modes a user can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeoLevel {
    /// Metro-area label (`REGION`).
    Region,
    /// `CITY`.
    City,
}

impl GeoLevel {
    pub const ALL: [GeoLevel; 2] = [GeoLevel::Region, GeoLevel::City];

    /// Source column backing this level.
    pub fn column(self) -> &'static str {
        match self {
            GeoLevel::Region => REGION,
            GeoLevel::City => CITY,
        }
    }

    /// Label shown in the geography-level selector.
    pub fn label(self) -> &'static str {
        match self {
            GeoLevel::Region => "REGION (Metro Area)",
            GeoLevel::City => "CITY",
        }
    }

    /// Lower-case plural used in scope labels ("3 regions").
    pub fn plural(self) -> &'static str {
        match self {
            GeoLevel::Region => "regions",
            GeoLevel::City => "cities",
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single parsed row. Numeric cells are positional, in the file order of
/// the numeric columns; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub period_end: NaiveDate,
    pub property_type: String,
    pub region: Option<String>,
    pub city: Option<String>,
    pub values: Vec<Option<f64>>,
}

impl Record {
    /// Geography label of this row at the given level.
    pub fn geography(&self, level: GeoLevel) -> Option<&str> {
        match level {
            GeoLevel::Region => self.region.as_deref(),
            GeoLevel::City => self.city.as_deref(),
        }
    }

    /// Numeric cell by column position.
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset. Built once and never mutated afterwards; the
/// application shares it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All rows whose `PERIOD_END` parsed.
    pub records: Vec<Record>,
    /// Geography levels whose column exists in the source.
    pub geo_levels: Vec<GeoLevel>,
    /// Selectable metrics and their companion columns.
    pub metrics: MetricSchema,
    /// Rows discarded because `PERIOD_END` did not parse.
    pub dropped_rows: usize,
}

impl Dataset {
    /// Assemble a dataset and derive its metric schema.
    ///
    /// `columns` must list the numeric columns in the same relative order as
    /// the positions used in each record's `values`.
    pub fn new(columns: Vec<ColumnInfo>, records: Vec<Record>, dropped_rows: usize) -> Self {
        // Numeric column name → position in `Record::values`.
        let numeric_columns: BTreeMap<String, usize> = columns
            .iter()
            .filter(|c| c.is_numeric())
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let geo_levels = GeoLevel::ALL
            .into_iter()
            .filter(|level| columns.iter().any(|c| c.name == level.column()))
            .collect();

        let base = discover_base_metrics(&columns);
        let metrics = MetricSchema::build(&base, &columns, &numeric_columns);

        Dataset {
            records,
            geo_levels,
            metrics,
            dropped_rows,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct property types.
    pub fn property_types(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .map(|r| r.property_type.as_str())
            .collect()
    }

    /// Sorted distinct geographies present for one property type.
    pub fn geographies(&self, property_type: &str, level: GeoLevel) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| r.property_type == property_type)
            .filter_map(|r| r.geography(level))
            .collect()
    }

    /// Earliest and latest `PERIOD_END`.
    pub fn period_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.period_end).min()?;
        let max = self.records.iter().map(|r| r.period_end).max()?;
        Some((min, max))
    }

    /// Whether the source carried the column for `level`.
    pub fn has_geo_level(&self, level: GeoLevel) -> bool {
        self.geo_levels.contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(period: NaiveDate, ptype: &str, region: &str, value: f64) -> Record {
        Record {
            period_end: period,
            property_type: ptype.to_string(),
            region: Some(region.to_string()),
            city: None,
            values: vec![Some(value)],
        }
    }

    #[test]
    fn dataset_indexes_numeric_columns_and_geo_levels() {
        let columns = vec![
            ColumnInfo::new(PERIOD_END, ColumnKind::Date),
            ColumnInfo::new(PROPERTY_TYPE, ColumnKind::Text),
            ColumnInfo::new(REGION, ColumnKind::Text),
            ColumnInfo::new("MEDIAN_SALE_PRICE", ColumnKind::Numeric),
        ];
        let ds = Dataset::new(
            columns,
            vec![record(date(2024, 1, 31), "Condo", "Austin, TX", 1.0)],
            2,
        );

        assert_eq!(ds.metrics.get("MEDIAN_SALE_PRICE").map(|m| m.column), Some(0));
        assert_eq!(ds.geo_levels, vec![GeoLevel::Region]);
        assert!(ds.has_geo_level(GeoLevel::Region));
        assert!(!ds.has_geo_level(GeoLevel::City));
        assert!(ds.metrics.get("MEDIAN_SALE_PRICE").is_some());
        assert_eq!(ds.dropped_rows, 2);
    }

    #[test]
    fn geographies_are_scoped_to_property_type() {
        let columns = vec![
            ColumnInfo::new(PERIOD_END, ColumnKind::Date),
            ColumnInfo::new(PROPERTY_TYPE, ColumnKind::Text),
            ColumnInfo::new(REGION, ColumnKind::Text),
            ColumnInfo::new("INVENTORY", ColumnKind::Numeric),
        ];
        let ds = Dataset::new(
            columns,
            vec![
                record(date(2024, 1, 31), "Condo", "Denver, CO", 1.0),
                record(date(2024, 2, 29), "Condo", "Austin, TX", 1.0),
                record(date(2024, 1, 31), "Townhouse", "Boise, ID", 1.0),
            ],
            0,
        );

        let geos: Vec<&str> = ds.geographies("Condo", GeoLevel::Region).into_iter().collect();
        assert_eq!(geos, vec!["Austin, TX", "Denver, CO"]);
        assert_eq!(ds.period_bounds(), Some((date(2024, 1, 31), date(2024, 2, 29))));
    }
}
