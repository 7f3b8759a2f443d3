use std::collections::BTreeSet;

use chrono::{Months, NaiveDate};

use super::model::{Dataset, GeoLevel, Record};
use crate::error::{Result, TrendError};

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

pub const MIN_SMOOTHING_WINDOW: usize = 2;
pub const MAX_SMOOTHING_WINDOW: usize = 6;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Months before the latest period covered by the default range.
const DEFAULT_RANGE_MONTHS: u32 = 11;

/// Inclusive `PERIOD_END` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = PeriodRange { start, end };
        range.validate()?;
        Ok(range)
    }

    /// The twelve months ending at `end`, never earlier than `floor`.
    pub fn trailing_year(end: NaiveDate, floor: NaiveDate) -> Self {
        let start = end
            .checked_sub_months(Months::new(DEFAULT_RANGE_MONTHS))
            .map_or(floor, |s| s.max(floor));
        PeriodRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(TrendError::InvalidPeriod {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Everything the user picked for one recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelection {
    pub property_type: String,
    pub geo_level: GeoLevel,
    /// Selected geographies. Empty means no geography restriction.
    pub geographies: BTreeSet<String>,
    pub metric: String,
    pub period: PeriodRange,
    pub smoothing: bool,
    pub window: usize,
    pub show_yoy: bool,
}

impl FilterSelection {
    /// Initial selection for a freshly loaded dataset, or `None` when the
    /// dataset has no rows, no metrics or no geography column.
    pub fn default_for(dataset: &Dataset) -> Option<Self> {
        let property_type = dataset.property_types().into_iter().next()?.to_string();
        let geo_level = dataset.geo_levels.first().copied()?;
        let metric = dataset.metrics.default_metric()?.to_string();
        let (min, max) = dataset.period_bounds()?;

        let mut selection = FilterSelection {
            property_type,
            geo_level,
            geographies: BTreeSet::new(),
            metric,
            period: PeriodRange::trailing_year(max, min),
            smoothing: false,
            window: DEFAULT_SMOOTHING_WINDOW,
            show_yoy: true,
        };
        selection.reset_geographies(dataset);
        Some(selection)
    }

    /// Select only the first geography available for the current property
    /// type and level.
    pub fn reset_geographies(&mut self, dataset: &Dataset) {
        self.geographies = dataset
            .geographies(&self.property_type, self.geo_level)
            .into_iter()
            .next()
            .map(|g| BTreeSet::from([g.to_string()]))
            .unwrap_or_default();
    }

    /// More than one geography selected: results are kept per geography.
    pub fn is_multi_geo(&self) -> bool {
        self.geographies.len() > 1
    }

    /// The smoothing window to apply, validated, or `None` when smoothing
    /// is off.
    pub fn smoothing_window(&self) -> Result<Option<usize>> {
        if !self.smoothing {
            return Ok(None);
        }
        if !(MIN_SMOOTHING_WINDOW..=MAX_SMOOTHING_WINDOW).contains(&self.window) {
            return Err(TrendError::InvalidSmoothingWindow(self.window));
        }
        Ok(Some(self.window))
    }
}

// ---------------------------------------------------------------------------
// Filter & slice
// ---------------------------------------------------------------------------

/// Records matching the property type, the inclusive period range, and (if
/// any are selected) the chosen geographies.
///
/// An empty match is reported as [`TrendError::NoMatchingRows`]; callers
/// must stop there rather than aggregate nothing.
pub fn filter_records<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
) -> Result<Vec<&'a Record>> {
    selection.period.validate()?;

    let matched: Vec<&Record> = dataset
        .records
        .iter()
        .filter(|r| r.property_type == selection.property_type)
        .filter(|r| selection.period.contains(r.period_end))
        .filter(|r| {
            if selection.geographies.is_empty() {
                return true;
            }
            r.geography(selection.geo_level)
                .is_some_and(|g| selection.geographies.contains(g))
        })
        .collect();

    if matched.is_empty() {
        return Err(TrendError::NoMatchingRows);
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnInfo, ColumnKind, CITY, PERIOD_END, PROPERTY_TYPE, REGION};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Dataset {
        let columns = vec![
            ColumnInfo::new(PERIOD_END, ColumnKind::Date),
            ColumnInfo::new(PROPERTY_TYPE, ColumnKind::Text),
            ColumnInfo::new(REGION, ColumnKind::Text),
            ColumnInfo::new(CITY, ColumnKind::Text),
            ColumnInfo::new("HOMES_SOLD", ColumnKind::Numeric),
        ];
        let mut records = Vec::new();
        for (m, day) in [(1, 31), (2, 29), (3, 31)] {
            for (region, city) in [("Austin, TX", "Austin"), ("Denver, CO", "Denver")] {
                for ptype in ["Condo", "Townhouse"] {
                    records.push(Record {
                        period_end: date(2024, m, day),
                        property_type: ptype.to_string(),
                        region: Some(region.to_string()),
                        city: Some(city.to_string()),
                        values: vec![Some(m as f64)],
                    });
                }
            }
        }
        Dataset::new(columns, records, 0)
    }

    #[test]
    fn default_selection_uses_first_options_and_trailing_year() {
        let ds = dataset();
        let sel = FilterSelection::default_for(&ds).unwrap();
        assert_eq!(sel.property_type, "Condo");
        assert_eq!(sel.geo_level, GeoLevel::Region);
        assert_eq!(sel.geographies, BTreeSet::from(["Austin, TX".to_string()]));
        assert_eq!(sel.metric, "HOMES_SOLD");
        // Only three months of data: the range is clamped to the minimum.
        assert_eq!(sel.period, PeriodRange { start: date(2024, 1, 31), end: date(2024, 3, 31) });
        assert!(!sel.smoothing);
        assert!(sel.show_yoy);
    }

    #[test]
    fn trailing_year_spans_twelve_period_ends() {
        let range = PeriodRange::trailing_year(date(2025, 12, 31), date(2020, 1, 31));
        assert_eq!(range.start, date(2025, 1, 31));
    }

    #[test]
    fn empty_geography_set_applies_no_geography_filter() {
        let ds = dataset();
        let mut sel = FilterSelection::default_for(&ds).unwrap();
        sel.geographies.clear();

        let rows = filter_records(&ds, &sel).unwrap();
        let expected: Vec<&Record> = ds
            .records
            .iter()
            .filter(|r| r.property_type == "Condo" && sel.period.contains(r.period_end))
            .collect();
        assert_eq!(rows, expected);
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let ds = dataset();
        let mut sel = FilterSelection::default_for(&ds).unwrap();
        sel.period = PeriodRange::new(date(2024, 2, 29), date(2024, 3, 31)).unwrap();

        let rows = filter_records(&ds, &sel).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.region.as_deref() == Some("Austin, TX")));
    }

    #[test]
    fn geography_membership_uses_selected_level() {
        let ds = dataset();
        let mut sel = FilterSelection::default_for(&ds).unwrap();
        sel.geo_level = GeoLevel::City;
        sel.geographies = BTreeSet::from(["Denver".to_string()]);

        let rows = filter_records(&ds, &sel).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.city.as_deref() == Some("Denver")));
    }

    #[test]
    fn no_match_is_reported_as_empty_result() {
        let ds = dataset();
        let mut sel = FilterSelection::default_for(&ds).unwrap();
        sel.period = PeriodRange::new(date(2023, 1, 31), date(2023, 12, 31)).unwrap();

        let err = filter_records(&ds, &sel).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn smoothing_window_is_validated_only_when_enabled() {
        let ds = dataset();
        let mut sel = FilterSelection::default_for(&ds).unwrap();
        sel.window = 9;
        assert_eq!(sel.smoothing_window(), Ok(None));

        sel.smoothing = true;
        assert_eq!(sel.smoothing_window(), Err(TrendError::InvalidSmoothingWindow(9)));

        sel.window = 4;
        assert_eq!(sel.smoothing_window(), Ok(Some(4)));
    }

    #[test]
    fn inverted_period_is_rejected() {
        let err = PeriodRange::new(date(2024, 3, 31), date(2024, 1, 31)).unwrap_err();
        assert!(matches!(err, TrendError::InvalidPeriod { .. }));
    }
}
