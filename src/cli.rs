use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::compute_view;
use crate::data::export::{save_trend, EXPORT_FILE_NAME};
use crate::data::filter::{FilterSelection, PeriodRange};
use crate::data::kpi::KpiSummary;
use crate::data::model::{Dataset, GeoLevel};
use crate::format::{fmt_count, fmt_number, fmt_percent};

pub const DEFAULT_DATA_PATH: &str = "data/ALLMETRO_jan2026.csv";

#[derive(Parser, Debug)]
#[command(name = "metro-trend")]
#[command(about = "Filter, aggregate and chart monthly metro market metrics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Input table (.csv, .json or .parquet)
    #[arg(long, env = "METRO_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Without a subcommand the dashboard window opens
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate one selection without the GUI and write the CSV export
    Export(ExportArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GeoLevelArg {
    Region,
    City,
}

impl From<GeoLevelArg> for GeoLevel {
    fn from(arg: GeoLevelArg) -> Self {
        match arg {
            GeoLevelArg::Region => GeoLevel::Region,
            GeoLevelArg::City => GeoLevel::City,
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long)]
    pub property_type: Option<String>,

    #[arg(long, value_enum)]
    pub geo_level: Option<GeoLevelArg>,

    /// Geography to include; repeat to compare several
    #[arg(long = "geo")]
    pub geographies: Vec<String>,

    /// Combine every geography instead of the default first one
    #[arg(long, conflicts_with = "geographies")]
    pub all_geos: bool,

    #[arg(long)]
    pub metric: Option<String>,

    /// First period end, YYYY-MM-DD (default: 11 months before the latest)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last period end, YYYY-MM-DD (default: latest in the data)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Rolling-average window in periods (2-6)
    #[arg(long)]
    pub smoothing: Option<usize>,

    #[arg(long, default_value = EXPORT_FILE_NAME)]
    pub out: PathBuf,

    /// Print the KPI summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl ExportArgs {
    /// Start from the dashboard defaults and apply the given overrides.
    pub fn selection(&self, dataset: &Dataset) -> Result<FilterSelection> {
        let mut sel = FilterSelection::default_for(dataset)
            .context("dataset has no property types, metrics or geographies to select")?;

        if let Some(ptype) = &self.property_type {
            sel.property_type = ptype.clone();
        }
        if let Some(level) = self.geo_level.map(GeoLevel::from) {
            if !dataset.has_geo_level(level) {
                bail!("dataset has no {} column", level.column());
            }
            sel.geo_level = level;
        }
        sel.reset_geographies(dataset);

        if self.all_geos {
            sel.geographies.clear();
        } else if !self.geographies.is_empty() {
            sel.geographies = self.geographies.iter().cloned().collect::<BTreeSet<_>>();
        }
        if let Some(metric) = &self.metric {
            sel.metric = metric.clone();
        }
        if self.start.is_some() || self.end.is_some() {
            sel.period = PeriodRange::new(
                self.start.unwrap_or(sel.period.start),
                self.end.unwrap_or(sel.period.end),
            )?;
        }
        if let Some(window) = self.smoothing {
            sel.smoothing = true;
            sel.window = window;
        }
        Ok(sel)
    }
}

/// Headless export: compute, write the CSV and print the KPIs.
pub fn run_export(dataset: &Dataset, args: &ExportArgs) -> Result<()> {
    let sel = args.selection(dataset)?;
    let view = compute_view(dataset, &sel)?;
    save_trend(&view.series, &args.out)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.kpis)?);
    } else {
        print!("{}", kpi_report(&view.kpis));
    }
    Ok(())
}

fn kpi_report(kpis: &KpiSummary) -> String {
    format!(
        "Latest Period  {}\nMetric         {}\nLatest Value   {}\nScope          {}\nMoM %          {}\nYoY %          {}\nFiltered Rows  {}\n",
        kpis.latest_period.format("%Y-%m"),
        kpis.metric,
        fmt_number(kpis.value),
        kpis.scope,
        fmt_percent(kpis.mom),
        fmt_percent(kpis.yoy),
        fmt_count(kpis.filtered_rows),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export::read_trend;
    use crate::data::loader::load_csv;

    const CSV: &str = "\
PERIOD_END,PROPERTY_TYPE,REGION,CITY,HOMES_SOLD,MEDIAN_SALE_PRICE
2024-01-31,Condo,\"Austin, TX\",Austin,10,300000
2024-02-29,Condo,\"Austin, TX\",Austin,12,310000
2024-01-31,Condo,\"Denver, CO\",Denver,20,400000
2024-02-29,Condo,\"Denver, CO\",Denver,22,420000
";

    fn export_args(extra: &[&str]) -> ExportArgs {
        let mut argv = vec!["metro-trend", "--data", "x.csv", "export"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Export(args)) => args,
            None => panic!("expected export subcommand"),
        }
    }

    #[test]
    fn no_subcommand_means_gui() {
        let cli = Cli::try_parse_from(["metro-trend", "--data", "metro.csv"]).unwrap();
        assert_eq!(cli.data, PathBuf::from("metro.csv"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let ds = load_csv(CSV.as_bytes()).unwrap();
        let args = export_args(&[
            "--geo-level", "city", "--geo", "Austin", "--geo", "Denver",
            "--metric", "HOMES_SOLD", "--start", "2024-02-01", "--smoothing", "2",
        ]);

        let sel = args.selection(&ds).unwrap();
        assert_eq!(sel.geo_level, GeoLevel::City);
        assert!(sel.is_multi_geo());
        assert_eq!(sel.metric, "HOMES_SOLD");
        assert_eq!(sel.period.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(sel.smoothing_window(), Ok(Some(2)));
    }

    #[test]
    fn geo_level_without_its_column_is_rejected() {
        let ds = load_csv("PERIOD_END,PROPERTY_TYPE,REGION,HOMES_SOLD\n2024-01-31,Condo,X,1\n".as_bytes()).unwrap();
        let err = export_args(&["--geo-level", "city"]).selection(&ds).unwrap_err();
        assert!(err.to_string().contains("CITY"));
        assert!(export_args(&["--geo-level", "region"]).selection(&ds).is_ok());
    }

    #[test]
    fn all_geos_conflicts_with_explicit_geos() {
        let argv = ["metro-trend", "export", "--all-geos", "--geo", "Austin"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn export_writes_the_aggregated_csv() {
        let ds = load_csv(CSV.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("trend.csv");
        let out_arg = out.to_str().unwrap();
        let args = export_args(&["--all-geos", "--metric", "HOMES_SOLD", "--out", out_arg]);

        run_export(&ds, &args).unwrap();

        let series = read_trend(std::fs::File::open(&out).unwrap(), "HOMES_SOLD").unwrap();
        let values: Vec<_> = series.rows.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(30.0), Some(34.0)]);
        assert!((series.rows[1].mom.unwrap() - (34.0 / 30.0 - 1.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn report_uses_placeholders_for_missing_changes() {
        let kpis = KpiSummary {
            latest_period: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            metric: "MEDIAN_SALE_PRICE".to_string(),
            value: Some(415_000.0),
            mom: None,
            yoy: None,
            scope: "Austin, TX".to_string(),
            filtered_rows: 1_200,
        };
        let report = kpi_report(&kpis);
        assert!(report.contains("Latest Period  2024-02"));
        assert!(report.contains("Latest Value   415,000"));
        assert!(report.contains("MoM %          —"));
        assert!(report.contains("Filtered Rows  1,200"));
    }
}
