use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::PERIOD_END;
use super::trend::TrendSeries;

// Re-parsing is only used to check exports.
#[cfg(test)]
use super::{loader::parse_period, model::GeoLevel, trend::TrendRow};
#[cfg(test)]
use anyhow::bail;
#[cfg(test)]
use std::io::Read;

/// Suggested file name for the download.
pub const EXPORT_FILE_NAME: &str = "aggregated_trend.csv";

const VALUE: &str = "value";
const MOM: &str = "mom";
const YOY: &str = "yoy";

/// Write `PERIOD_END[,<geography>],value,mom,yoy`. Missing values are empty
/// cells.
pub fn write_trend<W: Write>(series: &TrendSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![PERIOD_END];
    if let Some(level) = series.geo_level {
        header.push(level.column());
    }
    header.extend([VALUE, MOM, YOY]);
    wtr.write_record(&header).context("writing CSV header")?;

    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for row in &series.rows {
        let mut record = vec![row.period_end.format("%Y-%m-%d").to_string()];
        if series.geo_level.is_some() {
            record.push(row.geography.clone().unwrap_or_default());
        }
        record.extend([cell(row.value), cell(row.mom), cell(row.yoy)]);
        wtr.write_record(&record).context("writing CSV row")?;
    }

    wtr.flush().context("flushing CSV")?;
    Ok(())
}

pub fn save_trend(series: &TrendSeries, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_trend(series, file)?;
    log::info!("Exported {} rows to {}", series.len(), path.display());
    Ok(())
}

/// Parse an export back into a series for `metric`.
#[cfg(test)]
pub fn read_trend<R: Read>(reader: R, metric: &str) -> Result<TrendSeries> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let geo_level = match headers.len() {
        4 => None,
        5 => {
            let level = GeoLevel::ALL.into_iter().find(|l| headers[1] == l.column());
            Some(level.with_context(|| format!("unknown geography column '{}'", headers[1]))?)
        }
        n => bail!("expected 4 or 5 columns, found {n}"),
    };
    let offset = usize::from(geo_level.is_some());

    let number = |s: &str, row: usize| -> Result<Option<f64>> {
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<f64>()
            .map(Some)
            .with_context(|| format!("row {row}: '{s}' is not a number"))
    };

    let mut rows = Vec::new();
    for (row_no, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |i: usize| record.get(i).unwrap_or("");
        let period_end = parse_period(field(0))
            .with_context(|| format!("row {row_no}: bad {PERIOD_END} '{}'", field(0)))?;
        rows.push(TrendRow {
            period_end,
            geography: geo_level.map(|_| field(1).to_string()),
            value: number(field(1 + offset), row_no)?,
            mom: number(field(2 + offset), row_no)?,
            yoy: number(field(3 + offset), row_no)?,
        });
    }

    Ok(TrendSeries {
        metric: metric.to_string(),
        geo_level,
        rows,
    })
}
