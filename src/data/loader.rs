use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::util::display::array_value_to_string;
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    ColumnInfo, ColumnKind, Dataset, Record, CITY, KEY_COLUMNS, PERIOD_END, PROPERTY_TYPE, REGION,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a metro dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line (recommended)
/// * `.json`    – `[{ "PERIOD_END": "...", "REGION": "...", ... }, ...]`
/// * `.parquet` – flat columns, as written by `df.to_parquet()`
pub fn load_file(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        bail!("Data file not found at: {}", path.display());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            load_csv(file)?
        }
        "json" => read_json(path)?.into_dataset()?,
        "parquet" | "pq" => read_parquet(path)?.into_dataset()?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    if dataset.is_empty() {
        log::warn!("{} has no rows with a parseable {PERIOD_END}", path.display());
    }
    if dataset.metrics.is_empty() {
        log::warn!("{} has no numeric metric columns", path.display());
    }
    log::info!(
        "Loaded {} rows from {} ({} dropped, {} metrics)",
        dataset.len(),
        path.display(),
        dataset.dropped_rows,
        dataset.metrics.len()
    );
    Ok(dataset)
}

/// Parse CSV text from any reader.
pub fn load_csv<R: Read>(reader: R) -> Result<Dataset> {
    read_csv(reader)?.into_dataset()
}

// ---------------------------------------------------------------------------
// Raw table – format-independent intermediate form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows[row].get(col).unwrap_or(&Cell::Empty)
    }

    /// Type the columns, parse dates and build the dataset.
    fn into_dataset(self) -> Result<Dataset> {
        let position = |name: &str| self.headers.iter().position(|h| h == name);

        let period_idx = position(PERIOD_END).context("missing 'PERIOD_END' column")?;
        let ptype_idx = position(PROPERTY_TYPE).context("missing 'PROPERTY_TYPE' column")?;
        let region_idx = position(REGION);
        let city_idx = position(CITY);
        if region_idx.is_none() && city_idx.is_none() {
            bail!("missing geography column: need 'REGION' or 'CITY'");
        }

        // A non-key column is numeric when no cell holds text.
        let mut columns = Vec::with_capacity(self.headers.len());
        let mut numeric_idx = Vec::new();
        for (col, name) in self.headers.iter().enumerate() {
            let kind = if name == PERIOD_END {
                ColumnKind::Date
            } else if KEY_COLUMNS.contains(&name.as_str()) {
                ColumnKind::Text
            } else if (0..self.rows.len()).all(|r| !matches!(self.cell(r, col), Cell::Text(_))) {
                numeric_idx.push(col);
                ColumnKind::Numeric
            } else {
                ColumnKind::Text
            };
            columns.push(ColumnInfo::new(name.clone(), kind));
        }

        let mut records = Vec::with_capacity(self.rows.len());
        let mut dropped_rows = 0;
        for r in 0..self.rows.len() {
            let Some(period_end) = self.cell(r, period_idx).as_text().and_then(|s| parse_period(&s))
            else {
                dropped_rows += 1;
                continue;
            };

            let text_at = |idx: Option<usize>| idx.and_then(|c| self.cell(r, c).as_text());
            let values = numeric_idx
                .iter()
                .map(|&c| match self.cell(r, c) {
                    Cell::Number(v) => Some(*v),
                    _ => None,
                })
                .collect();

            records.push(Record {
                period_end,
                property_type: text_at(Some(ptype_idx)).unwrap_or_default(),
                region: text_at(region_idx),
                city: text_at(city_idx),
                values,
            });
        }

        if dropped_rows > 0 {
            log::warn!("Dropped {dropped_rows} rows with unparseable {PERIOD_END}");
        }

        Ok(Dataset::new(columns, records, dropped_rows))
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a period-end date in any of the common layouts.
pub fn parse_period(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

/// Tokens read as a missing cell in any column, as `pandas.read_csv` does by
/// default.
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn guess_cell(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        return Cell::Empty;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Number(v),
        // NaN / inf read as missing numbers.
        Ok(_) => Cell::Empty,
        Err(_) => Cell::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell).collect());
    }

    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are the
/// union of keys in first-seen order.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(Cell::Empty, json_to_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::Null => Cell::Empty,
        JsonValue::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
        JsonValue::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Flat Parquet table. Every numeric column (any int width, floats, decimals)
/// is cast to `f64`; everything else (strings, dates, timestamps) is rendered
/// as text.
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch
            .columns()
            .iter()
            .map(as_f64_column)
            .collect::<Result<Vec<_>>>()?;
        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Numeric columns become `Float64`; others pass through unchanged.
fn as_f64_column(col: &ArrayRef) -> Result<ArrayRef> {
    if !col.data_type().is_numeric() || *col.data_type() == DataType::Float64 {
        return Ok(col.clone());
    }
    cast(col.as_ref(), &DataType::Float64)
        .with_context(|| format!("casting {} column to Float64", col.data_type()))
}

fn arrow_cell(col: &ArrayRef, row: usize) -> Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Empty);
    }
    if *col.data_type() != DataType::Float64 {
        return Ok(Cell::Text(array_value_to_string(col, row)?));
    }
    let number = col.as_primitive::<Float64Type>().value(row);
    Ok(if number.is_finite() {
        Cell::Number(number)
    } else {
        Cell::Empty
    })
}
