use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Months, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const MONTHS: u32 = 36;

const PROPERTY_TYPES: [(i64, &str, f64); 3] = [
    (-1, "All Residential", 1.0),
    (3, "Condo/Co-op", 0.7),
    (6, "Single Family Residential", 1.15),
];

const METROS: [(&str, &str, f64, [&str; 2]); 4] = [
    ("Austin, TX", "TX", 440_000.0, ["Austin", "Round Rock"]),
    ("Denver, CO", "CO", 560_000.0, ["Denver", "Aurora"]),
    ("Phoenix, AZ", "AZ", 420_000.0, ["Phoenix", "Mesa"]),
    ("Raleigh, NC", "NC", 410_000.0, ["Raleigh", "Durham"]),
];

/// One output row; field names become the column headers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct MetroRow {
    period_end: String,
    table_id: i64,
    region_type_id: i64,
    property_type_id: i64,
    property_type: String,
    region: String,
    city: String,
    state_code: String,
    median_sale_price: Option<f64>,
    median_sale_price_mom: Option<f64>,
    median_sale_price_yoy: Option<f64>,
    median_list_price: Option<f64>,
    avg_sale_to_list: Option<f64>,
    median_dom: Option<f64>,
    homes_sold: Option<f64>,
    pending_sales: Option<f64>,
    new_listings: Option<f64>,
    inventory: Option<f64>,
    price_drops: Option<f64>,
}

/// Small deterministic noise source (splitmix64).
struct Noise(u64);

impl Noise {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[-amplitude, amplitude]`.
    fn jitter(&mut self, amplitude: f64) -> f64 {
        (self.next_unit() * 2.0 - 1.0) * amplitude
    }
}

fn month_end(first: NaiveDate, offset: u32) -> Result<NaiveDate> {
    let next = first + Months::new(offset + 1);
    next.pred_opt().context("month end out of range")
}

fn pct(current: f64, prior: f64) -> f64 {
    (current / prior - 1.0) * 100.0
}

fn generate(noise: &mut Noise) -> Result<Vec<MetroRow>> {
    let first = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;
    let mut rows = Vec::new();
    let mut table_id = 1;

    for (ptype_id, ptype, price_factor) in PROPERTY_TYPES {
        for (metro_idx, (region, state, base_price, cities)) in METROS.iter().enumerate() {
            for (city_idx, city) in cities.iter().enumerate() {
                let city_scale = 1.0 - 0.12 * city_idx as f64;
                let growth = 0.002 + 0.0015 * metro_idx as f64;
                let mut prices = Vec::with_capacity(MONTHS as usize);

                for m in 0..MONTHS {
                    let season = (m as f64 / 12.0 * std::f64::consts::TAU).sin();
                    let price = base_price * price_factor * city_scale
                        * (1.0 + growth).powi(m as i32)
                        * (1.0 + 0.02 * season + noise.jitter(0.01));
                    prices.push(price.round());

                    let sold = (180.0 * city_scale * (1.0 + 0.25 * season) + noise.jitter(15.0)).round();
                    let m_idx = m as usize;
                    let period_end = month_end(first, m)?;

                    rows.push(MetroRow {
                        period_end: period_end.format("%Y-%m-%d").to_string(),
                        table_id,
                        region_type_id: 6,
                        property_type_id: ptype_id,
                        property_type: ptype.to_string(),
                        region: region.to_string(),
                        city: city.to_string(),
                        state_code: state.to_string(),
                        median_sale_price: Some(prices[m_idx]),
                        median_sale_price_mom: (m_idx >= 1).then(|| pct(prices[m_idx], prices[m_idx - 1])),
                        median_sale_price_yoy: (m_idx >= 12).then(|| pct(prices[m_idx], prices[m_idx - 12])),
                        median_list_price: Some((prices[m_idx] * (1.02 + noise.jitter(0.01))).round()),
                        avg_sale_to_list: Some(0.985 + 0.01 * season + noise.jitter(0.004)),
                        median_dom: Some((35.0 - 10.0 * season + noise.jitter(4.0)).round()),
                        homes_sold: Some(sold),
                        pending_sales: Some((sold * (0.95 + noise.jitter(0.05))).round()),
                        new_listings: Some((sold * (1.1 + noise.jitter(0.1))).round()),
                        // Leave a few gaps so missing cells show up in the dashboard.
                        inventory: (m % 17 != 5).then(|| (sold * 2.4 + noise.jitter(20.0)).round()),
                        price_drops: Some((sold * (0.2 - 0.05 * season) + noise.jitter(5.0)).round().max(0.0)),
                    });
                }
                table_id += 1;
            }
        }
    }
    Ok(rows)
}

fn write_csv(rows: &[MetroRow], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("creating CSV")?;
    for row in rows {
        wtr.serialize(row).context("writing CSV row")?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_parquet(rows: &[MetroRow], path: &Path) -> Result<()> {
    let text = |f: fn(&MetroRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
    };
    let int = |f: fn(&MetroRow) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(rows.iter().map(f)))
    };
    let float = |f: fn(&MetroRow) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    };

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("PERIOD_END", text(|r| r.period_end.as_str())),
        ("TABLE_ID", int(|r| r.table_id)),
        ("REGION_TYPE_ID", int(|r| r.region_type_id)),
        ("PROPERTY_TYPE_ID", int(|r| r.property_type_id)),
        ("PROPERTY_TYPE", text(|r| r.property_type.as_str())),
        ("REGION", text(|r| r.region.as_str())),
        ("CITY", text(|r| r.city.as_str())),
        ("STATE_CODE", text(|r| r.state_code.as_str())),
        ("MEDIAN_SALE_PRICE", float(|r| r.median_sale_price)),
        ("MEDIAN_SALE_PRICE_MOM", float(|r| r.median_sale_price_mom)),
        ("MEDIAN_SALE_PRICE_YOY", float(|r| r.median_sale_price_yoy)),
        ("MEDIAN_LIST_PRICE", float(|r| r.median_list_price)),
        ("AVG_SALE_TO_LIST", float(|r| r.avg_sale_to_list)),
        ("MEDIAN_DOM", float(|r| r.median_dom)),
        ("HOMES_SOLD", float(|r| r.homes_sold)),
        ("PENDING_SALES", float(|r| r.pending_sales)),
        ("NEW_LISTINGS", float(|r| r.new_listings)),
        ("INVENTORY", float(|r| r.inventory)),
        ("PRICE_DROPS", float(|r| r.price_drops)),
    ];

    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), *array.data_type() == DataType::Float64))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let path = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "data/ALLMETRO_sample.csv".to_string()),
    );
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut noise = Noise(42);
    let rows = generate(&mut noise)?;

    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e, "parquet" | "pq"));
    if is_parquet {
        write_parquet(&rows, &path)?;
    } else {
        write_csv(&rows, &path)?;
    }

    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    println!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
