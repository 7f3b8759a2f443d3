use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::trend::TrendSeries;
use crate::format::{fmt_number, fmt_percent};

const ROW_HEIGHT: f32 = 18.0;

/// Scrollable preview of the aggregated rows, as they would be exported.
pub fn trend_table(ui: &mut Ui, series: &TrendSeries) {
    let mut headers = vec!["PERIOD_END".to_string()];
    if let Some(level) = series.geo_level {
        headers.push(level.column().to_string());
    }
    headers.extend(["value", "mom", "yoy"].map(String::from));

    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(300.0)
        .columns(Column::auto().at_least(90.0), headers.len())
        .header(ROW_HEIGHT + 2.0, |mut header| {
            for h in &headers {
                header.col(|ui| {
                    ui.strong(h.as_str());
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, series.len(), |mut row| {
                let r = &series.rows[row.index()];
                row.col(|ui| {
                    ui.label(r.period_end.format("%Y-%m-%d").to_string());
                });
                if series.is_multi_geo() {
                    row.col(|ui| {
                        ui.label(r.geography.as_deref().unwrap_or_default());
                    });
                }
                row.col(|ui| {
                    ui.label(fmt_number(r.value));
                });
                row.col(|ui| {
                    ui.label(fmt_percent(r.mom));
                });
                row.col(|ui| {
                    ui.label(fmt_percent(r.yoy));
                });
            });
        });
}
