use eframe::egui::{self, RichText, Ui};

use crate::data::kpi::KpiSummary;
use crate::format::{fmt_count, fmt_number, fmt_percent};

/// A labelled headline number.
fn card(ui: &mut Ui, label: &str, value: &str) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(label).small().weak());
        ui.label(RichText::new(value).heading().strong());
    });
}

/// Two rows of KPI cards for the latest period in range.
pub fn kpi_cards(ui: &mut Ui, kpis: &KpiSummary) {
    let first = [
        ("Latest Period", kpis.latest_period.format("%Y-%m").to_string()),
        ("Metric", kpis.metric.clone()),
        ("Latest Value", fmt_number(kpis.value)),
        ("Scope", kpis.scope.clone()),
    ];
    let second = [
        ("MoM %", fmt_percent(kpis.mom)),
        ("YoY %", fmt_percent(kpis.yoy)),
        ("Filtered Rows", fmt_count(kpis.filtered_rows)),
    ];

    ui.columns(first.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(&first) {
            card(col, label, value);
        }
    });
    ui.columns(second.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(&second) {
            card(col, label, value);
        }
    });
}
