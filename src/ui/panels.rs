use std::collections::BTreeSet;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::export::EXPORT_FILE_NAME;
use crate::data::filter::{FilterSelection, MAX_SMOOTHING_WINDOW, MIN_SMOOTHING_WINDOW};
use crate::format::fmt_count;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let (Some(dataset), Some(current)) = (state.dataset.clone(), state.selection.clone()) else {
        ui.label("No dataset loaded.");
        return;
    };

    // Widgets edit a copy; the state recomputes only if something changed.
    let mut sel = current;
    let geo_options = state.geography_options();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Property type ----
            ui.strong("Property Type");
            egui::ComboBox::from_id_salt("property_type")
                .selected_text(sel.property_type.clone())
                .show_ui(ui, |ui: &mut Ui| {
                    for ptype in dataset.property_types() {
                        ui.selectable_value(&mut sel.property_type, ptype.to_string(), ptype);
                    }
                });

            // ---- Geography level ----
            ui.strong("Geography Level");
            egui::ComboBox::from_id_salt("geo_level")
                .selected_text(sel.geo_level.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for level in &dataset.geo_levels {
                        ui.selectable_value(&mut sel.geo_level, *level, level.label());
                    }
                });
            ui.separator();

            geography_picker(ui, &mut sel, &geo_options);
            ui.separator();

            // ---- Metric ----
            ui.strong("Metric");
            egui::ComboBox::from_id_salt("metric")
                .selected_text(sel.metric.clone())
                .show_ui(ui, |ui: &mut Ui| {
                    for metric in dataset.metrics.names() {
                        ui.selectable_value(&mut sel.metric, metric.to_string(), metric);
                    }
                });

            // ---- Period ----
            ui.strong("Period");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("From");
                ui.add(DatePickerButton::new(&mut sel.period.start).id_salt("period_start"));
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("To");
                ui.add(DatePickerButton::new(&mut sel.period.end).id_salt("period_end"));
            });
            if let Some((min, max)) = dataset.period_bounds() {
                ui.small(format!(
                    "Data available {} – {}",
                    min.format("%Y-%m"),
                    max.format("%Y-%m")
                ));
            }
            ui.separator();

            // ---- Smoothing ----
            ui.heading("Smoothing");
            ui.checkbox(&mut sel.smoothing, "Apply rolling average");
            if sel.smoothing {
                ui.add(
                    egui::Slider::new(&mut sel.window, MIN_SMOOTHING_WINDOW..=MAX_SMOOTHING_WINDOW)
                        .text("Rolling window (months)"),
                );
            }

            // ---- YoY overlay ----
            ui.checkbox(&mut sel.show_yoy, "Show YoY % change");
        });

    state.apply_selection(sel);
}

/// Collapsible checklist of geographies with All / None shortcuts.
fn geography_picker(ui: &mut Ui, sel: &mut FilterSelection, options: &BTreeSet<String>) {
    let column = sel.geo_level.column();
    let header_text = format!("Select {column}(s)  ({}/{})", sel.geographies.len(), options.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("geographies")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    sel.geographies = options.clone();
                }
                if ui.small_button("None").clicked() {
                    sel.geographies.clear();
                }
            });

            for geo in options {
                let mut checked = sel.geographies.contains(geo);
                if ui.checkbox(&mut checked, geo.as_str()).changed() {
                    if checked {
                        sel.geographies.insert(geo.clone());
                    } else {
                        sel.geographies.remove(geo);
                    }
                }
            }

            if sel.geographies.is_empty() {
                ui.small("No selection: all geographies are combined.");
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.trend_view().is_some_and(|v| !v.series.is_empty());
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let filtered = state.trend_view().map_or(0, |v| v.kpis.filtered_rows);
            ui.label(format!(
                "{} rows loaded, {} filtered",
                fmt_count(ds.len()),
                fmt_count(filtered)
            ));
        }

        if let Some(sel) = &state.selection {
            if sel.is_multi_geo() {
                ui.separator();
                ui.label(format!(
                    "Comparing {} {}",
                    sel.geographies.len(),
                    sel.geo_level.plural()
                ));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open metro market data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        match crate::data::loader::load_file(&path) {
            Ok(dataset) => state.set_dataset(Arc::new(dataset)),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download aggregated CSV")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_to(&path);
    }
}
