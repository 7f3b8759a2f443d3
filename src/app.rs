use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::Dataset;
use crate::error::TrendError;
use crate::state::AppState;
use crate::ui::{kpi, panels, plot, table};

pub const APP_TITLE: &str = "Metro Market Dashboard";

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MetroTrendApp {
    pub state: AppState,
}

impl MetroTrendApp {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            state: AppState::new(dataset),
        }
    }
}

impl eframe::App for MetroTrendApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, charts, data ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| dashboard(ui, &self.state));
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    ui.heading(APP_TITLE);
    ui.label(
        RichText::new("Property Type • Geography • Period • Metric • KPI cards • YoY overlay • Smoothing")
            .weak(),
    );
    ui.add_space(6.0);

    let view = match &state.view {
        Some(Ok(view)) => view,
        Some(Err(TrendError::NoMatchingRows)) => {
            ui.label(RichText::new(TrendError::NoMatchingRows.to_string()).color(Color32::YELLOW));
            return;
        }
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
            return;
        }
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a file to view market trends  (File → Open…)");
            });
            return;
        }
    };

    kpi::kpi_cards(ui, &view.kpis);
    ui.separator();

    ui.strong("Trend Chart");
    plot::trend_plot(ui, &view.series, &state.color_map);

    let show_yoy = state.selection.as_ref().is_some_and(|s| s.show_yoy);
    if show_yoy {
        if view.series.is_multi_geo() {
            ui.small("YoY is shown as a separate chart when comparing multiple geographies.");
        }
        plot::yoy_plot(ui, &view.series, &state.color_map);
    }

    ui.separator();
    egui::CollapsingHeader::new("Show aggregated chart data")
        .default_open(false)
        .show(ui, |ui: &mut Ui| table::trend_table(ui, &view.series));
}
