use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, Ui};
use egui_plot::{GridMark, HLine, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints};

use crate::color::ColorMap;
use crate::data::trend::{TrendRow, TrendSeries};
use crate::format::{fmt_number, fmt_percent};

const TREND_HEIGHT_SINGLE: f32 = 420.0;
const TREND_HEIGHT_MULTI: f32 = 380.0;
const YOY_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Date axis helpers
// ---------------------------------------------------------------------------

fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn x_to_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

/// `YYYY-MM` of an x coordinate, empty when out of range.
fn period_label(x: f64) -> String {
    x_to_date(x)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn format_period_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    period_label(mark.value)
}

/// Points of one line, skipping rows where `pick` is missing.
fn line_points<'a>(
    rows: impl Iterator<Item = &'a TrendRow>,
    pick: impl Fn(&TrendRow) -> Option<f64>,
) -> Vec<[f64; 2]> {
    rows.filter_map(|r| pick(r).map(|y| [date_to_x(r.period_end), y]))
        .collect()
}

/// Geography lines to draw: one per geography, or the single collapsed one.
fn line_keys(series: &TrendSeries) -> Vec<Option<&str>> {
    if series.is_multi_geo() {
        series.geographies().into_iter().map(Some).collect()
    } else {
        vec![None]
    }
}

// ---------------------------------------------------------------------------
// Trend chart (central panel)
// ---------------------------------------------------------------------------

/// Render the metric value over time.
pub fn trend_plot(ui: &mut Ui, series: &TrendSeries, colors: &ColorMap) {
    let height = if series.is_multi_geo() {
        TREND_HEIGHT_MULTI
    } else {
        TREND_HEIGHT_SINGLE
    };
    let metric = series.metric.clone();

    Plot::new("trend_plot")
        .legend(Legend::default())
        .height(height)
        .x_axis_label("Period End")
        .y_axis_label(series.metric.clone())
        .x_axis_formatter(format_period_axis)
        .label_formatter(move |name, value: &PlotPoint| {
            let period = period_label(value.x);
            let prefix = if name.is_empty() {
                String::new()
            } else {
                format!("{name}\n")
            };
            format!("{prefix}{period}\n{metric}: {}", fmt_number(Some(value.y)))
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for geo in line_keys(series) {
                let points = line_points(series.line(geo), |r| r.value);
                let mut line = Line::new(PlotPoints::from(points))
                    .color(colors.color_for(geo))
                    .width(2.0);
                if let Some(name) = geo {
                    line = line.name(name);
                }
                plot_ui.line(line);
            }
        });
}

// ---------------------------------------------------------------------------
// YoY chart
// ---------------------------------------------------------------------------

/// Render year-over-year % change as a dashed line per geography.
pub fn yoy_plot(ui: &mut Ui, series: &TrendSeries, colors: &ColorMap) {
    Plot::new("yoy_plot")
        .legend(Legend::default())
        .height(YOY_HEIGHT)
        .x_axis_label("Period End")
        .y_axis_label("YoY %")
        .x_axis_formatter(format_period_axis)
        .label_formatter(|name, value: &PlotPoint| {
            let period = period_label(value.x);
            format!("{name}\n{period}\nYoY: {}", fmt_percent(Some(value.y)))
        })
        .show(ui, |plot_ui| {
            plot_ui.hline(HLine::new(0.0).color(Color32::DARK_GRAY));
            for geo in line_keys(series) {
                let points = line_points(series.line(geo), |r| r.yoy);
                let line = Line::new(PlotPoints::from(points))
                    .name(geo.unwrap_or("YoY %"))
                    .color(colors.color_for(geo))
                    .style(LineStyle::dashed_loose())
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}
