mod app;
mod cli;
mod color;
mod data;
mod error;
mod format;
mod state;
mod ui;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use app::{MetroTrendApp, APP_TITLE};
use clap::Parser;
use cli::{Cli, Commands};
use data::model::Dataset;
use eframe::egui;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // The dataset is loaded once, before any interaction is possible.
    let dataset = data::loader::load_file(&cli.data)
        .with_context(|| format!("loading {}", cli.data.display()))?;
    let dataset = Arc::new(dataset);

    match cli.command {
        Some(Commands::Export(args)) => cli::run_export(&dataset, &args),
        None => launch_gui(dataset),
    }
}

fn launch_gui(dataset: Arc<Dataset>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(MetroTrendApp::new(dataset)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
