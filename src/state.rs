use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::color::ColorMap;
use crate::data::export::save_trend;
use crate::data::filter::FilterSelection;
use crate::data::model::Dataset;
use crate::data::{compute_view, TrendView};
use crate::error::TrendError;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset, shared read-only (None until a file is loaded).
    pub dataset: Option<Arc<Dataset>>,

    /// Current filter selection.
    pub selection: Option<FilterSelection>,

    /// Result of the last recomputation.
    pub view: Option<Result<TrendView, TrendError>>,

    /// Colours of the geographies in the current view.
    pub color_map: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let mut state = AppState::default();
        state.set_dataset(dataset);
        state
    }

    /// Ingest a newly loaded dataset and start from the default selection.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.selection = FilterSelection::default_for(&dataset);
        if self.selection.is_none() {
            log::warn!("Dataset has no selectable rows, metrics or geographies");
        }
        self.dataset = Some(dataset);
        self.status_message = None;
        self.recompute();
    }

    /// Replace the selection after a widget change and recompute.
    ///
    /// Switching property type or geography level invalidates the current
    /// geography picks, so they are reset to the new default.
    pub fn apply_selection(&mut self, mut selection: FilterSelection) {
        if self.selection.as_ref() == Some(&selection) {
            return;
        }
        if let (Some(prev), Some(ds)) = (&self.selection, &self.dataset) {
            if prev.property_type != selection.property_type || prev.geo_level != selection.geo_level {
                selection.reset_geographies(ds);
            }
        }
        self.selection = Some(selection);
        self.recompute();
    }

    /// Rebuild the trend for the current selection.
    pub fn recompute(&mut self) {
        let (Some(ds), Some(sel)) = (&self.dataset, &self.selection) else {
            self.view = None;
            return;
        };

        let result = compute_view(ds, sel);
        match &result {
            Ok(view) => self.color_map = ColorMap::new(view.series.geographies()),
            Err(e) if e.is_empty_result() => log::warn!("{e}"),
            Err(e) => log::error!("{e}"),
        }
        self.view = Some(result);
    }

    /// The successful view, if any.
    pub fn trend_view(&self) -> Option<&TrendView> {
        self.view.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// Geographies selectable for the current property type and level.
    pub fn geography_options(&self) -> BTreeSet<String> {
        match (&self.dataset, &self.selection) {
            (Some(ds), Some(sel)) => ds
                .geographies(&sel.property_type, sel.geo_level)
                .into_iter()
                .map(str::to_string)
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Write the current trend to `path`, reporting the outcome in the
    /// status line.
    pub fn export_to(&mut self, path: &Path) {
        let Some(view) = self.trend_view() else {
            self.status_message = Some("Nothing to export".to_string());
            return;
        };
        self.status_message = match save_trend(&view.series, path) {
            Ok(()) => Some(format!("Exported {}", path.display())),
            Err(e) => {
                log::error!("Failed to export: {e:#}");
                Some(format!("Error: {e:#}"))
            }
        };
    }
}
