use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Geography → Color32
// ---------------------------------------------------------------------------

/// Colour used for the collapsed single-geography line.
pub const SINGLE_SERIES_COLOR: Color32 = Color32::LIGHT_BLUE;

/// Maps the geographies of a multi-geography trend to distinct colours, so a
/// geography keeps its colour across the value and YoY charts.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    pub fn new<'a>(geographies: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<&str> = geographies.into_iter().collect();
        let mapping = names
            .iter()
            .zip(generate_palette(names.len()))
            .map(|(name, c)| (name.to_string(), c))
            .collect();
        ColorMap { mapping }
    }

    /// Colour for a line; `None` is the single collapsed series.
    pub fn color_for(&self, geography: Option<&str>) -> Color32 {
        geography
            .and_then(|g| self.mapping.get(g).copied())
            .unwrap_or(SINGLE_SERIES_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(4);
        assert_eq!(palette.len(), 4);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_or_single_series_falls_back() {
        let map = ColorMap::new(["Austin, TX", "Denver, CO"]);
        assert_ne!(map.color_for(Some("Austin, TX")), map.color_for(Some("Denver, CO")));
        assert_eq!(map.color_for(None), SINGLE_SERIES_COLOR);
        assert_eq!(map.color_for(Some("Boise, ID")), SINGLE_SERIES_COLOR);
    }
}
