use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

/// Colour of single-series charts (scatter, line, histogram).
pub const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);

const DEFAULT_COLOR: RGBColor = RGBColor(128, 128, 128);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category label → RGBColor
// ---------------------------------------------------------------------------

/// Maps the categories of a bar chart to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, RGBColor>,
}

impl ColorMap {
    /// Build a colour map from category labels in display order.
    pub fn new(labels: &[String]) -> Self {
        let mapping = labels
            .iter()
            .cloned()
            .zip(generate_palette(labels.len()))
            .collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a given category.
    pub fn color_for(&self, label: &str) -> RGBColor {
        self.mapping.get(label).copied().unwrap_or(DEFAULT_COLOR)
    }
}
