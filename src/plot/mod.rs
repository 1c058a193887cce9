//! Chart rendering: a [`ChartSpec`] and a dataset in, one raster image out.

use std::fmt;
use std::str::FromStr;

use crate::artifact::ImageFormat;
use crate::error::PlotError;

pub mod options;
pub mod render;

pub use render::render;

// ---------------------------------------------------------------------------
// PlotKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// Raw x,y as a point cloud.
    Scatter,
    /// Raw x,y connected in row order.
    Line,
    /// Distribution of x; y is ignored.
    Hist,
    /// Sum of y per distinct x, largest first.
    BarSum,
    /// Count of y per distinct x, largest first.
    BarCount,
}

impl PlotKind {
    /// In the order the plot form lists them.
    pub const ALL: [PlotKind; 5] = [
        PlotKind::Line,
        PlotKind::Scatter,
        PlotKind::Hist,
        PlotKind::BarSum,
        PlotKind::BarCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlotKind::Scatter => "scatter",
            PlotKind::Line => "line",
            PlotKind::Hist => "hist",
            PlotKind::BarSum => "bar-sum",
            PlotKind::BarCount => "bar-count",
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotKind {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| PlotError::UnsupportedKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ChartSpec
// ---------------------------------------------------------------------------

/// Cosmetic options. Each is applied best-effort; see [`options`].
#[derive(Debug, Clone, Default)]
pub struct ChartOptions {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Legend entry for the plotted series.
    pub legend: Option<String>,
}

/// What to draw. Built per request and dropped after rendering.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: PlotKind,
    pub x_column: String,
    pub y_column: String,
    pub options: ChartOptions,
}

/// How to rasterize.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub hist_bins: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: ImageFormat::Jpeg,
            hist_bins: 10,
        }
    }
}
