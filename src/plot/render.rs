use std::collections::HashMap;
use std::ops::Range;

use plotters::chart::SeriesAnno;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::options::{apply_best_effort, validate_label, OptionStep};
use super::{ChartSpec, PlotKind, RenderSettings};
use crate::artifact::{encode_rgb, RenderedArtifact};
use crate::color::{ColorMap, SERIES_COLOR};
use crate::data::aggregate::{group_by, Aggregation};
use crate::data::model::{Column, Dataset};
use crate::error::{OptionError, PlotError};
use crate::fonts::FONT_FAMILY;

/// Strip above the plotting area reserved for the title.
const TITLE_HEIGHT: u32 = 40;

type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

// ---------------------------------------------------------------------------
// Series preparation (no drawing)
// ---------------------------------------------------------------------------

/// One histogram bin, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Series {
    Points(Vec<(f64, f64)>),
    /// Line segments; a row with a missing coordinate breaks the line.
    Path(Vec<Vec<(f64, f64)>>),
    Bins(Vec<Bin>),
    /// Histogram of a categorical column: one count per category.
    Counts(Vec<(String, usize)>),
    Bars(Vec<(String, f64)>),
}

/// Everything the drawing step needs, computed up front.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChart {
    pub series: Series,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    /// Tick labels for a categorical x axis (integer positions).
    pub x_categories: Option<Vec<String>>,
    pub y_categories: Option<Vec<String>>,
}

/// Column values placed on an axis. Categorical columns are placed at
/// integer positions in order of first appearance.
struct AxisValues {
    values: Vec<Option<f64>>,
    categories: Option<Vec<String>>,
}

impl AxisValues {
    fn from_column(column: &Column) -> Self {
        if let Some(values) = column.numeric_values() {
            return AxisValues {
                values,
                categories: None,
            };
        }
        let categories = column.categories();
        let index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let values = column
            .cells()
            .iter()
            .map(|cell| {
                if cell.is_null() {
                    return None;
                }
                index.get(cell.to_string().as_str()).map(|&i| i as f64)
            })
            .collect();
        AxisValues {
            values,
            categories: Some(categories),
        }
    }
}

fn lookup<'d>(dataset: &'d Dataset, name: &str) -> Result<&'d Column, PlotError> {
    dataset
        .column(name)
        .ok_or_else(|| PlotError::ColumnNotFound(name.to_string()))
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Data range with a 5% margin on both sides.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    match min_max(values) {
        None => 0.0..1.0,
        Some((lo, hi)) if lo == hi => (lo - 0.5)..(hi + 0.5),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            (lo - pad)..(hi + pad)
        }
    }
}

/// Range for bars: always includes the zero baseline, margin away from it.
fn baseline_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = min_max(values.chain([0.0])).unwrap_or((0.0, 0.0));
    if lo == hi {
        return lo..(lo + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    let lo = if lo < 0.0 { lo - pad } else { lo };
    let hi = if hi > 0.0 { hi + pad } else { hi };
    lo..hi
}

/// Equal-width bins over `[min, max]`; a constant sample gets a unit-wide range.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let bins = bins.max(1);
    let (lo, hi) = match min_max(values.iter().copied()) {
        Some((lo, hi)) if lo < hi => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: lo + i as f64 * width,
            end: lo + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Split rows into runs of complete points.
fn segments(rows: impl Iterator<Item = Option<(f64, f64)>>) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for row in rows {
        match row {
            Some(point) => current.push(point),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Occurrences of each category, in order of first appearance.
fn category_histogram(column: &Column) -> PreparedChart {
    let axis = AxisValues::from_column(column);
    let categories = axis.categories.unwrap_or_default();
    let mut counts = vec![0usize; categories.len()];
    for position in axis.values.into_iter().flatten() {
        counts[position as usize] += 1;
    }
    let y_range = baseline_range(counts.iter().map(|&c| c as f64));
    let x_range = -0.5..(categories.len().max(1) as f64 - 0.5);
    PreparedChart {
        series: Series::Counts(categories.iter().cloned().zip(counts).collect()),
        x_range,
        y_range,
        x_categories: Some(categories),
        y_categories: None,
    }
}

/// Apply the kind-specific transform and compute axis ranges.
pub(crate) fn prepare(dataset: &Dataset, spec: &ChartSpec, hist_bins: usize) -> Result<PreparedChart, PlotError> {
    let x = lookup(dataset, &spec.x_column)?;

    match spec.kind {
        PlotKind::Scatter | PlotKind::Line => {
            let y = lookup(dataset, &spec.y_column)?;
            let xs = AxisValues::from_column(x);
            let ys = AxisValues::from_column(y);
            let rows = xs.values.iter().zip(&ys.values).map(|(x, y)| Some(((*x)?, (*y)?)));
            let points: Vec<(f64, f64)> = rows.clone().flatten().collect();
            let x_range = padded_range(points.iter().map(|p| p.0));
            let y_range = padded_range(points.iter().map(|p| p.1));
            let series = if spec.kind == PlotKind::Scatter {
                Series::Points(points)
            } else {
                Series::Path(segments(rows))
            };
            Ok(PreparedChart {
                series,
                x_range,
                y_range,
                x_categories: xs.categories,
                y_categories: ys.categories,
            })
        }
        PlotKind::Hist => {
            let Some(values) = x.numeric_values() else {
                return Ok(category_histogram(x));
            };
            let values: Vec<f64> = values.into_iter().flatten().collect();
            let bins = histogram(&values, hist_bins);
            let x_range = match (bins.first(), bins.last()) {
                (Some(first), Some(last)) => padded_range([first.start, last.end].into_iter()),
                _ => 0.0..1.0,
            };
            let y_range = baseline_range(bins.iter().map(|b| b.count as f64));
            Ok(PreparedChart {
                series: Series::Bins(bins),
                x_range,
                y_range,
                x_categories: None,
                y_categories: None,
            })
        }
        PlotKind::BarSum | PlotKind::BarCount => {
            let y = lookup(dataset, &spec.y_column)?;
            let aggregation = if spec.kind == PlotKind::BarSum {
                Aggregation::Sum
            } else {
                Aggregation::Count
            };
            let bars: Vec<(String, f64)> = group_by(x, y, aggregation)?
                .into_iter()
                .map(|g| (g.key.to_string(), g.value))
                .collect();
            let labels = bars.iter().map(|(label, _)| label.clone()).collect();
            let x_range = -0.5..(bars.len().max(1) as f64 - 0.5);
            let y_range = baseline_range(bars.iter().map(|(_, v)| *v));
            Ok(PreparedChart {
                series: Series::Bars(bars),
                x_range,
                y_range,
                x_categories: Some(labels),
                y_categories: None,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render one chart into a fresh in-memory bitmap and encode it.
///
/// Nothing is shared between calls: the bitmap, drawing area and chart
/// context are created here and dropped before encoding.
pub fn render(dataset: &Dataset, spec: &ChartSpec, settings: &RenderSettings) -> Result<RenderedArtifact, PlotError> {
    let prepared = prepare(dataset, spec, settings.hist_bins)?;
    let width = settings.width.max(64);
    let height = settings.height.max(TITLE_HEIGHT + 64);

    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        draw(&root, &prepared, spec)?;
        root.present().map_err(draw_err)?;
    }

    let bytes = encode_rgb(buf, width, height, settings.format)?;
    log::debug!(
        "rendered {} chart of {} vs {} ({} bytes)",
        spec.kind,
        spec.x_column,
        spec.y_column,
        bytes.len()
    );
    Ok(RenderedArtifact {
        format: settings.format,
        width,
        height,
        bytes,
        persisted: None,
    })
}

fn draw(root: &Area<'_>, prepared: &PreparedChart, spec: &ChartSpec) -> Result<(), PlotError> {
    let (title_area, plot_area) = root.split_vertically(TITLE_HEIGHT);

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(prepared.x_range.clone(), prepared.y_range.clone())
        .map_err(draw_err)?;

    // Tick labels need a font; without one the series are still drawn.
    if let Err(e) = draw_mesh(&mut chart, prepared) {
        log::debug!("axis ticks skipped: {e}");
    }

    let legend = validate_label("legend", spec.options.legend.as_deref());
    let legend_text = legend.as_ref().ok().cloned().flatten();
    draw_series(&mut chart, &prepared.series, legend_text.as_deref())?;

    let options = &spec.options;
    let mut steps: Vec<OptionStep<'_>> = Vec::with_capacity(4);
    steps.push(("title", Box::new(|| draw_title(&title_area, options.title.as_deref()))));
    steps.push(("x_label", Box::new(|| draw_x_label(&plot_area, options.x_label.as_deref()))));
    steps.push(("y_label", Box::new(|| draw_y_label(&plot_area, options.y_label.as_deref()))));
    steps.push(("legend", Box::new(move || draw_legend(&mut chart, legend))));
    apply_best_effort(steps);
    Ok(())
}

fn draw_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Draw(e.to_string())
}

fn option_err<E: std::fmt::Display>(option: &'static str, e: E) -> OptionError {
    OptionError::Draw {
        option,
        reason: e.to_string(),
    }
}

fn draw_mesh(chart: &mut Chart<'_, '_>, prepared: &PreparedChart) -> Result<(), PlotError> {
    let x_fmt = |v: &f64| tick_label(*v, prepared.x_categories.as_deref());
    let y_fmt = |v: &f64| tick_label(*v, prepared.y_categories.as_deref());
    let x_ticks = prepared.x_categories.as_ref().map_or(10, |c| c.len().clamp(1, 20));
    let y_ticks = prepared.y_categories.as_ref().map_or(10, |c| c.len().clamp(1, 20));

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(x_ticks)
        .y_labels(y_ticks)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style((FONT_FAMILY, 12.0))
        .draw()
        .map_err(draw_err)
}

fn draw_series(chart: &mut Chart<'_, '_>, series: &Series, legend: Option<&str>) -> Result<(), PlotError> {
    match series {
        Series::Points(points) => {
            let anno = chart
                .draw_series(points.iter().map(|&p| Circle::new(p, 3, SERIES_COLOR.filled())))
                .map_err(draw_err)?;
            attach_legend(anno, legend, SERIES_COLOR);
        }
        Series::Path(segments) => {
            for (i, segment) in segments.iter().enumerate() {
                let anno = chart
                    .draw_series(LineSeries::new(segment.iter().copied(), SERIES_COLOR.stroke_width(2)))
                    .map_err(draw_err)?;
                if i == 0 {
                    attach_legend(anno, legend, SERIES_COLOR);
                }
            }
        }
        Series::Bins(bins) => {
            let anno = chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], SERIES_COLOR.filled())
                }))
                .map_err(draw_err)?;
            attach_legend(anno, legend, SERIES_COLOR);
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
                }))
                .map_err(draw_err)?;
        }
        Series::Counts(counts) => {
            let bar = |i: usize, count: usize| {
                let x = i as f64;
                [(x - 0.4, 0.0), (x + 0.4, count as f64)]
            };
            let anno = chart
                .draw_series(
                    counts
                        .iter()
                        .enumerate()
                        .map(|(i, (_, count))| Rectangle::new(bar(i, *count), SERIES_COLOR.filled())),
                )
                .map_err(draw_err)?;
            attach_legend(anno, legend, SERIES_COLOR);
        }
        Series::Bars(bars) => {
            let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();
            let colors = ColorMap::new(&labels);
            let anno = chart
                .draw_series(bars.iter().enumerate().map(|(i, (label, value))| {
                    let x = i as f64;
                    Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *value)], colors.color_for(label).filled())
                }))
                .map_err(draw_err)?;
            let swatch = labels.first().map_or(SERIES_COLOR, |l| colors.color_for(l));
            attach_legend(anno, legend, swatch);
        }
    }
    Ok(())
}

fn attach_legend(anno: &mut SeriesAnno<'_, BitMapBackend<'_>>, legend: Option<&str>, color: RGBColor) {
    if let Some(text) = legend {
        anno.label(text)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
}

// -- cosmetic options --

fn draw_title(area: &Area<'_>, value: Option<&str>) -> Result<(), OptionError> {
    let Some(text) = validate_label("title", value)? else {
        return Ok(());
    };
    let (w, h) = area.dim_in_pixel();
    let style = (FONT_FAMILY, 22.0)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(text, (w as i32 / 2, h as i32 / 2), style))
        .map_err(|e| option_err("title", e))
}

fn draw_x_label(area: &Area<'_>, value: Option<&str>) -> Result<(), OptionError> {
    let Some(text) = validate_label("x_label", value)? else {
        return Ok(());
    };
    let (w, h) = area.dim_in_pixel();
    let style = (FONT_FAMILY, 15.0)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    area.draw(&Text::new(text, (w as i32 / 2, h as i32 - 4), style))
        .map_err(|e| option_err("x_label", e))
}

fn draw_y_label(area: &Area<'_>, value: Option<&str>) -> Result<(), OptionError> {
    let Some(text) = validate_label("y_label", value)? else {
        return Ok(());
    };
    let (_, h) = area.dim_in_pixel();
    let style = (FONT_FAMILY, 15.0)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(text, (14, h as i32 / 2), style))
        .map_err(|e| option_err("y_label", e))
}

fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>, legend: Result<Option<String>, OptionError>) -> Result<(), OptionError> {
    if legend?.is_none() {
        return Ok(());
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font((FONT_FAMILY, 13.0))
        .draw()
        .map_err(|e| option_err("legend", e))
}

// -- tick labels --

fn tick_label(value: f64, categories: Option<&[String]>) -> String {
    match categories {
        Some(categories) => {
            let idx = value.round();
            if (value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            categories.get(idx as usize).cloned().unwrap_or_default()
        }
        None => format_number(value),
    }
}

fn format_number(v: f64) -> String {
    if v == 0.0 {
        return "0".into();
    }
    if !(1e-3..1e6).contains(&v.abs()) {
        return format!("{v:.2e}");
    }
    let s = format!("{v:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
