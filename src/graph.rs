use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;
use std::ops::Range;

use crate::aggregate::{sort_labels, BoxStats, Histogram, Pivot, PointRow};
use crate::palette::ColorPalette;

const BAR_HALF_WIDTH: f64 = 0.4;
const BOX_WIDTH: f64 = 0.6;
const MAX_CATEGORY_LABELS: usize = 60;
const BUBBLE_MIN_AREA: f64 = 10.0;
const BUBBLE_MAX_AREA: f64 = 1000.0;
/// Largest RGB buffer a PNG render may allocate.
const MAX_BUFFER_BYTES: usize = 1 << 30;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Chart-ready data for one report.
#[derive(Debug, Clone)]
pub enum ChartData {
    /// One bar per category.
    Bar {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    /// One line per series over the pivot categories.
    Line(Pivot),
    /// One slice per category, sized by share of the total.
    Pie {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    /// Series stacked on top of each other per category.
    StackedBar(Pivot),
    Scatter(Vec<PointRow>),
    Bubble(Vec<PointRow>),
    Box(Vec<BoxStats>),
    Histogram(Histogram),
}

/// Presentation hints for a single chart
#[derive(Debug, Clone, Default)]
pub struct ChartStyle {
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub value_labels: bool,
    pub palette: ColorPalette,
}

/// Fixed-size drawing surface that renders a chart to PNG bytes or SVG markup.
#[derive(Debug, Clone, Copy)]
pub struct Canvas {
    width: u32,
    height: u32,
    buffer_len: usize,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("Canvas dimensions must be non-zero (got {}x{})", width, height);
        }
        let buffer_len = match (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
        {
            Some(len) if len <= MAX_BUFFER_BYTES => len,
            _ => anyhow::bail!("Canvas dimensions {}x{} are too large", width, height),
        };
        Ok(Canvas { width, height, buffer_len })
    }

    /// Draw onto an RGB buffer and encode it as PNG
    pub fn render_png(&self, data: &ChartData, style: &ChartStyle) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.buffer_len];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            draw_chart(&root, data, style)?;
            root.present().context("Failed to present drawing")?;
        }

        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(&buffer, self.width, self.height, image::ColorType::Rgb8)
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }

    /// Draw into a self-contained `<svg>` fragment
    pub fn render_svg(&self, data: &ChartData, style: &ChartStyle) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            draw_chart(&root, data, style)?;
            root.present().context("Failed to present drawing")?;
        }
        Ok(svg)
    }
}

/// Draw any chart kind onto a drawing area.
pub fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, data: &ChartData, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match data {
        ChartData::Bar { categories, values } => draw_bars(root, categories, values, style),
        ChartData::Line(pivot) => draw_lines(root, pivot, style),
        ChartData::Pie { categories, values } => draw_pie(root, categories, values, style),
        ChartData::StackedBar(pivot) => draw_stacked_bars(root, pivot, style),
        ChartData::Scatter(points) => draw_points(root, points, false, style),
        ChartData::Bubble(points) => draw_points(root, points, true, style),
        ChartData::Box(stats) => draw_boxes(root, stats, style),
        ChartData::Histogram(hist) => draw_histogram(root, hist, style),
    }
}

fn build_chart<'a, DB>(
    root: &'a DrawingArea<DB, Shift>,
    style: &ChartStyle,
    x_range: Range<f64>,
    y_range: Range<f64>,
) -> Result<Chart<'a, DB>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    ChartBuilder::on(root)
        .margin(10)
        .caption(&style.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")
}

/// Axis descriptions, plus category tick labels when the x axis is categorical.
fn draw_mesh<DB>(chart: &mut Chart<'_, DB>, categories: Option<&[String]>, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let formatter = |x: &f64| category_label(categories.unwrap_or(&[]), *x);
    let mut mesh = chart.configure_mesh();
    if let Some(cats) = categories {
        mesh.x_labels(cats.len().clamp(1, MAX_CATEGORY_LABELS))
            .x_label_formatter(&formatter)
            .disable_x_mesh();
    }
    if let Some(label) = &style.x_label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &style.y_label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().context("Failed to draw mesh")?;
    Ok(())
}

fn draw_legend<'a, DB>(chart: &mut Chart<'a, DB>) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;
    Ok(())
}

/// Categories sit at integer x positions; ticks between them stay blank.
fn category_label(categories: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

fn category_range(n: usize) -> Range<f64> {
    -0.5..(n as f64 - 0.5)
}

/// Padded data range. With `from_zero` the range always includes zero and
/// does not pad below a zero baseline.
fn value_range(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if from_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let padding = (max - min) * 0.05;
    let lower = if from_zero && min == 0.0 { 0.0 } else { min - padding };
    lower..(max + padding)
}

fn draw_bars<DB>(root: &DrawingArea<DB, Shift>, categories: &[String], values: &[f64], style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if categories.is_empty() || categories.len() != values.len() {
        anyhow::bail!(
            "Bar chart needs one value per category (categories: {}, values: {})",
            categories.len(),
            values.len()
        );
    }

    let mut chart = build_chart(
        root,
        style,
        category_range(categories.len()),
        value_range(values.iter().copied(), true),
    )?;
    draw_mesh(&mut chart, Some(categories), style)?;

    let color = style.palette.color(0);
    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            let x = i as f64;
            Rectangle::new(
                [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, v)],
                color.filled(),
            )
        }))
        .context("Failed to draw bars")?;

    if style.value_labels {
        chart
            .draw_series(values.iter().enumerate().map(|(i, &v)| {
                Text::new(
                    format!("{:.1}", v),
                    (i as f64 - BAR_HALF_WIDTH, v),
                    ("sans-serif", 12).into_font(),
                )
            }))
            .context("Failed to draw bar labels")?;
    }

    Ok(())
}

fn draw_lines<DB>(root: &DrawingArea<DB, Shift>, pivot: &Pivot, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if pivot.categories.is_empty() || pivot.series.is_empty() {
        anyhow::bail!("Line chart needs at least one category and one series");
    }

    let y_range = value_range(
        pivot.series.iter().flat_map(|s| s.values.iter().flatten().copied()),
        false,
    );
    let mut chart = build_chart(root, style, category_range(pivot.categories.len()), y_range)?;
    draw_mesh(&mut chart, Some(pivot.categories.as_slice()), style)?;

    for (i, series) in pivot.series.iter().enumerate() {
        let color = style.palette.color(i);
        // Gaps are skipped; the line joins the neighbouring points.
        let points: Vec<(f64, f64)> = series
            .values
            .iter()
            .enumerate()
            .filter_map(|(x, v)| v.map(|v| (x as f64, v)))
            .collect();

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .context("Failed to draw line series")?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))
            .context("Failed to draw line markers")?;
    }

    draw_legend(&mut chart)
}

/// Polygon approximating a pie wedge. Angles are in degrees, clockwise from
/// the positive x axis in screen space.
fn wedge(center: (i32, i32), radius: f64, start_angle: f64, sweep_angle: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep_angle.abs() / 3.6).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 0..=steps {
        let angle = (start_angle + sweep_angle * i as f64 / steps as f64).to_radians();
        points.push((
            center.0 + (radius * angle.cos()).round() as i32,
            center.1 + (radius * angle.sin()).round() as i32,
        ));
    }
    points
}

fn draw_pie<DB>(root: &DrawingArea<DB, Shift>, categories: &[String], values: &[f64], style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if categories.len() != values.len() || total <= 0.0 {
        anyhow::bail!("Pie chart needs positive values, one per category");
    }

    let area = root
        .titled(&style.title, ("sans-serif", 20))
        .context("Failed to draw title")?;
    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = width.min(height) as f64 * 0.35;
    let label_style = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    let at = |angle: f64, distance: f64| {
        (
            center.0 + (distance * angle.cos()).round() as i32,
            center.1 + (distance * angle.sin()).round() as i32,
        )
    };

    let mut start = -90.0;
    for (i, (category, &value)) in categories.iter().zip(values).enumerate() {
        if value <= 0.0 {
            continue;
        }
        let share = value / total;
        let sweep = share * 360.0;
        let mid = (start + sweep / 2.0).to_radians();

        area.draw(&Polygon::new(
            wedge(center, radius, start, sweep),
            style.palette.color(i).filled(),
        ))
        .context("Failed to draw pie slice")?;
        area.draw(&Text::new(
            format!("{:.1}%", share * 100.0),
            at(mid, radius * 0.6),
            label_style.clone(),
        ))
        .context("Failed to draw slice percentage")?;
        area.draw(&Text::new(category.clone(), at(mid, radius * 1.15), label_style.clone()))
            .context("Failed to draw slice label")?;

        start += sweep;
    }

    Ok(())
}

fn draw_stacked_bars<DB>(root: &DrawingArea<DB, Shift>, pivot: &Pivot, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = pivot.categories.len();
    if n == 0 || pivot.series.is_empty() {
        anyhow::bail!("Stacked bar chart needs at least one category and one series");
    }

    let mut totals = vec![0.0; n];
    for series in &pivot.series {
        for (c, v) in series.values.iter().enumerate() {
            totals[c] += v.unwrap_or(0.0);
        }
    }

    let mut chart = build_chart(
        root,
        style,
        category_range(n),
        value_range(totals.iter().copied(), true),
    )?;
    draw_mesh(&mut chart, Some(pivot.categories.as_slice()), style)?;

    let mut bottoms = vec![0.0; n];
    for (i, series) in pivot.series.iter().enumerate() {
        let color = style.palette.color(i);
        let segments: Vec<Rectangle<(f64, f64)>> = series
            .values
            .iter()
            .enumerate()
            .filter_map(|(c, v)| v.map(|v| (c, v)))
            .map(|(c, v)| {
                let base = bottoms[c];
                bottoms[c] += v;
                let x = c as f64;
                Rectangle::new(
                    [(x - BAR_HALF_WIDTH, base), (x + BAR_HALF_WIDTH, base + v)],
                    color.filled(),
                )
            })
            .collect();

        chart
            .draw_series(segments)
            .context("Failed to draw stacked bars")?
            .label(series.name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    draw_legend(&mut chart)
}

/// Marker radius for a bubble: area scales linearly with `value` between
/// the smallest and largest value in the chart.
pub(crate) fn bubble_radius(value: f64, min: f64, max: f64) -> i32 {
    let t = if max > min { (value - min) / (max - min) } else { 0.5 };
    let area = BUBBLE_MIN_AREA + t.clamp(0.0, 1.0) * (BUBBLE_MAX_AREA - BUBBLE_MIN_AREA);
    ((area / PI).sqrt().round() as i32).max(1)
}

fn draw_points<DB>(root: &DrawingArea<DB, Shift>, points: &[PointRow], bubble: bool, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if points.is_empty() {
        anyhow::bail!("Cannot create point chart with no data points");
    }

    let mut chart = build_chart(
        root,
        style,
        value_range(points.iter().map(|p| p.x), false),
        value_range(points.iter().map(|p| p.y), false),
    )?;
    draw_mesh(&mut chart, None, style)?;

    let (size_min, size_max) = points
        .iter()
        .filter_map(|p| p.size)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let alpha = if bubble { 0.6 } else { 0.8 };

    let groups = sort_labels(
        points
            .iter()
            .map(|p| p.group.clone().unwrap_or_default())
            .collect(),
    );
    for (i, group) in groups.iter().enumerate() {
        let color = style.palette.color(i);
        let members = points
            .iter()
            .filter(|p| p.group.as_deref().unwrap_or_default() == group.as_str());
        let anno = chart
            .draw_series(members.map(|p| {
                let radius = match (bubble, p.size) {
                    (true, Some(size)) => bubble_radius(size, size_min, size_max),
                    _ => 3,
                };
                Circle::new((p.x, p.y), radius, color.mix(alpha).filled())
            }))
            .context("Failed to draw points")?;
        if !group.is_empty() {
            anno.label(group.clone())
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }
    }

    if groups.iter().any(|g| !g.is_empty()) {
        draw_legend(&mut chart)?;
    }
    Ok(())
}

/// Box plot primitives for one category
struct BoxGeometry {
    lower_whisker: Vec<(f64, f64)>,
    upper_whisker: Vec<(f64, f64)>,
    min_cap: Vec<(f64, f64)>,
    max_cap: Vec<(f64, f64)>,
    box_tl: (f64, f64),
    box_br: (f64, f64),
    median_line: Vec<(f64, f64)>,
    outlier_points: Vec<(f64, f64)>,
}

fn box_geometry(x: f64, width: f64, stats: &BoxStats) -> BoxGeometry {
    let half_width = width / 2.0;
    let cap_half = width * 0.2;

    BoxGeometry {
        lower_whisker: vec![(x, stats.lower_whisker), (x, stats.q1)],
        upper_whisker: vec![(x, stats.q3), (x, stats.upper_whisker)],
        min_cap: vec![(x - cap_half, stats.lower_whisker), (x + cap_half, stats.lower_whisker)],
        max_cap: vec![(x - cap_half, stats.upper_whisker), (x + cap_half, stats.upper_whisker)],
        box_tl: (x - half_width, stats.q3),
        box_br: (x + half_width, stats.q1),
        median_line: vec![(x - half_width, stats.median), (x + half_width, stats.median)],
        outlier_points: stats.outliers.iter().map(|&v| (x, v)).collect(),
    }
}

fn draw_boxes<DB>(root: &DrawingArea<DB, Shift>, stats: &[BoxStats], style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if stats.is_empty() {
        anyhow::bail!("Cannot create box plot with no categories");
    }

    let categories: Vec<String> = stats.iter().map(|s| s.category.clone()).collect();
    let y_range = value_range(
        stats.iter().flat_map(|s| {
            [s.lower_whisker, s.upper_whisker]
                .into_iter()
                .chain(s.outliers.iter().copied())
        }),
        false,
    );
    let mut chart = build_chart(root, style, category_range(categories.len()), y_range)?;
    draw_mesh(&mut chart, Some(categories.as_slice()), style)?;

    for (i, s) in stats.iter().enumerate() {
        let color = style.palette.color(i);
        let geom = box_geometry(i as f64, BOX_WIDTH, s);

        chart
            .draw_series(std::iter::once(Rectangle::new([geom.box_tl, geom.box_br], color.filled())))
            .context("Failed to draw box")?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [geom.box_tl, geom.box_br],
                BLACK.stroke_width(1),
            )))
            .context("Failed to draw box outline")?;
        for segment in [geom.lower_whisker, geom.upper_whisker, geom.min_cap, geom.max_cap] {
            chart
                .draw_series(std::iter::once(PathElement::new(segment, BLACK.stroke_width(1))))
                .context("Failed to draw whisker")?;
        }
        chart
            .draw_series(std::iter::once(PathElement::new(geom.median_line, BLACK.stroke_width(2))))
            .context("Failed to draw median")?;
        chart
            .draw_series(
                geom.outlier_points
                    .into_iter()
                    .map(|p| Circle::new(p, 3, BLACK.stroke_width(1))),
            )
            .context("Failed to draw outliers")?;
    }

    Ok(())
}

fn draw_histogram<DB>(root: &DrawingArea<DB, Shift>, hist: &Histogram, style: &ChartStyle) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if hist.counts.is_empty() {
        anyhow::bail!("Cannot create histogram with no bins");
    }

    let edges = hist.edges();
    let x_range = value_range(edges.iter().copied(), false);
    let y_range = value_range(hist.counts.iter().map(|&c| c as f64), true);
    let mut chart = build_chart(root, style, x_range, y_range)?;
    draw_mesh(&mut chart, None, style)?;

    let fill = style.palette.color(0).mix(0.7);
    let bins: Vec<((f64, f64), (f64, f64))> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| ((edges[i], 0.0), (edges[i + 1], count as f64)))
        .collect();

    chart
        .draw_series(bins.iter().map(|&(lo, hi)| Rectangle::new([lo, hi], fill.filled())))
        .context("Failed to draw histogram bins")?;
    chart
        .draw_series(
            bins.iter()
                .map(|&(lo, hi)| Rectangle::new([lo, hi], BLACK.stroke_width(1))),
        )
        .context("Failed to draw histogram edges")?;

    Ok(())
}
