//! PNG chart rendering.
//!
//! A figure is a vertical stack of equally sized panels, each with a frame,
//! a light grid and one data series. Nothing here renders text.

use crate::config::ChartConfig;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// Series colours, cycled per panel.
const PALETTE: [Rgb<u8>; 6] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
];

/// Margin between the panel edge and its plot area, in pixels.
const MARGIN: u32 = 40;
const GRID_DIVISIONS: u32 = 5;
const MARKER_RADIUS: i64 = 2;

/// One panel of a figure.
#[derive(Debug, Clone)]
pub enum Panel {
    /// Unconnected points. `x_range` lets stacked panels share an x-axis.
    Scatter {
        points: Vec<(f64, f64)>,
        x_range: Option<AxisRange>,
    },
    /// Frequency histogram with a fixed number of equal-width bins.
    Histogram { values: Vec<f64>, bins: usize },
    /// Points connected in order, with markers.
    Line { points: Vec<(f64, f64)> },
}

/// Closed interval mapped onto one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Smallest range covering every finite value, widened when degenerate.
    pub fn covering(values: impl IntoIterator<Item = f64>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
        if min > max {
            return Self { min: 0.0, max: 1.0 };
        }
        if min == max {
            let pad = if min == 0.0 { 0.5 } else { min.abs() * 0.05 };
            return Self {
                min: min - pad,
                max: max + pad,
            };
        }
        Self { min, max }
    }

    /// Position of `v` within the range, 0.0 at `min` and 1.0 at `max`.
    fn fraction(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}

/// Errors produced while writing a chart.
#[derive(Debug)]
pub enum PlotError {
    CreateDir { path: PathBuf, source: std::io::Error },
    Save { path: PathBuf, source: image::ImageError },
}

impl std::fmt::Display for PlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotError::CreateDir { path, source } => {
                write!(f, "failed to create chart directory {}: {source}", path.display())
            }
            PlotError::Save { path, source } => {
                write!(f, "failed to write chart {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::CreateDir { source, .. } => Some(source),
            PlotError::Save { source, .. } => Some(source),
        }
    }
}

/// Plot area of one panel, in pixel coordinates.
#[derive(Debug, Clone, Copy)]
struct Area {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Area {
    fn x(&self, fraction: f64) -> i64 {
        self.left as i64 + (fraction.clamp(0.0, 1.0) * (self.width - 1) as f64).round() as i64
    }

    fn y(&self, fraction: f64) -> i64 {
        let bottom = (self.top + self.height - 1) as i64;
        bottom - (fraction.clamp(0.0, 1.0) * (self.height - 1) as f64).round() as i64
    }

    fn bottom(&self) -> i64 {
        (self.top + self.height - 1) as i64
    }
}

/// Draw `panels` stacked top to bottom into an image.
pub fn render(panels: &[Panel], chart: &ChartConfig) -> RgbImage {
    let count = panels.len().max(1) as u32;
    let mut image = RgbImage::from_pixel(chart.width, chart.panel_height * count, BACKGROUND);

    for index in 0..count {
        let area = Area {
            left: MARGIN,
            top: index * chart.panel_height + MARGIN / 2,
            width: chart.width - 2 * MARGIN,
            height: chart.panel_height - MARGIN,
        };
        draw_frame(&mut image, area);

        let color = PALETTE[index as usize % PALETTE.len()];
        match panels.get(index as usize) {
            Some(Panel::Scatter { points, x_range }) => {
                draw_scatter(&mut image, area, points, *x_range, color)
            }
            Some(Panel::Histogram { values, bins }) => {
                draw_histogram(&mut image, area, values, *bins, color)
            }
            Some(Panel::Line { points }) => draw_polyline(&mut image, area, points, color),
            None => {}
        }
    }
    image
}

/// Render and write a figure as PNG, creating the parent directory if needed.
pub fn save(path: &Path, panels: &[Panel], chart: &ChartConfig) -> Result<(), PlotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PlotError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    render(panels, chart)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| PlotError::Save {
            path: path.to_path_buf(),
            source: e,
        })?;
    tracing::info!(path = %path.display(), panels = panels.len(), "wrote chart");
    Ok(())
}

/// Histogram bin counts over `range`; the maximum value lands in the last bin.
pub fn bin_counts(values: &[f64], bins: usize, range: AxisRange) -> Vec<usize> {
    let bins = bins.max(1);
    let mut counts = vec![0; bins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let fraction = range.fraction(v);
        if !(0.0..=1.0).contains(&fraction) {
            continue;
        }
        let index = ((fraction * bins as f64) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for y in y0.min(y1)..=y0.max(y1) {
        for x in x0.min(x1)..=x0.max(x1) {
            put(image, x, y, color);
        }
    }
}

/// Bresenham line between two pixels.
fn draw_segment(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(image, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_marker(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    fill_rect(
        image,
        x - MARKER_RADIUS,
        y - MARKER_RADIUS,
        x + MARKER_RADIUS,
        y + MARKER_RADIUS,
        color,
    );
}

fn draw_frame(image: &mut RgbImage, area: Area) {
    for step in 1..GRID_DIVISIONS {
        let fraction = step as f64 / GRID_DIVISIONS as f64;
        let x = area.x(fraction);
        let y = area.y(fraction);
        draw_segment(image, (x, area.y(0.0)), (x, area.y(1.0)), GRID);
        draw_segment(image, (area.x(0.0), y), (area.x(1.0), y), GRID);
    }
    let (left, right) = (area.x(0.0), area.x(1.0));
    let (top, bottom) = (area.y(1.0), area.y(0.0));
    draw_segment(image, (left, top), (right, top), FRAME);
    draw_segment(image, (left, bottom), (right, bottom), FRAME);
    draw_segment(image, (left, top), (left, bottom), FRAME);
    draw_segment(image, (right, top), (right, bottom), FRAME);
}

fn draw_scatter(
    image: &mut RgbImage,
    area: Area,
    points: &[(f64, f64)],
    x_range: Option<AxisRange>,
    color: Rgb<u8>,
) {
    let xr = x_range.unwrap_or_else(|| AxisRange::covering(points.iter().map(|p| p.0)));
    let yr = AxisRange::covering(points.iter().map(|p| p.1));
    for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        draw_marker(image, area.x(xr.fraction(x)), area.y(yr.fraction(y)), color);
    }
}

fn draw_histogram(image: &mut RgbImage, area: Area, values: &[f64], bins: usize, color: Rgb<u8>) {
    let range = AxisRange::covering(values.iter().copied());
    let counts = bin_counts(values, bins, range);
    let tallest = counts.iter().copied().max().unwrap_or(0);
    if tallest == 0 {
        return;
    }
    let n = counts.len() as f64;
    for (i, &count) in counts.iter().enumerate().filter(|(_, c)| **c > 0) {
        let x0 = area.x(i as f64 / n);
        let x1 = (area.x((i + 1) as f64 / n) - 1).max(x0);
        let top = area.y(count as f64 / tallest as f64);
        fill_rect(image, x0, top, x1, area.bottom(), color);
    }
}

fn draw_polyline(image: &mut RgbImage, area: Area, points: &[(f64, f64)], color: Rgb<u8>) {
    let xr = AxisRange::covering(points.iter().map(|p| p.0));
    let yr = AxisRange::covering(points.iter().map(|p| p.1));
    let pixels: Vec<(i64, i64)> = points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|&(x, y)| (area.x(xr.fraction(x)), area.y(yr.fraction(y))))
        .collect();
    for pair in pixels.windows(2) {
        draw_segment(image, pair[0], pair[1], color);
    }
    for &(x, y) in &pixels {
        draw_marker(image, x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_chart() -> ChartConfig {
        ChartConfig {
            width: 200,
            panel_height: 120,
        }
    }

    #[test]
    fn range_covers_values() {
        let r = AxisRange::covering([3.0, -1.0, 2.0]);
        assert_eq!(r, AxisRange { min: -1.0, max: 3.0 });
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        let empty = AxisRange::covering(std::iter::empty());
        assert_eq!(empty, AxisRange { min: 0.0, max: 1.0 });

        let zero = AxisRange::covering([0.0, 0.0]);
        assert!(zero.min < 0.0 && zero.max > 0.0);

        let single = AxisRange::covering([10.0]);
        assert!(single.min < 10.0 && single.max > 10.0);

        let nan_only = AxisRange::covering([f64::NAN]);
        assert_eq!(nan_only, AxisRange { min: 0.0, max: 1.0 });
    }

    #[test]
    fn bins_include_both_ends() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        let counts = bin_counts(&values, 2, AxisRange::covering(values));
        assert_eq!(counts, vec![2, 3]);
        assert_eq!(counts.iter().sum::<usize>(), values.len());
    }

    #[test]
    fn zero_bins_is_treated_as_one() {
        let counts = bin_counts(&[1.0, 2.0], 0, AxisRange::covering([1.0, 2.0]));
        assert_eq!(counts, vec![2]);
    }

    #[test]
    fn figure_height_is_one_panel_per_series() {
        let panels = vec![
            Panel::Histogram {
                values: vec![1.0, 2.0, 2.5],
                bins: 10,
            },
            Panel::Line {
                points: vec![(0.0, 0.0), (1.0, 3.0)],
            },
            Panel::Scatter {
                points: vec![(5.0, 0.1)],
                x_range: None,
            },
        ];
        let image = render(&panels, &small_chart());
        assert_eq!(image.width(), 200);
        assert_eq!(image.height(), 360);
    }

    #[test]
    fn empty_figure_still_renders_a_frame() {
        let image = render(&[], &small_chart());
        assert_eq!(image.height(), 120);
        assert!(image.pixels().any(|p| *p == FRAME));
    }

    #[test]
    fn series_pixels_use_panel_colour() {
        let panels = vec![Panel::Line {
            points: vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.5)],
        }];
        let image = render(&panels, &small_chart());
        assert!(image.pixels().any(|p| *p == PALETTE[0]));
    }

    #[test]
    fn save_writes_png_and_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charts").join("out.png");
        let panels = vec![Panel::Histogram {
            values: vec![1.0, 1.5, 9.0],
            bins: 5,
        }];
        save(&path, &panels, &small_chart()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
