//! Static Chart Renderer
//! Draws report charts into an in-memory RGB buffer and encodes them as PNG.
//!
//! Every chart shares the same frame:
//! 1. Caption centred on top
//! 2. Axes with descriptions and category labels
//! 3. Series drawn in the palette below

use crate::stats::{BoxStats, HistogramBin};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;
use std::ops::Range;
use std::sync::OnceLock;
use thiserror::Error;

/// Default canvas size in pixels.
pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 500;

// Colors
const BAR_COLOR: RGBColor = RGBColor(91, 155, 213);
const LINE_COLOR: RGBColor = RGBColor(237, 125, 49);
const BOX_FILL: RGBColor = RGBColor(189, 215, 238);
const BOX_EDGE: RGBColor = RGBColor(47, 85, 151);
const NAN_CELL: RGBColor = RGBColor(200, 200, 200);
// Diverging scale endpoints for correlation heatmaps
const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

const FONT_FAMILY: &str = "sans-serif";
const CAPTION_FONT: (&str, u32) = (FONT_FAMILY, 22);
const LABEL_FONT: (&str, u32) = (FONT_FAMILY, 13);

/// Shipped with the binary so rendering never depends on system fonts.
static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
    #[error("Failed to encode PNG: {0}")]
    Encoding(#[from] image::ImageError),
    #[error("Pixel buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
    #[error("Bundled chart font could not be loaded")]
    FontUnavailable,
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}

/// Renders the report charts as PNG bytes.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Encode PNG bytes as standard, padded base64.
    pub fn to_base64(png: &[u8]) -> String {
        STANDARD.encode(png)
    }

    /// Vertical bars, one per labelled value, in the given order.
    pub fn bar_chart(
        title: &str,
        x_desc: &str,
        y_desc: &str,
        bars: &[(String, f64)],
    ) -> Result<Vec<u8>, ChartError> {
        let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();
        let y_range = Self::padded_range(bars.iter().map(|(_, v)| *v), true);
        let x_range = Self::category_range(bars.len());

        Self::render(CHART_WIDTH, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(60)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)?;

            let x_formatter = |x: &f64| Self::category_label(&labels, *x);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(labels.len().max(1))
                .x_label_formatter(&x_formatter)
                .y_label_formatter(&|y| format!("{:.0}", y))
                .x_desc(x_desc)
                .y_desc(y_desc)
                .label_style(LABEL_FONT)
                .draw()?;

            chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                let center = i as f64;
                Rectangle::new([(center - 0.35, 0.0), (center + 0.35, *v)], BAR_COLOR.filled())
            }))?;
            Ok(())
        })
    }

    /// A line through `points`, sorted by x, with a marker on each point.
    pub fn line_chart(
        title: &str,
        x_desc: &str,
        y_desc: &str,
        points: &[(f64, f64)],
    ) -> Result<Vec<u8>, ChartError> {
        let x_range = Self::padded_range(points.iter().map(|(x, _)| *x), false);
        let y_range = Self::padded_range(points.iter().map(|(_, y)| *y), false);

        Self::render(CHART_WIDTH, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)?;

            chart
                .configure_mesh()
                .x_label_formatter(&|x| format!("{:.0}", x))
                .y_label_formatter(&|y| format!("{:.0}", y))
                .x_desc(x_desc)
                .y_desc(y_desc)
                .label_style(LABEL_FONT)
                .draw()?;

            chart.draw_series(LineSeries::new(
                points.iter().copied(),
                LINE_COLOR.stroke_width(2),
            ))?;
            chart.draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, LINE_COLOR.filled())),
            )?;
            Ok(())
        })
    }

    /// Contiguous bars over histogram bins.
    pub fn histogram_chart(
        title: &str,
        x_desc: &str,
        bins: &[HistogramBin],
    ) -> Result<Vec<u8>, ChartError> {
        let x_range = Self::padded_range(bins.iter().flat_map(|b| [b.start, b.end]), false);
        let y_range = Self::padded_range(bins.iter().map(|b| b.count as f64), true);

        Self::render(CHART_WIDTH, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(60)
                .build_cartesian_2d(x_range, y_range)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_label_formatter(&|x| format!("{:.0}", x))
                .y_label_formatter(&|y| format!("{:.0}", y))
                .x_desc(x_desc)
                .y_desc("Count")
                .label_style(LABEL_FONT)
                .draw()?;

            chart.draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], BAR_COLOR.filled())
            }))?;
            chart.draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
            }))?;
            Ok(())
        })
    }

    /// Semi-transparent markers, one per observation.
    pub fn scatter_chart(
        title: &str,
        x_desc: &str,
        y_desc: &str,
        points: &[(f64, f64)],
    ) -> Result<Vec<u8>, ChartError> {
        let x_range = Self::padded_range(points.iter().map(|(x, _)| *x), false);
        let y_range = Self::padded_range(points.iter().map(|(_, y)| *y), false);

        Self::render(CHART_WIDTH, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)?;

            chart
                .configure_mesh()
                .x_label_formatter(&|x| format!("{:.0}", x))
                .y_label_formatter(&|y| format!("{:.0}", y))
                .x_desc(x_desc)
                .y_desc(y_desc)
                .label_style(LABEL_FONT)
                .draw()?;

            chart.draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, BAR_COLOR.mix(0.5).filled())),
            )?;
            Ok(())
        })
    }

    /// One box per group: IQR box, median line, whiskers with caps.
    pub fn box_chart(
        title: &str,
        y_desc: &str,
        groups: &[(String, BoxStats)],
    ) -> Result<Vec<u8>, ChartError> {
        let labels: Vec<String> = groups.iter().map(|(label, _)| label.clone()).collect();
        let x_range = Self::category_range(groups.len());
        let y_range = Self::padded_range(
            groups
                .iter()
                .flat_map(|(_, b)| [b.whisker_low, b.whisker_high]),
            false,
        );

        Self::render(CHART_WIDTH, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)?;

            let x_formatter = |x: &f64| Self::category_label(&labels, *x);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(labels.len().max(1))
                .x_label_formatter(&x_formatter)
                .y_label_formatter(&|y| format!("{:.0}", y))
                .y_desc(y_desc)
                .label_style(LABEL_FONT)
                .draw()?;

            for (i, (_, b)) in groups.iter().enumerate() {
                let x = i as f64;
                let (left, right) = (x - 0.3, x + 0.3);

                chart.draw_series([
                    Rectangle::new([(left, b.q1), (right, b.q3)], BOX_FILL.filled()),
                    Rectangle::new([(left, b.q1), (right, b.q3)], BOX_EDGE.stroke_width(1)),
                ])?;
                chart.draw_series([
                    PathElement::new(vec![(left, b.median), (right, b.median)], BOX_EDGE.stroke_width(2)),
                    PathElement::new(vec![(x, b.q3), (x, b.whisker_high)], BOX_EDGE.stroke_width(1)),
                    PathElement::new(vec![(x, b.q1), (x, b.whisker_low)], BOX_EDGE.stroke_width(1)),
                    PathElement::new(
                        vec![(x - 0.15, b.whisker_high), (x + 0.15, b.whisker_high)],
                        BOX_EDGE.stroke_width(1),
                    ),
                    PathElement::new(
                        vec![(x - 0.15, b.whisker_low), (x + 0.15, b.whisker_low)],
                        BOX_EDGE.stroke_width(1),
                    ),
                ])?;
            }
            Ok(())
        })
    }

    /// Square matrix as coloured cells on a diverging -1..1 scale.
    ///
    /// Row 0 is drawn at the top. NaN cells are grey.
    pub fn heatmap_chart(
        title: &str,
        labels: &[String],
        matrix: &[Vec<f64>],
    ) -> Result<Vec<u8>, ChartError> {
        let n = labels.len();
        let axis = Self::category_range(n);

        Self::render(CHART_HEIGHT + 100, CHART_HEIGHT, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(100)
                .build_cartesian_2d(axis.clone(), axis)?;

            let x_formatter = |x: &f64| Self::category_label(labels, *x);
            let y_formatter = |y: &f64| Self::category_label(labels, (n as f64 - 1.0) - *y);
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(n.max(1))
                .y_labels(n.max(1))
                .x_label_formatter(&x_formatter)
                .y_label_formatter(&y_formatter)
                .label_style(LABEL_FONT)
                .draw()?;

            let cells: Vec<(f64, f64, f64)> = matrix
                .iter()
                .enumerate()
                .flat_map(|(i, row)| {
                    row.iter()
                        .enumerate()
                        .map(move |(j, &v)| (j as f64, (n - 1 - i) as f64, v))
                })
                .collect();

            chart.draw_series(cells.iter().map(|&(x, y, v)| {
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    Self::diverging_color(v).filled(),
                )
            }))?;
            chart.draw_series(cells.iter().filter(|(_, _, v)| v.is_finite()).map(|&(x, y, v)| {
                Text::new(format!("{:.2}", v), (x - 0.1, y), LABEL_FONT.into_font())
            }))?;
            Ok(())
        })
    }

    /// Register the bundled font under the family every chart draws with.
    fn ensure_font() -> Result<(), ChartError> {
        let registered = *FONT_REGISTERED.get_or_init(|| {
            plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok()
        });
        if registered {
            Ok(())
        } else {
            Err(ChartError::FontUnavailable)
        }
    }

    fn render<F>(width: u32, height: u32, draw: F) -> Result<Vec<u8>, ChartError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), ChartError>,
    {
        Self::ensure_font()?;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;
            draw(&root)?;
            root.present()?;
        }
        Self::encode_png(buffer, width, height)
    }

    fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
        let image =
            RgbImage::from_raw(width, height, buffer).ok_or(ChartError::BufferSize { width, height })?;
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }

    /// Axis range for `n` categories centred on 0, 1, .. n-1.
    fn category_range(n: usize) -> Range<f64> {
        -0.5..(n.max(1) as f64 - 0.5)
    }

    fn category_label(labels: &[String], x: f64) -> String {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }

    /// Finite min..max with 5% headroom; `0..1` when nothing is finite.
    fn padded_range(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
        let (mut min, mut max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            return 0.0..1.0;
        }
        if from_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if max - min < f64::EPSILON {
            return (min - 1.0)..(max + 1.0);
        }

        let pad = (max - min) * 0.05;
        let low = if from_zero && min == 0.0 { 0.0 } else { min - pad };
        low..(max + pad)
    }

    fn diverging_color(value: f64) -> RGBColor {
        if !value.is_finite() {
            return NAN_CELL;
        }
        let v = value.clamp(-1.0, 1.0);
        let (from, to, t) = if v < 0.0 {
            (COLD, NEUTRAL, v + 1.0)
        } else {
            (NEUTRAL, HOT, v)
        };
        let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
        RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsCalculator;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn assert_png(bytes: &[u8]) {
        assert!(bytes.len() > PNG_SIGNATURE.len());
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png).unwrap();
        assert!(decoded.width() > 0 && decoded.height() > 0);
    }

    #[test]
    fn bar_chart_renders_png() {
        let bars = vec![("Toyota".to_string(), 3.0), ("Honda".to_string(), 2.0)];
        assert_png(&StaticChartRenderer::bar_chart("Brands", "Brand", "Count", &bars).unwrap());
    }

    #[test]
    fn empty_charts_still_render() {
        assert_png(&StaticChartRenderer::bar_chart("Empty", "x", "y", &[]).unwrap());
        assert_png(&StaticChartRenderer::line_chart("Empty", "x", "y", &[]).unwrap());
        assert_png(&StaticChartRenderer::scatter_chart("Empty", "x", "y", &[]).unwrap());
        assert_png(&StaticChartRenderer::histogram_chart("Empty", "x", &[]).unwrap());
        assert_png(&StaticChartRenderer::box_chart("Empty", "y", &[]).unwrap());
        assert_png(&StaticChartRenderer::heatmap_chart("Empty", &[], &[]).unwrap());
    }

    #[test]
    fn statistical_charts_render_png() {
        let values = [1.0, 2.0, 2.5, 3.0, 8.0, 13.0];
        let bins = StatsCalculator::histogram(&values, 4);
        assert_png(&StaticChartRenderer::histogram_chart("Hist", "Value", &bins).unwrap());

        let boxes = vec![("a".to_string(), StatsCalculator::box_stats(&values).unwrap())];
        assert_png(&StaticChartRenderer::box_chart("Box", "Value", &boxes).unwrap());

        let labels = vec!["x".to_string(), "y".to_string()];
        let matrix = vec![vec![1.0, -0.4], vec![-0.4, 1.0]];
        assert_png(&StaticChartRenderer::heatmap_chart("Corr", &labels, &matrix).unwrap());
    }

    #[test]
    fn captions_and_labels_draw_text() {
        let bars = vec![("Toyota".to_string(), 3.0)];
        let png = StaticChartRenderer::bar_chart("Listings by Brand", "Brand", "Listings", &bars).unwrap();
        assert_png(&png);

        // The caption band above the plot must contain dark glyph pixels.
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        let inked = (0..40)
            .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y).0.iter().all(|&c| c < 128))
            .count();
        assert!(inked > 0, "caption was not drawn");
    }

    #[test]
    fn labelled_heatmap_renders_cell_values() {
        let labels = vec!["Mileage_km".to_string(), "Price_USD".to_string()];
        let matrix = vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]];
        assert_png(&StaticChartRenderer::heatmap_chart("Correlation", &labels, &matrix).unwrap());
    }

    #[test]
    fn single_point_line_chart_renders() {
        assert_png(&StaticChartRenderer::line_chart("One", "x", "y", &[(2020.0, 5.0)]).unwrap());
    }

    #[test]
    fn base64_is_padded_standard_alphabet() {
        assert_eq!(StaticChartRenderer::to_base64(b"png"), "cG5n");
        assert_eq!(StaticChartRenderer::to_base64(b"pn"), "cG4=");
    }

    #[test]
    fn diverging_scale_hits_endpoints() {
        assert_eq!(StaticChartRenderer::diverging_color(-1.0).rgb(), (59, 76, 192));
        assert_eq!(StaticChartRenderer::diverging_color(0.0).rgb(), (221, 221, 221));
        assert_eq!(StaticChartRenderer::diverging_color(1.0).rgb(), (180, 4, 38));
        assert_eq!(StaticChartRenderer::diverging_color(f64::NAN).rgb(), NAN_CELL.rgb());
    }
}
