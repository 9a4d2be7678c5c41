//! Dashboard chart rendering
//!
//! Writes three PNGs into the public chart directory, overwriting the
//! previous set. Concurrent renders write the same paths without locking.
//!
//! Text is drawn with DejaVu Sans, bundled into the binary. `CHART_FONT`
//! replaces it with another TTF/OTF file.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use serde::Serialize;
use thiserror::Error;

use super::dataset::{class_counts, value_counts, LabeledTransaction};

pub const PIE_CHART: &str = "fraud_vs_legal_pie_chart.png";
pub const COUNTRY_CHART: &str = "top_fraud_countries_bar_chart.png";
pub const BROWSER_CHART: &str = "fraud_by_browser_bar_chart.png";

const FONT_FAMILY: &str = "sans-serif";
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const FRAUD_COLOR: RGBColor = RGBColor(0x22, 0xd3, 0xee);
const LEGAL_COLOR: RGBColor = RGBColor(0x7e, 0x3f, 0xf4);
const COUNTRY_COLOR: RGBColor = RGBColor(0x2c, 0x7f, 0xb8);
const BROWSER_COLOR: RGBColor = RGBColor(0xe0, 0x5d, 0x5d);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to create chart directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load chart font {path}: {message}")]
    Font { path: String, message: String },

    #[error("failed to render {chart}: {message}")]
    Render { chart: &'static str, message: String },
}

/// Fraud and legal tallies the pie chart was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartCounts {
    pub fraud: i64,
    pub legal: i64,
}

/// Draws the dashboard charts.
///
/// Built once at startup and shared through the application state. A
/// renderer without labels draws shapes only.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    labels: bool,
}

impl ChartRenderer {
    /// Register the chart font and return a labelling renderer.
    ///
    /// `font` overrides the bundled face; if it cannot be loaded the bundled
    /// face is used instead.
    pub fn new(font: Option<&Path>) -> Self {
        if let Some(path) = font {
            match load_font_file(path) {
                Ok(()) => {
                    tracing::info!(font = %path.display(), "Chart font registered");
                    return Self { labels: true };
                }
                Err(e) => tracing::warn!("Falling back to the bundled chart font: {}", e),
            }
        }

        match register_font(FONT_FAMILY, FontStyle::Normal, BUNDLED_FONT) {
            Ok(()) => Self { labels: true },
            Err(_) => {
                tracing::error!("Bundled chart font rejected, charts will have no text");
                Self { labels: false }
            }
        }
    }

    pub fn labels(&self) -> bool {
        self.labels
    }

    /// Render all dashboard charts for `records` into `dir`
    pub fn render_dashboard_charts<T: LabeledTransaction>(
        &self,
        records: &[T],
        dir: &Path,
    ) -> Result<ChartCounts, ChartError> {
        std::fs::create_dir_all(dir).map_err(|source| ChartError::Directory {
            path: dir.display().to_string(),
            source,
        })?;

        let (fraud, legal) = class_counts(records);

        let top_countries: Vec<(String, i64)> = value_counts(
            records.iter().filter(|r| r.is_fraud()).map(|r| r.country_name()),
        )
        .into_iter()
        .take(5)
        .collect();

        let fraud_by_browser = value_counts(
            records.iter().filter(|r| r.is_fraud()).map(|r| r.browser()),
        );

        let [pie, countries, browsers] = chart_paths(dir);
        self.draw_pie(&pie, fraud, legal)
            .map_err(|message| ChartError::Render { chart: PIE_CHART, message })?;
        self.draw_country_bars(&countries, &top_countries)
            .map_err(|message| ChartError::Render { chart: COUNTRY_CHART, message })?;
        self.draw_browser_bars(&browsers, &fraud_by_browser)
            .map_err(|message| ChartError::Render { chart: BROWSER_CHART, message })?;

        tracing::debug!(dir = %dir.display(), fraud, legal, "Dashboard charts rendered");

        Ok(ChartCounts { fraud, legal })
    }

    fn draw_pie(&self, path: &Path, fraud: i64, legal: i64) -> Result<(), String> {
        let root = BitMapBackend::new(path, (600, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let root = if self.labels {
            root.titled("Fraud vs Legal Transactions", (FONT_FAMILY, 24))
                .map_err(|e| e.to_string())?
        } else {
            root
        };

        let total = fraud + legal;
        if total > 0 {
            let (width, height) = root.dim_in_pixel();
            let center = (width as i32 / 2, height as i32 / 2);
            let radius = f64::from(width.min(height)) * 0.4;

            // Start at twelve o'clock and go counter-clockwise
            let mut start = PI / 2.0;
            for (name, count, color) in [("Fraud", fraud, FRAUD_COLOR), ("Legal", legal, LEGAL_COLOR)] {
                if count == 0 {
                    continue;
                }
                let share = count as f64 / total as f64;
                let sweep = 2.0 * PI * share;
                root.draw(&Polygon::new(wedge(center, radius, start, sweep), color.filled()))
                    .map_err(|e| e.to_string())?;

                if self.labels {
                    let mid = start + sweep / 2.0;
                    let anchor = (
                        center.0 + (radius * 0.55 * mid.cos()) as i32 - 30,
                        center.1 - (radius * 0.55 * mid.sin()) as i32,
                    );
                    let text = format!("{} {:.1}%", name, share * 100.0);
                    root.draw(&Text::new(text, anchor, (FONT_FAMILY, 18).into_font().color(&BLACK)))
                        .map_err(|e| e.to_string())?;
                }

                start += sweep;
            }
        }

        root.present().map_err(|e| e.to_string())
    }

    /// Horizontal bars, most fraud at the top
    fn draw_country_bars(&self, path: &Path, bars: &[(String, i64)]) -> Result<(), String> {
        let root = BitMapBackend::new(path, (800, 500)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let rows = axis_len(bars);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(15);
        if self.labels {
            builder
                .caption("Top 5 Fraud-Prone Countries", (FONT_FAMILY, 24))
                .x_label_area_size(40)
                .y_label_area_size(160);
        }
        let mut chart = builder
            .build_cartesian_2d(0u32..axis_max(bars), (0u32..rows).into_segmented())
            .map_err(|e| e.to_string())?;

        // Without a font there is nothing to put on the axes
        if self.labels {
            let row_label = |y: &SegmentValue<u32>| match y {
                SegmentValue::CenterOf(row) => rows
                    .checked_sub(row + 1)
                    .and_then(|i| bars.get(i as usize))
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            };

            chart
                .configure_mesh()
                .disable_y_mesh()
                .x_desc("Fraud Transactions")
                .y_label_formatter(&row_label)
                .draw()
                .map_err(|e| e.to_string())?;
        }

        chart
            .draw_series(
                Histogram::horizontal(&chart)
                    .style(COUNTRY_COLOR.filled())
                    .margin(8)
                    .data(
                        bars.iter()
                            .zip((0..rows).rev())
                            .map(|((_, value), row)| (row, count_u32(*value))),
                    ),
            )
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())
    }

    /// Vertical bars, most fraud on the left
    fn draw_browser_bars(&self, path: &Path, bars: &[(String, i64)]) -> Result<(), String> {
        let root = BitMapBackend::new(path, (800, 500)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let columns = axis_len(bars);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(15);
        if self.labels {
            builder
                .caption("Fraud Transactions by Browser", (FONT_FAMILY, 24))
                .x_label_area_size(40)
                .y_label_area_size(60);
        }
        let mut chart = builder
            .build_cartesian_2d((0u32..columns).into_segmented(), 0u32..axis_max(bars))
            .map_err(|e| e.to_string())?;

        if self.labels {
            let column_label = |x: &SegmentValue<u32>| match x {
                SegmentValue::CenterOf(column) => bars
                    .get(*column as usize)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            };

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc("Browser")
                .y_desc("Fraud Count")
                .x_label_formatter(&column_label)
                .draw()
                .map_err(|e| e.to_string())?;
        }

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BROWSER_COLOR.filled())
                    .margin(10)
                    .data(
                        bars.iter()
                            .zip(0..columns)
                            .map(|((_, value), column)| (column, count_u32(*value))),
                    ),
            )
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())
    }
}

/// Paths of the rendered charts inside `dir`
pub fn chart_paths(dir: &Path) -> [PathBuf; 3] {
    [dir.join(PIE_CHART), dir.join(COUNTRY_CHART), dir.join(BROWSER_CHART)]
}

/// Register a TTF/OTF file as the chart font family
fn load_font_file(path: &Path) -> Result<(), ChartError> {
    let font_error = |message: &str| ChartError::Font {
        path: path.display().to_string(),
        message: message.to_string(),
    };

    let bytes = std::fs::read(path).map_err(|e| font_error(&e.to_string()))?;
    // The font registry keeps the bytes for the life of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| font_error("not a usable TrueType/OpenType font"))
}

/// Outline of a pie slice in pixel coordinates
fn wedge(center: (i32, i32), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 0..=steps {
        let angle = start + sweep * i as f64 / steps as f64;
        points.push((
            center.0 + (radius * angle.cos()).round() as i32,
            center.1 - (radius * angle.sin()).round() as i32,
        ));
    }
    points
}

/// Bar height on the u32 value axis, saturating
fn count_u32(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

/// Number of bar slots, at least one
fn axis_len(bars: &[(String, i64)]) -> u32 {
    u32::try_from(bars.len().max(1)).unwrap_or(u32::MAX)
}

fn axis_max(bars: &[(String, i64)]) -> u32 {
    let max = bars.iter().map(|(_, v)| count_u32(*v)).max().unwrap_or(0).max(1);
    // 10% headroom above the tallest bar
    max.saturating_add(max / 10 + u32::from(max % 10 != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dataset::{read_records, DashboardRecord};
    use crate::test_utils::write_dashboard_csv;

    fn dashboard_records(dir: &Path) -> Vec<DashboardRecord> {
        read_records(write_dashboard_csv(dir)).unwrap()
    }

    #[test]
    fn test_renders_three_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let records = dashboard_records(dir.path());

        let chart_dir = dir.path().join("static").join("images");
        let renderer = ChartRenderer::new(None);
        assert!(renderer.labels());
        let counts = renderer.render_dashboard_charts(&records, &chart_dir).unwrap();

        assert_eq!(counts.fraud + counts.legal, records.len() as i64);
        for path in chart_paths(&chart_dir) {
            let bytes = std::fs::read(&path).unwrap();
            assert!(bytes.starts_with(b"\x89PNG"), "{}", path.display());
        }
    }

    #[test]
    fn test_renders_without_labels() {
        let dir = tempfile::tempdir().unwrap();
        let records = dashboard_records(dir.path());

        let renderer = ChartRenderer { labels: false };
        let counts = renderer.render_dashboard_charts(&records, dir.path()).unwrap();
        assert_eq!(counts, ChartCounts { fraud: 9, legal: 4 });
        for path in chart_paths(dir.path()) {
            assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
        }

        let empty: Vec<DashboardRecord> = Vec::new();
        renderer.render_dashboard_charts(&empty, dir.path()).unwrap();
    }

    #[test]
    fn test_overwrites_previous_render() {
        let dir = tempfile::tempdir().unwrap();
        let records = dashboard_records(dir.path());
        let renderer = ChartRenderer::new(None);

        let chart_dir = dir.path().join("images");
        let first = renderer.render_dashboard_charts(&records, &chart_dir).unwrap();
        let before = std::fs::read(chart_dir.join(PIE_CHART)).unwrap();
        let second = renderer.render_dashboard_charts(&records, &chart_dir).unwrap();
        let after = std::fs::read(chart_dir.join(PIE_CHART)).unwrap();

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert_eq!(std::fs::read_dir(&chart_dir).unwrap().count(), 3);
    }

    #[test]
    fn test_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<DashboardRecord> = Vec::new();

        let counts = ChartRenderer::new(None)
            .render_dashboard_charts(&records, dir.path())
            .unwrap();
        assert_eq!(counts, ChartCounts { fraud: 0, legal: 0 });
        for path in chart_paths(dir.path()) {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_missing_font_falls_back_to_bundled() {
        let err = load_font_file(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(matches!(err, ChartError::Font { .. }));

        let renderer = ChartRenderer::new(Some(Path::new("/no/such/font.ttf")));
        assert!(renderer.labels());
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let err = load_font_file(&path).unwrap_err();
        assert!(matches!(err, ChartError::Font { .. }));
    }

    #[test]
    fn test_huge_counts_saturate() {
        let dir = tempfile::tempdir().unwrap();
        let bars = vec![("Chrome".to_string(), i64::from(u32::MAX) + 10)];

        assert_eq!(count_u32(i64::MAX), u32::MAX);
        assert_eq!(count_u32(-3), 0);
        assert_eq!(axis_max(&bars), u32::MAX);

        let renderer = ChartRenderer { labels: false };
        renderer.draw_browser_bars(&dir.path().join("b.png"), &bars).unwrap();
    }

    #[test]
    fn test_wedge_outline() {
        let points = wedge((100, 100), 50.0, 0.0, PI);
        assert_eq!(points[0], (100, 100));
        assert_eq!(points[1], (150, 100));
        assert_eq!(*points.last().unwrap(), (50, 100));
    }

    #[test]
    fn test_axis_headroom() {
        assert_eq!(axis_max(&[]), 2);
        assert_eq!(axis_max(&[("Chrome".to_string(), 10)]), 11);
        assert_eq!(axis_max(&[("Chrome".to_string(), 11)]), 13);
    }
}
