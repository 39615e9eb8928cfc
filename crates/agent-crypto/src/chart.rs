//! 7-day price chart
//!
//! The renderer never fails: any problem turns into a user-facing message
//! that is delivered next to the report instead of the image.

use crate::error::{CryptoError, Result};
use crate::symbol::Symbol;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;
const SKYBLUE: RGBColor = RGBColor(135, 206, 235);
const GRID: RGBColor = RGBColor(220, 220, 220);
const GRID_LINES: i32 = 10;

/// One hourly closing price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlySample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// A backend with hourly prices for the trailing week
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HourlySeriesSource: Send + Sync {
    async fn hourly_series(&self, symbol: &Symbol) -> Result<Vec<HourlySample>>;
}

/// A rendered chart image, removed from disk when dropped
#[derive(Debug)]
pub struct ChartArtifact {
    path: PathBuf,
    keep: bool,
}

impl ChartArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keep: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk and hand back its path
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for ChartArtifact {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove chart file"),
        }
    }
}

/// Either an image or the text to show instead of it
#[derive(Debug)]
pub enum ChartOutcome {
    Rendered(ChartArtifact),
    Unavailable(String),
}

/// Produces the chart shown next to a report
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, symbol: &Symbol) -> ChartOutcome;
}

/// Line chart of the last 7 days of hourly closes
pub struct MarketChartRenderer {
    source: Arc<dyn HourlySeriesSource>,
    chart_dir: PathBuf,
    font_path: Option<PathBuf>,
}

impl MarketChartRenderer {
    pub fn new(source: Arc<dyn HourlySeriesSource>, chart_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            chart_dir: chart_dir.into(),
            font_path: None,
        }
    }

    /// TrueType font for titles, axis labels and the legend
    pub fn with_font(mut self, path: Option<PathBuf>) -> Self {
        self.font_path = path;
        self
    }

    async fn try_render(&self, symbol: &Symbol) -> Result<Option<ChartArtifact>> {
        let samples = self.source.hourly_series(symbol).await?;
        if samples.is_empty() {
            return Ok(None);
        }

        let artifact = ChartArtifact::new(self.chart_dir.join(chart_file_name(symbol)));
        let path = artifact.path().to_path_buf();
        let label = symbol.as_str().to_uppercase();
        let with_text = ensure_font(self.font_path.as_deref());
        let points: Vec<(i64, f64)> = samples
            .iter()
            .map(|s| (s.timestamp.timestamp(), s.close))
            .collect();

        tokio::task::spawn_blocking(move || draw_chart(&path, &label, &points, with_text))
            .await
            .map_err(|e| CryptoError::Chart(e.to_string()))??;

        Ok(Some(artifact))
    }
}

#[async_trait]
impl ChartRenderer for MarketChartRenderer {
    async fn render(&self, symbol: &Symbol) -> ChartOutcome {
        match self.try_render(symbol).await {
            Ok(Some(artifact)) => {
                info!(symbol = %symbol, path = %artifact.path().display(), "Chart rendered");
                ChartOutcome::Rendered(artifact)
            }
            Ok(None) => {
                info!(symbol = %symbol, "No hourly data for chart");
                ChartOutcome::Unavailable(format!("❌ No data found for {symbol}"))
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Chart generation failed");
                ChartOutcome::Unavailable(format!("⚠️ Error generating chart: {e}"))
            }
        }
    }
}

/// `<SYMBOL>_chart-<id>.png`, with path-hostile characters replaced
fn chart_file_name(symbol: &Symbol) -> String {
    let safe: String = symbol
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{safe}_chart-{}.png", &id[..8])
}

/// Register the label font once per process
///
/// Returns whether text can be drawn.
fn ensure_font(path: Option<&Path>) -> bool {
    static FONT_READY: OnceLock<bool> = OnceLock::new();

    *FONT_READY.get_or_init(|| {
        let Some(path) = path else {
            warn!("No chart font configured, charts are drawn without text");
            return false;
        };
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read chart font");
                return false;
            }
        };
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match plotters::style::register_font("sans-serif", FontStyle::Normal, bytes) {
            Ok(()) => true,
            Err(_) => {
                warn!(path = %path.display(), "Invalid chart font");
                false
            }
        }
    })
}

fn plot_err(e: impl std::fmt::Display) -> CryptoError {
    CryptoError::Chart(e.to_string())
}

fn draw_chart(path: &Path, label: &str, points: &[(i64, f64)], with_text: bool) -> Result<()> {
    let (x_min, x_max) = bounds(points.iter().map(|p| p.0 as f64));
    let (y_min, y_max) = bounds(points.iter().map(|p| p.1));
    let pad = ((y_max - y_min) * 0.05).max(0.01);
    let (x_min, x_max) = (x_min as i64, (x_max as i64).max(x_min as i64 + 1));
    let (y_min, y_max) = (y_min - pad, y_max + pad);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if with_text {
        builder
            .caption(format!("{label} - Market Price (7d)"), ("sans-serif", 24))
            .x_label_area_size(45)
            .y_label_area_size(80);
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    if with_text {
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price in USD")
            .x_labels(8)
            .x_label_formatter(&|ts: &i64| {
                DateTime::from_timestamp(*ts, 0)
                    .map(|d| d.format("%m-%d %Hh").to_string())
                    .unwrap_or_default()
            })
            .y_label_formatter(&|price: &f64| format!("{price:.2}"))
            .draw()
            .map_err(plot_err)?;
    } else {
        let x_step = (x_max - x_min) as f64 / f64::from(GRID_LINES);
        let y_step = (y_max - y_min) / f64::from(GRID_LINES);
        chart
            .draw_series((0..=GRID_LINES).flat_map(|i| {
                let x = x_min + (x_step * f64::from(i)) as i64;
                let y = y_min + y_step * f64::from(i);
                [
                    PathElement::new(vec![(x, y_min), (x, y_max)], GRID.stroke_width(1)),
                    PathElement::new(vec![(x_min, y), (x_max, y)], GRID.stroke_width(1)),
                ]
            }))
            .map_err(plot_err)?;
    }

    let series = chart
        .draw_series(LineSeries::new(points.iter().copied(), SKYBLUE.stroke_width(2)))
        .map_err(plot_err)?;

    if with_text {
        series
            .label(format!("{label} Price"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SKYBLUE.stroke_width(2)));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use temp_dir::TempDir;

    fn week_of_samples() -> Vec<HourlySample> {
        let start = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        (0..168)
            .map(|h| HourlySample {
                timestamp: start + Duration::hours(h),
                close: 60_000.0 + (h as f64 * 0.3).sin() * 500.0,
            })
            .collect()
    }

    fn renderer(source: MockHourlySeriesSource, dir: &Path) -> MarketChartRenderer {
        MarketChartRenderer::new(Arc::new(source), dir)
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_empty_series_has_no_artifact() {
        let dir = TempDir::new().unwrap();
        let mut source = MockHourlySeriesSource::new();
        source.expect_hourly_series().returning(|_| Ok(Vec::new()));

        let outcome = renderer(source, dir.path()).render(&Symbol::new("ZZZ")).await;
        match outcome {
            ChartOutcome::Unavailable(text) => {
                assert_eq!(text, "❌ No data found for ZZZ");
            }
            ChartOutcome::Rendered(_) => panic!("empty series produced a chart"),
        }
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_source_error_becomes_text() {
        let dir = TempDir::new().unwrap();
        let mut source = MockHourlySeriesSource::new();
        source
            .expect_hourly_series()
            .returning(|_| Err(CryptoError::Yahoo("No data found, symbol may be delisted".into())));

        let outcome = renderer(source, dir.path()).render(&Symbol::new("BTC")).await;
        let ChartOutcome::Unavailable(text) = outcome else {
            panic!("failing source produced a chart");
        };
        assert_eq!(
            text,
            "⚠️ Error generating chart: Yahoo Finance error: No data found, symbol may be delisted"
        );
    }

    #[tokio::test]
    async fn test_renders_png_and_cleans_up_on_drop() {
        let dir = TempDir::new().unwrap();
        let mut source = MockHourlySeriesSource::new();
        source
            .expect_hourly_series()
            .times(1)
            .returning(|_| Ok(week_of_samples()));

        let outcome = renderer(source, dir.path()).render(&Symbol::new("BTC")).await;
        let ChartOutcome::Rendered(artifact) = outcome else {
            panic!("chart was not rendered");
        };

        let path = artifact.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("BTC_chart-"));
        assert!(name.ends_with(".png"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");

        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unusable_font_still_renders() {
        let dir = TempDir::new().unwrap();
        let font = dir.path().join("broken.ttf");
        std::fs::write(&font, b"not a font").unwrap();

        let mut source = MockHourlySeriesSource::new();
        source
            .expect_hourly_series()
            .returning(|_| Ok(week_of_samples()));

        let outcome = renderer(source, dir.path())
            .with_font(Some(font))
            .render(&Symbol::new("SOL"))
            .await;
        let ChartOutcome::Rendered(artifact) = outcome else {
            panic!("bad font prevented the chart");
        };
        assert!(artifact.path().exists());
    }

    #[test]
    fn test_keep_leaves_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kept.png");
        std::fs::write(&path, b"png").unwrap();

        let kept = ChartArtifact::new(&path).keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_file_name_is_sanitized() {
        let name = chart_file_name(&Symbol::new("../BTC-USD"));
        assert!(name.starts_with("___BTC-USD_chart-"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_two_renders_get_distinct_names() {
        let symbol = Symbol::new("ETH");
        assert_ne!(chart_file_name(&symbol), chart_file_name(&symbol));
    }
}
