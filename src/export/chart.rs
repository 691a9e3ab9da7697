//! Line charts of extracted series using plotters.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::batch::ResultSet;

const CHART_SIZE: (u32, u32) = (1000, 500);
const LINE_COLOR: RGBColor = RGBColor(230, 120, 30);
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);

/// Y range with 10% headroom on both sides; flat or empty series get a
/// unit-wide range so the axis can still be drawn.
fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let range = max - min;
    if range == 0.0 {
        return (min - 0.5, max + 0.5);
    }
    (min - range * 0.1, max + range * 0.1)
}

/// File name for the chart of the `index`-th video (0-based):
/// `<nn>_<video stem>_series.png`. The number keeps videos with the same
/// name in different folders apart.
fn chart_file_name(index: usize, video: &Path) -> String {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    format!("{:02}_{}_series.png", index + 1, stem)
}

/// Draws one series (reading index on x, value on y) to a PNG.
pub fn render_series_chart(title: &str, values: &[f64], output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .context("Failed to fill chart background")?;

    let (y_min, y_max) = value_range(values);
    let x_max = values.len().max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} (n = {})", title, values.len()), ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0f64..x_max, y_min..y_max)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_desc("Reading")
        .y_desc("Value")
        .light_line_style(GRID_COLOR)
        .draw()
        .context("Failed to draw mesh")?;

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
        LINE_COLOR.stroke_width(2),
    ))?;

    root.present().context("Failed to save chart")?;
    Ok(())
}

/// Draws one chart per video into `output_dir` and returns their paths.
pub fn render_all_charts(results: &ResultSet, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for (index, entry) in results.entries().iter().enumerate() {
        let path = output_dir.join(chart_file_name(index, &entry.video));
        let title = entry
            .video
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        render_series_chart(&title, &entry.readings, &path)?;
        paths.push(path);
    }

    Ok(paths)
}
