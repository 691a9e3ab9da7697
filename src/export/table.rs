//! Tabular export of a result set.
//!
//! One column per video, one row per reading index. Shorter series are
//! padded at the bottom with a missing marker so every column has the
//! length of the longest series. There is no index column.

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::batch::ResultSet;

/// Column-per-video table with padded cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub headers: Vec<String>,
    /// `rows[i][j]` is reading `i` of video `j`, `None` where padded
    pub rows: Vec<Vec<Option<f64>>>,
}

impl SeriesTable {
    /// Lays out a result set as a padded table.
    pub fn from_results(results: &ResultSet) -> Self {
        let headers = results
            .entries()
            .iter()
            .map(|e| e.video.display().to_string())
            .collect();

        let rows = (0..results.max_len())
            .map(|i| {
                results
                    .entries()
                    .iter()
                    .map(|e| e.readings.get(i).copied())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Renders the table as CSV, writing `missing_marker` for padded cells.
    pub fn to_csv(&self, missing_marker: &str) -> String {
        let mut out = String::new();

        let header: Vec<String> = self.headers.iter().map(|h| escape_field(h)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Some(value) => value.to_string(),
                    None => escape_field(missing_marker),
                })
                .collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }

        out
    }
}

/// Quotes a CSV field if it contains a separator, quote or newline.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Writes the result set to a CSV file.
///
/// Refuses an empty result set. The file is written to a temporary file in
/// the target directory first and moved into place once complete.
pub fn export_to_csv(results: &ResultSet, output_path: &Path, missing_marker: &str) -> Result<()> {
    if results.is_empty() {
        return Err(anyhow!("No OCR results to save."));
    }

    let csv = SeriesTable::from_results(results).to_csv(missing_marker);

    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(csv.as_bytes())
        .context("Failed to write CSV data")?;
    file.persist(output_path)
        .with_context(|| format!("Failed to save CSV file: {}", output_path.display()))?;

    Ok(())
}
