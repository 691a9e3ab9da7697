use anyhow::{anyhow, Result};

use crate::batch::ResultSet;

/// Formats the result set as one `<file name>: v1, v2, ...` line per video.
pub fn format_listing(results: &ResultSet) -> Result<String> {
    if results.is_empty() {
        return Err(anyhow!("No OCR results to display."));
    }

    let mut out = String::new();
    for entry in results.entries() {
        let name = entry
            .video
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| entry.video.display().to_string());
        let values: Vec<String> = entry.readings.iter().map(|v| v.to_string()).collect();

        out.push_str(&format!("{}: {}\n", name, values.join(", ")));
    }

    Ok(out)
}
