//! JSON export of a result set.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::batch::ResultSet;

/// Export the result set to a JSON file.
///
/// The output is pretty-printed for human readability: an array of
/// `{ "video": ..., "readings": [...] }` objects in run order.
pub fn export_to_json(results: &ResultSet, output_path: &Path) -> Result<()> {
    if results.is_empty() {
        return Err(anyhow!("No OCR results to save."));
    }

    let json =
        serde_json::to_string_pretty(results).context("Failed to serialize results to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_export_to_json() {
        let mut results = ResultSet::new();
        results.insert(PathBuf::from("a.mp4"), vec![12.5, 13.0]);
        results.insert(PathBuf::from("b.mp4"), vec![]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");

        export_to_json(&results, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["video"], "a.mp4");
        assert_eq!(value[0]["readings"][0], 12.5);
        assert_eq!(value[1]["readings"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_export_empty_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");

        assert!(export_to_json(&ResultSet::new(), &path).is_err());
        assert!(!path.exists());
    }
}
