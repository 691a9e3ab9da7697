use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use crate::config::OcrSettings;

/// Confidence reported for rows the engine did not score.
pub const NO_CONFIDENCE: f32 = -1.0;

/// One recognized piece of text with its confidence (0-100, or [`NO_CONFIDENCE`]).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f32,
}

impl OcrFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// True if the engine scored this fragment at all.
    pub fn is_scored(&self) -> bool {
        self.confidence >= 0.0
    }
}

/// An OCR backend.
///
/// Returns fragments in the engine's native order. Rows the engine did not
/// score are reported with [`NO_CONFIDENCE`] rather than dropped.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage, whitelist: &str) -> Result<Vec<OcrFragment>>;
}

/// Tesseract run as a subprocess with TSV output.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
    page_seg_mode: u8,
    engine_mode: u8,
}

impl TesseractEngine {
    /// Locates tesseract and its data for the given settings.
    ///
    /// A missing tessdata directory is not fatal here; tesseract then falls
    /// back to its compiled-in default location.
    pub fn from_settings(settings: &OcrSettings) -> Result<Self> {
        let executable = find_tesseract_executable(settings.tesseract_path.as_deref())?;
        let tessdata_dir = match find_tessdata_dir(settings) {
            Ok(dir) => Some(dir),
            Err(e) => {
                crate::log(&format!("Warning: {}", e));
                None
            }
        };

        Ok(Self {
            executable,
            tessdata_dir,
            language: settings.language.clone(),
            page_seg_mode: settings.page_seg_mode,
            engine_mode: settings.engine_mode,
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage, whitelist: &str) -> Result<Vec<OcrFragment>> {
        // Save crop to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let mut command = Command::new(&self.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        let output = command
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("--oem")
            .arg(self.engine_mode.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", whitelist))
            .arg("tsv")
            .output()
            .context("Failed to execute tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        parse_tsv_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses Tesseract TSV output into fragments, one per data row, in order.
fn parse_tsv_output(tsv: &str) -> Result<Vec<OcrFragment>> {
    let mut lines = tsv.lines();

    let header = lines.next().unwrap_or_default();
    if !header.starts_with("level") {
        return Err(anyhow!("Unexpected tesseract TSV header: {:?}", header));
    }

    let mut fragments = Vec::new();
    for line in lines {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            continue;
        }

        let confidence: f32 = fields[10].trim().parse().unwrap_or(NO_CONFIDENCE);
        let text = fields.get(11).map(|t| t.trim()).unwrap_or_default();

        fragments.push(OcrFragment::new(text, confidence));
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_keeps_order_and_sentinels() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t120\t40\t-1\t\n\
             2\t1\t1\t0\t0\t0\t4\t3\t110\t35\t-1\t\n\
             5\t1\t1\t1\t1\t1\t4\t3\t110\t35\t91.372345\t12.5\n\
             5\t1\t1\t1\t1\t2\t60\t3\t40\t35\t45.0\t7\n"
        );

        let fragments = parse_tsv_output(&tsv).unwrap();

        assert_eq!(fragments.len(), 4);
        assert!(!fragments[0].is_scored());
        assert!(!fragments[1].is_scored());
        assert_eq!(fragments[2].text, "12.5");
        assert!((fragments[2].confidence - 91.372345).abs() < 1e-4);
        assert_eq!(fragments[3], OcrFragment::new("7", 45.0));
    }

    #[test]
    fn test_parse_tsv_header_only() {
        let fragments = parse_tsv_output(&format!("{HEADER}\n")).unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_parse_tsv_missing_text_column() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t4\t3\t110\t35\t88");
        let fragments = parse_tsv_output(&tsv).unwrap();
        assert_eq!(fragments, vec![OcrFragment::new("", 88.0)]);
    }

    #[test]
    fn test_parse_tsv_rejects_garbage() {
        assert!(parse_tsv_output("Error opening data file").is_err());
    }
}
