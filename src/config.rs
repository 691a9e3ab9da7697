//! Job configuration.
//!
//! A job file lists the videos to read, how each one is normalized, where
//! its numeric display is (the ROI), and the OCR and export settings shared
//! by the whole batch.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::roi::Roi;

/// Characters the OCR engine may return.
pub const DIGIT_WHITELIST: &str = "0123456789.";

/// Minimum OCR confidence (exclusive, 0-100 scale) for a reading to be accepted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 70.0;

/// ROI as written in the job file.
///
/// Either an explicit rectangle or the two corner points picked on the
/// first frame, in whichever order they were clicked. Coordinates may be
/// fractional and are truncated to whole pixels. Anything else is kept as
/// `Invalid` so one bad entry does not reject the whole job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoiSpec {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Corners {
        corners: [[f64; 2]; 2],
    },
    Invalid(serde_json::Value),
}

impl RoiSpec {
    /// Resolves into a pixel rectangle.
    ///
    /// Returns `None` for malformed rectangles (negative origin, empty area)
    /// and for unrecognized shapes.
    pub fn resolve(&self) -> Option<Roi> {
        let roi = match *self {
            RoiSpec::Rect {
                x,
                y,
                width,
                height,
            } => {
                if x < 0.0 || y < 0.0 || width <= 0.0 || height <= 0.0 {
                    return None;
                }
                Roi::new(x as u32, y as u32, width as u32, height as u32)
            }
            RoiSpec::Corners { corners: [a, b] } => {
                Roi::from_corners((a[0], a[1]), (b[0], b[1]))
            }
            RoiSpec::Invalid(_) => return None,
        };
        roi.has_area().then_some(roi)
    }
}

/// One video in the job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoEntry {
    /// Path to the video file
    pub path: PathBuf,
    /// Whether this video takes part in the next batch run
    #[serde(default = "default_true")]
    pub include: bool,
    /// Rotate each frame by 180° before anything else
    #[serde(default = "default_true")]
    pub flip: bool,
    /// Counter-clockwise rotation in degrees, applied after the flip
    #[serde(default)]
    pub rotation_deg: f64,
    /// Where the numeric display is; unset until the user has picked it
    #[serde(default)]
    pub roi: Option<RoiSpec>,
}

impl VideoEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include: true,
            flip: true,
            rotation_deg: 0.0,
            roi: None,
        }
    }
}

/// Tesseract settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract language (traineddata name)
    pub language: String,
    /// Page segmentation mode (13 = raw line)
    pub page_seg_mode: u8,
    /// OCR engine mode (3 = default)
    pub engine_mode: u8,
    pub whitelist: String,
    /// Readings are accepted only above this confidence
    pub confidence_threshold: f32,
    /// Explicit tesseract executable, otherwise searched on PATH
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    /// Base URL to download `<language>.traineddata` from
    pub traineddata_url: Option<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "sev_seg4".to_string(),
            page_seg_mode: 13,
            engine_mode: 3,
            whitelist: DIGIT_WHITELIST.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            tesseract_path: None,
            tessdata_dir: None,
            traineddata_url: None,
        }
    }
}

/// Export settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Cell text used to pad shorter series in the table export
    pub missing_marker: String,
    /// Also render one PNG line chart per video
    pub charts: bool,
}

/// Complete job description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub export: ExportSettings,
    /// Rough processing cost per frame, used only for the duration estimate
    #[serde(default = "default_seconds_per_frame")]
    pub seconds_per_frame: f64,
}

fn default_true() -> bool {
    true
}

fn default_seconds_per_frame() -> f64 {
    0.5
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            videos: Vec::new(),
            ocr: OcrSettings::default(),
            export: ExportSettings::default(),
            seconds_per_frame: default_seconds_per_frame(),
        }
    }
}

impl JobConfig {
    /// Parses a job from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse job file")
    }
}

/// Loads the job file.
///
/// Unlike the OCR and export sections, the video list has no sensible
/// default, so a missing or unreadable file is an error.
pub fn load_job(path: &Path) -> Result<JobConfig> {
    crate::log(&format!("Loading job from: {}", path.display()));

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {}", path.display()))?;
    let job = JobConfig::from_json(&contents)?;

    crate::log(&format!(
        "Job loaded: {} videos ({} included)",
        job.videos.len(),
        job.videos.iter().filter(|v| v.include).count()
    ));

    Ok(job)
}
