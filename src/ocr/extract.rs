use anyhow::Result;
use image::RgbImage;
use regex::Regex;

use super::engine::{OcrEngine, OcrFragment};
use super::preprocess::crop_roi;
use crate::config::OcrSettings;
use crate::roi::Roi;

/// Signed decimal number: 12, 12.5, .5, 12., -3.25
const NUMBER_PATTERN: &str = r"^[+-]?(\d+\.?\d*|\.\d+)$";

/// Why a frame produced no reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The ROI does not overlap the frame
    EmptyRegion,
    /// No scored fragment came back from the engine
    NoFragments,
    /// The first scored fragment was not above the threshold
    LowConfidence { text: String, confidence: f32 },
    /// The first scored fragment is not a number
    Unparseable { text: String, confidence: f32 },
    /// The engine call itself failed
    EngineFailed(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EmptyRegion => write!(f, "ROI outside frame"),
            Rejection::NoFragments => write!(f, "no text"),
            Rejection::LowConfidence { text, confidence } => {
                write!(f, "low confidence {:.1} for {:?}", confidence, text)
            }
            Rejection::Unparseable { text, confidence } => {
                write!(f, "not a number: {:?} (conf {:.1})", text, confidence)
            }
            Rejection::EngineFailed(msg) => write!(f, "OCR failed: {}", msg),
        }
    }
}

/// Result of reading one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Accepted { value: f64, confidence: f32 },
    Rejected(Rejection),
}

impl FrameOutcome {
    /// The accepted value, if any.
    #[cfg(test)]
    pub fn reading(&self) -> Option<f64> {
        match self {
            FrameOutcome::Accepted { value, .. } => Some(*value),
            FrameOutcome::Rejected(_) => None,
        }
    }
}

/// Turns OCR text into numbers.
pub struct ReadingParser {
    number: Regex,
}

impl ReadingParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            number: Regex::new(NUMBER_PATTERN)?,
        })
    }

    /// Parses OCR text as a finite real number.
    pub fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if !self.number.is_match(text) {
            return None;
        }
        text.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Picks the reading out of the engine's fragments.
///
/// Unscored fragments are dropped, then only the first remaining one counts:
/// it is accepted if its confidence is strictly above `threshold` and its
/// text parses as a number.
pub fn select_reading(
    fragments: &[OcrFragment],
    threshold: f32,
    parser: &ReadingParser,
) -> FrameOutcome {
    let Some(first) = fragments.iter().find(|f| f.is_scored()) else {
        return FrameOutcome::Rejected(Rejection::NoFragments);
    };

    if first.confidence <= threshold {
        return FrameOutcome::Rejected(Rejection::LowConfidence {
            text: first.text.clone(),
            confidence: first.confidence,
        });
    }

    match parser.parse(&first.text) {
        Some(value) => FrameOutcome::Accepted {
            value,
            confidence: first.confidence,
        },
        None => FrameOutcome::Rejected(Rejection::Unparseable {
            text: first.text.clone(),
            confidence: first.confidence,
        }),
    }
}

/// Reads the number shown inside an ROI, one frame at a time.
///
/// Holds no state between frames.
pub struct RegionExtractor<'a> {
    engine: &'a dyn OcrEngine,
    settings: &'a OcrSettings,
    parser: ReadingParser,
}

impl<'a> RegionExtractor<'a> {
    pub fn new(engine: &'a dyn OcrEngine, settings: &'a OcrSettings) -> Result<Self> {
        Ok(Self {
            engine,
            settings,
            parser: ReadingParser::new()?,
        })
    }

    /// Crops `frame` to `roi`, runs OCR on the crop and applies the
    /// confidence gate.
    pub fn read_frame(&self, frame: &RgbImage, roi: &Roi) -> FrameOutcome {
        let Some(crop) = crop_roi(frame, roi) else {
            return FrameOutcome::Rejected(Rejection::EmptyRegion);
        };

        match self.engine.recognize(&crop, &self.settings.whitelist) {
            Ok(fragments) => {
                select_reading(&fragments, self.settings.confidence_threshold, &self.parser)
            }
            Err(e) => FrameOutcome::Rejected(Rejection::EngineFailed(e.to_string())),
        }
    }
}
