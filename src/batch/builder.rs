use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

use super::plan::{BatchPlan, BoundVideo};
use super::progress::{format_duration, start_message, StatusReporter};
use crate::ocr::{FrameOutcome, OcrEngine, Rejection, RegionExtractor};
use crate::roi::Roi;
use crate::video::{open_normalized, FrameSource};

/// Accepted readings of one video, in frame order. Rejected frames are
/// left out, so a series can be shorter than the video.
pub type Series = Vec<f64>;

/// One video's series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesEntry {
    pub video: PathBuf,
    pub readings: Series,
}

/// Series of every video read in one batch run.
///
/// Entries are kept in the order they were inserted; inserting a video that
/// is already present replaces its series.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: Vec<SeriesEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one complete series.
    pub fn insert(&mut self, video: PathBuf, readings: Series) {
        match self.entries.iter_mut().find(|e| e.video == video) {
            Some(existing) => existing.readings = readings,
            None => self.entries.push(SeriesEntry { video, readings }),
        }
    }

    #[cfg(test)]
    pub fn get(&self, video: &std::path::Path) -> Option<&Series> {
        self.entries
            .iter()
            .find(|e| e.video == video)
            .map(|e| &e.readings)
    }

    #[cfg(test)]
    pub fn contains(&self, video: &std::path::Path) -> bool {
        self.get(video).is_some()
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest series (0 for an empty set).
    pub fn max_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.readings.len())
            .max()
            .unwrap_or(0)
    }
}

/// Counts collected while building one series.
#[derive(Debug, Default)]
struct SeriesStats {
    frames: u64,
    engine_failures: u64,
}

/// Reads every frame through `roi` and collects the accepted readings.
fn build_series<I>(
    frames: I,
    roi: &Roi,
    extractor: &RegionExtractor,
) -> (Series, SeriesStats)
where
    I: IntoIterator<Item = RgbImage>,
{
    let mut series = Series::new();
    let mut stats = SeriesStats::default();

    for frame in frames {
        stats.frames += 1;
        match extractor.read_frame(&frame, roi) {
            FrameOutcome::Accepted { value, confidence } => {
                crate::log(&format!(
                    "Frame {}: detected value {} with confidence {:.1}",
                    stats.frames, value, confidence
                ));
                series.push(value);
            }
            FrameOutcome::Rejected(Rejection::EngineFailed(msg)) => {
                stats.engine_failures += 1;
                crate::log(&format!("Frame {}: OCR failed: {}", stats.frames, msg));
            }
            FrameOutcome::Rejected(_) => {}
        }
    }

    (series, stats)
}

/// Decodes, normalizes and reads one video.
fn read_video(
    video: &BoundVideo,
    source: &dyn FrameSource,
    extractor: &RegionExtractor,
) -> Series {
    let frames = open_normalized(source, &video.source.path, video.source.transform);
    let (series, stats) = build_series(frames, &video.roi, extractor);

    if stats.frames == 0 {
        crate::log(&format!("{}: no frames decoded", video.source.path.display()));
    }
    if stats.engine_failures > 0 {
        crate::log(&format!(
            "{}: OCR failed on {} of {} frames",
            video.source.path.display(),
            stats.engine_failures,
            stats.frames
        ));
    }

    series
}

/// Runs extraction over every video of the plan, one after another.
///
/// Each video contributes exactly one complete series to the returned set.
/// A video that panics mid-read is reported and contributes nothing; the
/// remaining videos are still processed.
pub fn run_batch(
    plan: &BatchPlan,
    source: &dyn FrameSource,
    engine: &dyn OcrEngine,
    reporter: &dyn StatusReporter,
) -> Result<ResultSet> {
    let extractor = RegionExtractor::new(engine, &plan.ocr)?;
    let started = Instant::now();
    let mut results = ResultSet::new();
    let count = plan.videos.len();

    reporter.report(&start_message(
        count,
        plan.total_frames(),
        plan.seconds_per_frame,
    ));

    for (index, video) in plan.videos.iter().enumerate() {
        let name = video.source.display_name();
        reporter.report(&format!(
            "Reading {} ({}/{}), ROI {}",
            name,
            index + 1,
            count,
            video.roi
        ));

        let outcome = catch_unwind(AssertUnwindSafe(|| read_video(video, source, &extractor)));
        match outcome {
            Ok(series) => {
                reporter.report(&format!("{}: {} readings", name, series.len()));
                results.insert(video.source.path.clone(), series);
            }
            Err(_) => {
                reporter.report(&format!("{}: reading failed, no series recorded", name));
            }
        }
    }

    reporter.report(&format!(
        "Batch finished in {}. Save the data, or view it as a list.",
        format_duration(started.elapsed().as_secs_f64())
    ));

    Ok(results)
}
