//! ROI binding: the phase that runs before extraction.
//!
//! Every included video gets its ROI resolved and checked against the
//! video's frame size here. Only once the whole plan is built does the
//! extraction phase start, so nothing waits on user input mid-run.

use std::path::PathBuf;

use super::progress::StatusReporter;
use crate::config::{JobConfig, OcrSettings};
use crate::roi::Roi;
use crate::video::{FrameSource, FrameTransform};

/// A video selected for reading.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSource {
    pub path: PathBuf,
    pub transform: FrameTransform,
    /// Frame count from the container, for progress only (0 if unknown)
    pub total_frames: u64,
}

impl VideoSource {
    /// File name used in listings and logs.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A video together with the ROI it is read through.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundVideo {
    pub source: VideoSource,
    pub roi: Roi,
}

/// Why an included video was left out of the run.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// No ROI has been picked for this video
    MissingRoi,
    /// The ROI has a negative origin or no area
    MalformedRoi,
    /// The ROI lies entirely outside the frame
    RoiOutsideFrame { width: u32, height: u32 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingRoi => write!(f, "no ROI selected"),
            SkipReason::MalformedRoi => write!(f, "ROI is empty or malformed"),
            SkipReason::RoiOutsideFrame { width, height } => {
                write!(f, "ROI lies outside the {}x{} frame", width, height)
            }
        }
    }
}

/// Everything the extraction phase needs.
#[derive(Clone, Debug)]
pub struct BatchPlan {
    /// Videos to read, in job order
    pub videos: Vec<BoundVideo>,
    /// Included videos that will not be read
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub ocr: OcrSettings,
    pub seconds_per_frame: f64,
}

impl BatchPlan {
    /// Sum of the known frame counts of all bound videos.
    pub fn total_frames(&self) -> u64 {
        self.videos.iter().map(|v| v.source.total_frames).sum()
    }
}

/// Resolves and validates the ROI of every included video.
///
/// Videos whose source cannot be probed keep their ROI unvalidated; reading
/// them later simply produces no frames.
pub fn bind_rois(
    job: &JobConfig,
    source: &dyn FrameSource,
    reporter: &dyn StatusReporter,
) -> BatchPlan {
    let mut videos = Vec::new();
    let mut skipped = Vec::new();

    for entry in job.videos.iter().filter(|v| v.include) {
        let Some(spec) = &entry.roi else {
            skipped.push((entry.path.clone(), SkipReason::MissingRoi));
            continue;
        };
        let Some(mut roi) = spec.resolve() else {
            skipped.push((entry.path.clone(), SkipReason::MalformedRoi));
            continue;
        };

        let total_frames = match source.probe(&entry.path) {
            Ok(info) => {
                // Flip and rotation keep the frame size, so the probed size applies
                let Some(clamped) = roi.clamp_to(info.width, info.height) else {
                    skipped.push((
                        entry.path.clone(),
                        SkipReason::RoiOutsideFrame {
                            width: info.width,
                            height: info.height,
                        },
                    ));
                    continue;
                };
                if clamped != roi {
                    crate::log(&format!(
                        "{}: ROI {} clamped to {}",
                        entry.path.display(),
                        roi,
                        clamped
                    ));
                    roi = clamped;
                }
                crate::log(&format!(
                    "{}: {}x{}, {} frames at {:.2} fps",
                    entry.path.display(),
                    info.width,
                    info.height,
                    info.frame_count,
                    info.frame_rate
                ));
                info.frame_count
            }
            Err(e) => {
                crate::log(&format!(
                    "{}: cannot probe video ({}), ROI not validated",
                    entry.path.display(),
                    e
                ));
                0
            }
        };

        videos.push(BoundVideo {
            source: VideoSource {
                path: entry.path.clone(),
                transform: FrameTransform::new(entry.flip, entry.rotation_deg),
                total_frames,
            },
            roi,
        });
    }

    for (path, reason) in &skipped {
        reporter.report(&format!("Skipping {}: {}", path.display(), reason));
    }

    BatchPlan {
        videos,
        skipped,
        ocr: job.ocr.clone(),
        seconds_per_frame: job.seconds_per_frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::progress::tests::MemoryReporter;
    use crate::batch::tests::FakeSource;
    use crate::config::{RoiSpec, VideoEntry};

    fn entry(path: &str, roi: Option<RoiSpec>) -> VideoEntry {
        VideoEntry {
            roi,
            ..VideoEntry::new(path)
        }
    }

    fn rect(x: u32, y: u32, width: u32, height: u32) -> Option<RoiSpec> {
        Some(RoiSpec::Rect {
            x: f64::from(x),
            y: f64::from(y),
            width: f64::from(width),
            height: f64::from(height),
        })
    }

    #[test]
    fn test_bind_rois_keeps_order_and_skips() {
        let source = FakeSource::new(100, 50)
            .with_video("a.mp4", vec![None; 10])
            .with_video("b.mp4", vec![None; 5])
            .with_video("c.mp4", vec![None; 3])
            .with_video("d.mp4", vec![None; 3]);

        let mut excluded = entry("d.mp4", rect(0, 0, 10, 10));
        excluded.include = false;

        let job = JobConfig {
            videos: vec![
                entry("b.mp4", rect(1, 2, 30, 10)),
                entry("c.mp4", None),
                entry("a.mp4", rect(0, 0, 10, 10)),
                excluded,
            ],
            ..JobConfig::default()
        };

        let reporter = MemoryReporter::default();
        let plan = bind_rois(&job, &source, &reporter);

        let bound: Vec<&str> = plan
            .videos
            .iter()
            .map(|v| v.source.path.to_str().unwrap())
            .collect();
        assert_eq!(bound, vec!["b.mp4", "a.mp4"]);
        assert_eq!(plan.videos[0].roi, Roi::new(1, 2, 30, 10));
        assert_eq!(plan.videos[0].source.total_frames, 5);
        assert_eq!(plan.total_frames(), 15);

        assert_eq!(
            plan.skipped,
            vec![(PathBuf::from("c.mp4"), SkipReason::MissingRoi)]
        );
        assert!(reporter.contains("Skipping c.mp4: no ROI selected"));
    }

    #[test]
    fn test_bind_rois_clamps_and_rejects_outside() {
        let source = FakeSource::new(100, 50)
            .with_video("over.mp4", vec![None; 2])
            .with_video("out.mp4", vec![None; 2]);

        let job = JobConfig {
            videos: vec![
                entry("over.mp4", rect(90, 40, 30, 30)),
                entry("out.mp4", rect(100, 10, 5, 5)),
                entry("bad.mp4", rect(0, 0, 0, 5)),
            ],
            ..JobConfig::default()
        };

        let plan = bind_rois(&job, &source, &MemoryReporter::default());

        assert_eq!(plan.videos.len(), 1);
        assert_eq!(plan.videos[0].roi, Roi::new(90, 40, 10, 10));
        assert_eq!(
            plan.skipped,
            vec![
                (
                    PathBuf::from("out.mp4"),
                    SkipReason::RoiOutsideFrame {
                        width: 100,
                        height: 50
                    }
                ),
                (PathBuf::from("bad.mp4"), SkipReason::MalformedRoi),
            ]
        );
    }

    #[test]
    fn test_unprobeable_video_is_still_bound() {
        let source = FakeSource::new(100, 50);
        let job = JobConfig {
            videos: vec![entry("missing.mp4", rect(5, 5, 10, 10))],
            ..JobConfig::default()
        };

        let plan = bind_rois(&job, &source, &MemoryReporter::default());

        assert_eq!(plan.videos.len(), 1);
        assert_eq!(plan.videos[0].source.total_frames, 0);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn test_display_name() {
        let source = VideoSource {
            path: PathBuf::from("/data/run1/clip.mp4"),
            transform: FrameTransform::default(),
            total_frames: 0,
        };
        assert_eq!(source.display_name(), "clip.mp4");
    }
}
