//! ROI previews for the binding phase.
//!
//! Draws the bound region onto the first normalized frame of each video so
//! the user can check the placement before running a batch.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

use crate::config::JobConfig;
use crate::roi::Roi;
use crate::video::{first_frame, FrameSource, FrameTransform};

pub const COLOR_ROI: Rgb<u8> = Rgb([0, 255, 0]);
const ROI_THICKNESS: u32 = 2;

/// Draws a rectangle outline on an image. Edges outside the image are cut.
pub fn draw_rect(img: &mut RgbImage, roi: &Roi, color: Rgb<u8>, thickness: u32) {
    let (img_w, img_h) = img.dimensions();
    let (x, y, w, h) = (roi.x, roi.y, roi.width, roi.height);

    let mut put = |px: u32, py: u32| {
        if px < img_w && py < img_h {
            img.put_pixel(px, py, color);
        }
    };

    for d in 0..thickness.min(h) {
        for dx in 0..w {
            put(x + dx, y + d);
            put(x + dx, y + h - 1 - d);
        }
    }

    for d in 0..thickness.min(w) {
        for dy in 0..h {
            put(x + d, y + dy);
            put(x + w - 1 - d, y + dy);
        }
    }
}

/// Returns a copy of `frame` with the ROI outlined.
pub fn render_roi_preview(frame: &RgbImage, roi: &Roi) -> RgbImage {
    let mut img = frame.clone();
    draw_rect(&mut img, roi, COLOR_ROI, ROI_THICKNESS);
    img
}

/// `<nn>_<stem>_roi.png`, numbered by the video's position in the job.
fn preview_file_name(index: usize, video: &Path) -> String {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    format!("{:02}_{}_roi.png", index + 1, stem)
}

/// Writes `<nn>_<name>_roi.png` for every included video into `out_dir`.
///
/// Videos without a usable ROI get the plain first frame so the user can
/// pick coordinates from it. Videos that decode no frame are reported and
/// skipped. Returns the written paths.
pub fn write_previews(
    job: &JobConfig,
    source: &dyn FrameSource,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (index, entry) in job.videos.iter().enumerate().filter(|(_, v)| v.include) {
        let transform = FrameTransform::new(entry.flip, entry.rotation_deg);
        let Some(frame) = first_frame(source, &entry.path, transform) else {
            crate::log(&format!("{}: no frame decoded, no preview", entry.path.display()));
            continue;
        };

        let roi = entry
            .roi
            .as_ref()
            .and_then(|spec| spec.resolve())
            .and_then(|roi| roi.clamp_to(frame.width(), frame.height()));

        let img = match &roi {
            Some(roi) => render_roi_preview(&frame, roi),
            None => {
                crate::log(&format!(
                    "{}: no usable ROI, frame is {}x{}",
                    entry.path.display(),
                    frame.width(),
                    frame.height()
                ));
                frame
            }
        };

        let path = out_dir.join(preview_file_name(index, &entry.path));
        img.save(&path)
            .with_context(|| format!("Failed to save preview: {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::FakeSource;
    use crate::config::{RoiSpec, VideoEntry};
    use tempfile::tempdir;

    #[test]
    fn test_draw_rect_outline_only() {
        let mut img = RgbImage::new(10, 10);
        draw_rect(&mut img, &Roi::new(2, 2, 5, 4), COLOR_ROI, 1);

        assert_eq!(*img.get_pixel(2, 2), COLOR_ROI);
        assert_eq!(*img.get_pixel(6, 5), COLOR_ROI);
        assert_eq!(*img.get_pixel(4, 2), COLOR_ROI);
        assert_eq!(*img.get_pixel(4, 3), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(7, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_rect_past_edge() {
        let mut img = RgbImage::new(10, 10);
        draw_rect(&mut img, &Roi::new(8, 8, 5, 5), COLOR_ROI, 2);
        assert_eq!(*img.get_pixel(9, 9), COLOR_ROI);
    }

    #[test]
    fn test_preview_file_name() {
        assert_eq!(preview_file_name(0, Path::new("rec/meter.mov")), "01_meter_roi.png");
    }

    #[test]
    fn test_write_previews() {
        let source = FakeSource::new(20, 10)
            .with_video("a.mp4", vec![Some(125)])
            .with_video("b.mp4", vec![Some(125)])
            .with_video("c.mp4", vec![Some(125)]);

        let mut a = VideoEntry::new("a.mp4");
        a.roi = Some(RoiSpec::Corners {
            corners: [[12.0, 8.0], [2.0, 1.0]],
        });
        let b = VideoEntry::new("b.mp4");
        let mut c = VideoEntry::new("c.mp4");
        c.include = false;

        let job = JobConfig {
            videos: vec![a, b, c],
            ..JobConfig::default()
        };

        let dir = tempdir().unwrap();
        let written = write_previews(&job, &source, dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("01_a_roi.png").exists());
        assert!(dir.path().join("02_b_roi.png").exists());
        assert!(!dir.path().join("03_c_roi.png").exists());

        let preview = image::open(dir.path().join("01_a_roi.png")).unwrap().to_rgb8();
        assert_eq!(*preview.get_pixel(2, 1), COLOR_ROI);
    }

    #[test]
    fn test_same_stem_in_different_folders_gets_two_previews() {
        let source = FakeSource::new(20, 10)
            .with_video("day1/meter.mp4", vec![Some(125)])
            .with_video("day2/meter.mp4", vec![Some(125)]);
        let job = JobConfig {
            videos: vec![
                VideoEntry::new("day1/meter.mp4"),
                VideoEntry::new("day2/meter.mp4"),
            ],
            ..JobConfig::default()
        };

        let dir = tempdir().unwrap();
        let written = write_previews(&job, &source, dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_ne!(written[0], written[1]);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_write_previews_skips_undecodable() {
        let source = FakeSource::new(20, 10);
        let job = JobConfig {
            videos: vec![VideoEntry::new("missing.mp4")],
            ..JobConfig::default()
        };

        let dir = tempdir().unwrap();
        let written = write_previews(&job, &source, dir.path()).unwrap();
        assert!(written.is_empty());
    }
}
