//! Frame decoding through an ffmpeg subprocess.
//!
//! ffmpeg writes raw RGB24 frames to stdout; each frame is exactly
//! `width * height * 3` bytes, so frames are read one at a time as they
//! are consumed.

use anyhow::Result;
use image::RgbImage;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use super::probe::{probe_video, VideoInfo};
use super::{FrameSource, Frames};

/// Decodes videos with the `ffmpeg`/`ffprobe` executables on PATH.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegSource;

impl FrameSource for FfmpegSource {
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        probe_video(path)
    }

    fn frames(&self, path: &Path) -> Frames<'_> {
        let info = match probe_video(path) {
            Ok(info) => info,
            Err(e) => {
                crate::log(&format!("Cannot open {}: {}", path.display(), e));
                return Box::new(std::iter::empty());
            }
        };

        match FrameReader::spawn(path, info) {
            Ok(reader) => Box::new(reader),
            Err(e) => {
                crate::log(&format!("Cannot decode {}: {}", path.display(), e));
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Iterator over the frames produced by a running ffmpeg process.
pub struct FrameReader {
    child: Child,
    stdout: Option<ChildStdout>,
    width: u32,
    height: u32,
    frame_len: usize,
}

impl FrameReader {
    fn spawn(path: &Path, info: VideoInfo) -> Result<Self> {
        // -noautorotate keeps the decoded size equal to the probed size
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take();

        Ok(Self {
            child,
            stdout,
            width: info.width,
            height: info.height,
            frame_len: info.width as usize * info.height as usize * 3,
        })
    }

    /// Stops reading and reaps the ffmpeg process.
    fn finish(&mut self) {
        if self.stdout.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl Iterator for FrameReader {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        let stdout = self.stdout.as_mut()?;
        let mut buf = vec![0u8; self.frame_len];

        // A short read means end of stream or a decode error; either way the
        // sequence ends here.
        if stdout.read_exact(&mut buf).is_err() {
            self.finish();
            return None;
        }

        let frame = RgbImage::from_raw(self.width, self.height, buf);
        if frame.is_none() {
            self.finish();
        }
        frame
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mp4");

        let source = FfmpegSource;
        assert_eq!(source.frames(&path).count(), 0);
        assert!(source.probe(&path).is_err());
    }
}
