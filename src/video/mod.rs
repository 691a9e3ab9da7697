pub mod decoder;
pub mod normalize;
pub mod probe;

pub use decoder::FfmpegSource;
pub use normalize::{normalize_frames, FrameTransform, NormalizedFrames};
pub use probe::VideoInfo;

use anyhow::Result;
use image::RgbImage;
use std::path::Path;

/// Lazily decoded frames of one video, in decode order.
pub type Frames<'a> = Box<dyn Iterator<Item = RgbImage> + Send + 'a>;

/// Decodes video files into RGB frames.
///
/// Implementations never fail on `frames`: an unreadable source yields an
/// empty (or truncated) sequence and it is up to the caller to notice.
pub trait FrameSource: Send + Sync {
    /// Reads frame size and frame count without decoding.
    fn probe(&self, path: &Path) -> Result<VideoInfo>;

    /// Opens the video and returns its frames.
    fn frames(&self, path: &Path) -> Frames<'_>;
}

/// Opens a video and applies the flip/rotation to every frame.
pub fn open_normalized<'a>(
    source: &'a dyn FrameSource,
    path: &Path,
    transform: FrameTransform,
) -> NormalizedFrames<Frames<'a>> {
    normalize_frames(source.frames(path), transform)
}

/// Decodes and normalizes only the first frame, if there is one.
pub fn first_frame(
    source: &dyn FrameSource,
    path: &Path,
    transform: FrameTransform,
) -> Option<RgbImage> {
    open_normalized(source, path, transform).next()
}
