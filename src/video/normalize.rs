//! Geometric normalization of decoded frames.
//!
//! Each frame is optionally flipped (180° rotation of the pixel grid) and
//! then rotated by an arbitrary angle about its center. The output always
//! has the input's width and height: content rotated past the edges is
//! cropped and exposed canvas is filled with black.

use image::{imageops, Rgb, RgbImage};

/// Fill for canvas exposed by a rotation.
pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Per-video frame transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTransform {
    /// Rotate by 180° first
    pub flip: bool,
    /// Then rotate counter-clockwise by this many degrees
    pub rotation_deg: f64,
}

impl FrameTransform {
    pub fn new(flip: bool, rotation_deg: f64) -> Self {
        Self { flip, rotation_deg }
    }

    pub fn is_identity(&self) -> bool {
        !self.flip && self.rotation_deg == 0.0
    }
}

/// Applies flip, then rotation, to one frame.
pub fn normalize_frame(frame: RgbImage, transform: &FrameTransform) -> RgbImage {
    if transform.is_identity() {
        return frame;
    }

    let frame = if transform.flip {
        imageops::rotate180(&frame)
    } else {
        frame
    };

    if transform.rotation_deg != 0.0 {
        rotate_about_center(&frame, transform.rotation_deg)
    } else {
        frame
    }
}

/// Rotates `img` counter-clockwise by `angle_deg` about `(w/2, h/2)`.
///
/// Every output pixel is sampled bilinearly from the inverse-rotated
/// position; neighbours outside the source count as [`BACKGROUND`].
pub fn rotate_about_center(img: &RgbImage, angle_deg: f64) -> RgbImage {
    let (width, height) = img.dimensions();
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let src_x = cos * dx - sin * dy + cx;
        let src_y = sin * dx + cos * dy + cy;
        sample_bilinear(img, src_x, src_y)
    })
}

fn sample_bilinear(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1.0, y0, fx * (1.0 - fy)),
        (x0, y0 + 1.0, (1.0 - fx) * fy),
        (x0 + 1.0, y0 + 1.0, fx * fy),
    ];

    let mut acc = [0.0f64; 3];
    for (tx, ty, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        let pixel = pixel_or_background(img, tx, ty);
        for (channel, value) in acc.iter_mut().zip(pixel.0) {
            *channel += weight * value as f64;
        }
    }

    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}

fn pixel_or_background(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
        return BACKGROUND;
    }
    *img.get_pixel(x as u32, y as u32)
}

/// Frame iterator adapter that normalizes every frame it yields.
pub struct NormalizedFrames<I> {
    inner: I,
    transform: FrameTransform,
}

impl<I> Iterator for NormalizedFrames<I>
where
    I: Iterator<Item = RgbImage>,
{
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        self.inner
            .next()
            .map(|frame| normalize_frame(frame, &self.transform))
    }
}

/// Wraps a frame sequence so each frame is flipped/rotated on the way out.
pub fn normalize_frames<I>(frames: I, transform: FrameTransform) -> NormalizedFrames<I::IntoIter>
where
    I: IntoIterator<Item = RgbImage>,
{
    NormalizedFrames {
        inner: frames.into_iter(),
        transform,
    }
}
