use image::RgbImage;

use crate::roi::Roi;

/// Crops the ROI out of a frame.
///
/// The ROI is clamped to the frame bounds first. Returns `None` when nothing
/// of it lies inside the frame.
pub fn crop_roi(frame: &RgbImage, roi: &Roi) -> Option<RgbImage> {
    let (w, h) = frame.dimensions();
    let r = roi.clamp_to(w, h)?;

    Some(image::imageops::crop_imm(frame, r.x, r.y, r.width, r.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_roi() {
        // 100x200 frame
        let frame = RgbImage::from_fn(100, 200, |x, y| Rgb([x as u8, y as u8, 0]));

        let cropped = crop_roi(&frame, &Roi::new(10, 50, 50, 20)).unwrap();

        assert_eq!(cropped.dimensions(), (50, 20));
        // Top-left pixel should be (10, 50) from original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_roi_clamps() {
        let frame = RgbImage::new(100, 100);
        let cropped = crop_roi(&frame, &Roi::new(90, 90, 50, 50)).unwrap();

        // Should clamp to 10x10 (remaining pixels)
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_crop_roi_outside_frame() {
        let frame = RgbImage::new(100, 100);
        assert!(crop_roi(&frame, &Roi::new(100, 0, 10, 10)).is_none());
    }
}
