//! Region of interest in frame pixel coordinates.
//!
//! An ROI is an axis-aligned rectangle with its origin at the top-left
//! corner. It can be built from two arbitrary corner points (the order in
//! which they were picked does not matter) and is clamped against the frame
//! it is applied to.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle over frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    /// X position of the top-left corner
    pub x: u32,
    /// Y position of the top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds an ROI from two corner points picked in any order.
    ///
    /// Coordinates are truncated toward zero and negative values are clamped
    /// to zero, so the origin is always the top-left corner.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let (x0, x1) = (a.0.min(b.0).max(0.0), a.0.max(b.0).max(0.0));
        let (y0, y1) = (a.1.min(b.1).max(0.0), a.1.max(b.1).max(0.0));

        Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    /// Returns true if the rectangle covers at least one pixel.
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamps the rectangle to a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the rectangle is left inside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Roi> {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        let width = self.width.min(frame_width - x);
        let height = self.height.min(frame_height - y);

        let clamped = Roi { x, y, width, height };
        clamped.has_area().then_some(clamped)
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}
