//! Debug visualization: per-point tracking status painted over the current
//! frame, plus the bounded history of composited images.

use std::collections::VecDeque;

use image::{Rgb, RgbImage};

use crate::engine::FrameSnapshot;
use crate::transport::ColorImageMsg;

/// Gain applied to the snapshot's channel-0 intensity for the gray base.
const INTENSITY_GAIN: f32 = 0.9;

/// Filled disc of radius 2 around the rounded point center.
const DISC_OFFSETS: [(i32, i32); 13] = [
    (0, -2),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-2, 0),
    (-1, 0),
    (0, 0),
    (1, 0),
    (2, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (0, 2),
];

/// Pure snapshot-to-image renderer.
pub struct DebugCompositor;

impl DebugCompositor {
    /// Render the snapshot: grayscale base from channel-0 intensity, then
    /// one status-colored disc per tracked point, in point order (later
    /// points win shared pixels). Intensity saturates at both ends of
    /// [0, 255], never wraps.
    pub fn composite(snapshot: &FrameSnapshot) -> RgbImage {
        let (w, h) = (snapshot.width as u32, snapshot.height as u32);
        let mut img = RgbImage::new(w, h);

        for (i, px) in snapshot.intensity.iter().enumerate() {
            let c = (px[0] * INTENSITY_GAIN).clamp(0.0, 255.0) as u8;
            let x = (i % snapshot.width) as u32;
            let y = (i / snapshot.width) as u32;
            img.put_pixel(x, y, Rgb([c, c, c]));
        }

        for point in &snapshot.points {
            if !point.u.is_finite() || !point.v.is_finite() {
                continue;
            }
            let cx = (point.u + 0.5).floor() as i32;
            let cy = (point.v + 0.5).floor() as i32;
            let color = Rgb(point.status.color());
            for (dx, dy) in DISC_OFFSETS {
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }

        img
    }

    /// Flatten an image into the wire representation (rgb8).
    pub fn to_msg(img: &RgbImage) -> ColorImageMsg {
        ColorImageMsg {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }
}

/// Ring buffer of composited debug images, one per frame that yielded a
/// snapshot. Bounded so memory stays flat over unbounded streams.
pub struct DebugImageHistory {
    images: VecDeque<RgbImage>,
    capacity: usize,
}

impl DebugImageHistory {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            images: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest image, evicting the oldest at capacity.
    pub fn push(&mut self, img: RgbImage) {
        if self.images.len() == self.capacity {
            self.images.pop_front();
        }
        self.images.push_back(img);
    }

    pub fn latest(&self) -> Option<&RgbImage> {
        self.images.back()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Default for DebugImageHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
