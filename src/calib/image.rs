//! Owned image buffers crossing the calibration boundary.

/// A raw mono8 frame as delivered by the image input.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    /// Row-major, one byte per pixel, `len == width * height`.
    pub data: Vec<u8>,
}

impl RawImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }
}

/// An undistorted, photometrically corrected intensity image plus its
/// exposure. Consumed by value by engine ingestion and released afterwards.
#[derive(Debug, Clone)]
pub struct CalibratedImage {
    pub width: usize,
    pub height: usize,
    /// Row-major irradiance values, `len == width * height`.
    pub intensity: Vec<f32>,
    /// Exposure time scalar; 1.0 when the stream carries no exposure data.
    pub exposure: f32,
}

impl CalibratedImage {
    pub fn new(width: usize, height: usize, intensity: Vec<f32>, exposure: f32) -> Self {
        debug_assert_eq!(intensity.len(), width * height);
        Self {
            width,
            height,
            intensity,
            exposure,
        }
    }
}
