//! Camera calibration: geometric undistortion and photometric correction.
//!
//! The [`Undistorter`] is built once at startup from calibration files and
//! turns raw mono8 frames into [`CalibratedImage`]s ready for engine
//! ingestion. Construction is the only fallible step; a malformed
//! calibration input aborts startup (see [`CalibError`]).

pub mod image;
pub mod photometric;
pub mod undistort;

pub use image::{CalibratedImage, RawImage};
pub use photometric::PhotometricCalib;
pub use undistort::Undistorter;

use std::path::PathBuf;

use thiserror::Error;

/// Calibration-construction failures. Fatal at startup; frame processing
/// never starts with a broken model.
#[derive(Debug, Error)]
pub enum CalibError {
    #[error("failed to read calibration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed calibration file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to decode vignette image {path}")]
    VignetteDecode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("vignette is {got_w}x{got_h} but calibration input is {want_w}x{want_h}")]
    VignetteSize {
        got_w: usize,
        got_h: usize,
        want_w: usize,
        want_h: usize,
    },
}
