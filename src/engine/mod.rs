//! The tracking-engine contract.
//!
//! The odometry engine itself is an external collaborator; this module pins
//! down exactly what the bridge consumes and produces: calibrated frames and
//! a frame index go in, a pose estimate and a per-point tracking snapshot
//! come out. [`session::EngineSession`] owns the live instance and the
//! rebuild protocol.

pub mod passthrough;
pub mod session;
#[cfg(test)]
pub(crate) mod testkit;

use std::sync::Arc;

use anyhow::Result;

use crate::calib::CalibratedImage;
use crate::config::{PhotometricMode, Settings};
use crate::geometry::SE3;
use crate::output::OutputSubscriber;

pub use passthrough::{PassthroughEngine, PassthroughFactory};
pub use session::EngineSession;

/// Tracking classification of a point in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    /// Traced well and good.
    Good,
    /// Out of bounds: landed outside the image.
    OutOfBounds,
    /// Energy too high: probably an occlusion or a bad match.
    Outlier,
    /// Search interval too short, skipped this frame.
    Skipped,
    /// Tracing was ill-conditioned.
    BadCondition,
    /// Not traced yet.
    Uninitialized,
}

impl PointStatus {
    /// Visualization color, r,g,b. Exhaustive on purpose: a new status is a
    /// compile error here, not a silently unpainted point.
    pub fn color(self) -> [u8; 3] {
        match self {
            PointStatus::Good => [0, 255, 0],
            PointStatus::OutOfBounds => [255, 0, 0],
            PointStatus::Outlier => [0, 0, 255],
            PointStatus::Skipped => [255, 255, 0],
            PointStatus::BadCondition => [255, 255, 255],
            PointStatus::Uninitialized => [0, 0, 0],
        }
    }
}

/// A tracked point at sub-pixel image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPoint {
    pub u: f32,
    pub v: f32,
    pub status: PointStatus,
}

/// The engine's read-only state for its most recent frame: the dense
/// intensity buffer (channel 0 of each triple; the other two carry engine
/// internals) plus the tracked-point list.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub width: usize,
    pub height: usize,
    /// Row-major, `len == width * height`, indexed `row * width + col`.
    pub intensity: Vec<[f32; 3]>,
    pub points: Vec<TrackedPoint>,
}

/// Non-default engine settings applied at startup and re-applied on every
/// rebuild. Numeric defaults follow the classic DSO streaming setup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// False selects streaming (non-linearized) operation.
    pub linearize_operation: bool,
    pub desired_immature_density: f32,
    pub desired_point_density: f32,
    pub min_frames: usize,
    pub max_frames: usize,
    pub max_opt_iterations: usize,
    pub min_opt_iterations: usize,
    pub kf_global_weight: f64,
    /// Use the photometric model (off for modes 1 and 2).
    pub photometric_calibration: bool,
    /// Affine brightness a/b: negative fixes the term, non-negative
    /// optimizes it with that prior weight.
    pub affine_opt_mode_a: f64,
    pub affine_opt_mode_b: f64,
    pub min_grad_hist_add: f32,
    pub engine_logging: bool,
    pub multithreading: bool,
    /// Inverse response from the undistorter, when one was loaded.
    pub response: Option<Box<[f32; 256]>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            linearize_operation: false,
            desired_immature_density: 1000.0,
            desired_point_density: 1200.0,
            min_frames: 5,
            max_frames: 7,
            max_opt_iterations: 4,
            min_opt_iterations: 1,
            kf_global_weight: 1.3,
            photometric_calibration: true,
            affine_opt_mode_a: 1e12,
            affine_opt_mode_b: 1e8,
            min_grad_hist_add: 7.0,
            engine_logging: false,
            multithreading: true,
            response: None,
        }
    }
}

impl EngineConfig {
    /// Derive the engine configuration from parsed settings plus the
    /// undistorter's photometric response.
    pub fn from_settings(settings: &Settings, response: Option<&[f32; 256]>) -> Self {
        let mut config = Self {
            engine_logging: !settings.no_log,
            multithreading: !settings.no_multithreading,
            response: response.map(|r| Box::new(*r)),
            ..Self::default()
        };

        match settings.mode {
            PhotometricMode::Calibrated => {}
            PhotometricMode::Uncalibrated => {
                config.photometric_calibration = false;
                config.affine_opt_mode_a = 0.0;
                config.affine_opt_mode_b = 0.0;
            }
            PhotometricMode::PerfectImages => {
                config.photometric_calibration = false;
                config.affine_opt_mode_a = -1.0;
                config.affine_opt_mode_b = -1.0;
                config.min_grad_hist_add = 3.0;
            }
        }
        config
    }
}

/// One live engine instance. Not safe for concurrent ingestion; the frame
/// worker is the single caller.
pub trait TrackingEngine: Send {
    /// Apply non-default settings. Called once right after construction,
    /// before any frame is ingested.
    fn configure(&mut self, config: &EngineConfig);

    /// Attach the output subscribers this instance should notify.
    fn set_subscribers(&mut self, subscribers: Vec<Arc<dyn OutputSubscriber>>);

    /// Feed one calibrated frame. `frame_id` is pipeline state and keeps
    /// counting across engine rebuilds.
    fn ingest(&mut self, frame: CalibratedImage, frame_id: usize) -> Result<()>;

    /// The most recent frame snapshot, or `None` until the engine has
    /// buffered enough frames to produce one.
    fn frame_snapshot(&self) -> Option<&FrameSnapshot>;

    /// The most recent pose estimate, or `None` if there is none yet.
    /// Absence means "skip publishing this frame", never an error.
    fn latest_pose(&self) -> Option<SE3>;
}

/// Builds fresh engine instances: once at startup and once per reset.
pub trait EngineFactory: Send {
    fn build(&self) -> Result<Box<dyn TrackingEngine>>;
}
