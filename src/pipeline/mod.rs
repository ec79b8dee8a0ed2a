//! The per-frame processing pipeline and its single-consumer worker.

pub mod controller;
pub mod worker;

pub use controller::FramePipeline;
pub use worker::FrameWorker;

use thiserror::Error;

/// A raw frame violated the pipeline's input preconditions. The transport
/// layer is assumed to deliver validated mono8 images; anything else is
/// rejected up front instead of reaching the engine.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("raw frame is {got_w}x{got_h}, calibration expects {want_w}x{want_h}")]
    DimensionMismatch {
        got_w: usize,
        got_h: usize,
        want_w: usize,
        want_h: usize,
    },

    #[error("raw frame buffer holds {got} bytes, expected {want}")]
    BufferSize { got: usize, want: usize },
}
