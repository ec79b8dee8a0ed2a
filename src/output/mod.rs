//! Outward-facing products: subscriber hooks, pose messages, and the debug
//! visualization.

pub mod compositor;
pub mod pose;

pub use compositor::{DebugCompositor, DebugImageHistory};
pub use pose::PosePublisher;

use tracing::info;

use crate::geometry::SE3;

/// Observer of engine output events.
///
/// Subscribers are registered against the session, not the engine instance:
/// the session carries them across every rebuild, and each rebuild calls
/// [`OutputSubscriber::reset`] on every subscriber exactly once.
pub trait OutputSubscriber: Send + Sync {
    /// The engine instance was torn down; discard any per-instance state.
    fn reset(&self);

    /// A new camera pose estimate for `frame_id`.
    fn publish_camera_pose(&self, _pose: &SE3, _frame_id: usize) {}

    /// Called once at shutdown, after the last frame.
    fn join(&self) {}
}

/// Logging subscriber attached with `sampleoutput=1`; useful for eyeballing
/// the event stream without any transport.
#[derive(Default)]
pub struct SampleOutput;

impl OutputSubscriber for SampleOutput {
    fn reset(&self) {
        info!("sample output: engine reset");
    }

    fn publish_camera_pose(&self, pose: &SE3, frame_id: usize) {
        info!(
            frame_id,
            tx = pose.translation.x,
            ty = pose.translation.y,
            tz = pose.translation.z,
            "sample output: camera pose"
        );
    }

    fn join(&self) {
        info!("sample output: done");
    }
}
