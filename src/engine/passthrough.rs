//! A stand-in engine for wiring and smoke runs.
//!
//! It performs no odometry: every ingested frame becomes the current
//! snapshot (no tracked points) and no pose is ever produced. Useful for
//! exercising the full pipeline, transport, and debug-image path before a
//! real engine binding is plugged in behind [`TrackingEngine`].

use std::sync::Arc;

use anyhow::Result;

use crate::calib::CalibratedImage;
use crate::geometry::SE3;
use crate::output::OutputSubscriber;

use super::{EngineConfig, EngineFactory, FrameSnapshot, TrackingEngine};

#[derive(Default)]
pub struct PassthroughEngine {
    snapshot: Option<FrameSnapshot>,
}

impl TrackingEngine for PassthroughEngine {
    fn configure(&mut self, _config: &EngineConfig) {}

    fn set_subscribers(&mut self, _subscribers: Vec<Arc<dyn OutputSubscriber>>) {
        // No engine events to forward.
    }

    fn ingest(&mut self, frame: CalibratedImage, _frame_id: usize) -> Result<()> {
        self.snapshot = Some(FrameSnapshot {
            width: frame.width,
            height: frame.height,
            intensity: frame.intensity.iter().map(|&v| [v, 0.0, 0.0]).collect(),
            points: Vec::new(),
        });
        Ok(())
    }

    fn frame_snapshot(&self) -> Option<&FrameSnapshot> {
        self.snapshot.as_ref()
    }

    fn latest_pose(&self) -> Option<SE3> {
        None
    }
}

/// Builds [`PassthroughEngine`]s.
pub struct PassthroughFactory;

impl EngineFactory for PassthroughFactory {
    fn build(&self) -> Result<Box<dyn TrackingEngine>> {
        Ok(Box::new(PassthroughEngine::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_mirrors_last_frame() {
        let mut engine = PassthroughEngine::default();
        assert!(engine.frame_snapshot().is_none());

        let frame = CalibratedImage::new(2, 2, vec![1.0, 2.0, 3.0, 4.0], 1.0);
        engine.ingest(frame, 0).unwrap();

        let snap = engine.frame_snapshot().unwrap();
        assert_eq!((snap.width, snap.height), (2, 2));
        assert_eq!(snap.intensity[3], [4.0, 0.0, 0.0]);
        assert!(snap.points.is_empty());
        assert!(engine.latest_pose().is_none());
    }
}
