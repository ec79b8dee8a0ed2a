//! Scripted engine doubles for session and pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use parking_lot::Mutex;

use crate::calib::CalibratedImage;
use crate::geometry::SE3;
use crate::output::OutputSubscriber;

use super::{
    EngineConfig, EngineFactory, FrameSnapshot, PointStatus, TrackedPoint, TrackingEngine,
};

/// Shared chronological record of what happened, for ordering assertions.
#[derive(Clone)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// A calibrated frame with trivial contents.
pub(crate) fn blank_frame() -> CalibratedImage {
    CalibratedImage::new(4, 3, vec![0.0; 12], 1.0)
}

/// Engine double: records ingests into a shared list and optionally starts
/// yielding a pose and snapshot after a number of ingested frames.
pub(crate) struct ScriptedEngine {
    log: EventLog,
    ingested: Arc<Mutex<Vec<usize>>>,
    subscribers: Vec<Arc<dyn OutputSubscriber>>,
    frames_seen: usize,
    pose_after: Option<usize>,
    pose: SE3,
    snapshot: Option<FrameSnapshot>,
}

impl TrackingEngine for ScriptedEngine {
    fn configure(&mut self, _config: &EngineConfig) {
        self.log.push("configure");
    }

    fn set_subscribers(&mut self, subscribers: Vec<Arc<dyn OutputSubscriber>>) {
        self.subscribers = subscribers;
    }

    fn ingest(&mut self, _frame: CalibratedImage, frame_id: usize) -> Result<()> {
        self.log.push(format!("ingest {frame_id}"));
        self.ingested.lock().push(frame_id);
        self.frames_seen += 1;

        if matches!(self.pose_after, Some(n) if self.frames_seen > n) {
            self.snapshot = Some(FrameSnapshot {
                width: 4,
                height: 3,
                intensity: vec![[10.0, 0.0, 0.0]; 12],
                points: vec![TrackedPoint {
                    u: 1.0,
                    v: 1.0,
                    status: PointStatus::Good,
                }],
            });
        }
        if let Some(pose) = self.latest_pose() {
            for sub in &self.subscribers {
                sub.publish_camera_pose(&pose, frame_id);
            }
        }
        Ok(())
    }

    fn frame_snapshot(&self) -> Option<&FrameSnapshot> {
        self.snapshot.as_ref()
    }

    fn latest_pose(&self) -> Option<SE3> {
        match self.pose_after {
            Some(n) if self.frames_seen > n => Some(self.pose.clone()),
            _ => None,
        }
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.log.push("drop");
    }
}

/// Factory for [`ScriptedEngine`]s; counts builds and shares the ingest
/// record across instances so tests can observe behavior across rebuilds.
pub(crate) struct ScriptedFactory {
    log: EventLog,
    ingested: Arc<Mutex<Vec<usize>>>,
    builds: Arc<AtomicUsize>,
    pose_after: Option<usize>,
    pose: SE3,
    fail_builds_after: Option<usize>,
}

impl ScriptedFactory {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ingested: Arc::new(Mutex::new(Vec::new())),
            builds: Arc::new(AtomicUsize::new(0)),
            pose_after: None,
            pose: SE3::identity(),
            fail_builds_after: None,
        }
    }

    /// Engine instances yield a pose and snapshot once they have ingested
    /// more than `n` frames.
    pub fn with_pose_after(mut self, n: usize) -> Self {
        self.pose_after = Some(n);
        self
    }

    pub fn with_pose(mut self, pose: SE3) -> Self {
        self.pose = pose;
        self
    }

    /// Builds beyond the first `n` fail, for rebuild-failure tests.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_builds_after = Some(n);
        self
    }

    pub fn ingested(&self) -> Arc<Mutex<Vec<usize>>> {
        self.ingested.clone()
    }

    pub fn builds(&self) -> Arc<AtomicUsize> {
        self.builds.clone()
    }
}

impl EngineFactory for ScriptedFactory {
    fn build(&self) -> Result<Box<dyn TrackingEngine>> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fail_builds_after, Some(limit) if n > limit) {
            anyhow::bail!("scripted build failure");
        }
        self.log.push("build");
        Ok(Box::new(ScriptedEngine {
            log: self.log.clone(),
            ingested: self.ingested.clone(),
            subscribers: Vec::new(),
            frames_seen: 0,
            pose_after: self.pose_after,
            pose: self.pose.clone(),
            snapshot: None,
        }))
    }
}

/// Subscriber double counting its `reset()` calls.
pub(crate) struct CountingSubscriber {
    name: String,
    log: EventLog,
    resets: AtomicUsize,
}

impl CountingSubscriber {
    pub fn new(name: &str, log: EventLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            resets: AtomicUsize::new(0),
        }
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl OutputSubscriber for CountingSubscriber {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("reset {}", self.name));
    }
}
