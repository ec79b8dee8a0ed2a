//! Engine Session: owns the live engine instance and the reset protocol.
//!
//! The session is the stable handle the pipeline talks to; the engine
//! instance behind it can be destroyed and recreated any number of times.
//! Output subscribers are session state, not engine state: a rebuild
//! carries the same list (identity and order) onto the fresh instance and
//! notifies every subscriber exactly once.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::calib::CalibratedImage;
use crate::geometry::SE3;
use crate::output::OutputSubscriber;
use crate::system::SharedFlags;

use super::{EngineConfig, EngineFactory, FrameSnapshot, TrackingEngine};

/// One engine instance behind a stable handle, with reset mediation.
pub struct EngineSession {
    /// `None` only transiently inside a rebuild, or after a rebuild failed.
    engine: Option<Box<dyn TrackingEngine>>,
    factory: Box<dyn EngineFactory>,
    config: EngineConfig,
    subscribers: Vec<Arc<dyn OutputSubscriber>>,
    flags: Arc<SharedFlags>,
}

impl EngineSession {
    /// Build and configure the first engine instance.
    pub fn new(
        factory: Box<dyn EngineFactory>,
        config: EngineConfig,
        flags: Arc<SharedFlags>,
    ) -> Result<Self> {
        let mut engine = factory.build()?;
        engine.configure(&config);
        Ok(Self {
            engine: Some(engine),
            factory,
            config,
            subscribers: Vec::new(),
            flags,
        })
    }

    /// Register an output subscriber. Registration is against the session;
    /// the subscriber survives every engine rebuild.
    pub fn add_subscriber(&mut self, subscriber: Arc<dyn OutputSubscriber>) {
        self.subscribers.push(subscriber);
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.set_subscribers(self.subscribers.clone());
        }
    }

    pub fn subscribers(&self) -> &[Arc<dyn OutputSubscriber>] {
        &self.subscribers
    }

    /// Feed one calibrated frame, running the reset protocol first when a
    /// reset was requested. `frame_id` is owned by the pipeline and is not
    /// affected by resets.
    pub fn ingest(&mut self, frame: CalibratedImage, frame_id: usize) -> Result<()> {
        // swap(false): the request is read and cleared in one atomic step,
        // so it is observed by exactly one frame and one rebuild.
        if self.flags.take_reset_request() {
            self.rebuild()?;
        }

        match self.engine.as_deref_mut() {
            Some(engine) => engine.ingest(frame, frame_id),
            None => bail!("no engine instance; a previous rebuild failed"),
        }
    }

    /// The engine's most recent frame snapshot, if it has produced one.
    pub fn frame_snapshot(&self) -> Option<&FrameSnapshot> {
        self.engine.as_deref().and_then(|e| e.frame_snapshot())
    }

    /// The most recent pose estimate. `None` means skip publishing.
    pub fn latest_pose(&self) -> Option<SE3> {
        self.engine.as_deref().and_then(|e| e.latest_pose())
    }

    /// Notify subscribers at shutdown.
    pub fn join_subscribers(&self) {
        for sub in &self.subscribers {
            sub.join();
        }
    }

    /// The full-reset protocol: tear down, notify, rebuild, reconfigure,
    /// reattach. No frame is ever ingested by a half-constructed engine
    /// because the new instance only becomes visible fully configured.
    fn rebuild(&mut self) -> Result<()> {
        info!(
            subscribers = self.subscribers.len(),
            "full reset requested, rebuilding engine"
        );

        let subscribers = self.subscribers.clone();

        // Old instance goes first; its observers learn about it next.
        self.engine = None;
        for sub in &subscribers {
            sub.reset();
        }

        let mut engine = match self.factory.build() {
            Ok(engine) => engine,
            Err(e) => {
                warn!("engine rebuild failed: {e:#}");
                return Err(e);
            }
        };
        engine.configure(&self.config);
        engine.set_subscribers(subscribers);
        self.engine = Some(engine);
        Ok(())
    }
}
