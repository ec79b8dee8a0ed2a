//! The single-consumer frame worker.
//!
//! One dedicated thread drains the frame queue and runs the pipeline
//! procedure to completion for each frame; frame N+1 never starts before
//! frame N finished. The engine instance is only ever touched from here.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::calib::RawImage;
use crate::system::SharedFlags;

use super::FramePipeline;

/// How long the worker sleeps on an idle queue before re-checking shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct FrameWorker {
    handle: Option<JoinHandle<()>>,
}

impl FrameWorker {
    /// Spawn the worker thread. It exits when the frame queue disconnects
    /// or shutdown is requested, whichever comes first.
    pub fn spawn(
        mut pipeline: FramePipeline,
        frames: Receiver<RawImage>,
        flags: Arc<SharedFlags>,
    ) -> Self {
        let handle = thread::spawn(move || {
            loop {
                if flags.is_shutdown_requested() {
                    break;
                }
                match frames.recv_timeout(IDLE_POLL) {
                    Ok(raw) => {
                        if let Err(e) = pipeline.process_frame(&raw) {
                            warn!("frame dropped: {e:#}");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            pipeline.join_subscribers();
            info!(frames = pipeline.frame_id(), "frame worker exiting");
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the worker to finish draining.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
