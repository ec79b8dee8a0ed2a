//! Flags shared between the frame worker and external control paths.
//!
//! Any thread may request a full engine reset or a shutdown at any time;
//! the frame worker is the only consumer. The reset flag is consumed with
//! an atomic swap so one request triggers exactly one rebuild.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Externally settable control flags.
pub struct SharedFlags {
    /// Full engine rebuild requested (operator command, tracking lost, ...).
    full_reset_requested: AtomicBool,

    /// Stop draining frames and exit the worker loop.
    shutdown_requested: AtomicBool,
}

impl SharedFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            full_reset_requested: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
        })
    }

    /// Request a full engine reset. Observed once by the next frame.
    pub fn request_reset(&self) {
        self.full_reset_requested.store(true, Ordering::SeqCst);
    }

    /// Read and clear the reset request in one atomic step.
    pub fn take_reset_request(&self) -> bool {
        self.full_reset_requested.swap(false, Ordering::SeqCst)
    }

    /// True if a reset is pending but not yet consumed.
    pub fn reset_pending(&self) -> bool {
        self.full_reset_requested.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}
