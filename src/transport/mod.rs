//! Message types and the publish/subscribe seam.
//!
//! The pipeline only sees the [`Publisher`] trait; the in-process
//! implementation is a bounded crossbeam channel whose `try_send` keeps
//! publication non-blocking. A full queue drops the message (the stream is
//! latest-wins for observers), a disconnected queue is a transport error
//! that the caller logs and survives.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use thiserror::Error;
use tracing::trace;

/// Outward pose message: translation plus unit quaternion, x,y,z,w order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMsg {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

/// Outward debug image: rgb8, three bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImageMsg {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Emitting a message failed and will not be retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("topic \"{topic}\" is disconnected")]
    Disconnected { topic: String },
}

/// Fire-and-forget message output.
pub trait Publisher<T>: Send {
    fn publish(&self, msg: T) -> Result<(), TransportError>;
}

/// Bounded in-process topic backed by a crossbeam channel.
pub struct ChannelPublisher<T> {
    topic: String,
    tx: Sender<T>,
}

/// Create a topic with the given queue capacity, returning the publisher
/// and the subscriber end.
pub fn topic<T>(name: &str, capacity: usize) -> (ChannelPublisher<T>, Receiver<T>) {
    let (tx, rx) = bounded(capacity);
    (
        ChannelPublisher {
            topic: name.to_string(),
            tx,
        },
        rx,
    )
}

impl<T: Send> Publisher<T> for ChannelPublisher<T> {
    fn publish(&self, msg: T) -> Result<(), TransportError> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                // Subscriber is behind; dropping is preferable to stalling
                // frame ingestion.
                trace!(topic = %self.topic, "queue full, message dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Disconnected {
                topic: self.topic.clone(),
            }),
        }
    }
}
