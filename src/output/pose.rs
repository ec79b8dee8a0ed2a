//! Pose Publisher Adapter: internal SE3 out to the wire format.

use crate::geometry::SE3;
use crate::transport::{Publisher, TransformMsg, TransportError};

/// Converts the engine's latest pose into a [`TransformMsg`] and emits it.
/// Holds no pose state of its own; the caller reads the latest value at
/// publish time and skips the call entirely when there is none.
pub struct PosePublisher {
    publisher: Box<dyn Publisher<TransformMsg>>,
}

impl PosePublisher {
    pub fn new(publisher: Box<dyn Publisher<TransformMsg>>) -> Self {
        Self { publisher }
    }

    /// Emit one pose message. A transport failure is returned to the caller
    /// and not retried.
    pub fn publish(&self, pose: &SE3) -> Result<(), TransportError> {
        self.publisher.publish(Self::to_msg(pose))
    }

    /// Translation components plus unit quaternion in x,y,z,w order.
    pub fn to_msg(pose: &SE3) -> TransformMsg {
        let t = &pose.translation;
        let q = &pose.rotation;
        TransformMsg {
            translation: [t.x, t.y, t.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}
