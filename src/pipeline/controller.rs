//! Frame Pipeline Controller: the procedure executed once per raw frame.
//!
//! Per frame, strictly in order: undistort, ingest (which may run the reset
//! protocol first), publish the latest pose if there is one, composite and
//! emit the debug image if there is a snapshot, advance the frame counter.
//! The published pose always reflects the state after this frame's ingest.

use anyhow::Result;
use tracing::{debug, warn};

use crate::calib::{RawImage, Undistorter};
use crate::engine::EngineSession;
use crate::output::{DebugCompositor, DebugImageHistory, PosePublisher};
use crate::transport::{ColorImageMsg, Publisher};

use super::PipelineError;

pub struct FramePipeline {
    undistorter: Undistorter,
    session: EngineSession,
    pose_publisher: PosePublisher,
    image_publisher: Box<dyn Publisher<ColorImageMsg>>,
    history: DebugImageHistory,
    /// Monotonic, survives engine resets; advances only on successful ingest.
    frame_id: usize,
}

impl FramePipeline {
    pub fn new(
        undistorter: Undistorter,
        session: EngineSession,
        pose_publisher: PosePublisher,
        image_publisher: Box<dyn Publisher<ColorImageMsg>>,
        history_capacity: usize,
    ) -> Self {
        Self {
            undistorter,
            session,
            pose_publisher,
            image_publisher,
            history: DebugImageHistory::new(history_capacity),
            frame_id: 0,
        }
    }

    /// Index the next frame will be ingested under.
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    /// Run the per-frame procedure. Not re-entrant; the frame worker is the
    /// single caller.
    pub fn process_frame(&mut self, raw: &RawImage) -> Result<()> {
        self.check_input(raw)?;

        let calibrated = self.undistorter.undistort(raw);
        self.session.ingest(calibrated, self.frame_id)?;

        if let Some(pose) = self.session.latest_pose() {
            if let Err(e) = self.pose_publisher.publish(&pose) {
                warn!(frame_id = self.frame_id, "pose publish failed: {e}");
            }
        }

        if let Some(snapshot) = self.session.frame_snapshot() {
            self.history.push(DebugCompositor::composite(snapshot));
            if let Some(latest) = self.history.latest() {
                if let Err(e) = self.image_publisher.publish(DebugCompositor::to_msg(latest)) {
                    warn!(frame_id = self.frame_id, "debug image publish failed: {e}");
                }
            }
        } else {
            debug!(frame_id = self.frame_id, "no snapshot yet");
        }

        self.frame_id += 1;
        Ok(())
    }

    /// Notify subscribers that the stream ended.
    pub fn join_subscribers(&self) {
        self.session.join_subscribers();
    }

    fn check_input(&self, raw: &RawImage) -> Result<(), PipelineError> {
        let (want_w, want_h) = self.undistorter.input_size();
        if (raw.width, raw.height) != (want_w, want_h) {
            return Err(PipelineError::DimensionMismatch {
                got_w: raw.width,
                got_h: raw.height,
                want_w,
                want_h,
            });
        }
        if raw.data.len() != want_w * want_h {
            return Err(PipelineError::BufferSize {
                got: raw.data.len(),
                want: want_w * want_h,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use crossbeam_channel::Receiver;
    use nalgebra::{UnitQuaternion, Vector3};

    use crate::engine::testkit::{EventLog, ScriptedFactory};
    use crate::engine::{EngineConfig, EngineSession};
    use crate::geometry::SE3;
    use crate::system::SharedFlags;
    use crate::transport::{self, TransformMsg};

    const W: usize = 640;
    const H: usize = 480;

    fn identity_undistorter() -> Undistorter {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "0.5 0.5 0.5 0.5\n{W} {H}\nnone\n{W} {H}\n").unwrap();
        f.flush().unwrap();
        Undistorter::from_files(f.path(), None, None).unwrap()
    }

    struct Fixture {
        pipeline: FramePipeline,
        flags: Arc<SharedFlags>,
        pose_rx: Receiver<TransformMsg>,
        image_rx: Receiver<ColorImageMsg>,
        ingested: Arc<parking_lot::Mutex<Vec<usize>>>,
    }

    fn fixture(factory: ScriptedFactory) -> Fixture {
        let flags = SharedFlags::new();
        let ingested = factory.ingested();
        let session = EngineSession::new(
            Box::new(factory),
            EngineConfig::default(),
            flags.clone(),
        )
        .unwrap();

        let (pose_pub, pose_rx) = transport::topic("pose", 16);
        let (image_pub, image_rx) = transport::topic("debug_image", 16);
        let pipeline = FramePipeline::new(
            identity_undistorter(),
            session,
            PosePublisher::new(Box::new(pose_pub)),
            Box::new(image_pub),
            8,
        );
        Fixture {
            pipeline,
            flags,
            pose_rx,
            image_rx,
            ingested,
        }
    }

    fn raw_frame() -> RawImage {
        RawImage::new(W, H, vec![128; W * H])
    }

    #[test]
    fn test_no_publish_without_pose() {
        let mut fx = fixture(ScriptedFactory::new(EventLog::new()));
        for _ in 0..3 {
            fx.pipeline.process_frame(&raw_frame()).unwrap();
        }
        assert!(fx.pose_rx.try_recv().is_err());
    }

    #[test]
    fn test_pose_published_once_engine_yields_one() {
        // Engine yields nothing for frames 0 and 1, pose P from frame 2 on.
        let pose = SE3::new(
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.25),
            Vector3::new(0.5, -1.0, 2.0),
        );
        let mut fx = fixture(
            ScriptedFactory::new(EventLog::new())
                .with_pose_after(2)
                .with_pose(pose.clone()),
        );

        fx.pipeline.process_frame(&raw_frame()).unwrap();
        fx.pipeline.process_frame(&raw_frame()).unwrap();
        assert!(fx.pose_rx.try_recv().is_err());

        fx.pipeline.process_frame(&raw_frame()).unwrap();
        let msg = fx.pose_rx.try_recv().unwrap();
        assert!(fx.pose_rx.try_recv().is_err());

        let expected = PosePublisher::to_msg(&pose);
        assert_eq!(msg, expected);
    }

    #[test]
    fn test_debug_image_emitted_only_with_snapshot() {
        let mut fx = fixture(ScriptedFactory::new(EventLog::new()).with_pose_after(2));

        fx.pipeline.process_frame(&raw_frame()).unwrap();
        fx.pipeline.process_frame(&raw_frame()).unwrap();
        assert!(fx.image_rx.try_recv().is_err());

        fx.pipeline.process_frame(&raw_frame()).unwrap();
        let img = fx.image_rx.try_recv().unwrap();
        // Scripted snapshots are 4x3.
        assert_eq!((img.width, img.height), (4, 3));
        assert_eq!(img.data.len(), 4 * 3 * 3);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected_before_ingest() {
        let mut fx = fixture(ScriptedFactory::new(EventLog::new()));

        let bad = RawImage::new(64, 48, vec![0; 64 * 48]);
        let err = fx.pipeline.process_frame(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DimensionMismatch { .. })
        ));

        // The rejected frame consumed no index.
        assert_eq!(fx.pipeline.frame_id(), 0);
        fx.pipeline.process_frame(&raw_frame()).unwrap();
        assert_eq!(*fx.ingested.lock(), vec![0]);
    }

    #[test]
    fn test_frame_ids_continue_across_reset() {
        let mut fx = fixture(ScriptedFactory::new(EventLog::new()));

        fx.pipeline.process_frame(&raw_frame()).unwrap();
        fx.pipeline.process_frame(&raw_frame()).unwrap();
        fx.flags.request_reset();
        fx.pipeline.process_frame(&raw_frame()).unwrap();

        assert_eq!(*fx.ingested.lock(), vec![0, 1, 2]);
        assert_eq!(fx.pipeline.frame_id(), 3);
    }

    #[test]
    fn test_transport_failure_does_not_stop_the_pipeline() {
        let mut fx = fixture(ScriptedFactory::new(EventLog::new()).with_pose_after(0));

        // Kill both outward topics; frames must still flow.
        drop(fx.pose_rx);
        drop(fx.image_rx);
        for _ in 0..3 {
            fx.pipeline.process_frame(&raw_frame()).unwrap();
        }
        assert_eq!(fx.pipeline.frame_id(), 3);
    }
}
