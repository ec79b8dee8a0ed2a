use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, bail};
use crossbeam_channel::bounded;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dso_bridge::calib::Undistorter;
use dso_bridge::config::Settings;
use dso_bridge::engine::{EngineConfig, EngineSession, PassthroughFactory};
use dso_bridge::io::ImageDirSource;
use dso_bridge::output::{PosePublisher, SampleOutput};
use dso_bridge::pipeline::{FramePipeline, FrameWorker};
use dso_bridge::system::SharedFlags;
use dso_bridge::transport;

fn main() -> Result<()> {
    let settings = Settings::from_tokens(std::env::args().skip(1));

    if !settings.no_log {
        let default = if settings.quiet { "warn" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
            )
            .init();
    }

    if settings.calib.is_empty() {
        bail!("no calibration file given (calib=<path>)");
    }
    if settings.files.is_empty() {
        bail!("no image directory given (files=<dir>)");
    }

    let undistorter = Undistorter::from_files(
        Path::new(&settings.calib),
        non_empty(&settings.gamma),
        non_empty(&settings.vignette),
    )
    .context("calibration setup failed")?;

    let engine_config = EngineConfig::from_settings(&settings, undistorter.response());
    let flags = SharedFlags::new();

    // No engine binding is wired in yet; the passthrough stand-in carries
    // frames through the full pipeline.
    let mut session = EngineSession::new(
        Box::new(PassthroughFactory),
        engine_config,
        flags.clone(),
    )?;
    if settings.use_sample_output {
        session.add_subscriber(Arc::new(SampleOutput));
    }

    let (pose_pub, pose_rx) = transport::topic::<transport::TransformMsg>("dso/pose", 8);
    let (image_pub, image_rx) = transport::topic::<transport::ColorImageMsg>("dso/debug_image", 4);

    // Outward topic drains: log poses, count debug images.
    let pose_drain = thread::spawn(move || {
        for msg in pose_rx.iter() {
            info!(
                t = ?msg.translation,
                q = ?msg.rotation,
                "pose"
            );
        }
    });
    let image_drain = thread::spawn(move || {
        let n = image_rx.iter().count();
        info!(images = n, "debug image topic closed");
    });

    let pipeline = FramePipeline::new(
        undistorter,
        session,
        PosePublisher::new(Box::new(pose_pub)),
        Box::new(image_pub),
        dso_bridge::output::DebugImageHistory::DEFAULT_CAPACITY,
    );

    let (frame_tx, frame_rx) = bounded(2);
    let worker = FrameWorker::spawn(pipeline, frame_rx, flags);

    let source = ImageDirSource::new(&settings.files)?;
    info!(frames = source.len(), "starting playback");
    for frame in source.frames() {
        frame_tx.send(frame?)?;
    }

    drop(frame_tx);
    worker.join();
    let _ = pose_drain.join();
    let _ = image_drain.join();
    Ok(())
}

fn non_empty(s: &str) -> Option<&Path> {
    (!s.is_empty()).then(|| Path::new(s))
}
