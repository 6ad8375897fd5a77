//! fusiond - activity fusion daemon
//!
//! Runs the full pipeline against a synthetic camera and scripted detectors:
//! camera -> scheduler -> pose/object detector threads -> fusion loop.
//! The main thread doubles as the UI thread: it applies label updates
//! received from the fusion loop and logs a health line every few seconds.

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use activity_fusion::{
    ChannelDisplaySink, DisplayUpdate, FusionConfig, FusionEngine, FrameScheduler, Overlay,
    OverlaySink, ReleaseCounter, ScriptedObjectModel, ScriptedPoseModel, SyntheticCamera,
    ThreadedObjectDetector, ThreadedPoseDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Stop after this many camera frames (default: run until Ctrl-C).
    #[arg(long)]
    frames: Option<u64>,
    /// Seconds between health log lines.
    #[arg(long, default_value_t = 5)]
    health_secs: u64,
    /// Run without the object detector (pose frames only are analyzed).
    #[arg(long)]
    no_objects: bool,
}

/// Logs overlay sizes at debug level.
struct LogOverlaySink;

impl OverlaySink for LogOverlaySink {
    fn draw(&self, overlay: &Overlay) {
        log::debug!(
            "overlay: {} draw commands ({}x{} input)",
            overlay.commands.len(),
            overlay.image_width,
            overlay.image_height
        );
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = FusionConfig::load()?;
    log::info!(
        "fusiond starting (window={}, phone>{:.2}, mirrored={})",
        cfg.smoothing_window,
        cfg.classifier.phone_min_confidence,
        cfg.camera.mirrored
    );

    let (display, labels) = ChannelDisplaySink::new();
    let engine = Arc::new(
        FusionEngine::new(cfg.fusion_settings(), Arc::new(display))
            .with_overlay_sink(Arc::new(LogOverlaySink)),
    );
    let (events_tx, events_rx) = mpsc::channel();
    let fusion = engine.clone().spawn(events_rx)?;

    // A detector that fails to initialize leaves its slot empty; frames
    // routed there are released without analysis.
    let mut scheduler = FrameScheduler::new(cfg.camera.mirrored);
    match ThreadedPoseDetector::spawn(ScriptedPoseModel::desk_scenario(), events_tx.clone()) {
        Ok(detector) => {
            scheduler.set_pose_detector(Some(Box::new(detector)));
        }
        Err(err) => log::error!("pose detector unavailable: {:#}", err),
    }
    if args.no_objects {
        log::info!("object detector disabled");
    } else {
        match ThreadedObjectDetector::spawn(
            ScriptedObjectModel::desk_scenario(),
            cfg.object_detector,
            events_tx.clone(),
        ) {
            Ok(detector) => {
                scheduler.set_object_detector(Some(Box::new(detector)));
            }
            Err(err) => log::error!("object detector unavailable: {:#}", err),
        }
    }
    drop(events_tx);

    let releases = ReleaseCounter::new();
    let mut camera =
        SyntheticCamera::new(cfg.camera_config())?.with_release_counter(releases.clone());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let health_interval = Duration::from_secs(args.health_secs.max(1));
    let mut last_health_log = Instant::now();
    let mut current_label = "-";

    log::info!("fusiond running. Ctrl-C to stop");
    while running.load(Ordering::SeqCst) {
        if let Some(limit) = args.frames {
            if camera.frames_captured() >= limit {
                log::info!("frame limit {} reached", limit);
                break;
            }
        }

        let frame = camera.next_frame()?;
        scheduler.submit(frame);

        while let Ok(update) = labels.try_recv() {
            current_label = apply_label(&update);
        }

        if last_health_log.elapsed() >= health_interval {
            let routed = scheduler.stats();
            let fused = engine.stats()?;
            log::info!(
                "health frames={} pose={} object={} dropped={} released={} results(pose={}, object={}) failures={} label={}",
                routed.frames_seen,
                routed.routed_pose,
                routed.routed_object,
                routed.dropped,
                releases.count(),
                fused.pose_updates,
                fused.object_updates,
                fused.detector_failures,
                current_label
            );
            last_health_log = Instant::now();
        }
    }

    log::info!("shutting down");
    // Close detectors first so in-flight results still reach the fusion loop.
    scheduler.shutdown();
    fusion.wait()?;
    while let Ok(update) = labels.try_recv() {
        current_label = apply_label(&update);
    }

    let fused = engine.stats()?;
    log::info!(
        "fusiond stopped: frames={} released={} evaluations={} label_changes={} final label={}",
        camera.frames_captured(),
        releases.count(),
        fused.evaluations,
        fused.label_changes,
        current_label
    );
    Ok(())
}

fn apply_label(update: &DisplayUpdate) -> &'static str {
    println!("[{}] {}", update.color.hex(), update.label);
    update.label
}
