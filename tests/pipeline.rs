use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use activity_fusion::detect::backends::{arms_pose, labeled_detection};
use activity_fusion::{
    BoundingBox, DisplaySink, Frame, FrameScheduler, FusionEngine, FusionSettings, ObjectModel,
    ObjectResult, PoseResult, ReleaseCounter, ScriptedObjectModel, ScriptedPoseModel, Status,
    StatusColor, ThreadedObjectDetector, ThreadedPoseDetector,
};

#[derive(Default)]
struct RecordingDisplay {
    shown: Mutex<Vec<Status>>,
}

impl DisplaySink for RecordingDisplay {
    fn show(&self, status: Status, _color: StatusColor) {
        self.shown.lock().unwrap().push(status);
    }
}

struct UnavailableObjectModel;

impl ObjectModel for UnavailableObjectModel {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn warm_up(&mut self) -> Result<()> {
        Err(anyhow!("model asset not found"))
    }

    fn infer(&mut self, _frame: &Frame, _mirrored: bool) -> Result<ObjectResult> {
        unreachable!("never initialized")
    }
}

fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Submit one frame and wait until its result (if any) has been fused.
fn step(scheduler: &mut FrameScheduler, engine: &FusionEngine, counter: &ReleaseCounter, seq: u64) {
    let frame = counter.attach(Frame::new(vec![0u8; 640 * 480 * 4], 640, 480, seq, seq * 66));
    scheduler.submit(frame);
    let routed = scheduler.stats();
    let expected = routed.routed_pose + routed.routed_object;
    wait_until("fused result", || {
        let stats = engine.stats().unwrap();
        stats.pose_updates + stats.object_updates + stats.detector_failures == expected
    });
    wait_until("frame release", || counter.count() == seq + 1);
}

fn raised_phone_pose() -> PoseResult {
    PoseResult::single(arms_pose(0.3, 0.1, 0.45, 0.55))
}

fn phone_objects() -> ObjectResult {
    ObjectResult::new(vec![labeled_detection(
        "cell phone",
        0.82,
        BoundingBox::new(100.0, 40.0, 220.0, 200.0),
    )])
}

#[test]
fn alternating_detectors_fuse_into_stable_label() -> Result<()> {
    let display = Arc::new(RecordingDisplay::default());
    let engine = Arc::new(FusionEngine::new(FusionSettings::default(), display.clone()));
    let (tx, rx) = mpsc::channel();
    let fusion = engine.clone().spawn(rx)?;

    let mut scheduler = FrameScheduler::new(true)
        .with_pose_detector(Box::new(ThreadedPoseDetector::spawn(
            ScriptedPoseModel::new(vec![raised_phone_pose()]),
            tx.clone(),
        )?))
        .with_object_detector(Box::new(ThreadedObjectDetector::spawn(
            ScriptedObjectModel::new(vec![phone_objects()]),
            Default::default(),
            tx.clone(),
        )?));
    drop(tx);

    let counter = ReleaseCounter::new();

    // frame 0 -> pose only: hands raised, no phone seen yet
    step(&mut scheduler, &engine, &counter, 0);
    assert_eq!(engine.current_status()?, Some(Status::PhoneUseSuspected));

    // frame 1 -> phone appears; window [Suspected, Confirmed] ties, oldest wins
    step(&mut scheduler, &engine, &counter, 1);
    assert_eq!(engine.current_status()?, Some(Status::PhoneUseSuspected));

    // frame 2 -> Confirmed takes the majority
    step(&mut scheduler, &engine, &counter, 2);
    assert_eq!(engine.current_status()?, Some(Status::PhoneUseConfirmed));

    for seq in 3..12 {
        step(&mut scheduler, &engine, &counter, seq);
    }

    assert_eq!(
        *display.shown.lock().unwrap(),
        vec![Status::PhoneUseSuspected, Status::PhoneUseConfirmed]
    );

    let routed = scheduler.stats();
    assert_eq!(routed.frames_seen, 12);
    assert_eq!(routed.routed_pose, 6);
    assert_eq!(routed.routed_object, 6);
    assert_eq!(counter.count(), 12);

    let state = engine.snapshot()?;
    let objects = state.object.expect("object result");
    assert_eq!((objects.image_width, objects.image_height), (640, 480));
    // mirrored front camera: box flipped around the vertical axis
    assert_eq!(
        objects.detections[0].bounding_box,
        BoundingBox::new(420.0, 40.0, 540.0, 200.0)
    );

    scheduler.shutdown();
    fusion.wait()?;
    Ok(())
}

#[test]
fn failed_object_detector_leaves_pose_only_pipeline() -> Result<()> {
    let display = Arc::new(RecordingDisplay::default());
    let engine = Arc::new(FusionEngine::new(FusionSettings::default(), display.clone()));
    let (tx, rx) = mpsc::channel();
    let fusion = engine.clone().spawn(rx)?;

    let mut scheduler = FrameScheduler::new(false).with_pose_detector(Box::new(
        ThreadedPoseDetector::spawn(ScriptedPoseModel::new(vec![raised_phone_pose()]), tx.clone())?,
    ));
    let init =
        ThreadedObjectDetector::spawn(UnavailableObjectModel, Default::default(), tx.clone());
    assert!(init.is_err());
    drop(tx);

    let counter = ReleaseCounter::new();
    for seq in 0..6 {
        step(&mut scheduler, &engine, &counter, seq);
    }

    let routed = scheduler.stats();
    assert_eq!(routed.routed_pose, 3);
    assert_eq!(routed.routed_object, 0);
    assert_eq!(routed.dropped, 3);
    assert_eq!(counter.count(), 6);

    let stats = engine.stats()?;
    assert_eq!(stats.pose_updates, 3);
    assert_eq!(stats.object_updates, 0);
    assert_eq!(engine.current_status()?, Some(Status::PhoneUseSuspected));

    fusion.stop()?;
    scheduler.shutdown();
    Ok(())
}

#[test]
fn desk_scenario_runs_every_status_path() -> Result<()> {
    let display = Arc::new(RecordingDisplay::default());
    let settings = FusionSettings {
        smoothing_window: 1,
        ..FusionSettings::default()
    };
    let engine = Arc::new(FusionEngine::new(settings, display.clone()));
    let (tx, rx) = mpsc::channel();
    let fusion = engine.clone().spawn(rx)?;

    let mut scheduler = FrameScheduler::new(true)
        .with_pose_detector(Box::new(ThreadedPoseDetector::spawn(
            ScriptedPoseModel::desk_scenario(),
            tx.clone(),
        )?))
        .with_object_detector(Box::new(ThreadedObjectDetector::spawn(
            ScriptedObjectModel::desk_scenario(),
            Default::default(),
            tx.clone(),
        )?));
    drop(tx);

    let counter = ReleaseCounter::new();
    for seq in 0..20 {
        step(&mut scheduler, &engine, &counter, seq);
    }
    assert_eq!(counter.count(), 20);

    let shown = display.shown.lock().unwrap().clone();
    for status in [
        Status::Writing,
        Status::PhoneUseConfirmed,
        Status::PhoneUseSuspected,
        Status::NormalOrUnknown,
        Status::NoPerson,
    ] {
        assert!(shown.contains(&status), "{:?} never displayed: {:?}", status, shown);
    }
    // emitted only on change
    assert!(shown.windows(2).all(|pair| pair[0] != pair[1]));

    scheduler.shutdown();
    fusion.wait()?;
    Ok(())
}

#[test]
fn recorded_results_parse_without_metadata() -> Result<()> {
    let mut landmarks = String::from("[");
    for i in 0..33 {
        let (x, y) = match i {
            11 => (0.4, 0.3),
            12 => (0.6, 0.3),
            15 => (0.45, 0.8),
            16 => (0.55, 0.8),
            _ => (0.5, 0.5),
        };
        if i > 0 {
            landmarks.push(',');
        }
        landmarks.push_str(&format!(r#"{{"x":{},"y":{}}}"#, x, y));
    }
    landmarks.push(']');
    let pose: PoseResult = serde_json::from_str(&format!(r#"{{"landmarks":[{}]}}"#, landmarks))?;
    assert_eq!(pose.image_width, 0);

    let display = Arc::new(RecordingDisplay::default());
    let engine = FusionEngine::new(FusionSettings::default(), display);
    let out = engine.update_pose(pose)?.expect("engine alive");
    assert_eq!(out.status, Status::Writing);
    Ok(())
}
