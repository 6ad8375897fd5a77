//! Activity fusion core.
//!
//! This crate fuses two independently timed detector streams (body-pose
//! landmarks and generic object detections) into one stable, human-readable
//! activity label.
//!
//! # Pipeline
//!
//! ```text
//! camera -> FrameScheduler -> { pose detector, object detector }   (async, own threads)
//!                                      |                |
//!                                      +--> FusionEvent <+
//!                                              |
//!                                        FusionEngine
//!                        ActionClassifier -> StatusSmoother -> DisplaySink
//!                        CoverTransform -> Overlay -> OverlaySink
//! ```
//!
//! # Module Structure
//!
//! - `frame`: Owned camera frames with exactly-once release
//! - `ingest`: Frame sources (synthetic camera)
//! - `detect`: Detector result types, detector traits and threaded adapters
//! - `scheduler`: Alternates frames between the two detectors
//! - `classify`: Geometric action classification
//! - `smooth`: Majority-vote label smoothing
//! - `overlay`: Cover-scaling coordinate mapping and overlay draw commands
//! - `display`: Display sinks for the stabilized label
//! - `fusion`: Mutex-guarded fusion state and the event loop
//! - `config`: File + environment configuration
//! - `replay`: JSON-lines recorded detector results

pub mod classify;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod fusion;
pub mod ingest;
pub mod overlay;
pub mod replay;
pub mod scheduler;
pub mod smooth;

pub use classify::{
    classify, ActionClassifier, ArmGeometry, ClassifierThresholds, Status, StatusColor,
};
pub use detect::{
    BoundingBox, Category, Detection, Landmark, Modality, ObjectDetector, ObjectDetectorOptions,
    ObjectModel, ObjectResult, PoseDetector, PoseModel, PoseResult, ScriptedObjectModel,
    ScriptedPoseModel, ThreadedObjectDetector, ThreadedPoseDetector,
};
pub use config::{CameraSettings, FusionConfig};
pub use display::{ChannelDisplaySink, DisplaySink, DisplayUpdate, LogDisplaySink};
pub use frame::{Frame, ReleaseCounter};
pub use fusion::{
    EventSender, FusionEngine, FusionEvent, FusionHandle, FusionSettings, FusionState, FusionStats,
};
pub use ingest::{SyntheticCamera, SyntheticCameraConfig};
pub use overlay::{build_overlay, CoverTransform, DrawCommand, Overlay, OverlaySink, ViewSize};
pub use replay::ReplayRecord;
pub use scheduler::{route_for, Dispatch, DropReason, FrameScheduler, Route, SchedulerStats};
pub use smooth::{Stabilized, StatusSmoother, DEFAULT_SMOOTHING_WINDOW};
