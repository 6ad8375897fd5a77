mod backend;
pub mod backends;
mod result;
mod threaded;

pub use backend::{ObjectDetector, ObjectDetectorOptions, ObjectModel, PoseDetector, PoseModel};
pub use backends::{ScriptedObjectModel, ScriptedPoseModel};
pub use result::{
    BoundingBox, Category, Detection, Landmark, Modality, ObjectResult, PoseResult,
    POSE_LANDMARK_COUNT,
};
pub use threaded::{ThreadedObjectDetector, ThreadedPoseDetector};
