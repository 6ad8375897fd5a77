pub mod scripted;

pub use scripted::{arms_pose, labeled_detection, ScriptedObjectModel, ScriptedPoseModel};
