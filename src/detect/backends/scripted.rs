use anyhow::Result;

use crate::classify::{LEFT_SHOULDER, LEFT_WRIST, RIGHT_SHOULDER, RIGHT_WRIST};
use crate::detect::backend::{ObjectModel, PoseModel};
use crate::detect::result::{
    BoundingBox, Category, Detection, Landmark, ObjectResult, PoseResult, POSE_LANDMARK_COUNT,
};
use crate::frame::Frame;

/// Build a full 33-point skeleton with the given shoulder/wrist placement.
///
/// Every other landmark sits at the frame center.
pub fn arms_pose(
    shoulder_y: f32,
    wrist_y: f32,
    left_wrist_x: f32,
    right_wrist_x: f32,
) -> Vec<Landmark> {
    let mut landmarks = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
    landmarks[LEFT_SHOULDER] = Landmark::new(0.4, shoulder_y);
    landmarks[RIGHT_SHOULDER] = Landmark::new(0.6, shoulder_y);
    landmarks[LEFT_WRIST] = Landmark::new(left_wrist_x, wrist_y);
    landmarks[RIGHT_WRIST] = Landmark::new(right_wrist_x, wrist_y);
    landmarks
}

/// A single detection with one category.
pub fn labeled_detection(label: &str, score: f32, bounding_box: BoundingBox) -> Detection {
    Detection::new(bounding_box, vec![Category::new(label, score)])
}

fn mirror_pose(result: &mut PoseResult) {
    for person in &mut result.landmarks {
        for landmark in person.iter_mut() {
            landmark.x = 1.0 - landmark.x;
        }
    }
}

fn mirror_objects(result: &mut ObjectResult, width: f32) {
    for det in &mut result.detections {
        let b = det.bounding_box;
        det.bounding_box = BoundingBox::new(width - b.right, b.top, width - b.left, b.bottom);
    }
}

// ----------------------------------------------------------------------------
// ScriptedPoseModel
// ----------------------------------------------------------------------------

/// Replays a fixed sequence of pose results, cycling.
///
/// Each scripted step is returned `repeat` times before advancing. Scripts
/// are authored in camera space; mirrored frames flip the x axis.
pub struct ScriptedPoseModel {
    script: Vec<PoseResult>,
    repeat: usize,
    calls: usize,
}

impl ScriptedPoseModel {
    pub fn new(script: Vec<PoseResult>) -> Self {
        Self {
            script,
            repeat: 1,
            calls: 0,
        }
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Desk scenario: writing, then a raised phone, then hands together,
    /// then nobody in frame.
    pub fn desk_scenario() -> Self {
        Self::new(vec![
            PoseResult::single(arms_pose(0.3, 0.8, 0.45, 0.55)),
            PoseResult::single(arms_pose(0.3, 0.1, 0.45, 0.55)),
            PoseResult::single(arms_pose(0.3, 0.2, 0.35, 0.65)),
            PoseResult::single(arms_pose(0.3, 0.4, 0.2, 0.8)),
            PoseResult::default(),
        ])
    }

    fn next_step(&mut self) -> PoseResult {
        if self.script.is_empty() {
            return PoseResult::default();
        }
        let idx = (self.calls / self.repeat) % self.script.len();
        self.calls += 1;
        self.script[idx].clone()
    }
}

impl PoseModel for ScriptedPoseModel {
    fn name(&self) -> &'static str {
        "scripted-pose"
    }

    fn infer(&mut self, frame: &Frame, mirrored: bool) -> Result<PoseResult> {
        let mut result = self.next_step();
        if mirrored {
            mirror_pose(&mut result);
        }
        result.image_width = frame.width;
        result.image_height = frame.height;
        Ok(result)
    }
}

// ----------------------------------------------------------------------------
// ScriptedObjectModel
// ----------------------------------------------------------------------------

/// Replays a fixed sequence of object results, cycling.
pub struct ScriptedObjectModel {
    script: Vec<ObjectResult>,
    repeat: usize,
    calls: usize,
}

impl ScriptedObjectModel {
    pub fn new(script: Vec<ObjectResult>) -> Self {
        Self {
            script,
            repeat: 1,
            calls: 0,
        }
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Companion to `ScriptedPoseModel::desk_scenario`: a phone shows up
    /// during the second step only.
    pub fn desk_scenario() -> Self {
        let phone = labeled_detection(
            "cell phone",
            0.82,
            BoundingBox::new(260.0, 40.0, 380.0, 200.0),
        );
        let book = labeled_detection("book", 0.71, BoundingBox::new(180.0, 330.0, 460.0, 470.0));
        Self::new(vec![
            ObjectResult::new(vec![book.clone()]),
            ObjectResult::new(vec![phone]),
            ObjectResult::default(),
            ObjectResult::new(vec![book]),
            ObjectResult::default(),
        ])
    }

    fn next_step(&mut self) -> ObjectResult {
        if self.script.is_empty() {
            return ObjectResult::default();
        }
        let idx = (self.calls / self.repeat) % self.script.len();
        self.calls += 1;
        self.script[idx].clone()
    }
}

impl ObjectModel for ScriptedObjectModel {
    fn name(&self) -> &'static str {
        "scripted-object"
    }

    fn infer(&mut self, frame: &Frame, mirrored: bool) -> Result<ObjectResult> {
        let mut result = self.next_step();
        if mirrored {
            mirror_objects(&mut result, frame.width as f32);
        }
        result.image_width = frame.width;
        result.image_height = frame.height;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4], 640, 480, 0, 0)
    }

    #[test]
    fn arms_pose_places_key_landmarks() {
        let pose = arms_pose(0.3, 0.1, 0.45, 0.55);
        assert_eq!(pose.len(), POSE_LANDMARK_COUNT);
        assert_eq!(pose[LEFT_SHOULDER].y, 0.3);
        assert_eq!(pose[RIGHT_WRIST], Landmark::new(0.55, 0.1));
    }

    #[test]
    fn script_repeats_then_cycles() {
        let mut model = ScriptedPoseModel::new(vec![
            PoseResult::single(arms_pose(0.3, 0.8, 0.4, 0.6)),
            PoseResult::default(),
        ])
        .with_repeat(2);
        let f = frame();

        let people: Vec<bool> = (0..5)
            .map(|_| model.infer(&f, false).unwrap().has_person())
            .collect();
        assert_eq!(people, vec![true, true, false, false, true]);
    }

    #[test]
    fn mirrored_frames_flip_x() {
        let mut model =
            ScriptedPoseModel::new(vec![PoseResult::single(arms_pose(0.3, 0.1, 0.2, 0.3))]);
        let result = model.infer(&frame(), true).unwrap();
        let landmarks = result.primary().unwrap();
        assert!((landmarks[LEFT_WRIST].x - 0.8).abs() < 1e-6);

        let mut objects = ScriptedObjectModel::new(vec![ObjectResult::new(vec![labeled_detection(
            "cell phone",
            0.9,
            BoundingBox::new(0.0, 10.0, 100.0, 50.0),
        )])]);
        let result = objects.infer(&frame(), true).unwrap();
        assert_eq!(result.detections[0].bounding_box, BoundingBox::new(540.0, 10.0, 640.0, 50.0));
        assert_eq!(result.image_width, 640);
    }

    #[test]
    fn empty_script_yields_empty_results() {
        let mut model = ScriptedObjectModel::new(vec![]);
        assert!(model.infer(&frame(), false).unwrap().detections.is_empty());
    }
}
