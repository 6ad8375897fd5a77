use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of landmarks in one full pose skeleton.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// The two detector modalities that feed fusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Pose,
    Object,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Pose => f.write_str("pose"),
            Modality::Object => f.write_str("object"),
        }
    }
}

// ----------------------------------------------------------------------------
// Pose results
// ----------------------------------------------------------------------------

/// Normalized 2D keypoint, `(0,0)` is the top-left of the detector input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Output of the pose detector for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseResult {
    /// One landmark sequence per detected person. Only index 0 is consumed.
    pub landmarks: Vec<Vec<Landmark>>,
    /// Detector input size in pixels.
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    /// Capture time of the frame this result was computed from.
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub inference_ms: u64,
}

impl PoseResult {
    pub fn single(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks: vec![landmarks],
            ..Self::default()
        }
    }

    /// Landmarks of the first detected person, if any.
    pub fn primary(&self) -> Option<&[Landmark]> {
        self.landmarks.first().map(Vec::as_slice)
    }

    pub fn has_person(&self) -> bool {
        !self.landmarks.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Object results
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub score: f32,
}

impl Category {
    pub fn new(label: &str, score: f32) -> Self {
        Self {
            label: label.to_string(),
            score,
        }
    }
}

/// Axis-aligned box in detector-input pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    /// Ranked category guesses, best first.
    pub categories: Vec<Category>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<Category>) -> Self {
        Self {
            bounding_box,
            categories,
        }
    }

    /// Highest category score, 0 when there are no categories.
    pub fn best_score(&self) -> f32 {
        self.categories
            .iter()
            .map(|c| c.score)
            .fold(0.0, f32::max)
    }
}

/// Output of the object detector for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectResult {
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub inference_ms: u64,
}

impl ObjectResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_is_first_person() {
        let pose = PoseResult {
            landmarks: vec![vec![Landmark::new(0.1, 0.2)], vec![Landmark::new(0.9, 0.9)]],
            ..PoseResult::default()
        };
        assert_eq!(pose.primary(), Some(&[Landmark::new(0.1, 0.2)][..]));
        assert!(PoseResult::default().primary().is_none());
    }

    #[test]
    fn best_score_handles_empty_categories() {
        let det = Detection::new(BoundingBox::default(), vec![]);
        assert_eq!(det.best_score(), 0.0);

        let det = Detection::new(
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            vec![Category::new("cup", 0.3), Category::new("cell phone", 0.7)],
        );
        assert_eq!(det.best_score(), 0.7);
    }

    #[test]
    fn results_deserialize_without_metadata() {
        let json = r#"{"detections":[{"bounding_box":{"left":1,"top":2,"right":3,"bottom":4},
            "categories":[{"label":"cell phone","score":0.9}]}]}"#;
        let result: ObjectResult = serde_json::from_str(json).expect("object result");
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.image_width, 0);
        assert_eq!(
            result.detections[0].bounding_box,
            BoundingBox::new(1.0, 2.0, 3.0, 4.0)
        );
    }
}
