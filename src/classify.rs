//! Action classification.
//!
//! A pure mapping from the latest pose landmarks and object detections to a
//! discrete `Status`. Landmark indices follow the 33-point pose skeleton:
//! a replacement pose model must keep the same indexing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detect::{Landmark, ObjectResult, PoseResult};

pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;

/// Landmark count below which a pose is still "analyzing".
pub const MIN_CLASSIFIABLE_LANDMARKS: usize = 17;

// ----------------------------------------------------------------------------
// Status
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No pose result yet, or the result contains no person.
    NoPerson,
    /// A person is present but the skeleton is incomplete.
    Analyzing,
    PhoneUseConfirmed,
    PhoneUseSuspected,
    Writing,
    NormalOrUnknown,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::NoPerson => "No person detected",
            Status::Analyzing => "Analyzing...",
            Status::PhoneUseConfirmed => "Caught! Using a phone",
            Status::PhoneUseSuspected => "Possibly using a phone / holding something",
            Status::Writing => "Writing",
            Status::NormalOrUnknown => "Normal posture / unknown action",
        }
    }

    pub fn color(&self) -> StatusColor {
        match self {
            Status::NoPerson | Status::Analyzing => StatusColor::NoPerson,
            Status::PhoneUseConfirmed | Status::PhoneUseSuspected => StatusColor::PhoneUse,
            Status::Writing => StatusColor::Writing,
            Status::NormalOrUnknown => StatusColor::Neutral,
        }
    }

    pub fn is_no_person_or_analyzing(&self) -> bool {
        matches!(self, Status::NoPerson | Status::Analyzing)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Background color category of the status banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Neutral,
    Writing,
    PhoneUse,
    NoPerson,
}

impl StatusColor {
    /// Semi-transparent ARGB value.
    pub fn argb(&self) -> u32 {
        match self {
            StatusColor::Neutral => 0x88FF_9800,
            StatusColor::Writing => 0x884C_AF50,
            StatusColor::PhoneUse => 0x88F4_4336,
            StatusColor::NoPerson => 0x8800_0000,
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:08X}", self.argb())
    }
}

// ----------------------------------------------------------------------------
// Geometry
// ----------------------------------------------------------------------------

/// Shoulder/wrist measurements in normalized image space (y grows downward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmGeometry {
    pub shoulder_avg_y: f32,
    pub wrist_avg_y: f32,
    /// `wrist_avg_y - shoulder_avg_y`. Negative means hands above shoulders.
    pub vertical_diff: f32,
    pub horizontal_gap: f32,
}

impl ArmGeometry {
    /// `None` when the skeleton has fewer than `MIN_CLASSIFIABLE_LANDMARKS` points.
    pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
        if landmarks.len() < MIN_CLASSIFIABLE_LANDMARKS {
            return None;
        }
        let left_shoulder = landmarks[LEFT_SHOULDER];
        let right_shoulder = landmarks[RIGHT_SHOULDER];
        let left_wrist = landmarks[LEFT_WRIST];
        let right_wrist = landmarks[RIGHT_WRIST];

        let shoulder_avg_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let wrist_avg_y = (left_wrist.y + right_wrist.y) / 2.0;
        Some(Self {
            shoulder_avg_y,
            wrist_avg_y,
            vertical_diff: wrist_avg_y - shoulder_avg_y,
            horizontal_gap: (left_wrist.x - right_wrist.x).abs(),
        })
    }
}

// ----------------------------------------------------------------------------
// Classifier
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierThresholds {
    /// Hands count as raised when `vertical_diff` is below this.
    pub hands_raised_max: f32,
    /// Hands count as together when `horizontal_gap` is below this.
    pub hands_together_max: f32,
    /// Writing when `vertical_diff` is above this.
    pub writing_min: f32,
    pub phone_label: String,
    /// Applied on top of the object detector's own score threshold.
    pub phone_min_confidence: f32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            hands_raised_max: 0.25,
            hands_together_max: 0.4,
            writing_min: 0.45,
            phone_label: "cell phone".to_string(),
            phone_min_confidence: 0.4,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionClassifier {
    thresholds: ClassifierThresholds,
}

impl ActionClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify the latest pose and object results. Either may be absent.
    ///
    /// Rules, first match wins:
    /// 1. no person -> `NoPerson`; incomplete skeleton -> `Analyzing`
    /// 2. hands raised and phone visible -> `PhoneUseConfirmed`
    /// 3. hands raised and together -> `PhoneUseSuspected`
    /// 4. hands well below shoulders -> `Writing`
    /// 5. otherwise `NormalOrUnknown`
    pub fn classify(&self, pose: Option<&PoseResult>, objects: Option<&ObjectResult>) -> Status {
        let Some(landmarks) = pose.and_then(PoseResult::primary) else {
            return Status::NoPerson;
        };
        let Some(geometry) = ArmGeometry::from_landmarks(landmarks) else {
            return Status::Analyzing;
        };

        let t = &self.thresholds;
        let hands_raised = geometry.vertical_diff < t.hands_raised_max;
        let hands_together = geometry.horizontal_gap < t.hands_together_max;

        if hands_raised && self.phone_visible(objects) {
            Status::PhoneUseConfirmed
        } else if hands_raised && hands_together {
            Status::PhoneUseSuspected
        } else if geometry.vertical_diff > t.writing_min {
            Status::Writing
        } else {
            Status::NormalOrUnknown
        }
    }

    /// True when any detection carries the phone category above threshold.
    pub fn phone_visible(&self, objects: Option<&ObjectResult>) -> bool {
        let Some(objects) = objects else {
            return false;
        };
        objects
            .detections
            .iter()
            .flat_map(|det| det.categories.iter())
            .any(|c| {
                c.label == self.thresholds.phone_label
                    && c.score > self.thresholds.phone_min_confidence
            })
    }
}

/// Classify with default thresholds.
pub fn classify(pose: Option<&PoseResult>, objects: Option<&ObjectResult>) -> Status {
    ActionClassifier::default().classify(pose, objects)
}
