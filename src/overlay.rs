//! Overlay coordinate mapping.
//!
//! The preview surface shows the camera image with cover scaling: the image
//! is uniformly scaled until it fills the view and the overflow is cropped
//! around the center. `CoverTransform` applies the same mapping to detector
//! output so skeletons and boxes line up with the preview.

use serde::{Deserialize, Serialize};

use crate::detect::{BoundingBox, Landmark, ObjectResult, PoseResult};

/// Bone pairs of the 33-point pose skeleton.
pub const POSE_CONNECTIONS: [(usize, usize); 26] = [
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
    (15, 21),
    (16, 22),
    (15, 17),
    (16, 18),
    (15, 19),
    (16, 20),
    (17, 19),
    (18, 20),
];

pub const LANDMARK_RADIUS: f32 = 8.0;

/// Box labels are drawn this far above the top edge.
pub const LABEL_OFFSET_Y: f32 = 20.0;

/// Destination surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

impl ViewSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for ViewSize {
    fn default() -> Self {
        Self::new(1080.0, 1920.0)
    }
}

// ----------------------------------------------------------------------------
// CoverTransform
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    image_width: f32,
    image_height: f32,
}

impl CoverTransform {
    /// Image sizes of 0 are treated as the 1x1 "no detection yet" default.
    pub fn new(view: ViewSize, image_width: u32, image_height: u32) -> Self {
        let image_width = image_width.max(1) as f32;
        let image_height = image_height.max(1) as f32;
        let scale = (view.width / image_width).max(view.height / image_height);
        Self {
            scale,
            offset_x: (view.width - image_width * scale) / 2.0,
            offset_y: (view.height - image_height * scale) / 2.0,
            image_width,
            image_height,
        }
    }

    /// Map a normalized landmark to view pixels.
    pub fn map_landmark(&self, landmark: Landmark) -> (f32, f32) {
        (
            landmark.x * self.image_width * self.scale + self.offset_x,
            landmark.y * self.image_height * self.scale + self.offset_y,
        )
    }

    /// Map a point already in image pixels to view pixels.
    pub fn map_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    pub fn map_box(&self, b: &BoundingBox) -> BoundingBox {
        let (left, top) = self.map_pixel(b.left, b.top);
        let (right, bottom) = self.map_pixel(b.right, b.bottom);
        BoundingBox::new(left, top, right, bottom)
    }
}

// ----------------------------------------------------------------------------
// Draw commands
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Line { from: (f32, f32), to: (f32, f32) },
    Circle { center: (f32, f32), radius: f32 },
    Rect(BoundingBox),
    Text { at: (f32, f32), text: String },
}

/// Everything to draw for one fused update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub image_width: u32,
    pub image_height: u32,
    pub commands: Vec<DrawCommand>,
}

impl Overlay {
    /// Nothing drawn; image size reset to the 1x1 default.
    pub fn cleared() -> Self {
        Self {
            image_width: 1,
            image_height: 1,
            commands: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Receives overlay updates. The concrete UI marshals them to its own thread.
///
/// Called outside the fusion state lock; an overlay older than one already
/// drawn is skipped.
pub trait OverlaySink: Send + Sync {
    fn draw(&self, overlay: &Overlay);
}

/// Build draw commands for the latest results.
///
/// With no person in view the overlay is cleared, boxes included. Landmarks
/// are mapped with the pose input size and boxes with the object input size.
pub fn build_overlay(
    view: ViewSize,
    pose: Option<&PoseResult>,
    objects: Option<&ObjectResult>,
) -> Overlay {
    let Some((pose, landmarks)) = pose.and_then(|p| p.primary().map(|l| (p, l))) else {
        return Overlay::cleared();
    };

    let mut commands = Vec::new();

    if let Some(objects) = objects {
        let transform = CoverTransform::new(view, objects.image_width, objects.image_height);
        for det in &objects.detections {
            let mapped = transform.map_box(&det.bounding_box);
            commands.push(DrawCommand::Rect(mapped));
            if let Some(category) = det.categories.first() {
                commands.push(DrawCommand::Text {
                    at: (mapped.left, mapped.top - LABEL_OFFSET_Y),
                    text: format!(
                        "{} {}%",
                        category.label,
                        (category.score * 100.0).round() as i32
                    ),
                });
            }
        }
    }

    let transform = CoverTransform::new(view, pose.image_width, pose.image_height);
    for &(start, end) in POSE_CONNECTIONS.iter() {
        let (Some(&a), Some(&b)) = (landmarks.get(start), landmarks.get(end)) else {
            continue;
        };
        commands.push(DrawCommand::Line {
            from: transform.map_landmark(a),
            to: transform.map_landmark(b),
        });
    }
    for &landmark in landmarks {
        commands.push(DrawCommand::Circle {
            center: transform.map_landmark(landmark),
            radius: LANDMARK_RADIUS,
        });
    }

    Overlay {
        image_width: pose.image_width.max(1),
        image_height: pose.image_height.max(1),
        commands,
    }
}
