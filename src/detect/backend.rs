use anyhow::Result;

use crate::detect::result::{ObjectResult, PoseResult};
use crate::frame::Frame;

/// Asynchronous pose detector.
///
/// `detect_async` takes ownership of the frame. The implementation is
/// responsible for releasing it, including on every error path. Results are
/// delivered later as `FusionEvent::PoseUpdated` on a completion thread.
pub trait PoseDetector: Send {
    fn name(&self) -> &'static str;

    fn detect_async(&mut self, frame: Frame, mirrored: bool) -> Result<()>;

    /// Stop accepting frames. Completions already in flight may still arrive.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Asynchronous object detector. Same ownership contract as `PoseDetector`.
pub trait ObjectDetector: Send {
    fn name(&self) -> &'static str;

    fn detect_async(&mut self, frame: Frame, mirrored: bool) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Synchronous pose inference engine.
///
/// Implementations must treat the pixels as read-only and must not keep them
/// beyond the `infer` call.
pub trait PoseModel: Send {
    fn name(&self) -> &'static str;

    fn infer(&mut self, frame: &Frame, mirrored: bool) -> Result<PoseResult>;

    /// Optional warm-up hook. A failure here is an initialization failure.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Synchronous object inference engine.
pub trait ObjectModel: Send {
    fn name(&self) -> &'static str;

    fn infer(&mut self, frame: &Frame, mirrored: bool) -> Result<ObjectResult>;

    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Upstream object detector options.
///
/// These run before classification, so the classifier's own per-category
/// threshold only ever sees detections that already passed `score_threshold`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectDetectorOptions {
    pub max_results: usize,
    pub score_threshold: f32,
}

impl Default for ObjectDetectorOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            score_threshold: 0.6,
        }
    }
}

impl ObjectDetectorOptions {
    /// Keep confident detections only, best first, at most `max_results`.
    pub fn apply(&self, mut result: ObjectResult) -> ObjectResult {
        result
            .detections
            .retain(|det| det.best_score() >= self.score_threshold);
        result
            .detections
            .sort_by(|a, b| b.best_score().total_cmp(&a.best_score()));
        result.detections.truncate(self.max_results);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::{BoundingBox, Category, Detection};

    fn det(label: &str, score: f32) -> Detection {
        Detection::new(BoundingBox::default(), vec![Category::new(label, score)])
    }

    #[test]
    fn options_filter_and_truncate() {
        let options = ObjectDetectorOptions {
            max_results: 2,
            score_threshold: 0.6,
        };
        let result = ObjectResult::new(vec![
            det("cup", 0.61),
            det("cell phone", 0.5),
            det("book", 0.9),
            det("laptop", 0.75),
        ]);

        let filtered = options.apply(result);
        let labels: Vec<&str> = filtered
            .detections
            .iter()
            .map(|d| d.categories[0].label.as_str())
            .collect();
        assert_eq!(labels, vec!["book", "laptop"]);
    }

    #[test]
    fn default_options_match_upstream_setup() {
        let options = ObjectDetectorOptions::default();
        assert_eq!(options.max_results, 5);
        assert_eq!(options.score_threshold, 0.6);
    }
}
