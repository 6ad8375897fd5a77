use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::classify::ClassifierThresholds;
use crate::detect::ObjectDetectorOptions;
use crate::fusion::FusionSettings;
use crate::ingest::{SyntheticCameraConfig, MAX_FRAME_DIMENSION};
use crate::overlay::ViewSize;
use crate::smooth::DEFAULT_SMOOTHING_WINDOW;

const DEFAULT_CAMERA_MIRRORED: bool = true;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 15;

#[derive(Debug, Deserialize, Default)]
struct FusionConfigFile {
    smoothing: Option<SmoothingConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    object_detector: Option<ObjectDetectorConfigFile>,
    camera: Option<CameraConfigFile>,
    view: Option<ViewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SmoothingConfigFile {
    window: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    hands_raised_max: Option<f32>,
    hands_together_max: Option<f32>,
    writing_min: Option<f32>,
    phone_label: Option<String>,
    phone_min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ObjectDetectorConfigFile {
    max_results: Option<usize>,
    score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    mirrored: Option<bool>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ViewConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub smoothing_window: usize,
    pub classifier: ClassifierThresholds,
    pub object_detector: ObjectDetectorOptions,
    pub camera: CameraSettings,
    pub view: ViewSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// Front camera: detector input is mirrored horizontally.
    pub mirrored: bool,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            mirrored: DEFAULT_CAMERA_MIRRORED,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            target_fps: DEFAULT_CAMERA_FPS,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            classifier: ClassifierThresholds::default(),
            object_detector: ObjectDetectorOptions::default(),
            camera: CameraSettings::default(),
            view: ViewSize::default(),
        }
    }
}

impl FusionConfig {
    /// Read `$FUSION_CONFIG` (if set), fill defaults, apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FUSION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FusionConfigFile) -> Self {
        let defaults = Self::default();

        let smoothing_window = file
            .smoothing
            .and_then(|smoothing| smoothing.window)
            .unwrap_or(defaults.smoothing_window);

        let classifier = match file.classifier {
            Some(c) => ClassifierThresholds {
                hands_raised_max: c
                    .hands_raised_max
                    .unwrap_or(defaults.classifier.hands_raised_max),
                hands_together_max: c
                    .hands_together_max
                    .unwrap_or(defaults.classifier.hands_together_max),
                writing_min: c.writing_min.unwrap_or(defaults.classifier.writing_min),
                phone_label: c.phone_label.unwrap_or(defaults.classifier.phone_label),
                phone_min_confidence: c
                    .phone_min_confidence
                    .unwrap_or(defaults.classifier.phone_min_confidence),
            },
            None => defaults.classifier,
        };

        let object_detector = ObjectDetectorOptions {
            max_results: file
                .object_detector
                .as_ref()
                .and_then(|od| od.max_results)
                .unwrap_or(defaults.object_detector.max_results),
            score_threshold: file
                .object_detector
                .as_ref()
                .and_then(|od| od.score_threshold)
                .unwrap_or(defaults.object_detector.score_threshold),
        };

        let camera = CameraSettings {
            mirrored: file
                .camera
                .as_ref()
                .and_then(|camera| camera.mirrored)
                .unwrap_or(defaults.camera.mirrored),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(defaults.camera.width),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(defaults.camera.height),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(defaults.camera.target_fps),
        };

        let view = ViewSize {
            width: file
                .view
                .as_ref()
                .and_then(|view| view.width)
                .unwrap_or(defaults.view.width),
            height: file
                .view
                .as_ref()
                .and_then(|view| view.height)
                .unwrap_or(defaults.view.height),
        };

        Self {
            smoothing_window,
            classifier,
            object_detector,
            camera,
            view,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(window) = std::env::var("FUSION_SMOOTHING_WINDOW") {
            self.smoothing_window = window.trim().parse().map_err(|_| {
                anyhow!("FUSION_SMOOTHING_WINDOW must be a positive integer")
            })?;
        }
        if let Ok(confidence) = std::env::var("FUSION_PHONE_CONFIDENCE") {
            self.classifier.phone_min_confidence = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("FUSION_PHONE_CONFIDENCE must be a number"))?;
        }
        if let Ok(threshold) = std::env::var("FUSION_OBJECT_SCORE_THRESHOLD") {
            self.object_detector.score_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("FUSION_OBJECT_SCORE_THRESHOLD must be a number"))?;
        }
        if let Ok(fps) = std::env::var("FUSION_CAMERA_FPS") {
            self.camera.target_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("FUSION_CAMERA_FPS must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.smoothing_window == 0 {
            return Err(anyhow!("smoothing window must be at least 1"));
        }
        let c = &self.classifier;
        for (name, value) in [
            ("hands_raised_max", c.hands_raised_max),
            ("hands_together_max", c.hands_together_max),
            ("writing_min", c.writing_min),
        ] {
            if !value.is_finite() {
                return Err(anyhow!("classifier.{} must be finite", name));
            }
        }
        check_unit("classifier.phone_min_confidence", c.phone_min_confidence)?;
        if c.phone_label.trim().is_empty() {
            return Err(anyhow!("classifier.phone_label must not be empty"));
        }
        if self.object_detector.max_results == 0 {
            return Err(anyhow!("object_detector.max_results must be at least 1"));
        }
        check_unit(
            "object_detector.score_threshold",
            self.object_detector.score_threshold,
        )?;
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera size must be non-zero"));
        }
        if self.camera.width > MAX_FRAME_DIMENSION || self.camera.height > MAX_FRAME_DIMENSION {
            return Err(anyhow!(
                "camera size {}x{} exceeds {} per side",
                self.camera.width,
                self.camera.height,
                MAX_FRAME_DIMENSION
            ));
        }
        if !(self.view.width > 0.0 && self.view.height > 0.0) {
            return Err(anyhow!("view size must be positive"));
        }
        Ok(())
    }

    pub fn fusion_settings(&self) -> FusionSettings {
        FusionSettings {
            smoothing_window: self.smoothing_window,
            thresholds: self.classifier.clone(),
            view: self.view,
        }
    }

    pub fn camera_config(&self) -> SyntheticCameraConfig {
        SyntheticCameraConfig {
            width: self.camera.width,
            height: self.camera.height,
            target_fps: self.camera.target_fps,
        }
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<FusionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
