//! Synthetic camera source.
//!
//! Generates RGBA frames at a fixed rate so the pipeline can run without a
//! camera. Pixel content is a slowly changing gradient plus per-frame noise;
//! the scripted detectors do not look at it, but the buffers are realistic in
//! size and are zeroized on release like real camera buffers.

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use rand::RngCore;

use crate::frame::{Frame, ReleaseCounter, BYTES_PER_PIXEL};

/// Largest accepted width or height.
pub const MAX_FRAME_DIMENSION: u32 = 8192;

#[derive(Clone, Debug)]
pub struct SyntheticCameraConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second. 0 disables pacing (frames as fast as requested).
    pub target_fps: u32,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 15,
        }
    }
}

pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    started: Instant,
    next_due: Instant,
    frame_count: u64,
    /// Simulated scene brightness, drifts every 50 frames.
    scene_state: u8,
    releases: Option<ReleaseCounter>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            bail!(
                "synthetic camera needs a non-zero size, got {}x{}",
                config.width,
                config.height
            );
        }
        if config.width > MAX_FRAME_DIMENSION || config.height > MAX_FRAME_DIMENSION {
            bail!(
                "synthetic camera size {}x{} exceeds {} per side",
                config.width,
                config.height,
                MAX_FRAME_DIMENSION
            );
        }
        let now = Instant::now();
        log::info!(
            "synthetic camera: {}x{} @ {} fps",
            config.width,
            config.height,
            config.target_fps
        );
        Ok(Self {
            config,
            started: now,
            next_due: now,
            frame_count: 0,
            scene_state: 0,
            releases: None,
        })
    }

    /// Count every frame this source hands out when it is released.
    pub fn with_release_counter(mut self, counter: ReleaseCounter) -> Self {
        self.releases = Some(counter);
        self
    }

    /// Produce the next frame, sleeping to honor `target_fps`.
    pub fn next_frame(&mut self) -> Result<Frame> {
        self.pace();

        let sequence = self.frame_count;
        self.frame_count += 1;
        if sequence > 0 && sequence % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(16);
        }

        let pixels = self.generate_pixels(sequence);
        let timestamp_ms = self.started.elapsed().as_millis() as u64;
        let frame = Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            sequence,
            timestamp_ms,
        );
        Ok(match &self.releases {
            Some(counter) => counter.attach(frame),
            None => frame,
        })
    }

    fn pace(&mut self) {
        if self.config.target_fps == 0 {
            return;
        }
        let now = Instant::now();
        if self.next_due > now {
            std::thread::sleep(self.next_due - now);
        }
        let interval = Duration::from_secs_f64(1.0 / self.config.target_fps as f64);
        // Never try to catch up on missed frames.
        self.next_due = self.next_due.max(now) + interval;
    }

    fn generate_pixels(&self, sequence: u64) -> Vec<u8> {
        let pixel_count = self.config.width as usize * self.config.height as usize;
        let mut pixels = vec![0u8; pixel_count * BYTES_PER_PIXEL];

        let mut noise = vec![0u8; pixel_count];
        rand::thread_rng().fill_bytes(&mut noise);

        for (i, px) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let base = ((i as u64 + sequence) % 256) as u8;
            let n = noise[i] >> 5;
            px[0] = base.wrapping_add(self.scene_state).wrapping_add(n);
            px[1] = base.wrapping_add(n);
            px[2] = self.scene_state.wrapping_add(n);
            px[3] = 0xFF;
        }
        pixels
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}
