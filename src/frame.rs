//! Camera frame ownership.
//!
//! A `Frame` owns its pixel buffer. Whoever holds the `Frame` is responsible
//! for releasing it, and releasing happens in `Drop`, so moving a frame into a
//! detector (or dropping it when no detector is available) releases it exactly
//! once.
//!
//! - `Frame`: Owned RGBA buffer plus capture metadata. Not `Clone`.
//! - `ReleaseCounter`: Shared hook that counts released frames.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use zeroize::Zeroize;

/// Bytes per pixel for RGBA_8888 frames.
pub const BYTES_PER_PIXEL: usize = 4;

type ReleaseHook = Box<dyn FnOnce(u64) + Send>;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Owned camera frame.
///
/// There is no `Clone` impl: a frame buffer has exactly one owner at a time,
/// and the owner's drop is the release.
pub struct Frame {
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Capture sequence number, starting at 0.
    pub sequence: u64,

    /// Monotonic capture time in milliseconds.
    pub timestamp_ms: u64,

    release: Option<ReleaseHook>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64, timestamp_ms: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
            timestamp_ms,
            release: None,
        }
    }

    /// Attach a hook that runs once when the frame is released.
    ///
    /// The hook receives the frame sequence number.
    pub fn with_release_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    /// Read-only access to the pixels for inference.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Release the frame now. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        // Wipe the buffer before handing it back.
        self.data.zeroize();
        if let Some(hook) = self.release.take() {
            hook(self.sequence);
        }
    }
}

// ----------------------------------------------------------------------------
// ReleaseCounter
// ----------------------------------------------------------------------------

/// Counts frame releases across threads.
#[derive(Clone, Debug, Default)]
pub struct ReleaseCounter {
    released: Arc<AtomicU64>,
}

impl ReleaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach this counter to a frame.
    pub fn attach(&self, frame: Frame) -> Frame {
        let released = self.released.clone();
        frame.with_release_hook(move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}
