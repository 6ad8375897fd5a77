//! Frame sources.
//!
//! Sources hand out owned `Frame`s in capture order. The consumer (the frame
//! scheduler) takes ownership of every frame it receives; a source never
//! keeps a reference to a buffer it has produced.

pub mod synthetic;

pub use synthetic::{SyntheticCamera, SyntheticCameraConfig, MAX_FRAME_DIMENSION};
