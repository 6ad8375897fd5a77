//! Recorded detector results.
//!
//! A replay file is JSON lines, one detector completion per line, keyed by
//! modality:
//!
//! ```text
//! {"pose": {"landmarks": [[{"x": 0.5, "y": 0.5}, ...]]}}
//! {"object": {"detections": [...]}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::{ObjectResult, PoseResult};
use crate::fusion::FusionEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayRecord {
    Pose(PoseResult),
    Object(ObjectResult),
}

impl ReplayRecord {
    pub fn into_event(self) -> FusionEvent {
        match self {
            ReplayRecord::Pose(result) => FusionEvent::PoseUpdated(result),
            ReplayRecord::Object(result) => FusionEvent::ObjectUpdated(result),
        }
    }
}

/// Parse one replay line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<ReplayRecord>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let record = serde_json::from_str(trimmed).map_err(|e| anyhow!("invalid record: {}", e))?;
    Ok(Some(record))
}
