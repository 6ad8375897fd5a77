use std::collections::VecDeque;

use crate::classify::Status;

/// Default majority-vote window.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;

/// Result of pushing one classification through the smoother.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stabilized {
    /// Mode of the current window.
    pub status: Status,
    /// True when `status` differs from what was displayed before this push.
    pub changed: bool,
}

/// Bounded history + majority vote.
///
/// The window is a FIFO of the most recent classifications (newest at the
/// back). Ties between equally frequent statuses go to the one that appears
/// first when scanning the window oldest to newest.
pub struct StatusSmoother {
    history: VecDeque<Status>,
    window: usize,
    displayed: Option<Status>,
}

impl StatusSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            history: VecDeque::with_capacity(window + 1),
            window,
            displayed: None,
        }
    }

    /// Record a classification and return the stabilized status.
    pub fn push(&mut self, status: Status) -> Stabilized {
        self.history.push_back(status);
        while self.history.len() > self.window {
            self.history.pop_front();
        }

        // History is non-empty here, so the fallback is never used.
        let mode = self.mode().unwrap_or(status);
        let changed = self.displayed != Some(mode);
        self.displayed = Some(mode);
        Stabilized {
            status: mode,
            changed,
        }
    }

    /// Most frequent status in the window, first-seen wins ties.
    pub fn mode(&self) -> Option<Status> {
        let mut counts: Vec<(Status, usize)> = Vec::new();
        for status in &self.history {
            match counts.iter_mut().find(|(s, _)| s == status) {
                Some((_, count)) => *count += 1,
                None => counts.push((*status, 1)),
            }
        }

        let mut best: Option<(Status, usize)> = None;
        for (status, count) in counts {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((status, count));
            }
        }
        best.map(|(status, _)| status)
    }

    pub fn displayed(&self) -> Option<Status> {
        self.displayed
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn history(&self) -> impl Iterator<Item = &Status> + '_ {
        self.history.iter()
    }
}

impl Default for StatusSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}
