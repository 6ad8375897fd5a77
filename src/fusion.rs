//! Result fusion.
//!
//! Both detectors complete asynchronously, on their own threads and in any
//! relative order. `FusionEngine` keeps only the latest result per modality
//! and re-evaluates on every update:
//!
//! 1. overwrite the slot for the updated modality
//! 2. classify the latest pose + latest objects (either may be absent)
//! 3. push the classification through the smoother
//! 4. notify the display sink when the stabilized label changes
//! 5. hand a fresh overlay to the overlay sink, if one is attached
//!
//! Steps 1-4 run under one mutex: a slot swap, a bounded-queue push and the
//! label hand-off. The overlay is built and drawn after the lock is released,
//! from a copy of the two slots. The liveness flag is re-checked under the
//! lock, so once `shutdown()` returns no completion touches the state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::classify::{ActionClassifier, ClassifierThresholds, Status};
use crate::detect::{Modality, ObjectResult, PoseResult};
use crate::display::DisplaySink;
use crate::overlay::{build_overlay, OverlaySink, ViewSize};
use crate::smooth::{Stabilized, StatusSmoother, DEFAULT_SMOOTHING_WINDOW};

/// How often the event loop re-checks the liveness flag while idle.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Detector completion delivered to the fusion loop.
#[derive(Clone, Debug, PartialEq)]
pub enum FusionEvent {
    PoseUpdated(PoseResult),
    ObjectUpdated(ObjectResult),
    DetectorFailed { modality: Modality, message: String },
}

impl FusionEvent {
    /// Record the source frame time and inference latency on a result.
    pub(crate) fn stamp(&mut self, timestamp_ms: u64, inference_ms: u64) {
        match self {
            FusionEvent::PoseUpdated(result) => {
                result.timestamp_ms = timestamp_ms;
                result.inference_ms = inference_ms;
            }
            FusionEvent::ObjectUpdated(result) => {
                result.timestamp_ms = timestamp_ms;
                result.inference_ms = inference_ms;
            }
            FusionEvent::DetectorFailed { .. } => {}
        }
    }
}

/// Completion side of the fusion channel, cloned into each detector.
pub type EventSender = mpsc::Sender<FusionEvent>;

// ----------------------------------------------------------------------------
// State
// ----------------------------------------------------------------------------

/// Latest result per modality. No history beyond "latest".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FusionState {
    pub pose: Option<PoseResult>,
    pub object: Option<ObjectResult>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub pose_updates: u64,
    pub object_updates: u64,
    pub detector_failures: u64,
    pub evaluations: u64,
    pub label_changes: u64,
}

#[derive(Clone, Debug)]
pub struct FusionSettings {
    pub smoothing_window: usize,
    pub thresholds: ClassifierThresholds,
    pub view: ViewSize,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            thresholds: ClassifierThresholds::default(),
            view: ViewSize::default(),
        }
    }
}

struct Inner {
    state: FusionState,
    classifier: ActionClassifier,
    smoother: StatusSmoother,
    view: ViewSize,
    stats: FusionStats,
}

// ----------------------------------------------------------------------------
// FusionEngine
// ----------------------------------------------------------------------------

pub struct FusionEngine {
    inner: Mutex<Inner>,
    alive: AtomicBool,
    display: Arc<dyn DisplaySink>,
    overlay: Option<Arc<dyn OverlaySink>>,
    /// Evaluation number of the newest overlay handed to the sink.
    overlay_drawn: AtomicU64,
}

impl FusionEngine {
    pub fn new(settings: FusionSettings, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: FusionState::default(),
                classifier: ActionClassifier::new(settings.thresholds),
                smoother: StatusSmoother::new(settings.smoothing_window),
                view: settings.view,
                stats: FusionStats::default(),
            }),
            alive: AtomicBool::new(true),
            display,
            overlay: None,
            overlay_drawn: AtomicU64::new(0),
        }
    }

    pub fn with_overlay_sink(mut self, sink: Arc<dyn OverlaySink>) -> Self {
        self.overlay = Some(sink);
        self
    }

    /// Replace the latest pose result and re-evaluate.
    ///
    /// Returns `None` once the engine has been shut down.
    pub fn update_pose(&self, result: PoseResult) -> Result<Option<Stabilized>> {
        self.evaluate(move |inner| {
            inner.state.pose = Some(result);
            inner.stats.pose_updates += 1;
        })
    }

    /// Replace the latest object result and re-evaluate.
    pub fn update_object(&self, result: ObjectResult) -> Result<Option<Stabilized>> {
        self.evaluate(move |inner| {
            inner.state.object = Some(result);
            inner.stats.object_updates += 1;
        })
    }

    /// Apply one detector completion.
    ///
    /// A detector failure is logged and counted but does not re-evaluate:
    /// the previous result for that modality stays in place.
    pub fn handle(&self, event: FusionEvent) -> Result<Option<Stabilized>> {
        match event {
            FusionEvent::PoseUpdated(result) => self.update_pose(result),
            FusionEvent::ObjectUpdated(result) => self.update_object(result),
            FusionEvent::DetectorFailed { modality, message } => {
                log::warn!("{} detector error: {}", modality, message);
                let mut inner = self.lock()?;
                if self.is_alive() {
                    inner.stats.detector_failures += 1;
                }
                Ok(None)
            }
        }
    }

    fn evaluate<F>(&self, apply: F) -> Result<Option<Stabilized>>
    where
        F: FnOnce(&mut Inner),
    {
        let mut guard = self.lock()?;
        if !self.is_alive() {
            log::debug!("fusion engine shut down, ignoring late update");
            return Ok(None);
        }
        let inner = &mut *guard;
        apply(inner);

        let status = inner
            .classifier
            .classify(inner.state.pose.as_ref(), inner.state.object.as_ref());
        let stabilized = inner.smoother.push(status);
        inner.stats.evaluations += 1;

        if stabilized.changed {
            inner.stats.label_changes += 1;
            log::debug!("label -> {} (raw {:?})", stabilized.status, status);
            self.display.show(stabilized.status, stabilized.status.color());
        }

        let pending = self.overlay.as_ref().map(|sink| {
            (
                sink.clone(),
                inner.stats.evaluations,
                inner.view,
                inner.state.clone(),
            )
        });
        drop(guard);

        if let Some((sink, evaluation, view, state)) = pending {
            let overlay = build_overlay(view, state.pose.as_ref(), state.object.as_ref());
            // A newer evaluation may have drawn while this one was building.
            if self.overlay_drawn.fetch_max(evaluation, Ordering::SeqCst) < evaluation {
                sink.draw(&overlay);
            }
        }
        Ok(Some(stabilized))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("fusion state lock poisoned"))
    }

    pub fn snapshot(&self) -> Result<FusionState> {
        Ok(self.lock()?.state.clone())
    }

    pub fn stats(&self) -> Result<FusionStats> {
        Ok(self.lock()?.stats)
    }

    /// Currently displayed (stabilized) status.
    pub fn current_status(&self) -> Result<Option<Status>> {
        Ok(self.lock()?.smoother.displayed())
    }

    /// Smoothing window contents, oldest first.
    pub fn history(&self) -> Result<Vec<Status>> {
        Ok(self.lock()?.smoother.history().copied().collect())
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop processing. Updates that take the state lock after this returns
    /// are ignored, including ones already waiting on it.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Run the single-writer event loop on its own thread.
    ///
    /// The loop exits when the engine is shut down or every `EventSender`
    /// has been dropped.
    pub fn spawn(self: Arc<Self>, events: mpsc::Receiver<FusionEvent>) -> Result<FusionHandle> {
        let engine = self.clone();
        let join = std::thread::Builder::new()
            .name("fusion".to_string())
            .spawn(move || run_loop(&engine, events))
            .context("failed to spawn fusion loop")?;
        Ok(FusionHandle {
            engine: self,
            join: Some(join),
        })
    }
}

fn run_loop(engine: &FusionEngine, events: mpsc::Receiver<FusionEvent>) {
    log::info!("fusion loop running");
    while engine.is_alive() {
        match events.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => {
                if let Err(err) = engine.handle(event) {
                    log::error!("fusion update failed: {:#}", err);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("all detectors disconnected");
                break;
            }
        }
    }
    log::info!("fusion loop stopped");
}

/// Handle to a running fusion loop.
pub struct FusionHandle {
    engine: Arc<FusionEngine>,
    join: Option<JoinHandle<()>>,
}

impl FusionHandle {
    pub fn engine(&self) -> &Arc<FusionEngine> {
        &self.engine
    }

    /// Shut the engine down and wait for the loop to exit.
    pub fn stop(mut self) -> Result<()> {
        self.engine.shutdown();
        self.join_loop()
    }

    /// Wait for the loop to drain and exit on its own (all senders dropped).
    pub fn wait(mut self) -> Result<()> {
        self.join_loop()
    }

    fn join_loop(&mut self) -> Result<()> {
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("fusion loop thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for FusionHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.engine.shutdown();
            if let Err(err) = self.join_loop() {
                log::warn!("{}", err);
            }
        }
    }
}
