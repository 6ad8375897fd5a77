//! Threaded detector adapters.
//!
//! Each adapter owns a synchronous model and runs it on a dedicated
//! completion thread. Frames are handed over through a bounded queue; when the
//! queue is full the frame is rejected (and released) instead of blocking the
//! camera thread. Completed results are posted to the fusion loop as
//! `FusionEvent`s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};

use crate::detect::backend::{
    ObjectDetector, ObjectDetectorOptions, ObjectModel, PoseDetector, PoseModel,
};
use crate::detect::result::Modality;
use crate::frame::Frame;
use crate::fusion::{EventSender, FusionEvent};

/// Frames that may wait for a busy detector.
const QUEUE_DEPTH: usize = 1;

struct Job {
    frame: Frame,
    mirrored: bool,
}

struct Worker {
    modality: Modality,
    name: &'static str,
    jobs: Option<SyncSender<Job>>,
    alive: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<F>(
        modality: Modality,
        name: &'static str,
        events: EventSender,
        mut run: F,
    ) -> Result<Self>
    where
        F: FnMut(&Frame, bool) -> Result<FusionEvent> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<Job>(QUEUE_DEPTH);
        let alive = Arc::new(AtomicBool::new(true));
        let alive_thread = alive.clone();

        let join = std::thread::Builder::new()
            .name(format!("{modality}-detector"))
            .spawn(move || {
                for job in rx {
                    if !alive_thread.load(Ordering::SeqCst) {
                        // Closed: drain and release whatever is still queued.
                        continue;
                    }
                    let started = Instant::now();
                    let outcome = run(&job.frame, job.mirrored);
                    let timestamp_ms = job.frame.timestamp_ms;
                    drop(job);

                    let event = match outcome {
                        Ok(mut event) => {
                            event.stamp(timestamp_ms, started.elapsed().as_millis() as u64);
                            event
                        }
                        Err(err) => FusionEvent::DetectorFailed {
                            modality,
                            message: format!("{err:#}"),
                        },
                    };
                    if events.send(event).is_err() {
                        log::debug!("{} detector: fusion loop gone, stopping", modality);
                        break;
                    }
                }
            })
            .with_context(|| format!("failed to spawn {modality} detector thread"))?;

        Ok(Self {
            modality,
            name,
            jobs: Some(tx),
            alive,
            join: Some(join),
        })
    }

    fn submit(&mut self, frame: Frame, mirrored: bool) -> Result<()> {
        let Some(jobs) = self.jobs.as_ref() else {
            return Err(anyhow!("{} detector is closed", self.modality));
        };
        match jobs.try_send(Job { frame, mirrored }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(anyhow!("{} detector busy", self.modality)),
            Err(TrySendError::Disconnected(_)) => {
                Err(anyhow!("{} detector thread exited", self.modality))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        self.jobs.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("{} detector thread panicked", self.modality))?;
            log::info!("{} detector {} stopped", self.modality, self.name);
        }
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("{}", err);
        }
    }
}

// ----------------------------------------------------------------------------
// Pose
// ----------------------------------------------------------------------------

/// Runs a `PoseModel` on its own completion thread.
pub struct ThreadedPoseDetector {
    worker: Worker,
}

impl ThreadedPoseDetector {
    /// Warm up the model and start the completion thread.
    ///
    /// A warm-up failure is an initialization failure: no thread is started.
    pub fn spawn<M: PoseModel + 'static>(mut model: M, events: EventSender) -> Result<Self> {
        let name = model.name();
        model
            .warm_up()
            .with_context(|| format!("pose model {name} failed to initialize"))?;

        let worker = Worker::spawn(Modality::Pose, name, events, move |frame, mirrored| {
            let mut result = model.infer(frame, mirrored)?;
            if result.image_width == 0 || result.image_height == 0 {
                result.image_width = frame.width;
                result.image_height = frame.height;
            }
            Ok(FusionEvent::PoseUpdated(result))
        })?;
        log::info!("pose detector {} started", name);
        Ok(Self { worker })
    }
}

impl PoseDetector for ThreadedPoseDetector {
    fn name(&self) -> &'static str {
        self.worker.name
    }

    fn detect_async(&mut self, frame: Frame, mirrored: bool) -> Result<()> {
        self.worker.submit(frame, mirrored)
    }

    fn close(&mut self) -> Result<()> {
        self.worker.close()
    }
}

// ----------------------------------------------------------------------------
// Object
// ----------------------------------------------------------------------------

/// Runs an `ObjectModel` on its own completion thread and applies the
/// upstream `ObjectDetectorOptions` to every result.
pub struct ThreadedObjectDetector {
    worker: Worker,
}

impl ThreadedObjectDetector {
    pub fn spawn<M: ObjectModel + 'static>(
        mut model: M,
        options: ObjectDetectorOptions,
        events: EventSender,
    ) -> Result<Self> {
        let name = model.name();
        model
            .warm_up()
            .with_context(|| format!("object model {name} failed to initialize"))?;

        let worker = Worker::spawn(Modality::Object, name, events, move |frame, mirrored| {
            let mut result = options.apply(model.infer(frame, mirrored)?);
            if result.image_width == 0 || result.image_height == 0 {
                result.image_width = frame.width;
                result.image_height = frame.height;
            }
            Ok(FusionEvent::ObjectUpdated(result))
        })?;
        log::info!(
            "object detector {} started (max_results={}, score_threshold={:.2})",
            name,
            options.max_results,
            options.score_threshold
        );
        Ok(Self { worker })
    }
}

impl ObjectDetector for ThreadedObjectDetector {
    fn name(&self) -> &'static str {
        self.worker.name
    }

    fn detect_async(&mut self, frame: Frame, mirrored: bool) -> Result<()> {
        self.worker.submit(frame, mirrored)
    }

    fn close(&mut self) -> Result<()> {
        self.worker.close()
    }
}
