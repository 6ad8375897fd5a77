//! Frame scheduling.
//!
//! Running both detectors on every frame exceeds the real-time budget, so
//! frames alternate: even frames go to the pose detector, odd frames to the
//! object detector. The counter starts at 0.
//!
//! Ownership of each frame moves into exactly one path: the detector that
//! accepts it, or the scheduler itself when that detector is missing, which
//! releases the frame on the spot.

use crate::detect::{ObjectDetector, PoseDetector};
use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Pose,
    Object,
}

/// Detector for the frame with the given 0-based index.
pub fn route_for(index: u64) -> Route {
    if index % 2 == 0 {
        Route::Pose
    } else {
        Route::Object
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Detector not initialized or already torn down.
    DetectorUnavailable,
    /// Detector refused the frame (busy, closed or failed).
    DetectorRejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Submitted(Route),
    Dropped(Route, DropReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames_seen: u64,
    pub routed_pose: u64,
    pub routed_object: u64,
    pub dropped: u64,
}

pub struct FrameScheduler {
    counter: u64,
    mirrored: bool,
    pose: Option<Box<dyn PoseDetector>>,
    object: Option<Box<dyn ObjectDetector>>,
    stats: SchedulerStats,
}

impl FrameScheduler {
    /// `mirrored` is forwarded to both detectors (front camera).
    pub fn new(mirrored: bool) -> Self {
        Self {
            counter: 0,
            mirrored,
            pose: None,
            object: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn with_pose_detector(mut self, detector: Box<dyn PoseDetector>) -> Self {
        self.pose = Some(detector);
        self
    }

    pub fn with_object_detector(mut self, detector: Box<dyn ObjectDetector>) -> Self {
        self.object = Some(detector);
        self
    }

    /// Install or remove the pose detector, returning the previous one.
    pub fn set_pose_detector(
        &mut self,
        detector: Option<Box<dyn PoseDetector>>,
    ) -> Option<Box<dyn PoseDetector>> {
        std::mem::replace(&mut self.pose, detector)
    }

    pub fn set_object_detector(
        &mut self,
        detector: Option<Box<dyn ObjectDetector>>,
    ) -> Option<Box<dyn ObjectDetector>> {
        std::mem::replace(&mut self.object, detector)
    }

    /// Route one frame. Never blocks on a detector result.
    pub fn submit(&mut self, frame: Frame) -> Dispatch {
        let route = route_for(self.counter);
        self.counter += 1;
        self.stats.frames_seen += 1;

        let sequence = frame.sequence;
        let outcome = match route {
            Route::Pose => match self.pose.as_mut() {
                Some(detector) => Some(detector.detect_async(frame, self.mirrored)),
                None => {
                    frame.release();
                    None
                }
            },
            Route::Object => match self.object.as_mut() {
                Some(detector) => Some(detector.detect_async(frame, self.mirrored)),
                None => {
                    frame.release();
                    None
                }
            },
        };

        match outcome {
            Some(Ok(())) => {
                match route {
                    Route::Pose => self.stats.routed_pose += 1,
                    Route::Object => self.stats.routed_object += 1,
                }
                log::debug!("frame {} -> {:?}", sequence, route);
                Dispatch::Submitted(route)
            }
            Some(Err(err)) => {
                self.stats.dropped += 1;
                log::warn!("frame {} dropped by {:?} detector: {:#}", sequence, route, err);
                Dispatch::Dropped(route, DropReason::DetectorRejected)
            }
            None => {
                self.stats.dropped += 1;
                log::debug!("frame {} dropped: no {:?} detector", sequence, route);
                Dispatch::Dropped(route, DropReason::DetectorUnavailable)
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Close and remove both detectors.
    pub fn shutdown(&mut self) {
        if let Some(mut detector) = self.pose.take() {
            if let Err(err) = detector.close() {
                log::warn!("pose detector {} close failed: {:#}", detector.name(), err);
            }
        }
        if let Some(mut detector) = self.object.take() {
            if let Err(err) = detector.close() {
                log::warn!("object detector {} close failed: {:#}", detector.name(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ReleaseCounter;
    use anyhow::{anyhow, Result};
    use std::sync::{Arc, Mutex};

    /// Records sequences and releases frames immediately.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<u64>>>,
        reject: bool,
    }

    impl Recorder {
        fn take(&mut self, frame: Frame) -> Result<()> {
            self.seen.lock().unwrap().push(frame.sequence);
            if self.reject {
                return Err(anyhow!("busy"));
            }
            Ok(())
        }
    }

    impl PoseDetector for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn detect_async(&mut self, frame: Frame, _mirrored: bool) -> Result<()> {
            self.take(frame)
        }
    }

    impl ObjectDetector for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn detect_async(&mut self, frame: Frame, _mirrored: bool) -> Result<()> {
            self.take(frame)
        }
    }

    fn frames(counter: &ReleaseCounter, n: u64) -> Vec<Frame> {
        (0..n)
            .map(|i| counter.attach(Frame::new(vec![1u8; 8], 2, 1, i, i * 33)))
            .collect()
    }

    #[test]
    fn frames_alternate_starting_with_pose() {
        assert_eq!(
            (0..4).map(route_for).collect::<Vec<_>>(),
            vec![Route::Pose, Route::Object, Route::Pose, Route::Object]
        );

        let pose = Recorder::default();
        let object = Recorder::default();
        let mut scheduler = FrameScheduler::new(true)
            .with_pose_detector(Box::new(pose.clone()))
            .with_object_detector(Box::new(object.clone()));

        let counter = ReleaseCounter::new();
        let dispatched: Vec<Dispatch> = frames(&counter, 4)
            .into_iter()
            .map(|f| scheduler.submit(f))
            .collect();

        assert_eq!(
            dispatched,
            vec![
                Dispatch::Submitted(Route::Pose),
                Dispatch::Submitted(Route::Object),
                Dispatch::Submitted(Route::Pose),
                Dispatch::Submitted(Route::Object),
            ]
        );
        assert_eq!(*pose.seen.lock().unwrap(), vec![0, 2]);
        assert_eq!(*object.seen.lock().unwrap(), vec![1, 3]);
        assert_eq!(counter.count(), 4);
    }

    #[test]
    fn missing_detector_releases_frame() {
        let object = Recorder::default();
        let mut scheduler =
            FrameScheduler::new(false).with_object_detector(Box::new(object.clone()));

        let counter = ReleaseCounter::new();
        let mut iter = frames(&counter, 2).into_iter();

        let first = scheduler.submit(iter.next().unwrap());
        assert_eq!(first, Dispatch::Dropped(Route::Pose, DropReason::DetectorUnavailable));
        assert_eq!(counter.count(), 1);

        let second = scheduler.submit(iter.next().unwrap());
        assert_eq!(second, Dispatch::Submitted(Route::Object));
        assert_eq!(counter.count(), 2);

        let stats = scheduler.stats();
        assert_eq!(stats.frames_seen, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.routed_object, 1);
    }

    #[test]
    fn rejected_frame_is_released_once_and_not_retried() {
        let pose = Recorder {
            reject: true,
            ..Recorder::default()
        };
        let mut scheduler = FrameScheduler::new(false).with_pose_detector(Box::new(pose.clone()));

        let counter = ReleaseCounter::new();
        for frame in frames(&counter, 3) {
            scheduler.submit(frame);
        }

        assert_eq!(*pose.seen.lock().unwrap(), vec![0, 2]);
        assert_eq!(counter.count(), 3);
        assert_eq!(scheduler.stats().dropped, 3);
    }

    #[test]
    fn torn_down_detector_drops_frames() {
        let mut scheduler =
            FrameScheduler::new(false).with_pose_detector(Box::new(Recorder::default()));
        assert!(scheduler.set_pose_detector(None).is_some());

        let counter = ReleaseCounter::new();
        let frame = frames(&counter, 1).pop().unwrap();
        assert_eq!(
            scheduler.submit(frame),
            Dispatch::Dropped(Route::Pose, DropReason::DetectorUnavailable)
        );
        assert_eq!(counter.count(), 1);
    }
}
