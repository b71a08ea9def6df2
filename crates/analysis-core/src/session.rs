//! One analysis run over a frame stream.
//!
//! The session owns the classifier, the anomaly detector and the emotion
//! tally, and feeds them one frame at a time. Frames are numbered in read
//! order starting at 0.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use posewatch_common::config::AnalysisDefaults;
use posewatch_common::error::{PosewatchError, PosewatchResult};
use posewatch_pose_model::activity::Activity;
use posewatch_pose_model::frame::{AnnotatedFrame, FrameObservation};

use crate::anomaly::{AnomalyDetector, DEFAULT_ANOMALY_THRESHOLD};
use crate::classifier::{ActivityClassifier, DEFAULT_HAND_NEAR_FACE};
use crate::emotion::EmotionTally;
use crate::report::SummaryReport;
use crate::stream::AnnotationSink;

/// Thresholds for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub anomaly_threshold: f64,
    pub hand_near_face_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            hand_near_face_threshold: DEFAULT_HAND_NEAR_FACE,
        }
    }
}

impl SessionConfig {
    /// Both thresholds must be finite and strictly positive.
    pub fn validate(&self) -> PosewatchResult<()> {
        for (name, value) in [
            ("anomaly threshold", self.anomaly_threshold),
            ("hand-near-face threshold", self.hand_near_face_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PosewatchError::invalid_input(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl From<&AnalysisDefaults> for SessionConfig {
    fn from(defaults: &AnalysisDefaults) -> Self {
        Self {
            anomaly_threshold: defaults.anomaly_threshold,
            hand_near_face_threshold: defaults.hand_near_face_threshold,
        }
    }
}

/// Result of [`AnalysisSession::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: SummaryReport,
    /// Frames per classified activity.
    pub activity_counts: BTreeMap<Activity, u64>,
    /// Frames read without a detected body.
    pub frames_without_pose: u64,
    /// Annotation writes that failed, including the final flush.
    pub sink_failures: u64,
    /// The stop flag ended the run before the stream did.
    pub interrupted: bool,
}

/// State for a single run.
#[derive(Debug)]
pub struct AnalysisSession {
    classifier: ActivityClassifier,
    detector: AnomalyDetector,
    tally: EmotionTally,
    frames_read: u64,
    activity_counts: BTreeMap<Activity, u64>,
    frames_without_pose: u64,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl AnalysisSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            classifier: ActivityClassifier::new(config.hand_near_face_threshold),
            detector: AnomalyDetector::new(config.anomaly_threshold),
            tally: EmotionTally::new(),
            frames_read: 0,
            activity_counts: BTreeMap::new(),
            frames_without_pose: 0,
        }
    }

    /// Frames processed so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn activity_counts(&self) -> &BTreeMap<Activity, u64> {
        &self.activity_counts
    }

    /// Process the next frame and return its annotation.
    pub fn process_frame(&mut self, observation: &FrameObservation) -> AnnotatedFrame {
        let index = self.frames_read;
        self.frames_read += 1;

        let classification = observation
            .pose
            .as_ref()
            .map(|pose| self.classifier.classify_explained(pose));

        match &classification {
            Some(c) => *self.activity_counts.entry(c.activity).or_insert(0) += 1,
            None => self.frames_without_pose += 1,
        }

        let anomaly = self
            .detector
            .observe(index, observation.pose.as_ref())
            .is_some();

        self.tally.record_reading(&observation.emotions);

        AnnotatedFrame {
            index,
            activity: classification.map(|c| c.activity),
            caption: classification.map(|c| c.activity.overlay_text()),
            rule: classification.map(|c| c.rule.to_string()),
            anomaly,
            emotions: observation.emotions.faces().to_vec(),
            bones: observation
                .pose
                .as_ref()
                .map(|pose| pose.bones())
                .unwrap_or_default(),
        }
    }

    /// Drive the session over `frames` until the stream ends or `stop` is
    /// set. The stop flag is checked before each frame. Sink failures are
    /// logged, counted and do not end the run; the sink is finished once
    /// after the last frame.
    pub fn run<I, S>(mut self, frames: I, sink: &mut S, stop: &AtomicBool) -> RunOutcome
    where
        I: IntoIterator<Item = FrameObservation>,
        S: AnnotationSink + ?Sized,
    {
        let mut interrupted = false;
        let mut sink_failures: u64 = 0;

        for observation in frames {
            if stop.load(Ordering::Relaxed) {
                interrupted = true;
                break;
            }

            let annotated = self.process_frame(&observation);
            if let Err(e) = sink.emit(&annotated) {
                sink_failures += 1;
                tracing::warn!(frame = annotated.index, error = %e, "Failed to emit annotation");
            }

            if self.frames_read % 1000 == 0 {
                tracing::debug!(frames = self.frames_read, "Analysis progress");
            }
        }

        if let Err(e) = sink.finish() {
            sink_failures += 1;
            tracing::warn!(error = %e, "Failed to finish annotation output");
        }

        if interrupted {
            tracing::info!(frames = self.frames_read, "Analysis interrupted");
        }
        if sink_failures > 0 {
            tracing::warn!(sink_failures, "Some annotations could not be written");
        }

        let activity_counts = std::mem::take(&mut self.activity_counts);
        let frames_without_pose = self.frames_without_pose;
        let report = self.finish();

        RunOutcome {
            report,
            activity_counts,
            frames_without_pose,
            sink_failures,
            interrupted,
        }
    }

    /// End the run and build the report.
    pub fn finish(self) -> SummaryReport {
        tracing::info!(
            frames = self.frames_read,
            anomalies = self.detector.anomalies().len(),
            emotions = self.tally.total(),
            "Analysis finished"
        );
        SummaryReport::build(self.frames_read, self.detector.anomalies(), &self.tally)
    }
}
