//! Frame-to-frame anomaly detection.
//!
//! A frame is anomalous when the mean 3D displacement of the joints it
//! shares with the previous pose-bearing frame exceeds a threshold. Frames
//! without a detected body are skipped and do not reset the comparison
//! baseline.

use posewatch_pose_model::geometry::distance;
use posewatch_pose_model::landmark::LandmarkSnapshot;

/// Default mean displacement above which a frame is flagged.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.05;

/// A flagged frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyRecord {
    pub frame_index: u64,
    pub displacement: f64,
}

/// Mean Euclidean distance between the joints present in both snapshots.
///
/// Returns `None` when the snapshots share no joint.
pub fn mean_displacement(previous: &LandmarkSnapshot, current: &LandmarkSnapshot) -> Option<f64> {
    let (sum, count) = current
        .iter()
        .filter_map(|(joint, landmark)| {
            let before = previous.position(joint)?;
            Some(distance(&before, &landmark.position))
        })
        .fold((0.0, 0usize), |(sum, count), d| (sum + d, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Stateful detector fed one frame at a time, in frame order.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    threshold: f64,
    previous: Option<LandmarkSnapshot>,
    last_index: Option<u64>,
    anomalies: Vec<u64>,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_THRESHOLD)
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
            last_index: None,
            anomalies: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Feed the snapshot for `frame_index`.
    ///
    /// `None` (no body detected) leaves the baseline untouched. Any present
    /// snapshot becomes the new baseline, whether or not it was flagged.
    /// Indices must be strictly increasing; a repeated or earlier index is
    /// ignored.
    pub fn observe(
        &mut self,
        frame_index: u64,
        snapshot: Option<&LandmarkSnapshot>,
    ) -> Option<AnomalyRecord> {
        if self.last_index.is_some_and(|last| frame_index <= last) {
            tracing::warn!(frame_index, "frame index out of order, ignoring");
            return None;
        }
        self.last_index = Some(frame_index);

        let current = snapshot?;

        let record = self
            .previous
            .as_ref()
            .and_then(|previous| mean_displacement(previous, current))
            .filter(|displacement| *displacement > self.threshold)
            .map(|displacement| AnomalyRecord {
                frame_index,
                displacement,
            });

        if let Some(record) = &record {
            tracing::debug!(
                frame_index,
                displacement = record.displacement,
                "anomalous movement"
            );
            self.anomalies.push(frame_index);
        }

        self.previous = Some(current.clone());
        record
    }

    /// Flagged frame indices, ascending.
    pub fn anomalies(&self) -> &[u64] {
        &self.anomalies
    }

    pub fn previous(&self) -> Option<&LandmarkSnapshot> {
        self.previous.as_ref()
    }

    pub fn into_anomalies(self) -> Vec<u64> {
        self.anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_pose_model::landmark::{Joint, Landmark};
    use proptest::prelude::*;

    fn nose_at(x: f64) -> LandmarkSnapshot {
        LandmarkSnapshot::new().with(Joint::Nose, Landmark::new(x, 0.5, 0.0, 0.9))
    }

    #[test]
    fn test_first_frame_is_never_flagged() {
        let mut detector = AnomalyDetector::default();
        assert!(detector.observe(0, Some(&nose_at(0.9))).is_none());
        assert!(detector.anomalies().is_empty());
        assert!(detector.previous().is_some());
    }

    #[test]
    fn test_large_jump_is_flagged() {
        let mut detector = AnomalyDetector::default();
        detector.observe(0, Some(&nose_at(0.1)));
        let record = detector.observe(1, Some(&nose_at(0.3))).unwrap();
        assert_eq!(record.frame_index, 1);
        assert!((record.displacement - 0.2).abs() < 1e-12);
        assert_eq!(detector.anomalies(), &[1]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut detector = AnomalyDetector::new(0.25);
        detector.observe(0, Some(&nose_at(0.0)));
        assert!(detector.observe(1, Some(&nose_at(0.25))).is_none());
        assert!(detector.observe(2, Some(&nose_at(0.5001))).is_some());
    }

    #[test]
    fn test_missing_pose_keeps_baseline() {
        let mut detector = AnomalyDetector::default();
        detector.observe(0, Some(&nose_at(0.1)));
        assert!(detector.observe(1, None).is_none());
        assert!(detector.observe(2, None).is_none());
        // Compared against frame 0, not reset.
        assert!(detector.observe(3, Some(&nose_at(0.5))).is_some());
        assert_eq!(detector.anomalies(), &[3]);
    }

    #[test]
    fn test_flagged_frame_becomes_baseline() {
        let mut detector = AnomalyDetector::default();
        detector.observe(0, Some(&nose_at(0.1)));
        assert!(detector.observe(1, Some(&nose_at(0.5))).is_some());
        assert!(detector.observe(2, Some(&nose_at(0.51))).is_none());
    }

    #[test]
    fn test_only_shared_joints_count() {
        let previous = nose_at(0.1);
        let current = nose_at(0.1).with(Joint::LeftWrist, Landmark::new(0.9, 0.9, 0.0, 0.9));
        assert_eq!(mean_displacement(&previous, &current), Some(0.0));

        let disjoint = LandmarkSnapshot::new()
            .with(Joint::LeftWrist, Landmark::new(0.9, 0.9, 0.0, 0.9));
        assert_eq!(mean_displacement(&previous, &disjoint), None);
    }

    #[test]
    fn test_disjoint_snapshot_still_replaces_baseline() {
        let mut detector = AnomalyDetector::default();
        detector.observe(0, Some(&nose_at(0.1)));
        let wrist = LandmarkSnapshot::new()
            .with(Joint::LeftWrist, Landmark::new(0.9, 0.9, 0.0, 0.9));
        assert!(detector.observe(1, Some(&wrist)).is_none());
        assert_eq!(detector.previous(), Some(&wrist));
    }

    #[test]
    fn test_displacement_includes_depth() {
        let previous = nose_at(0.5);
        let current =
            LandmarkSnapshot::new().with(Joint::Nose, Landmark::new(0.5, 0.5, 0.3, 0.9));
        let d = mean_displacement(&previous, &current).unwrap();
        assert!((d - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_order_index_is_ignored() {
        let mut detector = AnomalyDetector::default();
        detector.observe(5, Some(&nose_at(0.1)));
        assert!(detector.observe(5, Some(&nose_at(0.9))).is_none());
        assert!(detector.observe(3, Some(&nose_at(0.9))).is_none());
        assert_eq!(detector.previous(), Some(&nose_at(0.1)));
    }

    #[test]
    fn test_two_frame_scenario() {
        let a = LandmarkSnapshot::new()
            .with(Joint::Nose, Landmark::new(0.50, 0.20, 0.0, 0.9))
            .with(Joint::LeftWrist, Landmark::new(0.60, 0.60, 0.0, 0.9));
        let b = LandmarkSnapshot::new()
            .with(Joint::Nose, Landmark::new(0.50, 0.20, 0.0, 0.9))
            .with(Joint::LeftWrist, Landmark::new(0.60, 0.70, 0.0, 0.9));

        let d = mean_displacement(&a, &b).unwrap();
        assert!((d - 0.05).abs() < 1e-12);

        let mut detector = AnomalyDetector::new(0.04);
        detector.observe(0, Some(&a));
        assert!(detector.observe(1, Some(&b)).is_some());

        let mut strict = AnomalyDetector::new(0.06);
        strict.observe(0, Some(&a));
        assert!(strict.observe(1, Some(&b)).is_none());
    }

    fn nose_snapshot() -> impl Strategy<Value = LandmarkSnapshot> {
        (0.0f64..1.0, 0.0f64..1.0, -0.5f64..0.5)
            .prop_map(|(x, y, z)| LandmarkSnapshot::new().with(Joint::Nose, Landmark::new(x, y, z, 0.9)))
    }

    proptest! {
        #[test]
        fn scaling_a_move_never_unflags_it(
            prev in nose_snapshot(),
            (dx, dy, dz) in (-0.2f64..0.2, -0.2f64..0.2, -0.2f64..0.2),
            k in 1.0f64..4.0,
        ) {
            let p = prev.position(Joint::Nose).unwrap();
            let moved = |scale: f64| {
                LandmarkSnapshot::new().with(
                    Joint::Nose,
                    Landmark::new(p.x + scale * dx, p.y + scale * dy, p.z + scale * dz, 0.9),
                )
            };

            let mut base = AnomalyDetector::default();
            base.observe(0, Some(&prev));
            let flagged = base.observe(1, Some(&moved(1.0))).is_some();

            let mut scaled = AnomalyDetector::default();
            scaled.observe(0, Some(&prev));
            let flagged_scaled = scaled.observe(1, Some(&moved(k))).is_some();

            prop_assert!(!flagged || flagged_scaled);
        }

        #[test]
        fn anomalies_are_strictly_ascending(
            frames in prop::collection::vec(prop::option::of(nose_snapshot()), 0..40),
        ) {
            let mut detector = AnomalyDetector::default();
            for (i, frame) in frames.iter().enumerate() {
                detector.observe(i as u64, frame.as_ref());
            }
            prop_assert!(detector.anomalies().windows(2).all(|w| w[0] < w[1]));
            prop_assert!(detector.anomalies().iter().all(|&i| i > 0));
        }
    }
}
