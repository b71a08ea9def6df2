//! Body landmarks and per-frame skeleton snapshots.
//!
//! The joint set is the 33-point body topology of the pose model. A
//! snapshot maps each detected joint to its position and visibility.
//! Snapshots may be partial; a missing joint reads as visibility 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point2, Point3};

/// Number of joints in the pose-model topology.
pub const JOINT_COUNT: usize = 33;

/// The 33 canonical body joints, in pose-model index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Joint {
    /// All joints in index order.
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::Nose,
        Joint::LeftEyeInner,
        Joint::LeftEye,
        Joint::LeftEyeOuter,
        Joint::RightEyeInner,
        Joint::RightEye,
        Joint::RightEyeOuter,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::MouthLeft,
        Joint::MouthRight,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftPinky,
        Joint::RightPinky,
        Joint::LeftIndex,
        Joint::RightIndex,
        Joint::LeftThumb,
        Joint::RightThumb,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    /// Pose-model index of this joint.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Joint for a pose-model index.
    pub fn from_index(index: usize) -> Option<Joint> {
        Self::ALL.get(index).copied()
    }
}

/// Skeleton segments drawn by the overlay, as pairs of joints.
pub const POSE_CONNECTIONS: [(Joint, Joint); 35] = [
    (Joint::Nose, Joint::LeftEyeInner),
    (Joint::LeftEyeInner, Joint::LeftEye),
    (Joint::LeftEye, Joint::LeftEyeOuter),
    (Joint::LeftEyeOuter, Joint::LeftEar),
    (Joint::Nose, Joint::RightEyeInner),
    (Joint::RightEyeInner, Joint::RightEye),
    (Joint::RightEye, Joint::RightEyeOuter),
    (Joint::RightEyeOuter, Joint::RightEar),
    (Joint::MouthLeft, Joint::MouthRight),
    (Joint::LeftShoulder, Joint::RightShoulder),
    (Joint::LeftShoulder, Joint::LeftElbow),
    (Joint::LeftElbow, Joint::LeftWrist),
    (Joint::LeftWrist, Joint::LeftPinky),
    (Joint::LeftWrist, Joint::LeftIndex),
    (Joint::LeftWrist, Joint::LeftThumb),
    (Joint::LeftPinky, Joint::LeftIndex),
    (Joint::RightShoulder, Joint::RightElbow),
    (Joint::RightElbow, Joint::RightWrist),
    (Joint::RightWrist, Joint::RightPinky),
    (Joint::RightWrist, Joint::RightIndex),
    (Joint::RightWrist, Joint::RightThumb),
    (Joint::RightPinky, Joint::RightIndex),
    (Joint::LeftShoulder, Joint::LeftHip),
    (Joint::RightShoulder, Joint::RightHip),
    (Joint::LeftHip, Joint::RightHip),
    (Joint::LeftHip, Joint::LeftKnee),
    (Joint::RightHip, Joint::RightKnee),
    (Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightKnee, Joint::RightAnkle),
    (Joint::LeftAnkle, Joint::LeftHeel),
    (Joint::RightAnkle, Joint::RightHeel),
    (Joint::LeftHeel, Joint::LeftFootIndex),
    (Joint::RightHeel, Joint::RightFootIndex),
    (Joint::LeftAnkle, Joint::LeftFootIndex),
    (Joint::RightAnkle, Joint::RightFootIndex),
];

/// One tracked joint: position plus detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized x/y, relative depth z.
    #[serde(flatten)]
    pub position: Point3,

    /// Confidence in `[0.0, 1.0]` that the joint was located correctly.
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
            visibility,
        }
    }

    /// Image-plane position.
    pub fn xy(&self) -> Point2 {
        self.position.xy()
    }
}

/// A drawable skeleton segment between two present joints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub from: Joint,
    pub to: Joint,
    pub a: Point2,
    pub b: Point2,
}

/// Errors building a snapshot from the pose model's indexed layout.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("pose model emitted {count} landmarks, at most {JOINT_COUNT} are defined")]
    TooManyLandmarks { count: usize },
}

/// All landmarks detected for one frame, ordered by joint index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRepr", into = "BTreeMap<Joint, Landmark>")]
pub struct LandmarkSnapshot {
    landmarks: BTreeMap<Joint, Landmark>,
}

/// Accepted wire layouts: name-keyed object or index-ordered array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRepr {
    Named(BTreeMap<Joint, Landmark>),
    Indexed(Vec<Landmark>),
}

impl TryFrom<SnapshotRepr> for LandmarkSnapshot {
    type Error = SnapshotError;

    fn try_from(repr: SnapshotRepr) -> Result<Self, Self::Error> {
        match repr {
            SnapshotRepr::Named(landmarks) => Ok(Self { landmarks }),
            SnapshotRepr::Indexed(list) => Self::from_indexed(list),
        }
    }
}

impl From<LandmarkSnapshot> for BTreeMap<Joint, Landmark> {
    fn from(snapshot: LandmarkSnapshot) -> Self {
        snapshot.landmarks
    }
}

impl FromIterator<(Joint, Landmark)> for LandmarkSnapshot {
    fn from_iter<I: IntoIterator<Item = (Joint, Landmark)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

impl LandmarkSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the pose model's index-ordered landmark list.
    pub fn from_indexed(list: Vec<Landmark>) -> Result<Self, SnapshotError> {
        if list.len() > JOINT_COUNT {
            return Err(SnapshotError::TooManyLandmarks { count: list.len() });
        }
        Ok(Joint::ALL.iter().copied().zip(list).collect())
    }

    /// Builder-style insert.
    pub fn with(mut self, joint: Joint, landmark: Landmark) -> Self {
        self.landmarks.insert(joint, landmark);
        self
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks.get(&joint)
    }

    /// Visibility of `joint`, 0.0 when it was not detected.
    pub fn visibility(&self, joint: Joint) -> f64 {
        self.get(joint).map(|l| l.visibility).unwrap_or(0.0)
    }

    pub fn position(&self, joint: Joint) -> Option<Point3> {
        self.get(joint).map(|l| l.position)
    }

    /// Iterate landmarks in joint order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &Landmark)> {
        self.landmarks.iter().map(|(j, l)| (*j, l))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Skeleton segments whose endpoints are both present.
    pub fn bones(&self) -> Vec<Bone> {
        POSE_CONNECTIONS
            .iter()
            .filter_map(|&(from, to)| {
                let a = self.get(from)?.xy();
                let b = self.get(to)?.xy();
                Some(Bone { from, to, a, b })
            })
            .collect()
    }
}
