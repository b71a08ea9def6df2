//! Activity classification: landmark snapshot to activity label.
//!
//! # Algorithm
//!
//! 1. **Features**: compute the four limb angles and a fixed set of boolean
//!    pose predicates from the snapshot ([`PoseFeatures`]).
//! 2. **Rules**: walk [`RULES`] top to bottom; the first rule whose
//!    condition holds decides the activity.
//! 3. **Fallback**: if no rule fires the pose is [`FALLBACK`].
//!
//! Rule order is part of the contract: several conditions overlap and the
//! earlier rule wins. The table splits into an upper-body branch, used when
//! both ankles are out of view, and a lower-body branch otherwise.
//!
//! Missing joints read as visibility 0 and fail every positional predicate.
//! Undefined angles fail every range test.

use posewatch_pose_model::activity::Activity;
use posewatch_pose_model::geometry::{angle, near, JointAngle};
use posewatch_pose_model::landmark::{Joint, LandmarkSnapshot};

/// Ankle visibility below which the lower body counts as out of view.
pub const ANKLE_HIDDEN_VISIBILITY: f64 = 0.3;
/// Elbow visibility below which an elbow counts as out of view.
pub const ELBOW_HIDDEN_VISIBILITY: f64 = 0.4;
/// Elbow visibility required for the shoulder-height test.
pub const ELBOW_VISIBLE: f64 = 0.5;
/// Wrist visibility required for hand-on-face and bent-arm tests.
pub const WRIST_VISIBLE: f64 = 0.5;
/// Wrist visibility required for the raised-wrist (waving) test.
/// Applies to both wrists alike; the left side is not relaxed to any
/// non-zero visibility.
pub const RAISED_WRIST_VISIBLE: f64 = 0.3;
/// Default wrist-to-nose distance for a hand touching the face.
pub const DEFAULT_HAND_NEAR_FACE: f64 = 0.36;
/// Shoulder height difference implying a near-horizontal torso.
pub const SHOULDER_SKEW: f64 = 0.6;
/// Open range of elbow angles counted as a bent arm.
pub const BENT_ARM_DEGREES: (f64, f64) = (45.0, 130.0);
/// Max wrist-to-nose height difference for a raised wrist.
pub const FACE_LEVEL_BAND: f64 = 0.3;
/// Max elbow-to-shoulder height difference for a level elbow.
pub const SHOULDER_LEVEL_BAND: f64 = 0.3;
/// Elbow-to-shoulder depth difference for an arm reaching out.
pub const ELBOW_DEPTH_OFFSET: f64 = 0.2;
/// Knee angle above which a leg counts as straight.
pub const STRAIGHT_LEG_DEGREES: f64 = 150.0;
/// Knee angle difference above which straight legs count as striding.
pub const STRIDE_ASYMMETRY_DEGREES: f64 = 1.0;

/// Pose predicates evaluated by the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseFeatures {
    pub left_arm_angle: JointAngle,
    pub right_arm_angle: JointAngle,
    pub left_leg_angle: JointAngle,
    pub right_leg_angle: JointAngle,

    /// Both ankles below the visibility gate.
    pub lower_body_hidden: bool,
    /// Both elbows below the visibility gate.
    pub elbows_hidden: bool,
    /// A visible wrist is near the nose while the other wrist is above its
    /// shoulder.
    pub hand_on_face: bool,
    /// A visible wrist is near the nose.
    pub wrist_near_face: bool,
    /// Shoulders differ strongly in height.
    pub shoulders_skewed: bool,
    /// A visible wrist sits on a bent arm.
    pub arm_bent: bool,
    /// A wrist is at face level and above its shoulder.
    pub wrist_raised: bool,
    /// A visible elbow is roughly level with its shoulder.
    pub elbow_at_shoulder_height: bool,
    /// An elbow is well in front of or behind its shoulder.
    pub elbow_depth_offset: bool,
    /// Some elbow is above the hidden gate.
    pub elbow_visible: bool,
    /// Both knee angles exceed the straight-leg limit.
    pub legs_straight: bool,
    /// Knee angles differ beyond the stride limit.
    pub legs_asymmetric: bool,
}

/// One row of the decision table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub condition: fn(&PoseFeatures) -> bool,
    pub activity: Activity,
}

/// The decision table, in evaluation order.
pub static RULES: [Rule; 14] = [
    Rule {
        name: "upper_body.elbows_hidden.hand_on_face",
        condition: |f| f.lower_body_hidden && f.elbows_hidden && f.hand_on_face,
        activity: Activity::HandNearFace,
    },
    Rule {
        name: "upper_body.elbows_hidden",
        condition: |f| f.lower_body_hidden && f.elbows_hidden,
        activity: Activity::Unknown,
    },
    Rule {
        name: "upper_body.hand_on_face",
        condition: |f| f.lower_body_hidden && f.hand_on_face,
        activity: Activity::HandNearFace,
    },
    Rule {
        name: "upper_body.lying.hand_on_face",
        condition: |f| f.lower_body_hidden && f.shoulders_skewed && f.wrist_near_face,
        activity: Activity::HandNearFace,
    },
    Rule {
        name: "upper_body.lying",
        condition: |f| f.lower_body_hidden && f.shoulders_skewed,
        activity: Activity::Lying,
    },
    Rule {
        name: "upper_body.waving",
        condition: |f| f.lower_body_hidden && f.arm_bent && f.wrist_raised,
        activity: Activity::WavingHand,
    },
    Rule {
        name: "upper_body.writing_or_typing",
        condition: |f| f.lower_body_hidden && f.arm_bent,
        activity: Activity::WritingOrTyping,
    },
    Rule {
        name: "upper_body.arms_open",
        condition: |f| f.lower_body_hidden && f.elbow_at_shoulder_height && f.elbow_depth_offset,
        activity: Activity::ArmsOpen,
    },
    Rule {
        name: "upper_body.elbow_level.idle",
        condition: |f| f.lower_body_hidden && f.elbow_at_shoulder_height,
        activity: Activity::Idle,
    },
    Rule {
        name: "upper_body.elbow_visible.idle",
        condition: |f| f.lower_body_hidden && f.elbow_visible,
        activity: Activity::Idle,
    },
    Rule {
        name: "upper_body.unknown",
        condition: |f| f.lower_body_hidden,
        activity: Activity::Unknown,
    },
    Rule {
        name: "lower_body.walking",
        condition: |f| !f.lower_body_hidden && f.legs_straight && f.legs_asymmetric,
        activity: Activity::Walking,
    },
    Rule {
        name: "lower_body.standing",
        condition: |f| !f.lower_body_hidden && f.legs_straight,
        activity: Activity::Standing,
    },
    Rule {
        name: "lower_body.lying",
        condition: |f| !f.lower_body_hidden && f.shoulders_skewed,
        activity: Activity::Lying,
    },
];

/// Rule applied when no row of [`RULES`] fires.
pub static FALLBACK: Rule = Rule {
    name: "lower_body.sitting",
    condition: |_| true,
    activity: Activity::Sitting,
};

/// A classified snapshot together with the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub activity: Activity,
    pub rule: &'static str,
}

/// Deterministic activity classifier.
///
/// Holds only configuration; classifying never mutates it, so a single
/// instance can be shared freely.
#[derive(Debug, Clone, Copy)]
pub struct ActivityClassifier {
    hand_near_face_threshold: f64,
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_HAND_NEAR_FACE)
    }
}

impl ActivityClassifier {
    /// Create a classifier with a custom hand-near-face distance.
    pub fn new(hand_near_face_threshold: f64) -> Self {
        Self {
            hand_near_face_threshold,
        }
    }

    pub fn hand_near_face_threshold(&self) -> f64 {
        self.hand_near_face_threshold
    }

    /// Classify a snapshot.
    pub fn classify(&self, snapshot: &LandmarkSnapshot) -> Activity {
        self.classify_explained(snapshot).activity
    }

    /// Classify a snapshot and report which rule fired.
    pub fn classify_explained(&self, snapshot: &LandmarkSnapshot) -> Classification {
        let features = self.features(snapshot);
        let rule = RULES
            .iter()
            .find(|rule| (rule.condition)(&features))
            .unwrap_or(&FALLBACK);

        tracing::trace!(rule = rule.name, activity = %rule.activity, "classified pose");

        Classification {
            activity: rule.activity,
            rule: rule.name,
        }
    }

    /// Evaluate every predicate the rule table reads.
    pub fn features(&self, snapshot: &LandmarkSnapshot) -> PoseFeatures {
        let pose = PoseView { snapshot };

        let left_arm_angle = pose.angle(Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist);
        let right_arm_angle =
            pose.angle(Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist);
        let left_leg_angle = pose.angle(Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle);
        let right_leg_angle = pose.angle(Joint::RightHip, Joint::RightKnee, Joint::RightAnkle);

        let near_face = |wrist: Joint| {
            pose.vis(wrist) > WRIST_VISIBLE
                && pose.near_nose(wrist, self.hand_near_face_threshold)
        };

        let left_hand_on_face =
            near_face(Joint::LeftWrist) && pose.above(Joint::RightWrist, Joint::RightShoulder);
        let right_hand_on_face =
            near_face(Joint::RightWrist) && pose.above(Joint::LeftWrist, Joint::LeftShoulder);

        let bent = |wrist: Joint, arm: JointAngle| {
            pose.vis(wrist) > WRIST_VISIBLE && arm.within(BENT_ARM_DEGREES.0, BENT_ARM_DEGREES.1)
        };

        let raised = |wrist: Joint, shoulder: Joint| {
            pose.vis(wrist) > RAISED_WRIST_VISIBLE
                && pose.y_within(wrist, Joint::Nose, FACE_LEVEL_BAND)
                && pose.above(wrist, shoulder)
        };

        let level_elbow = |elbow: Joint, shoulder: Joint| {
            pose.vis(elbow) > ELBOW_VISIBLE && pose.y_within(elbow, shoulder, SHOULDER_LEVEL_BAND)
        };

        PoseFeatures {
            left_arm_angle,
            right_arm_angle,
            left_leg_angle,
            right_leg_angle,
            lower_body_hidden: pose.vis(Joint::LeftAnkle) < ANKLE_HIDDEN_VISIBILITY
                && pose.vis(Joint::RightAnkle) < ANKLE_HIDDEN_VISIBILITY,
            elbows_hidden: pose.vis(Joint::LeftElbow) < ELBOW_HIDDEN_VISIBILITY
                && pose.vis(Joint::RightElbow) < ELBOW_HIDDEN_VISIBILITY,
            hand_on_face: left_hand_on_face || right_hand_on_face,
            wrist_near_face: near_face(Joint::LeftWrist) || near_face(Joint::RightWrist),
            shoulders_skewed: pose.y_beyond(Joint::LeftShoulder, Joint::RightShoulder, SHOULDER_SKEW),
            arm_bent: bent(Joint::LeftWrist, left_arm_angle)
                || bent(Joint::RightWrist, right_arm_angle),
            wrist_raised: raised(Joint::RightWrist, Joint::RightShoulder)
                || raised(Joint::LeftWrist, Joint::LeftShoulder),
            elbow_at_shoulder_height: level_elbow(Joint::RightElbow, Joint::RightShoulder)
                || level_elbow(Joint::LeftElbow, Joint::LeftShoulder),
            elbow_depth_offset: pose.z_beyond(Joint::RightElbow, Joint::RightShoulder, ELBOW_DEPTH_OFFSET)
                || pose.z_beyond(Joint::LeftElbow, Joint::LeftShoulder, ELBOW_DEPTH_OFFSET),
            elbow_visible: pose.vis(Joint::RightElbow) > ELBOW_HIDDEN_VISIBILITY
                || pose.vis(Joint::LeftElbow) > ELBOW_HIDDEN_VISIBILITY,
            legs_straight: left_leg_angle.exceeds(STRAIGHT_LEG_DEGREES)
                && right_leg_angle.exceeds(STRAIGHT_LEG_DEGREES),
            legs_asymmetric: left_leg_angle.differs_from(&right_leg_angle, STRIDE_ASYMMETRY_DEGREES),
        }
    }
}

/// Classify with the default thresholds.
pub fn classify(snapshot: &LandmarkSnapshot) -> Activity {
    ActivityClassifier::default().classify(snapshot)
}

/// Positional queries that are false whenever a joint is missing.
struct PoseView<'a> {
    snapshot: &'a LandmarkSnapshot,
}

impl PoseView<'_> {
    fn vis(&self, joint: Joint) -> f64 {
        self.snapshot.visibility(joint)
    }

    fn angle(&self, a: Joint, b: Joint, c: Joint) -> JointAngle {
        match (
            self.snapshot.get(a),
            self.snapshot.get(b),
            self.snapshot.get(c),
        ) {
            (Some(a), Some(b), Some(c)) => angle(a.xy(), b.xy(), c.xy()),
            _ => JointAngle::UNDEFINED,
        }
    }

    fn pair(&self, a: Joint, b: Joint) -> Option<(f64, f64, f64, f64)> {
        let a = self.snapshot.position(a)?;
        let b = self.snapshot.position(b)?;
        Some((a.y, b.y, a.z, b.z))
    }

    fn near_nose(&self, wrist: Joint, threshold: f64) -> bool {
        match (self.snapshot.get(wrist), self.snapshot.get(Joint::Nose)) {
            (Some(w), Some(n)) => near(&w.xy(), &n.xy(), threshold),
            _ => false,
        }
    }

    /// `a` is higher in the image than `b` (smaller y).
    fn above(&self, a: Joint, b: Joint) -> bool {
        self.pair(a, b).is_some_and(|(ay, by, _, _)| ay < by)
    }

    fn y_within(&self, a: Joint, b: Joint, band: f64) -> bool {
        self.pair(a, b)
            .is_some_and(|(ay, by, _, _)| (ay - by).abs() < band)
    }

    fn y_beyond(&self, a: Joint, b: Joint, limit: f64) -> bool {
        self.pair(a, b)
            .is_some_and(|(ay, by, _, _)| (ay - by).abs() > limit)
    }

    fn z_beyond(&self, a: Joint, b: Joint, limit: f64) -> bool {
        self.pair(a, b)
            .is_some_and(|(_, _, az, bz)| (az - bz).abs() > limit)
    }
}
