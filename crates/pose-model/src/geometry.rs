//! Geometric primitives on normalized landmark coordinates.
//!
//! Angles are measured in the image plane (x/y only). Distances use every
//! coordinate the inputs carry.

use serde::{Deserialize, Serialize};

/// A 2D normalized point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// A 3D point: normalized x/y plus relative depth z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    fn sub(&self, other: &Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Projection onto the image plane.
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl From<Point3> for Point2 {
    fn from(p: Point3) -> Self {
        p.xy()
    }
}

/// Points with a Euclidean metric.
pub trait Euclidean {
    /// Euclidean distance to another point.
    fn distance_to(&self, other: &Self) -> f64;
}

impl Euclidean for Point2 {
    fn distance_to(&self, other: &Point2) -> f64 {
        self.sub(other).norm()
    }
}

impl Euclidean for Point3 {
    fn distance_to(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Euclidean distance between two points of the same dimension.
pub fn distance<P: Euclidean>(p: &P, q: &P) -> f64 {
    p.distance_to(q)
}

/// `true` when `p` and `q` are strictly closer than `threshold`.
pub fn near<P: Euclidean>(p: &P, q: &P, threshold: f64) -> bool {
    distance(p, q) < threshold
}

/// Angle at a joint in degrees, or undefined when a segment is degenerate.
///
/// Every range test on an undefined angle is `false`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngle(Option<f64>);

impl JointAngle {
    pub const UNDEFINED: JointAngle = JointAngle(None);

    /// Degrees in `[0, 180]`, if defined.
    pub fn degrees(&self) -> Option<f64> {
        self.0
    }

    pub fn is_defined(&self) -> bool {
        self.0.is_some()
    }

    /// Open interval test `lo < angle < hi`.
    pub fn within(&self, lo: f64, hi: f64) -> bool {
        self.0.is_some_and(|a| lo < a && a < hi)
    }

    /// `angle > limit`.
    pub fn exceeds(&self, limit: f64) -> bool {
        self.0.is_some_and(|a| a > limit)
    }

    /// `|self - other| > limit`, false if either side is undefined.
    pub fn differs_from(&self, other: &JointAngle, limit: f64) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => (a - b).abs() > limit,
            _ => false,
        }
    }
}

/// Angle `a-b-c` at vertex `b`, measured in the image plane.
pub fn angle(a: Point2, b: Point2, c: Point2) -> JointAngle {
    let u = a.sub(&b);
    let v = c.sub(&b);
    let nu = u.norm();
    let nv = v.norm();

    if !(nu.is_finite() && nv.is_finite()) || nu == 0.0 || nv == 0.0 {
        return JointAngle::UNDEFINED;
    }

    let cos = (u.dot(&v) / (nu * nv)).clamp(-1.0, 1.0);
    JointAngle(Some(cos.acos().to_degrees()))
}
