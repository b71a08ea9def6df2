//! PoseWatch Pose Model
//!
//! Defines the core data contracts for PoseWatch:
//! - **Geometry:** Points, joint angles, distances
//! - **Landmarks:** The 33-joint skeleton snapshot produced per frame
//! - **Activity:** The closed set of activity labels
//! - **Frames:** Per-frame collaborator observations and annotations
//!
//! x/y coordinates are normalized to `[0.0, 1.0]` relative to the image;
//! z is the pose model's unscaled relative depth.

pub mod activity;
pub mod frame;
pub mod geometry;
pub mod landmark;

pub use activity::*;
pub use frame::*;
pub use geometry::*;
pub use landmark::*;
