//! Classify a single landmark snapshot.

use std::path::PathBuf;

use anyhow::Context;
use posewatch_analysis_core::ActivityClassifier;
use posewatch_common::config::{check_threshold, AppConfig};
use posewatch_pose_model::geometry::JointAngle;
use posewatch_pose_model::landmark::LandmarkSnapshot;

pub fn run(config: &AppConfig, path: PathBuf, hand_near_face: Option<f64>) -> anyhow::Result<()> {
    let threshold = match hand_near_face {
        Some(value) => {
            check_threshold("--hand-near-face", value)?;
            value
        }
        None => config.analysis.hand_near_face_threshold,
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: LandmarkSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

    let classifier = ActivityClassifier::new(threshold);
    let features = classifier.features(&snapshot);
    let classification = classifier.classify_explained(&snapshot);

    println!("Snapshot: {} ({} landmarks)", path.display(), snapshot.len());
    println!("  Activity: {}", classification.activity);
    println!("  Caption: {}", classification.activity.overlay_text());
    println!("  Rule: {}", classification.rule);
    println!();
    println!("Joint angles:");
    println!("  Left arm:  {}", format_angle(features.left_arm_angle));
    println!("  Right arm: {}", format_angle(features.right_arm_angle));
    println!("  Left leg:  {}", format_angle(features.left_leg_angle));
    println!("  Right leg: {}", format_angle(features.right_leg_angle));

    Ok(())
}

fn format_angle(angle: JointAngle) -> String {
    match angle.degrees() {
        Some(degrees) => format!("{degrees:.1}°"),
        None => "undefined".to_string(),
    }
}
