//! Strictly validate a frame stream.

use std::path::PathBuf;

use anyhow::Context;
use posewatch_pose_model::frame::{parse_frames, FRAME_STREAM_SCHEMA_VERSION};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating frame stream: {}", path.display());

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read frame stream {}", path.display()))?;
    let stream = parse_frames(&content)
        .map_err(|e| anyhow::anyhow!("Invalid frame stream: {e}"))?;

    match &stream.header {
        Some(header) => {
            println!("  Schema version: {}", header.schema_version);
            if header.schema_version != FRAME_STREAM_SCHEMA_VERSION {
                println!("  Warning: expected schema version {FRAME_STREAM_SCHEMA_VERSION}");
            }
            if let Some(source) = &header.source {
                println!("  Source: {source}");
            }
            if let Some(fps) = header.fps {
                println!("  FPS: {fps}");
            }
            if let (Some(width), Some(height)) = (header.width, header.height) {
                println!("  Resolution: {width}x{height}");
            }
        }
        None => println!("  Header: none"),
    }

    let frames = stream.frames.len();
    let with_pose = stream.frames.iter().filter(|f| f.pose.is_some()).count();
    let faces: usize = stream.frames.iter().map(|f| f.emotions.faces().len()).sum();
    let failures = stream
        .frames
        .iter()
        .filter(|f| f.emotions.is_failure())
        .count();

    println!("  Frames: {frames}");
    println!("  Frames with pose: {with_pose}");
    println!("  Faces: {faces}");
    println!("  Emotion detector failures: {failures}");
    println!("\nFrame stream is valid.");

    Ok(())
}
