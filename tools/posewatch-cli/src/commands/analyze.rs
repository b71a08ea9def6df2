//! Analyze a frame stream: classify, detect anomalies, tally emotions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use posewatch_analysis_core::stream::{AnnotationSink, JsonlAnnotationWriter, JsonlFrameSource, NullSink};
use posewatch_analysis_core::{AnalysisSession, SessionConfig, SummaryReport};
use posewatch_common::config::AppConfig;
use posewatch_pose_model::activity::Activity;
use serde::Serialize;

pub struct AnalyzeArgs {
    pub frames: PathBuf,
    pub report: Option<PathBuf>,
    pub annotations: Option<PathBuf>,
    pub anomaly_threshold: Option<f64>,
    pub hand_near_face: Option<f64>,
    pub json: bool,
}

#[derive(Serialize)]
struct AnalyzeSummary<'a> {
    report: &'a SummaryReport,
    activities: &'a BTreeMap<Activity, u64>,
    frames_without_pose: u64,
    malformed_lines: u64,
    annotation_failures: u64,
    read_error: Option<&'a str>,
    interrupted: bool,
}

pub async fn run(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut session_config = SessionConfig::from(&config.analysis);
    if let Some(threshold) = args.anomaly_threshold {
        session_config.anomaly_threshold = threshold;
    }
    if let Some(threshold) = args.hand_near_face {
        session_config.hand_near_face_threshold = threshold;
    }
    session_config
        .validate()
        .context("Invalid threshold override")?;

    let report_path = args
        .report
        .unwrap_or_else(|| config.output.report_path.clone());

    if !args.json {
        println!("Analyzing frame stream: {}", args.frames.display());
    }

    let mut source = JsonlFrameSource::open(&args.frames)
        .with_context(|| format!("Failed to open frame stream {}", args.frames.display()))?;

    let header = source.read_preamble().cloned();
    if let Some(header) = &header {
        tracing::info!(
            source = ?header.source,
            fps = ?header.fps,
            "Frame stream metadata"
        );
    }

    let mut sink: Box<dyn AnnotationSink + Send> = match &args.annotations {
        Some(path) => Box::new(
            JsonlAnnotationWriter::new(path.clone(), header.as_ref())
                .with_context(|| format!("Failed to create annotations file {}", path.display()))?,
        ),
        None => Box::new(NullSink),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested, finishing current frame");
            stop_on_signal.store(true, Ordering::Relaxed);
        }
    });

    let (outcome, malformed_lines, read_error) = tokio::task::spawn_blocking(move || {
        let session = AnalysisSession::new(session_config);
        let outcome = session.run(source.by_ref(), sink.as_mut(), &stop);
        let read_error = source.read_error().map(ToString::to_string);
        (outcome, source.malformed_lines(), read_error)
    })
    .await
    .context("Analysis task failed")?;

    outcome
        .report
        .write_to(&report_path)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;

    if args.json {
        let summary = AnalyzeSummary {
            report: &outcome.report,
            activities: &outcome.activity_counts,
            frames_without_pose: outcome.frames_without_pose,
            malformed_lines,
            annotation_failures: outcome.sink_failures,
            read_error: read_error.as_deref(),
            interrupted: outcome.interrupted,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return annotation_result(&args.annotations, outcome.sink_failures);
    }

    let report = &outcome.report;
    println!();
    if outcome.interrupted {
        println!("Interrupted after {} frame(s).", report.total_frames());
    }
    println!("Frames: {}", report.total_frames());
    println!("  Without pose: {}", outcome.frames_without_pose);
    if malformed_lines > 0 {
        println!("  Malformed lines: {malformed_lines}");
    }
    if let Some(error) = &read_error {
        println!("  Stream ended early: {error}");
    }

    println!("Activities:");
    for (activity, count) in &outcome.activity_counts {
        println!("  {:<24} {count}", activity.caption());
    }

    println!("Anomalies: {}", report.anomaly_count());
    if !report.anomaly_frames().is_empty() {
        let frames: Vec<String> = report.anomaly_frames().iter().map(u64::to_string).collect();
        println!("  Frames: {}", frames.join(", "));
    }

    println!("Emotions:");
    if report.emotion_counts().is_empty() {
        println!("  (none)");
    }
    for (label, count) in report.emotion_counts().iter() {
        println!("  {label}: {count}");
    }

    println!();
    println!("Report written to: {}", report_path.display());
    annotation_result(&args.annotations, outcome.sink_failures)?;
    if let Some(path) = &args.annotations {
        println!("Annotations written to: {}", path.display());
    }

    Ok(())
}

/// The report is already on disk; lost annotations still fail the command.
fn annotation_result(path: &Option<PathBuf>, failures: u64) -> anyhow::Result<()> {
    match path {
        Some(path) if failures > 0 => anyhow::bail!(
            "{failures} annotation write(s) failed for {}",
            path.display()
        ),
        _ => Ok(()),
    }
}
