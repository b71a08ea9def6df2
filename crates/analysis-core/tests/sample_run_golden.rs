use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use posewatch_analysis_core::{
    AnalysisSession, ActivityClassifier, JsonlFrameSource, NullSink, SessionConfig,
};
use posewatch_pose_model::activity::Activity;
use posewatch_pose_model::frame::{parse_frames, AnnotatedFrame};
use posewatch_pose_model::landmark::LandmarkSnapshot;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-run")
        .join(name)
}

#[test]
fn sample_run_report_is_stable() {
    let source = JsonlFrameSource::open(&fixture("frames.jsonl")).expect("fixture should open");
    let stop = AtomicBool::new(false);
    let mut annotations: Vec<AnnotatedFrame> = Vec::new();

    let outcome = AnalysisSession::new(SessionConfig::default()).run(source, &mut annotations, &stop);

    let expected =
        std::fs::read_to_string(fixture("expected_report.txt")).expect("expected report should be readable");
    assert_eq!(outcome.report.render(), expected);
    assert!(!outcome.interrupted);
    assert_eq!(outcome.frames_without_pose, 2);
    assert_eq!(outcome.activity_counts.get(&Activity::Standing), Some(&5));
    assert_eq!(outcome.activity_counts.get(&Activity::Idle), Some(&1));

    let flagged: Vec<u64> = annotations
        .iter()
        .filter(|a| a.anomaly)
        .map(|a| a.index)
        .collect();
    assert_eq!(flagged, vec![4, 7]);
    assert_eq!(annotations.len(), 8);
    assert_eq!(annotations[6].rule.as_deref(), Some("upper_body.elbow_level.idle"));
    assert_eq!(annotations[6].emotions.len(), 2);
    assert!(annotations[3].activity.is_none());
}

#[test]
fn sample_run_source_counts_the_malformed_line() {
    let mut source = JsonlFrameSource::open(&fixture("frames.jsonl")).expect("fixture should open");
    assert_eq!(source.by_ref().count(), 8);
    assert_eq!(source.malformed_lines(), 1);
    let header = source.header().expect("fixture has a header");
    assert_eq!(header.source.as_deref(), Some("input_video.mp4"));
    assert_eq!(header.fps, Some(30.0));
}

#[test]
fn strict_parse_rejects_the_truncated_line() {
    let content = std::fs::read_to_string(fixture("frames.jsonl")).expect("fixture should be readable");
    let err = parse_frames(&content).expect_err("truncated line should fail strict parsing");
    assert_eq!(err.line, 6);
}

#[test]
fn stop_before_start_reports_zero_frames() {
    let source = JsonlFrameSource::open(&fixture("frames.jsonl")).expect("fixture should open");
    let stop = AtomicBool::new(true);
    let outcome = AnalysisSession::default().run(source, &mut NullSink, &stop);

    assert!(outcome.interrupted);
    assert_eq!(outcome.report.total_frames(), 0);
    assert_eq!(
        outcome.report.render(),
        "Resumo da Análise do Vídeo\n\
         Total de frames analisados: 0\n\
         Número de anomalias detectadas: 0\n\
         Emoções detectadas:\n\
         \n\
         Frames com anomalias:\n"
    );
}

#[test]
fn sample_snapshot_is_waving() {
    let content = std::fs::read_to_string(fixture("snapshot.json")).expect("snapshot should be readable");
    let snapshot: LandmarkSnapshot = serde_json::from_str(&content).expect("snapshot should parse");
    let c = ActivityClassifier::default().classify_explained(&snapshot);
    assert_eq!(c.activity, Activity::WavingHand);
    assert_eq!(c.rule, "upper_body.waving");
}
