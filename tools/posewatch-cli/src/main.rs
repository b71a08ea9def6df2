//! PoseWatch CLI: command-line interface for pose activity analysis.
//!
//! Usage:
//!   posewatch analyze <FRAMES>     Analyze a frame stream and write the report
//!   posewatch classify <SNAPSHOT>  Classify a single landmark snapshot
//!   posewatch validate <FRAMES>    Strictly check a frame stream

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use posewatch_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "posewatch",
    about = "Activity, anomaly and emotion analysis over pose landmark streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/posewatch/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded frame stream
    Analyze {
        /// Path to the frame stream (JSONL)
        frames: PathBuf,

        /// Where to write the summary report
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Write per-frame annotations (JSONL) for the overlay renderer
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Mean joint displacement above which a frame is an anomaly
        #[arg(long)]
        anomaly_threshold: Option<f64>,

        /// Wrist-to-nose distance counted as a hand on the face
        #[arg(long)]
        hand_near_face: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one landmark snapshot
    Classify {
        /// Path to a snapshot JSON file (named object or 33-entry array)
        snapshot: PathBuf,

        /// Wrist-to-nose distance counted as a hand on the face
        #[arg(long)]
        hand_near_face: Option<f64>,
    },

    /// Validate a frame stream
    Validate {
        /// Path to the frame stream (JSONL)
        frames: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    posewatch_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Analyze {
            frames,
            report,
            annotations,
            anomaly_threshold,
            hand_near_face,
            json,
        } => {
            commands::analyze::run(
                &config,
                commands::analyze::AnalyzeArgs {
                    frames,
                    report,
                    annotations,
                    anomaly_threshold,
                    hand_near_face,
                    json,
                },
            )
            .await
        }
        Commands::Classify {
            snapshot,
            hand_near_face,
        } => commands::classify::run(&config, snapshot, hand_near_face),
        Commands::Validate { frames } => commands::validate::run(frames),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "posewatch",
            "-v",
            "analyze",
            "frames.jsonl",
            "--report",
            "out/report.txt",
            "--anomaly-threshold",
            "0.1",
            "--json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                frames,
                report,
                anomaly_threshold,
                json,
                ..
            } => {
                assert_eq!(frames, PathBuf::from("frames.jsonl"));
                assert_eq!(report, Some(PathBuf::from("out/report.txt")));
                assert_eq!(anomaly_threshold, Some(0.1));
                assert!(json);
            }
            _ => panic!("expected analyze"),
        }
    }
}
