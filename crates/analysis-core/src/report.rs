//! End-of-run summary report.

use std::fmt;
use std::path::Path;

use posewatch_common::{PosewatchError, PosewatchResult};
use serde::Serialize;

use crate::emotion::EmotionTally;

/// Aggregate of one run. Built once when the frame stream ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    total_frames: u64,
    anomaly_count: usize,
    anomaly_frames: Vec<u64>,
    emotion_counts: EmotionTally,
}

impl SummaryReport {
    /// Assemble a report. `anomaly_frames` must be strictly ascending, as
    /// produced by the anomaly detector.
    pub fn build(total_frames: u64, anomaly_frames: &[u64], emotions: &EmotionTally) -> Self {
        debug_assert!(anomaly_frames.windows(2).all(|w| w[0] < w[1]));
        Self {
            total_frames,
            anomaly_count: anomaly_frames.len(),
            anomaly_frames: anomaly_frames.to_vec(),
            emotion_counts: emotions.clone(),
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomaly_count
    }

    pub fn anomaly_frames(&self) -> &[u64] {
        &self.anomaly_frames
    }

    pub fn emotion_counts(&self) -> &EmotionTally {
        &self.emotion_counts
    }

    /// Render the plain-text report. The last line has no trailing newline.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the rendered report to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> PosewatchResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PosewatchError::report(format!(
                        "cannot create report directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        std::fs::write(path, self.render()).map_err(|e| {
            PosewatchError::report(format!("cannot write report {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "Summary report written");
        Ok(())
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resumo da Análise do Vídeo")?;
        writeln!(f, "Total de frames analisados: {}", self.total_frames)?;
        writeln!(f, "Número de anomalias detectadas: {}", self.anomaly_count)?;
        writeln!(f, "Emoções detectadas:")?;
        for (label, count) in self.emotion_counts.iter() {
            writeln!(f, "  {label}: {count} vezes")?;
        }
        writeln!(f)?;
        writeln!(f, "Frames com anomalias:")?;

        let mut frames = self.anomaly_frames.iter();
        if let Some(first) = frames.next() {
            write!(f, "{first}")?;
            for frame in frames {
                write!(f, ", {frame}")?;
            }
        }
        Ok(())
    }
}
