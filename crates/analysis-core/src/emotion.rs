//! Run-wide tally of dominant-emotion labels.

use std::collections::BTreeMap;

use posewatch_pose_model::frame::EmotionReading;
use serde::{Deserialize, Serialize};

/// Label → count, ordered by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionTally {
    counts: BTreeMap<String, u64>,
}

impl EmotionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count each label once.
    pub fn record<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let label = label.as_ref();
            match self.counts.get_mut(label) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(label.to_string(), 1);
                }
            }
        }
    }

    /// Count the labels of one frame's reading. Returns how many were
    /// credited; a failed reading credits none.
    pub fn record_reading(&mut self, reading: &EmotionReading) -> usize {
        if let EmotionReading::Failed { error } = reading {
            tracing::debug!(%error, "emotion detector failed for frame");
            return 0;
        }
        let faces = reading.faces().len();
        self.record(reading.labels());
        faces
    }

    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_pose_model::frame::{FaceEmotion, FaceRegion};

    fn face(label: &str) -> FaceEmotion {
        FaceEmotion {
            region: FaceRegion {
                x: 0,
                y: 0,
                w: 32,
                h: 32,
            },
            dominant_emotion: label.to_string(),
        }
    }

    #[test]
    fn test_counts_across_frames() {
        let mut tally = EmotionTally::new();
        tally.record(["happy"]);
        tally.record(["happy"]);
        tally.record(["neutral"]);

        assert_eq!(tally.get("happy"), 2);
        assert_eq!(tally.get("neutral"), 1);
        assert_eq!(tally.get("sad"), 0);
        assert_eq!(tally.total(), 3);
        assert_eq!(
            tally.iter().collect::<Vec<_>>(),
            vec![("happy", 2), ("neutral", 1)]
        );
    }

    #[test]
    fn test_several_faces_in_one_frame() {
        let mut tally = EmotionTally::new();
        let reading = EmotionReading::Detected(vec![face("sad"), face("sad"), face("angry")]);
        assert_eq!(tally.record_reading(&reading), 3);
        assert_eq!(tally.get("sad"), 2);
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn test_failed_reading_credits_nothing() {
        let mut tally = EmotionTally::new();
        let reading = EmotionReading::Failed {
            error: "Face could not be detected".to_string(),
        };
        assert_eq!(tally.record_reading(&reading), 0);
        assert!(tally.is_empty());
        assert_eq!(tally.record_reading(&EmotionReading::default()), 0);
        assert!(tally.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut tally = EmotionTally::new();
        tally.record(["neutral", "happy"]);
        assert_eq!(
            serde_json::to_string(&tally).unwrap(),
            r#"{"happy":1,"neutral":1}"#
        );
    }
}
