//! Per-frame records exchanged with the external collaborators.
//!
//! A frame stream is JSONL: an optional `# {header}` line followed by one
//! [`FrameObservation`] per video frame, in frame order. The per-frame
//! output for the renderer is an [`AnnotatedFrame`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::activity::Activity;
use crate::landmark::{Bone, LandmarkSnapshot};

/// Current frame stream schema version.
pub const FRAME_STREAM_SCHEMA_VERSION: &str = "1.0";

/// Metadata describing the video a frame stream was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Source video path, as given to the extractor.
    #[serde(default)]
    pub source: Option<String>,

    /// Nominal frame rate of the source video.
    #[serde(default)]
    pub fps: Option<f64>,

    /// Frame dimensions in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// One detected face and its most likely emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmotion {
    pub region: FaceRegion,
    pub dominant_emotion: String,
}

/// Outcome of the emotion collaborator for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmotionReading {
    /// Zero or more faces were analyzed.
    Detected(Vec<FaceEmotion>),
    /// The detector failed; counts as zero faces.
    Failed { error: String },
}

impl Default for EmotionReading {
    fn default() -> Self {
        EmotionReading::Detected(Vec::new())
    }
}

impl EmotionReading {
    /// Faces credited for this frame. Empty on failure.
    pub fn faces(&self) -> &[FaceEmotion] {
        match self {
            EmotionReading::Detected(faces) => faces,
            EmotionReading::Failed { .. } => &[],
        }
    }

    /// Dominant-emotion labels credited for this frame.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.faces().iter().map(|f| f.dominant_emotion.as_str())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EmotionReading::Failed { .. })
    }
}

/// Everything the collaborators produced for one video frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Body landmarks, or `None` when no body was detected.
    #[serde(default)]
    pub pose: Option<LandmarkSnapshot>,

    /// Emotion collaborator output. Decoded on its own so a bad value
    /// never costs the frame its pose.
    #[serde(default, rename = "faces", deserialize_with = "lenient_reading")]
    pub emotions: EmotionReading,
}

/// `null` or an undecodable `faces` value becomes a failed reading.
fn lenient_reading<'de, D>(deserializer: D) -> Result<EmotionReading, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(EmotionReading::Failed {
            error: "emotion reading is null".to_string(),
        });
    }
    Ok(EmotionReading::deserialize(value).unwrap_or_else(|e| EmotionReading::Failed {
        error: format!("malformed emotion reading: {e}"),
    }))
}

impl FrameObservation {
    pub fn new(pose: Option<LandmarkSnapshot>, emotions: EmotionReading) -> Self {
        Self { pose, emotions }
    }

    /// A frame where neither collaborator produced anything.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Per-frame output consumed by the overlay renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedFrame {
    /// Zero-based frame index.
    pub index: u64,

    /// Classified activity; `None` when no body was detected.
    pub activity: Option<Activity>,

    /// Overlay text for the activity, e.g. `Atividade: Sentado`.
    pub caption: Option<String>,

    /// Name of the classifier rule that fired.
    pub rule: Option<String>,

    /// Whether this frame was flagged as an anomaly.
    pub anomaly: bool,

    /// Faces to box and label.
    pub emotions: Vec<FaceEmotion>,

    /// Skeleton segments to draw.
    pub bones: Vec<Bone>,
}

/// A classified line of a frame stream.
#[derive(Debug)]
pub enum FrameLine<'a> {
    /// Empty or whitespace-only line.
    Blank,
    /// `#`-prefixed metadata; the payload after the marker.
    Header(&'a str),
    /// A frame record.
    Frame(Result<FrameObservation, serde_json::Error>),
}

/// Classify and parse one line of a frame stream.
pub fn parse_frame_line(line: &str) -> FrameLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        FrameLine::Blank
    } else if let Some(rest) = trimmed.strip_prefix('#') {
        FrameLine::Header(rest.trim())
    } else {
        FrameLine::Frame(serde_json::from_str(trimmed))
    }
}

/// Error from strict frame stream parsing.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct FrameParseError {
    /// One-based line number.
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// A fully parsed frame stream.
#[derive(Debug, Clone, Default)]
pub struct FrameStream {
    pub header: Option<FrameStreamHeader>,
    pub frames: Vec<FrameObservation>,
}

/// Parse a whole frame stream, failing on the first malformed frame line.
///
/// The first `#` line is read as the header when it parses; other comment
/// lines are ignored.
pub fn parse_frames(jsonl: &str) -> Result<FrameStream, FrameParseError> {
    let mut stream = FrameStream::default();
    let mut seen_header = false;

    for (i, line) in jsonl.lines().enumerate() {
        match parse_frame_line(line) {
            FrameLine::Blank => {}
            FrameLine::Header(payload) => {
                if !seen_header {
                    seen_header = true;
                    stream.header = serde_json::from_str(payload).ok();
                }
            }
            FrameLine::Frame(result) => {
                let frame = result.map_err(|source| FrameParseError { line: i + 1, source })?;
                stream.frames.push(frame);
            }
        }
    }

    Ok(stream)
}
