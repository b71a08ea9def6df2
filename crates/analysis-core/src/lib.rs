//! PoseWatch Analysis Core
//!
//! Turns per-frame collaborator output into labels and a run report:
//! - **Classifier:** Ordered rule table mapping a landmark snapshot to an activity
//! - **Anomaly Detection:** Flags frames whose pose moved too far since the last one
//! - **Emotion Tally:** Counts dominant-emotion labels across the run
//! - **Report:** Aggregates a run into the summary report
//! - **Session:** Drives the per-frame loop with cooperative cancellation
//!
//! Everything except the stream adapters in [`stream`] is pure computation.

pub mod anomaly;
pub mod classifier;
pub mod emotion;
pub mod report;
pub mod session;
pub mod stream;

pub use anomaly::AnomalyDetector;
pub use classifier::{classify, ActivityClassifier, Classification};
pub use emotion::EmotionTally;
pub use report::SummaryReport;
pub use session::{AnalysisSession, RunOutcome, SessionConfig};
pub use stream::{AnnotationSink, JsonlAnnotationWriter, JsonlFrameSource, NullSink};
