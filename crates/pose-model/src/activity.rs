//! Activity labels produced by the classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of per-frame activity labels.
///
/// Frames without a detected body carry no activity at all
/// (`Option::<Activity>::None`); that is not a member of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Standing,
    Sitting,
    Lying,
    Walking,
    HandNearFace,
    WavingHand,
    WritingOrTyping,
    ArmsOpen,
    Idle,
    Unknown,
}

impl Activity {
    pub const ALL: [Activity; 10] = [
        Activity::Standing,
        Activity::Sitting,
        Activity::Lying,
        Activity::Walking,
        Activity::HandNearFace,
        Activity::WavingHand,
        Activity::WritingOrTyping,
        Activity::ArmsOpen,
        Activity::Idle,
        Activity::Unknown,
    ];

    /// Stable machine identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Standing => "standing",
            Activity::Sitting => "sitting",
            Activity::Lying => "lying",
            Activity::Walking => "walking",
            Activity::HandNearFace => "hand_near_face",
            Activity::WavingHand => "waving_hand",
            Activity::WritingOrTyping => "writing_or_typing",
            Activity::ArmsOpen => "arms_open",
            Activity::Idle => "idle",
            Activity::Unknown => "unknown",
        }
    }

    /// Caption drawn on the video overlay.
    pub fn caption(&self) -> &'static str {
        match self {
            Activity::Standing => "Em pe",
            Activity::Sitting => "Sentado",
            Activity::Lying => "Deitado",
            Activity::Walking => "Caminhando",
            Activity::HandNearFace => "Mao no rosto",
            Activity::WavingHand => "Acenando",
            Activity::WritingOrTyping => "Escrevendo ou Teclando",
            Activity::ArmsOpen => "Braco aberto",
            Activity::Idle => "Parado",
            Activity::Unknown => "Atividade desconhecida",
        }
    }

    /// Full overlay line, e.g. `Atividade: Sentado`.
    pub fn overlay_text(&self) -> String {
        format!("Atividade: {}", self.caption())
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_match_serde() {
        for activity in Activity::ALL {
            let json = serde_json::to_string(&activity).unwrap();
            assert_eq!(json, format!("\"{}\"", activity.as_str()));
        }
    }

    #[test]
    fn test_overlay_text() {
        assert_eq!(Activity::Lying.overlay_text(), "Atividade: Deitado");
        assert_eq!(Activity::HandNearFace.to_string(), "hand_near_face");
    }
}
