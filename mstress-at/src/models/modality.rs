//! Modality score types
//!
//! One `ModalityScore` per analysis channel. The channel-specific payload is
//! a tagged `ModalityDetail` variant with a closed schema, validated at the
//! adapter boundary so downstream components never see free-form maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Independent source of stress-related signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Questionnaire,
    Facial,
    Voice,
    Sentiment,
}

impl Channel {
    /// All channels in dispatch order (questionnaire first)
    pub const ALL: [Channel; 4] = [
        Channel::Questionnaire,
        Channel::Facial,
        Channel::Voice,
        Channel::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Questionnaire => "questionnaire",
            Channel::Facial => "facial",
            Channel::Voice => "voice",
            Channel::Sentiment => "sentiment",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Life-domain category contributing to the questionnaire breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressCategory {
    Academic,
    Social,
    Financial,
    Health,
    Work,
}

impl StressCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressCategory::Academic => "academic",
            StressCategory::Social => "social",
            StressCategory::Financial => "financial",
            StressCategory::Health => "health",
            StressCategory::Work => "work",
        }
    }
}

/// Facial emotion label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Angry,
    Fear,
    Sad,
    Disgust,
    Surprise,
    Happy,
    Neutral,
}

impl Emotion {
    /// Stress weighting per emotion (0.0 calm .. 1.0 distressed)
    pub fn stress_weight(&self) -> f64 {
        match self {
            Emotion::Angry => 0.8,
            Emotion::Fear => 0.9,
            Emotion::Sad => 0.7,
            Emotion::Disgust => 0.6,
            Emotion::Surprise => 0.4,
            Emotion::Happy => 0.1,
            Emotion::Neutral => 0.3,
        }
    }

    /// Parse a provider emotion label; unknown labels fall back to `Neutral`
    pub fn parse_or_neutral(s: &str) -> Emotion {
        match s {
            "angry" | "anger" => Emotion::Angry,
            "fear" | "afraid" => Emotion::Fear,
            "sad" | "sadness" => Emotion::Sad,
            "disgust" => Emotion::Disgust,
            "surprise" | "surprised" => Emotion::Surprise,
            "happy" | "happiness" => Emotion::Happy,
            _ => Emotion::Neutral,
        }
    }
}

/// Dominant sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

/// DASS-21 subscale severity rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscaleSeverity {
    Normal,
    Mild,
    Moderate,
    Severe,
    ExtremelySevere,
}

/// Score for one DASS-21 subscale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscaleScore {
    /// Raw subscale score (answer sum x 2, DASS-21 convention)
    pub raw_score: u32,
    /// Severity rating per the DASS-21 threshold table
    pub severity: SubscaleSeverity,
    /// Raw score as a percentage of the subscale maximum (42)
    pub percentage: f64,
}

/// One structured questionnaire answer
///
/// `value` uses the DASS-21 response scale: 0 = did not apply,
/// 1 = applied sometimes, 2 = applied often, 3 = applied very much.
/// An answer may carry a life-domain category tag contributing to the
/// per-category breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireResponse {
    pub question_index: usize,
    pub value: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StressCategory>,
}

/// Channel-specific structured payload, tagged by channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModalityDetail {
    Questionnaire {
        /// Sum of raw answer values (0-3 scale, before the x2 scaling)
        total_raw_score: u32,
        depression: SubscaleScore,
        anxiety: SubscaleScore,
        stress: SubscaleScore,
        /// Per-category percentages from category-tagged answers
        category_scores: BTreeMap<StressCategory, f64>,
    },
    Facial {
        dominant_emotion: Emotion,
        /// Per-emotion probabilities from the provider (0.0-1.0)
        emotion_scores: BTreeMap<Emotion, f64>,
        faces_detected: u32,
    },
    Voice {
        depression_score: f64,
        anxiety_score: f64,
        stress_score: f64,
    },
    Sentiment {
        negative: f64,
        neutral: f64,
        positive: f64,
        label: SentimentLabel,
    },
    /// Placeholder detail for a synthesized score with no provider signal
    Unavailable,
}

/// Normalized output of one analysis channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityScore {
    pub channel: Channel,
    /// Stress score, 0-100
    pub score: f64,
    /// Provider (or synthesizer) confidence, 0.0-1.0
    pub confidence: f64,
    pub detail: ModalityDetail,
    /// True when synthesized locally rather than produced by a real provider
    pub is_fallback: bool,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serde_wire_names() {
        let json = serde_json::to_string(&Channel::Questionnaire).unwrap();
        assert_eq!(json, "\"questionnaire\"");
        let back: Channel = serde_json::from_str("\"sentiment\"").unwrap();
        assert_eq!(back, Channel::Sentiment);
    }

    #[test]
    fn test_unknown_emotion_defaults_to_neutral() {
        assert_eq!(Emotion::parse_or_neutral("contempt"), Emotion::Neutral);
        assert_eq!(Emotion::parse_or_neutral("sadness"), Emotion::Sad);
    }

    #[test]
    fn test_detail_round_trip_is_tagged() {
        let detail = ModalityDetail::Facial {
            dominant_emotion: Emotion::Sad,
            emotion_scores: BTreeMap::from([(Emotion::Sad, 0.7), (Emotion::Neutral, 0.3)]),
            faces_detected: 1,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "facial");
        let back: ModalityDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }
}
