//! Modality result adapter
//!
//! Normalizes raw provider payloads into `ModalityScore`s. Pure transform:
//! tolerates missing optional sub-fields by substituting documented defaults,
//! and fails with `MalformedProviderOutput` only when a channel's minimum
//! required field is absent — which aborts aggregation for that channel
//! alone, never the whole assessment.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{
    Channel, Emotion, ModalityDetail, ModalityScore, SentimentLabel, StressCategory,
    SubscaleScore, SubscaleSeverity,
};

/// Default confidence per channel when the provider omits one
const DEFAULT_CONFIDENCE: [(Channel, f64); 4] = [
    (Channel::Questionnaire, 0.90),
    (Channel::Facial, 0.75),
    (Channel::Voice, 0.70),
    (Channel::Sentiment, 0.65),
];

/// Adapter errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The provider payload lacks the channel's minimum required field
    #[error("Malformed {channel} provider output: {reason}")]
    MalformedProviderOutput { channel: Channel, reason: String },
}

/// Normalize one channel's raw provider output
///
/// # Errors
/// `MalformedProviderOutput` when the payload is missing the channel's
/// minimum required field (see per-channel functions).
pub fn normalize(channel: Channel, raw: &Value) -> Result<ModalityScore, AdapterError> {
    match channel {
        Channel::Questionnaire => normalize_questionnaire(raw),
        Channel::Facial => normalize_facial(raw),
        Channel::Voice => normalize_voice(raw),
        Channel::Sentiment => normalize_sentiment(raw),
    }
}

fn default_confidence(channel: Channel) -> f64 {
    DEFAULT_CONFIDENCE
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|(_, v)| *v)
        .unwrap_or(0.5)
}

fn malformed(channel: Channel, reason: impl Into<String>) -> AdapterError {
    AdapterError::MalformedProviderOutput {
        channel,
        reason: reason.into(),
    }
}

fn score_from(channel: Channel, score: f64, confidence: f64, detail: ModalityDetail) -> ModalityScore {
    ModalityScore {
        channel,
        score: score.clamp(0.0, 100.0),
        confidence: confidence.clamp(0.0, 1.0),
        detail,
        is_fallback: false,
        computed_at: Utc::now(),
    }
}

/// Questionnaire scorer payload
///
/// Minimum required: `overall.percentage` (or `overall.score` on the 0-42
/// scale). Optional: per-subscale blocks, `category_scores`, `confidence`.
fn normalize_questionnaire(raw: &Value) -> Result<ModalityScore, AdapterError> {
    let overall = raw
        .get("overall")
        .ok_or_else(|| malformed(Channel::Questionnaire, "missing 'overall' block"))?;

    let percentage = match overall.get("percentage").and_then(Value::as_f64) {
        Some(p) => p,
        None => {
            let score = overall
                .get("score")
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    malformed(Channel::Questionnaire, "missing 'overall.percentage' and 'overall.score'")
                })?;
            score / crate::scoring::dass21::MAX_SUBSCALE_SCORE * 100.0
        }
    };

    let subscale = |key: &str| parse_subscale(raw.get(key));
    let detail = ModalityDetail::Questionnaire {
        total_raw_score: raw
            .get("total_raw_score")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        depression: subscale("depression"),
        anxiety: subscale("anxiety"),
        stress: subscale("stress"),
        category_scores: parse_category_scores(raw.get("category_scores")),
    };

    let confidence = raw
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or_else(|| default_confidence(Channel::Questionnaire));

    Ok(score_from(Channel::Questionnaire, percentage, confidence, detail))
}

/// Sub-scale block: missing fields default to a zero/normal reading
fn parse_subscale(value: Option<&Value>) -> SubscaleScore {
    let raw_score = value
        .and_then(|v| v.get("score"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let severity = value
        .and_then(|v| v.get("severity"))
        .and_then(Value::as_str)
        .and_then(parse_severity)
        .unwrap_or(SubscaleSeverity::Normal);
    let percentage = value
        .and_then(|v| v.get("percentage"))
        .and_then(Value::as_f64)
        .unwrap_or_else(|| raw_score as f64 / crate::scoring::dass21::MAX_SUBSCALE_SCORE * 100.0);
    SubscaleScore {
        raw_score,
        severity,
        percentage,
    }
}

fn parse_severity(s: &str) -> Option<SubscaleSeverity> {
    match s {
        "normal" => Some(SubscaleSeverity::Normal),
        "mild" => Some(SubscaleSeverity::Mild),
        "moderate" => Some(SubscaleSeverity::Moderate),
        "severe" => Some(SubscaleSeverity::Severe),
        "extremely_severe" => Some(SubscaleSeverity::ExtremelySevere),
        _ => None,
    }
}

fn parse_category(s: &str) -> Option<StressCategory> {
    match s {
        "academic" => Some(StressCategory::Academic),
        "social" => Some(StressCategory::Social),
        "financial" => Some(StressCategory::Financial),
        "health" => Some(StressCategory::Health),
        "work" => Some(StressCategory::Work),
        _ => None,
    }
}

/// Category map: unknown category keys are dropped, not errors
fn parse_category_scores(value: Option<&Value>) -> BTreeMap<StressCategory, f64> {
    let mut scores = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, entry) in map {
            if let (Some(category), Some(score)) = (parse_category(key), entry.as_f64()) {
                scores.insert(category, score);
            }
        }
    }
    scores
}

/// Facial emotion payload
///
/// Minimum required: `stress_assessment.stress_score` (0-100). Optional:
/// `stress_assessment.confidence`, `emotions` (first entry's
/// `dominant_emotion` and `scores`), `faces_detected`. An unknown or absent
/// dominant emotion defaults to `neutral`.
fn normalize_facial(raw: &Value) -> Result<ModalityScore, AdapterError> {
    let stress_score = raw
        .get("stress_assessment")
        .and_then(|v| v.get("stress_score"))
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(Channel::Facial, "missing 'stress_assessment.stress_score'"))?;

    let confidence = raw
        .get("stress_assessment")
        .and_then(|v| v.get("confidence"))
        .and_then(Value::as_f64)
        .unwrap_or_else(|| default_confidence(Channel::Facial));

    let first_emotion = raw
        .get("emotions")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first());

    let dominant_emotion = first_emotion
        .and_then(|e| e.get("dominant_emotion"))
        .and_then(Value::as_str)
        .map(Emotion::parse_or_neutral)
        .unwrap_or(Emotion::Neutral);

    let mut emotion_scores = BTreeMap::new();
    if let Some(Value::Object(map)) = first_emotion.and_then(|e| e.get("scores")) {
        for (key, entry) in map {
            if let Some(value) = entry.as_f64() {
                emotion_scores.insert(Emotion::parse_or_neutral(key), value);
            }
        }
    }

    let detail = ModalityDetail::Facial {
        dominant_emotion,
        emotion_scores,
        faces_detected: raw.get("faces_detected").and_then(Value::as_u64).unwrap_or(1) as u32,
    };

    Ok(score_from(Channel::Facial, stress_score, confidence, detail))
}

/// Voice analysis payload
///
/// Minimum required: at least one of `depression.score` / `anxiety.score` /
/// `stress.score` (each 0-100). The modality score is the mean of the
/// sub-scores present; missing sub-scores are recorded as zero in the
/// detail.
fn normalize_voice(raw: &Value) -> Result<ModalityScore, AdapterError> {
    let sub = |key: &str| raw.get(key).and_then(|v| v.get("score")).and_then(Value::as_f64);

    let present: Vec<f64> = [sub("depression"), sub("anxiety"), sub("stress")]
        .into_iter()
        .flatten()
        .collect();
    if present.is_empty() {
        return Err(malformed(Channel::Voice, "no 'depression'/'anxiety'/'stress' sub-score"));
    }
    let score = present.iter().sum::<f64>() / present.len() as f64;

    let confidence = raw
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or_else(|| default_confidence(Channel::Voice));

    let detail = ModalityDetail::Voice {
        depression_score: sub("depression").unwrap_or(0.0),
        anxiety_score: sub("anxiety").unwrap_or(0.0),
        stress_score: sub("stress").unwrap_or(0.0),
    };

    Ok(score_from(Channel::Voice, score, confidence, detail))
}

/// Sentiment payload
///
/// Minimum required: the `negative` proportion (0.0-1.0). Optional:
/// `positive`, `neutral` (default 0), `confidence`. Stress contribution is
/// the original negative-dominant weighting: `negative x 45 - positive x 10`,
/// floored at zero.
fn normalize_sentiment(raw: &Value) -> Result<ModalityScore, AdapterError> {
    let negative = raw
        .get("negative")
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(Channel::Sentiment, "missing 'negative' proportion"))?;
    let positive = raw.get("positive").and_then(Value::as_f64).unwrap_or(0.0);
    let neutral = raw.get("neutral").and_then(Value::as_f64).unwrap_or(0.0);

    let score = (negative * 45.0 - positive * 10.0).max(0.0);

    let label = if negative >= positive && negative >= neutral {
        SentimentLabel::Negative
    } else if positive >= neutral {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    };

    let confidence = raw
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or_else(|| default_confidence(Channel::Sentiment));

    let detail = ModalityDetail::Sentiment {
        negative,
        neutral,
        positive,
        label,
    };

    Ok(score_from(Channel::Sentiment, score, confidence, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_questionnaire_minimum_payload() {
        let raw = json!({"overall": {"percentage": 54.0}});
        let score = normalize(Channel::Questionnaire, &raw).unwrap();
        assert_eq!(score.channel, Channel::Questionnaire);
        assert_eq!(score.score, 54.0);
        assert_eq!(score.confidence, 0.90);
        assert!(!score.is_fallback);
    }

    #[test]
    fn test_questionnaire_overall_score_fallback_to_scale() {
        let raw = json!({"overall": {"score": 21.0}});
        let score = normalize(Channel::Questionnaire, &raw).unwrap();
        assert!((score.score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_questionnaire_missing_overall_is_malformed() {
        let raw = json!({"depression": {"score": 10}});
        let err = normalize(Channel::Questionnaire, &raw).unwrap_err();
        let AdapterError::MalformedProviderOutput { channel, .. } = err;
        assert_eq!(channel, Channel::Questionnaire);
    }

    #[test]
    fn test_facial_unknown_dominant_emotion_defaults_neutral() {
        let raw = json!({
            "stress_assessment": {"stress_score": 62.0, "confidence": 0.8},
            "emotions": [{"dominant_emotion": "contempt"}],
        });
        let score = normalize(Channel::Facial, &raw).unwrap();
        match score.detail {
            ModalityDetail::Facial { dominant_emotion, faces_detected, .. } => {
                assert_eq!(dominant_emotion, Emotion::Neutral);
                assert_eq!(faces_detected, 1);
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_facial_missing_stress_score_is_malformed() {
        let raw = json!({"emotions": [{"dominant_emotion": "sad"}]});
        assert!(normalize(Channel::Facial, &raw).is_err());
    }

    #[test]
    fn test_voice_mean_of_present_subscores() {
        let raw = json!({
            "depression": {"score": 30.0},
            "stress": {"score": 60.0},
        });
        let score = normalize(Channel::Voice, &raw).unwrap();
        assert!((score.score - 45.0).abs() < 1e-9);
        match score.detail {
            ModalityDetail::Voice { anxiety_score, .. } => assert_eq!(anxiety_score, 0.0),
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_voice_all_subscores_missing_is_malformed() {
        assert!(normalize(Channel::Voice, &json!({"confidence": 0.9})).is_err());
    }

    #[test]
    fn test_sentiment_negative_dominant() {
        let raw = json!({"negative": 0.8, "positive": 0.1, "neutral": 0.1});
        let score = normalize(Channel::Sentiment, &raw).unwrap();
        assert!((score.score - 35.0).abs() < 1e-9);
        match score.detail {
            ModalityDetail::Sentiment { label, .. } => assert_eq!(label, SentimentLabel::Negative),
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_sentiment_positive_floor_at_zero() {
        let raw = json!({"negative": 0.0, "positive": 0.9, "neutral": 0.1});
        let score = normalize(Channel::Sentiment, &raw).unwrap();
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_scores_clamped_to_range() {
        let raw = json!({"stress_assessment": {"stress_score": 140.0, "confidence": 1.4}});
        let score = normalize(Channel::Facial, &raw).unwrap();
        assert_eq!(score.score, 100.0);
        assert_eq!(score.confidence, 1.0);
    }
}
