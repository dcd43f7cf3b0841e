//! Composite scorer
//!
//! Combines the present modality scores into one `CompositeResult`:
//! confidence-weighted overall score, fixed-band stress level, penalized
//! confidence, questionnaire category breakdown, and derived
//! insights/recommendations.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{
    Channel, CompositeResult, Insights, ModalityDetail, ModalityScore, Recommendation,
    StressCategory, StressLevel, Urgency,
};

/// Base channel weights; questionnaire carries the most signal, the
/// sensor-derived channels split the remainder (voice above sentiment and
/// facial). Renormalized over the channels actually present.
const BASE_WEIGHTS: [(Channel, f64); 4] = [
    (Channel::Questionnaire, 0.50),
    (Channel::Voice, 0.20),
    (Channel::Sentiment, 0.15),
    (Channel::Facial, 0.15),
];

/// Multiplicative confidence penalty applied per fallback channel
const FALLBACK_CONFIDENCE_PENALTY: f64 = 0.85;

/// Floor preventing a degenerate zero confidence
const MIN_CONFIDENCE: f64 = 0.10;

/// Category score at or above this is a concern
const CONCERN_THRESHOLD: f64 = 70.0;

/// Category score at or below this is a strength
const STRENGTH_THRESHOLD: f64 = 30.0;

/// Category score at or above this is a risk factor
const RISK_THRESHOLD: f64 = 85.0;

/// Composite scoring errors
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Cannot aggregate an empty modality set
    #[error("No modality data to aggregate")]
    NoModalityData,
}

/// Combine the present modality scores into a composite result
///
/// # Errors
/// `NoModalityData` when `scores` is empty.
pub fn combine(scores: &[ModalityScore]) -> Result<CompositeResult, CompositeError> {
    if scores.is_empty() {
        return Err(CompositeError::NoModalityData);
    }

    let weights = effective_weights(scores);
    let overall_score = scores
        .iter()
        .zip(&weights)
        .map(|(s, w)| s.score * w)
        .sum::<f64>()
        .clamp(0.0, 100.0);

    let stress_level = StressLevel::from_score(overall_score);

    let fallback_count = scores.iter().filter(|s| s.is_fallback).count();
    let weighted_confidence = scores
        .iter()
        .zip(&weights)
        .map(|(s, w)| s.confidence * w)
        .sum::<f64>();
    let penalty = FALLBACK_CONFIDENCE_PENALTY.powi(fallback_count as i32);
    let confidence = (weighted_confidence * penalty).clamp(MIN_CONFIDENCE, 1.0);

    let category_scores = questionnaire_categories(scores);
    let insights = derive_insights(stress_level, &category_scores, fallback_count);
    let recommendations = derive_recommendations(stress_level, &category_scores);

    Ok(CompositeResult {
        overall_score,
        stress_level,
        confidence,
        category_scores,
        insights,
        recommendations,
    })
}

fn base_weight(channel: Channel) -> f64 {
    BASE_WEIGHTS
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Per-channel weights: base x confidence, renormalized to sum to 1 over the
/// present channels. Degenerate all-zero confidence falls back to the base
/// weights alone so the combination stays defined.
fn effective_weights(scores: &[ModalityScore]) -> Vec<f64> {
    let mut weights: Vec<f64> = scores
        .iter()
        .map(|s| base_weight(s.channel) * s.confidence)
        .collect();
    let mut total: f64 = weights.iter().sum();

    if total <= f64::EPSILON {
        weights = scores.iter().map(|s| base_weight(s.channel)).collect();
        total = weights.iter().sum();
    }
    if total <= f64::EPSILON {
        let uniform = 1.0 / scores.len() as f64;
        return vec![uniform; scores.len()];
    }

    weights.iter().map(|w| w / total).collect()
}

/// Category breakdown comes from the questionnaire channel only; its absence
/// yields an empty mapping, not an error.
fn questionnaire_categories(scores: &[ModalityScore]) -> BTreeMap<StressCategory, f64> {
    scores
        .iter()
        .find_map(|s| match &s.detail {
            ModalityDetail::Questionnaire { category_scores, .. } => Some(category_scores.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn derive_insights(
    stress_level: StressLevel,
    category_scores: &BTreeMap<StressCategory, f64>,
    fallback_count: usize,
) -> Insights {
    let mut insights = Insights::default();

    for (category, score) in category_scores {
        if *score >= CONCERN_THRESHOLD {
            insights
                .concerns
                .push(format!("Elevated {} stress ({:.0}%)", category.as_str(), score));
        } else if *score <= STRENGTH_THRESHOLD {
            insights
                .strengths
                .push(format!("Low reported {} pressure ({:.0}%)", category.as_str(), score));
        }
        if *score >= RISK_THRESHOLD {
            insights
                .risk_factors
                .push(format!("{} stress in the critical range", category.as_str()));
        }
    }

    if matches!(stress_level, StressLevel::High | StressLevel::Severe) {
        insights
            .risk_factors
            .push(format!("Overall stress in the {} band", stress_level.as_str()));
    }

    if fallback_count > 0 {
        insights.risk_factors.push(format!(
            "{} channel(s) scored without provider analysis",
            fallback_count
        ));
    }

    insights
}

fn derive_recommendations(
    stress_level: StressLevel,
    category_scores: &BTreeMap<StressCategory, f64>,
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = Vec::new();
    let mut push = |urgency: Urgency, text: &str| {
        if !recommendations.iter().any(|r| r.text == text) {
            recommendations.push(Recommendation {
                urgency,
                text: text.to_string(),
            });
        }
    };

    match stress_level {
        StressLevel::Severe => {
            push(Urgency::High, "Consider speaking with a mental health professional");
            push(Urgency::High, "Practice deep breathing exercises for 10-15 minutes daily");
            push(Urgency::Medium, "Ensure you're getting 7-9 hours of quality sleep");
            push(Urgency::Medium, "Try progressive muscle relaxation techniques");
        }
        StressLevel::High => {
            push(Urgency::High, "Consider speaking with a mental health professional");
            push(Urgency::Medium, "Practice mindfulness or meditation for 10-15 minutes daily");
            push(Urgency::Medium, "Maintain a regular sleep schedule");
            push(Urgency::Low, "Try stress-reducing activities like yoga or walking");
        }
        StressLevel::Moderate => {
            push(Urgency::Medium, "Take short breaks throughout your day");
            push(Urgency::Low, "Continue current stress management practices");
            push(Urgency::Low, "Stay physically active");
        }
        StressLevel::Low => {
            push(Urgency::Low, "Maintain your current healthy lifestyle");
            push(Urgency::Low, "Continue regular exercise and good sleep habits");
            push(Urgency::Low, "Stay connected with your support network");
        }
    }

    for (category, score) in category_scores {
        if *score >= CONCERN_THRESHOLD {
            let text = match category {
                StressCategory::Academic => "Consider time management techniques for academic workload",
                StressCategory::Social => "Focus on building supportive social connections",
                StressCategory::Financial => "Consider financial planning or counseling resources",
                StressCategory::Health => "Prioritize physical and mental health self-care",
                StressCategory::Work => "Explore work-life balance strategies",
            };
            push(Urgency::Medium, text);
        }
    }

    recommendations.sort_by_key(|r| r.urgency);
    recommendations
}
