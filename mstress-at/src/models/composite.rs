//! Composite assessment result types
//!
//! A `CompositeResult` is derived by the composite scorer and never edited
//! directly; the stress-level bands are fixed and non-overlapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::modality::StressCategory;

/// Stress classification derived from the overall score
///
/// Bands: `[0,25)` low, `[25,50)` moderate, `[50,75)` high, `[75,100]`
/// severe. Boundary values resolve to the higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl StressLevel {
    /// Map an overall score (0-100) to its stress band
    pub fn from_score(score: f64) -> StressLevel {
        if score < 25.0 {
            StressLevel::Low
        } else if score < 50.0 {
            StressLevel::Moderate
        } else if score < 75.0 {
            StressLevel::High
        } else {
            StressLevel::Severe
        }
    }

    /// Midpoint of the band, used for deterministic fallback synthesis
    pub fn band_midpoint(&self) -> f64 {
        match self {
            StressLevel::Low => 12.5,
            StressLevel::Moderate => 37.5,
            StressLevel::High => 62.5,
            StressLevel::Severe => 87.5,
        }
    }

    /// Severity rank for triage ordering (higher sorts first)
    pub fn severity_rank(&self) -> i64 {
        match self {
            StressLevel::Low => 0,
            StressLevel::Moderate => 1,
            StressLevel::High => 2,
            StressLevel::Severe => 3,
        }
    }

    /// Whether this level crosses the human-review threshold
    pub fn needs_review(&self) -> bool {
        matches!(self, StressLevel::Moderate | StressLevel::High | StressLevel::Severe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Moderate => "moderate",
            StressLevel::High => "high",
            StressLevel::Severe => "severe",
        }
    }

    /// Parse from the wire/database representation
    pub fn parse(s: &str) -> Option<StressLevel> {
        match s {
            "low" => Some(StressLevel::Low),
            "moderate" => Some(StressLevel::Moderate),
            "high" => Some(StressLevel::High),
            "severe" => Some(StressLevel::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation urgency; lists are ordered high to low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

/// One recommendation with its urgency grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub urgency: Urgency,
    pub text: String,
}

/// Derived strengths / concerns / risk factors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub risk_factors: Vec<String>,
}

/// Composite assessment outcome combining all present modality scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Confidence-weighted combination of present modality scores, 0-100
    pub overall_score: f64,
    pub stress_level: StressLevel,
    /// Weighted modality confidence, penalized per fallback channel
    pub confidence: f64,
    /// Life-domain breakdown from the questionnaire channel (may be empty)
    pub category_scores: BTreeMap<StressCategory, f64>,
    pub insights: Insights,
    pub recommendations: Vec<Recommendation>,
}
