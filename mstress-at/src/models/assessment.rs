//! Assessment entity
//!
//! The durable unit of work. Created `in_progress`, mutated only by the
//! record builder during submission, completed atomically with its composite
//! result, and append-only thereafter: corrections occur via a new
//! assessment, never an edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::composite::{CompositeResult, StressLevel};
use super::modality::{Channel, ModalityScore};
use super::review::ReviewStatus;

/// Assessment type selected at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    /// Questionnaire only
    Standard,
    /// Questionnaire plus free-text sentiment
    Comprehensive,
    /// Any combination including facial and/or voice media
    MultiModal,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentType::Standard => "standard",
            AssessmentType::Comprehensive => "comprehensive",
            AssessmentType::MultiModal => "multi_modal",
        }
    }

    pub fn parse(s: &str) -> Option<AssessmentType> {
        match s {
            "standard" => Some(AssessmentType::Standard),
            "comprehensive" => Some(AssessmentType::Comprehensive),
            "multi_modal" => Some(AssessmentType::MultiModal),
            _ => None,
        }
    }
}

/// Assessment lifecycle state
///
/// `in_progress` -> `completed` is the only forward transition; a completed
/// assessment never returns to `in_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<AssessmentStatus> {
        match s {
            "in_progress" => Some(AssessmentStatus::InProgress),
            "completed" => Some(AssessmentStatus::Completed),
            "cancelled" => Some(AssessmentStatus::Cancelled),
            _ => None,
        }
    }
}

/// Submission metadata captured at finalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentMetadata {
    /// Wall-clock seconds from creation to completion
    pub duration_seconds: i64,
    /// Number of channels present in the submission
    pub channel_count: usize,
    /// Channels whose score was synthesized rather than provider-produced
    pub fallback_channels: Vec<Channel>,
    /// Provider versions per channel, for audit
    pub provider_versions: BTreeMap<String, String>,
}

/// The durable assessment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assessment_type: AssessmentType,
    pub status: AssessmentStatus,
    /// One entry per channel present, in dispatch order
    pub modality_scores: Vec<ModalityScore>,
    /// Present exactly when `status` is `completed`
    pub composite: Option<CompositeResult>,
    pub metadata: AssessmentMetadata,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Compact assessment row for history listings, triage and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assessment_type: AssessmentType,
    pub status: AssessmentStatus,
    pub stress_level: Option<StressLevel>,
    pub overall_score: Option<f64>,
    pub confidence: Option<f64>,
    pub channel_count: usize,
    pub fallback_count: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Existing review id, when one has been opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_id: Option<Uuid>,
    /// Existing review status, when one has been opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
}
