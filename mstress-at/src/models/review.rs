//! Review entity and state machine
//!
//! At most one review exists per assessment; the database enforces this with
//! a UNIQUE constraint on `assessment_id` and all writes go through a single
//! atomic upsert. A review cycle ends at `approved` or `rejected` — a new
//! finding requires a new assessment, not a reopened review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review lifecycle state
///
/// ```text
/// pending --(reviewer submits a decision)--> reviewed
/// reviewed --(reviewer escalates)--> approved | rejected
/// ```
///
/// Setting `flagged_for_follow_up` is allowed in any state and does not
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewed => "reviewed",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewStatus> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "reviewed" => Some(ReviewStatus::Reviewed),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }

    /// Whether a transition from `self` to `to` is legal
    ///
    /// Every first decision routes through `reviewed`; `approved` and
    /// `rejected` are terminal for the cycle. A no-op transition to the
    /// current state is always legal (patching other fields).
    pub fn can_transition_to(&self, to: ReviewStatus) -> bool {
        if *self == to {
            return true;
        }
        matches!(
            (self, to),
            (ReviewStatus::Pending, ReviewStatus::Reviewed)
                | (ReviewStatus::Reviewed, ReviewStatus::Approved)
                | (ReviewStatus::Reviewed, ReviewStatus::Rejected)
        )
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer's risk classification of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAssessment {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAssessment::Low => "low",
            RiskAssessment::Moderate => "moderate",
            RiskAssessment::High => "high",
            RiskAssessment::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<RiskAssessment> {
        match s {
            "low" => Some(RiskAssessment::Low),
            "moderate" => Some(RiskAssessment::Moderate),
            "high" => Some(RiskAssessment::High),
            "critical" => Some(RiskAssessment::Critical),
            _ => None,
        }
    }
}

/// Human review of one assessment (one-to-one by `assessment_id`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub reviewer_id: Uuid,
    pub status: ReviewStatus,
    pub review_score: Option<f64>,
    pub risk_assessment: Option<RiskAssessment>,
    pub comments: Option<String>,
    pub flagged_for_follow_up: bool,
    pub follow_up_notes: Option<String>,
    /// Set exactly once, on the first transition out of `pending`
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by `upsert_review`; absent fields are untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub review_score: Option<f64>,
    pub risk_assessment: Option<RiskAssessment>,
    pub comments: Option<String>,
    pub flagged_for_follow_up: Option<bool>,
    pub follow_up_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_decision_routes_through_reviewed() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Reviewed));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Rejected));
    }

    #[test]
    fn test_escalation_from_reviewed() {
        assert!(ReviewStatus::Reviewed.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Reviewed.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Reviewed.can_transition_to(ReviewStatus::Pending));
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        for terminal in [ReviewStatus::Approved, ReviewStatus::Rejected] {
            for target in [
                ReviewStatus::Pending,
                ReviewStatus::Reviewed,
                ReviewStatus::Approved,
                ReviewStatus::Rejected,
            ] {
                if target == terminal {
                    assert!(terminal.can_transition_to(target), "no-op patch stays legal");
                } else {
                    assert!(!terminal.can_transition_to(target));
                }
            }
        }
    }
}
