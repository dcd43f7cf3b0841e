//! Review database operations
//!
//! The at-most-one-review invariant is a schema constraint (UNIQUE on
//! `assessment_id`), and every write is a single find-or-create-and-patch
//! transaction against it: concurrent reviewer submissions for the same
//! assessment converge on one record instead of racing to insert
//! duplicates.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use mstress_common::{Error, Result};

use crate::db::assessments::{parse_timestamp, summary_from_row};
use crate::models::{
    AssessmentStatus, AssessmentSummary, Review, ReviewPatch, ReviewStatus, RiskAssessment,
};

/// Default page size for the triage listing
pub const DEFAULT_PENDING_LIMIT: i64 = 50;

/// Maximum page size for the triage listing
pub const MAX_PENDING_LIMIT: i64 = 100;

/// Completed assessments whose stress level crosses the review threshold
///
/// Ordered severity-first (severe, high, moderate), ties broken by most
/// recent `completed_at`. Each row is annotated with any existing review's
/// id and status.
pub async fn list_pending(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<AssessmentSummary>> {
    let limit = limit.clamp(1, MAX_PENDING_LIMIT);
    let offset = offset.max(0);

    let rows = sqlx::query(
        r#"
        SELECT a.id, a.user_id, a.assessment_type, a.status, a.stress_level,
               a.composite, a.metadata, a.created_at, a.completed_at,
               r.id AS review_id, r.status AS review_status
        FROM assessments a
        LEFT JOIN reviews r ON r.assessment_id = a.id
        WHERE a.status = 'completed'
          AND a.stress_level IN ('moderate', 'high', 'severe')
        ORDER BY CASE a.stress_level
                     WHEN 'severe' THEN 3
                     WHEN 'high' THEN 2
                     ELSE 1
                 END DESC,
                 a.completed_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(summary_from_row).collect()
}

/// Atomic find-or-create-and-patch for one assessment's review
///
/// Creates the review lazily in `pending` on first contact, then applies
/// only the fields present in `patch`. `reviewed_at` is set exactly once,
/// on the first transition out of `pending`. Fails with `NotFound` for an
/// unknown assessment, `InvalidInput` for an incomplete one, and
/// `Conflict` for an illegal status transition.
pub async fn upsert_review(
    pool: &SqlitePool,
    assessment_id: Uuid,
    reviewer_id: Uuid,
    patch: &ReviewPatch,
) -> Result<Review> {
    let mut tx = pool.begin().await?;

    let assessment_status: Option<String> =
        sqlx::query_scalar("SELECT status FROM assessments WHERE id = ?")
            .bind(assessment_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
    let assessment_status = assessment_status
        .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", assessment_id)))?;
    if AssessmentStatus::parse(&assessment_status) != Some(AssessmentStatus::Completed) {
        return Err(Error::InvalidInput(format!(
            "Assessment {} is not completed (status: {})",
            assessment_id, assessment_status
        )));
    }

    // Validate the status transition against the current state, inside the
    // same transaction that applies it
    let current_status: Option<String> =
        sqlx::query_scalar("SELECT status FROM reviews WHERE assessment_id = ?")
            .bind(assessment_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
    let current_status = current_status
        .as_deref()
        .and_then(ReviewStatus::parse)
        .unwrap_or(ReviewStatus::Pending);

    if let Some(target) = patch.status {
        if !current_status.can_transition_to(target) {
            return Err(Error::Conflict(format!(
                "Illegal review transition {} -> {}",
                current_status, target
            )));
        }
    }

    let now = Utc::now().to_rfc3339();
    let patch_status = patch.status.map(|s| s.as_str().to_string());
    let patch_risk = patch.risk_assessment.map(|r| r.as_str().to_string());
    let patch_flagged = patch.flagged_for_follow_up.map(|f| f as i64);
    let leaves_pending = patch
        .status
        .map(|s| s != ReviewStatus::Pending)
        .unwrap_or(false);

    sqlx::query(
        r#"
        INSERT INTO reviews (
            id, assessment_id, reviewer_id, status, review_score,
            risk_assessment, comments, flagged_for_follow_up, follow_up_notes,
            reviewed_at, created_at, updated_at
        ) VALUES (?, ?, ?, COALESCE(?, 'pending'), ?, ?, ?, COALESCE(?, 0), ?,
                  CASE WHEN ? THEN ? ELSE NULL END, ?, ?)
        ON CONFLICT(assessment_id) DO UPDATE SET
            reviewer_id = excluded.reviewer_id,
            status = COALESCE(?, reviews.status),
            review_score = COALESCE(?, reviews.review_score),
            risk_assessment = COALESCE(?, reviews.risk_assessment),
            comments = COALESCE(?, reviews.comments),
            flagged_for_follow_up = COALESCE(?, reviews.flagged_for_follow_up),
            follow_up_notes = COALESCE(?, reviews.follow_up_notes),
            reviewed_at = CASE
                WHEN reviews.reviewed_at IS NULL AND ? THEN ?
                ELSE reviews.reviewed_at
            END,
            updated_at = excluded.updated_at
        "#,
    )
    // INSERT values
    .bind(Uuid::new_v4().to_string())
    .bind(assessment_id.to_string())
    .bind(reviewer_id.to_string())
    .bind(&patch_status)
    .bind(patch.review_score)
    .bind(&patch_risk)
    .bind(&patch.comments)
    .bind(patch_flagged)
    .bind(&patch.follow_up_notes)
    .bind(leaves_pending)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    // DO UPDATE values
    .bind(&patch_status)
    .bind(patch.review_score)
    .bind(&patch_risk)
    .bind(&patch.comments)
    .bind(patch_flagged)
    .bind(&patch.follow_up_notes)
    .bind(leaves_pending)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    let review = fetch_review(&mut tx, assessment_id).await?;
    tx.commit().await?;

    tracing::info!(
        assessment_id = %assessment_id,
        reviewer_id = %reviewer_id,
        status = %review.status,
        "Review upserted"
    );

    Ok(review)
}

/// Load the review for an assessment, if one exists
pub async fn get_review(pool: &SqlitePool, assessment_id: Uuid) -> Result<Option<Review>> {
    let row = sqlx::query(
        r#"
        SELECT id, assessment_id, reviewer_id, status, review_score,
               risk_assessment, comments, flagged_for_follow_up,
               follow_up_notes, reviewed_at, created_at, updated_at
        FROM reviews
        WHERE assessment_id = ?
        "#,
    )
    .bind(assessment_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(review_from_row).transpose()
}

async fn fetch_review(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    assessment_id: Uuid,
) -> Result<Review> {
    let row = sqlx::query(
        r#"
        SELECT id, assessment_id, reviewer_id, status, review_score,
               risk_assessment, comments, flagged_for_follow_up,
               follow_up_notes, reviewed_at, created_at, updated_at
        FROM reviews
        WHERE assessment_id = ?
        "#,
    )
    .bind(assessment_id.to_string())
    .fetch_one(&mut **tx)
    .await?;

    review_from_row(row)
}

fn review_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Review> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse review id: {}", e)))?;

    let assessment_id: String = row.get("assessment_id");
    let assessment_id = Uuid::parse_str(&assessment_id)
        .map_err(|e| Error::Internal(format!("Failed to parse assessment id: {}", e)))?;

    let reviewer_id: String = row.get("reviewer_id");
    let reviewer_id = Uuid::parse_str(&reviewer_id)
        .map_err(|e| Error::Internal(format!("Failed to parse reviewer id: {}", e)))?;

    let status: String = row.get("status");
    let status = ReviewStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown review status: {}", status)))?;

    let risk_assessment: Option<String> = row.get("risk_assessment");
    let risk_assessment = risk_assessment.as_deref().and_then(RiskAssessment::parse);

    let reviewed_at: Option<String> = row.get("reviewed_at");
    let reviewed_at = reviewed_at.map(parse_timestamp).transpose()?;

    Ok(Review {
        id,
        assessment_id,
        reviewer_id,
        status,
        review_score: row.get("review_score"),
        risk_assessment,
        comments: row.get("comments"),
        flagged_for_follow_up: row.get::<i64, _>("flagged_for_follow_up") != 0,
        follow_up_notes: row.get("follow_up_notes"),
        reviewed_at,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{assessments, init_memory_pool};
    use crate::models::{
        AssessmentMetadata, AssessmentType, CompositeResult, Insights, StressLevel,
    };
    use std::collections::BTreeMap;

    async fn completed_assessment(pool: &SqlitePool, overall: f64) -> Uuid {
        let created = assessments::create_assessment(pool, Uuid::new_v4(), AssessmentType::Standard)
            .await
            .unwrap();
        let composite = CompositeResult {
            overall_score: overall,
            stress_level: StressLevel::from_score(overall),
            confidence: 0.8,
            category_scores: BTreeMap::new(),
            insights: Insights::default(),
            recommendations: Vec::new(),
        };
        assessments::finalize(pool, created.id, &[], &composite, &AssessmentMetadata::default())
            .await
            .unwrap();
        created.id
    }

    #[tokio::test]
    async fn test_first_contact_creates_pending_review() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 60.0).await;
        let reviewer_id = Uuid::new_v4();

        let review = upsert_review(&pool, assessment_id, reviewer_id, &ReviewPatch::default())
            .await
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.reviewer_id, reviewer_id);
        assert!(review.reviewed_at.is_none());
        assert!(!review.flagged_for_follow_up);
    }

    #[tokio::test]
    async fn test_second_upsert_updates_not_duplicates() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 60.0).await;
        let reviewer_id = Uuid::new_v4();

        let first = upsert_review(&pool, assessment_id, reviewer_id, &ReviewPatch::default())
            .await
            .unwrap();
        let second = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                comments: Some("needs a follow-up call".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id, "same review record");
        assert_eq!(second.comments.as_deref(), Some("needs a follow-up call"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE assessment_id = ?")
            .bind(assessment_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_reviewed_at_set_once_on_first_transition() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 60.0).await;
        let reviewer_id = Uuid::new_v4();

        let reviewed = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                status: Some(ReviewStatus::Reviewed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let first_reviewed_at = reviewed.reviewed_at.expect("reviewed_at set on transition");

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let approved = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                status: Some(ReviewStatus::Approved),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(approved.status, ReviewStatus::Approved);
        assert_eq!(
            approved.reviewed_at,
            Some(first_reviewed_at),
            "reviewed_at keeps the first transition time"
        );
    }

    #[tokio::test]
    async fn test_patch_only_touches_present_fields() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 60.0).await;
        let reviewer_id = Uuid::new_v4();

        upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                review_score: Some(72.0),
                comments: Some("initial look".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let patched = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                flagged_for_follow_up: Some(true),
                follow_up_notes: Some("call next week".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(patched.review_score, Some(72.0));
        assert_eq!(patched.comments.as_deref(), Some("initial look"));
        assert!(patched.flagged_for_follow_up);
        assert_eq!(patched.follow_up_notes.as_deref(), Some("call next week"));
        assert_eq!(patched.status, ReviewStatus::Pending, "flag does not transition");
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 60.0).await;
        let reviewer_id = Uuid::new_v4();

        // Direct escalation from pending routes through reviewed first
        let direct = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                status: Some(ReviewStatus::Approved),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(direct, Err(Error::Conflict(_))));

        for status in [ReviewStatus::Reviewed, ReviewStatus::Approved] {
            upsert_review(
                &pool,
                assessment_id,
                reviewer_id,
                &ReviewPatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        // Terminal state cannot reopen
        let reopen = upsert_review(
            &pool,
            assessment_id,
            reviewer_id,
            &ReviewPatch {
                status: Some(ReviewStatus::Reviewed),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(reopen, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_assessment_is_not_found() {
        let pool = init_memory_pool().await.unwrap();
        let result = upsert_review(&pool, Uuid::new_v4(), Uuid::new_v4(), &ReviewPatch::default()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_incomplete_assessment_rejected() {
        let pool = init_memory_pool().await.unwrap();
        let created = assessments::create_assessment(&pool, Uuid::new_v4(), AssessmentType::Standard)
            .await
            .unwrap();
        let result = upsert_review(&pool, created.id, Uuid::new_v4(), &ReviewPatch::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge_to_one_record() {
        let pool = init_memory_pool().await.unwrap();
        let assessment_id = completed_assessment(&pool, 80.0).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                upsert_review(
                    &pool,
                    assessment_id,
                    Uuid::new_v4(),
                    &ReviewPatch {
                        comments: Some(format!("pass {}", i)),
                        ..Default::default()
                    },
                )
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE assessment_id = ?")
            .bind(assessment_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_list_pending_severity_first_then_recency() {
        let pool = init_memory_pool().await.unwrap();

        let low = completed_assessment(&pool, 10.0).await;
        let moderate = completed_assessment(&pool, 30.0).await;
        let older_severe = completed_assessment(&pool, 90.0).await;
        let high = completed_assessment(&pool, 60.0).await;
        let newer_severe = completed_assessment(&pool, 85.0).await;

        // Deterministic completion ordering
        for (i, id) in [moderate, older_severe, high, newer_severe].iter().enumerate() {
            sqlx::query("UPDATE assessments SET completed_at = ? WHERE id = ?")
                .bind((Utc::now() + chrono::Duration::seconds(i as i64)).to_rfc3339())
                .bind(id.to_string())
                .execute(&pool)
                .await
                .unwrap();
        }

        let pending = list_pending(&pool, 50, 0).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|p| p.id).collect();

        assert!(!ids.contains(&low), "low stress is below the review threshold");
        assert_eq!(ids, vec![newer_severe, older_severe, high, moderate]);
    }

    #[tokio::test]
    async fn test_list_pending_annotates_existing_review() {
        let pool = init_memory_pool().await.unwrap();
        let with_review = completed_assessment(&pool, 80.0).await;
        let without_review = completed_assessment(&pool, 60.0).await;

        let review = upsert_review(
            &pool,
            with_review,
            Uuid::new_v4(),
            &ReviewPatch {
                status: Some(ReviewStatus::Reviewed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let pending = list_pending(&pool, 50, 0).await.unwrap();
        let annotated = pending.iter().find(|p| p.id == with_review).unwrap();
        assert_eq!(annotated.review_id, Some(review.id));
        assert_eq!(annotated.review_status, Some(ReviewStatus::Reviewed));

        let bare = pending.iter().find(|p| p.id == without_review).unwrap();
        assert!(bare.review_id.is_none());
        assert!(bare.review_status.is_none());
    }
}
