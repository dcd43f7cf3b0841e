//! Assessment database operations
//!
//! Completed assessments are append-only: the only mutation after creation
//! is the single conditional finalize, keyed on `status = 'in_progress'`,
//! which makes concurrent finalize calls converge on one completed record.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use mstress_common::{Error, Result};

use crate::models::{
    Assessment, AssessmentMetadata, AssessmentStatus, AssessmentSummary, AssessmentType,
    CompositeResult, ModalityScore, StressLevel,
};

/// Create a new `in_progress` assessment row
pub async fn create_assessment(
    pool: &SqlitePool,
    user_id: Uuid,
    assessment_type: AssessmentType,
) -> Result<Assessment> {
    let assessment = Assessment {
        id: Uuid::new_v4(),
        user_id,
        assessment_type,
        status: AssessmentStatus::InProgress,
        modality_scores: Vec::new(),
        composite: None,
        metadata: AssessmentMetadata::default(),
        created_at: Utc::now(),
        completed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO assessments (id, user_id, assessment_type, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(assessment.id.to_string())
    .bind(assessment.user_id.to_string())
    .bind(assessment.assessment_type.as_str())
    .bind(assessment.status.as_str())
    .bind(assessment.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(assessment)
}

/// Finalize an `in_progress` assessment with its modality scores and
/// composite result
///
/// Idempotent per assessment id: the conditional UPDATE only fires while the
/// row is still `in_progress`. A concurrent or repeated call observes zero
/// affected rows and returns the already-completed record unchanged; a
/// cancelled or missing assessment is an error.
pub async fn finalize(
    pool: &SqlitePool,
    assessment_id: Uuid,
    modality_scores: &[ModalityScore],
    composite: &CompositeResult,
    metadata: &AssessmentMetadata,
) -> Result<Assessment> {
    let scores_json = serde_json::to_string(modality_scores)
        .map_err(|e| Error::Internal(format!("Failed to serialize modality scores: {}", e)))?;
    let composite_json = serde_json::to_string(composite)
        .map_err(|e| Error::Internal(format!("Failed to serialize composite: {}", e)))?;
    let metadata_json = serde_json::to_string(metadata)
        .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;
    let completed_at = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE assessments
        SET status = 'completed',
            stress_level = ?,
            modality_scores = ?,
            composite = ?,
            metadata = ?,
            completed_at = ?
        WHERE id = ? AND status = 'in_progress'
        "#,
    )
    .bind(composite.stress_level.as_str())
    .bind(&scores_json)
    .bind(&composite_json)
    .bind(&metadata_json)
    .bind(&completed_at)
    .bind(assessment_id.to_string())
    .execute(pool)
    .await?;

    let assessment = get_assessment(pool, assessment_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", assessment_id)))?;

    if result.rows_affected() == 0 {
        match assessment.status {
            // Lost the race (or repeated call): the existing completed
            // record is the outcome
            AssessmentStatus::Completed => {
                tracing::debug!(assessment_id = %assessment_id, "Finalize no-op, already completed");
            }
            AssessmentStatus::Cancelled => {
                return Err(Error::InvalidInput(format!(
                    "Assessment {} is cancelled",
                    assessment_id
                )));
            }
            AssessmentStatus::InProgress => {
                return Err(Error::Internal(format!(
                    "Finalize affected no rows but assessment {} is still in progress",
                    assessment_id
                )));
            }
        }
    }

    Ok(assessment)
}

/// Load one assessment by id
pub async fn get_assessment(pool: &SqlitePool, assessment_id: Uuid) -> Result<Option<Assessment>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, assessment_type, status, modality_scores,
               composite, metadata, created_at, completed_at
        FROM assessments
        WHERE id = ?
        "#,
    )
    .bind(assessment_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(assessment_from_row).transpose()
}

fn assessment_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Assessment> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse assessment id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Internal(format!("Failed to parse user id: {}", e)))?;

    let assessment_type: String = row.get("assessment_type");
    let assessment_type = AssessmentType::parse(&assessment_type)
        .ok_or_else(|| Error::Internal(format!("Unknown assessment type: {}", assessment_type)))?;

    let status: String = row.get("status");
    let status = AssessmentStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown assessment status: {}", status)))?;

    let modality_scores: String = row.get("modality_scores");
    let modality_scores: Vec<ModalityScore> = serde_json::from_str(&modality_scores)
        .map_err(|e| Error::Internal(format!("Failed to deserialize modality scores: {}", e)))?;

    let composite: Option<String> = row.get("composite");
    let composite: Option<CompositeResult> = composite
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize composite: {}", e)))?;

    let metadata: Option<String> = row.get("metadata");
    let metadata: AssessmentMetadata = metadata
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize metadata: {}", e)))?
        .unwrap_or_default();

    let created_at = parse_timestamp(row.get("created_at"))?;
    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at.map(|s| parse_timestamp(s)).transpose()?;

    Ok(Assessment {
        id,
        user_id,
        assessment_type,
        status,
        modality_scores,
        composite,
        metadata,
        created_at,
        completed_at,
    })
}

pub(crate) fn parse_timestamp(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Paginated assessment history for one user, newest first
///
/// Returns the page of summaries and the total row count.
pub async fn list_history(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AssessmentSummary>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT a.id, a.user_id, a.assessment_type, a.status, a.stress_level,
               a.composite, a.metadata, a.created_at, a.completed_at,
               r.id AS review_id, r.status AS review_status
        FROM assessments a
        LEFT JOIN reviews r ON r.assessment_id = a.id
        WHERE a.user_id = ?
        ORDER BY a.created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let summaries = rows
        .into_iter()
        .map(summary_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok((summaries, total))
}

pub(crate) fn summary_from_row(row: sqlx::sqlite::SqliteRow) -> Result<AssessmentSummary> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse assessment id: {}", e)))?;

    let user_id: String = row.get("user_id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Internal(format!("Failed to parse user id: {}", e)))?;

    let assessment_type: String = row.get("assessment_type");
    let assessment_type = AssessmentType::parse(&assessment_type)
        .ok_or_else(|| Error::Internal(format!("Unknown assessment type: {}", assessment_type)))?;

    let status: String = row.get("status");
    let status = AssessmentStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown assessment status: {}", status)))?;

    let stress_level: Option<String> = row.get("stress_level");
    let stress_level = stress_level.as_deref().and_then(StressLevel::parse);

    let composite: Option<String> = row.get("composite");
    let composite: Option<CompositeResult> = composite
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize composite: {}", e)))?;

    let metadata: Option<String> = row.get("metadata");
    let metadata: Option<AssessmentMetadata> = metadata
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize metadata: {}", e)))?;

    let created_at = parse_timestamp(row.get("created_at"))?;
    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at.map(parse_timestamp).transpose()?;

    let review_id: Option<String> = row.get("review_id");
    let review_id = review_id
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse review id: {}", e)))?;

    let review_status: Option<String> = row.get("review_status");
    let review_status = review_status
        .as_deref()
        .and_then(crate::models::ReviewStatus::parse);

    Ok(AssessmentSummary {
        id,
        user_id,
        assessment_type,
        status,
        stress_level,
        overall_score: composite.as_ref().map(|c| c.overall_score),
        confidence: composite.as_ref().map(|c| c.confidence),
        channel_count: metadata.as_ref().map(|m| m.channel_count).unwrap_or(0),
        fallback_count: metadata
            .as_ref()
            .map(|m| m.fallback_channels.len())
            .unwrap_or(0),
        created_at,
        completed_at,
        review_id,
        review_status,
    })
}
