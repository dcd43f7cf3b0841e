//! Review triage queue API
//!
//! Reviewer/admin capability is required for every route here; the check is
//! the centralized one in `mstress_common::capability`.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ApiResult;
use crate::models::{AssessmentSummary, Review, ReviewPatch};
use crate::AppState;

use super::resolve_actor;

/// Review routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews/pending", get(list_pending))
        .route("/api/reviews/:assessment_id", put(upsert_review).get(get_review))
}

/// Query parameters for the pending listing
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    db::reviews::DEFAULT_PENDING_LIMIT
}

/// Pending listing response
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub limit: i64,
    pub offset: i64,
    pub assessments: Vec<AssessmentSummary>,
}

/// GET /api/reviews/pending
///
/// Completed assessments over the review threshold, severity-first, each
/// annotated with any existing review.
async fn list_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Json<PendingResponse>> {
    let actor = resolve_actor(&headers)?;
    actor.require_review()?;

    let assessments = db::reviews::list_pending(&state.db, query.limit, query.offset).await?;

    Ok(Json(PendingResponse {
        limit: query.limit.clamp(1, db::reviews::MAX_PENDING_LIMIT),
        offset: query.offset.max(0),
        assessments,
    }))
}

/// PUT /api/reviews/:assessment_id
///
/// Atomic find-or-create-and-patch of the assessment's single review.
async fn upsert_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(assessment_id): Path<Uuid>,
    Json(patch): Json<ReviewPatch>,
) -> ApiResult<Json<Review>> {
    let actor = resolve_actor(&headers)?;
    actor.require_review()?;

    let review = db::reviews::upsert_review(&state.db, assessment_id, actor.id, &patch).await?;
    Ok(Json(review))
}

/// GET /api/reviews/:assessment_id
async fn get_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(assessment_id): Path<Uuid>,
) -> ApiResult<Json<Review>> {
    let actor = resolve_actor(&headers)?;
    actor.require_review()?;

    // 404 distinguishes "no assessment" from "no review yet"
    super::load_assessment(&state, assessment_id).await?;
    let review = db::reviews::get_review(&state.db, assessment_id)
        .await?
        .ok_or_else(|| {
            crate::error::ApiError::NotFound(format!(
                "No review exists for assessment {}",
                assessment_id
            ))
        })?;

    Ok(Json(review))
}
