//! Assessment submission and retrieval API
//!
//! Submission is one canonical operation parameterized by which channel
//! inputs are present; there are no per-type handler variants. The handler
//! creates the `in_progress` record, dispatches the present channels
//! concurrently, combines the results, and finalizes atomically.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Assessment, AssessmentMetadata, AssessmentSummary, AssessmentType, QuestionnaireResponse,
};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::providers::ChannelInput;
use crate::scoring::composite;
use crate::AppState;

use super::resolve_actor;

/// Assessment routes
pub fn assessment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/assessments", post(submit_assessment))
        .route("/api/assessments/:id", get(get_assessment))
        .route("/api/users/:user_id/assessments", get(list_history))
}

/// Submission request: responses plus optional per-channel media
#[derive(Debug, Deserialize)]
pub struct SubmitAssessmentRequest {
    pub user_id: Uuid,
    /// Explicit type; derived from the present channels when absent
    pub assessment_type: Option<AssessmentType>,
    /// Structured questionnaire answers (DASS-21, 20 items)
    pub responses: Option<Vec<QuestionnaireResponse>>,
    /// Base64-encoded image frame for facial-emotion analysis
    pub facial_frame: Option<String>,
    /// Base64-encoded audio clip for voice analysis
    pub voice_clip: Option<String>,
    /// Free-text sample for sentiment analysis
    pub text_sample: Option<String>,
}

impl SubmitAssessmentRequest {
    /// Channel inputs present in this submission, in dispatch order
    fn channel_inputs(&self) -> Vec<ChannelInput> {
        let mut inputs = Vec::new();
        if let Some(responses) = &self.responses {
            inputs.push(ChannelInput::Questionnaire(responses.clone()));
        }
        if let Some(frame) = &self.facial_frame {
            inputs.push(ChannelInput::Facial(frame.clone()));
        }
        if let Some(clip) = &self.voice_clip {
            inputs.push(ChannelInput::Voice(clip.clone()));
        }
        if let Some(text) = &self.text_sample {
            inputs.push(ChannelInput::Sentiment(text.clone()));
        }
        inputs
    }

    /// Derive the assessment type from the present channels
    fn derived_type(&self) -> AssessmentType {
        if self.facial_frame.is_some() || self.voice_clip.is_some() {
            AssessmentType::MultiModal
        } else if self.text_sample.is_some() {
            AssessmentType::Comprehensive
        } else {
            AssessmentType::Standard
        }
    }
}

/// POST /api/assessments
///
/// Returns the completed assessment with its composite result. Provider
/// failures are recovered per channel via fallback synthesis and never fail
/// the submission; only an empty submission is rejected.
async fn submit_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitAssessmentRequest>,
) -> ApiResult<Json<Assessment>> {
    let actor = resolve_actor(&headers)?;
    if !actor.can_submit_for(request.user_id) {
        return Err(ApiError::Forbidden(format!(
            "actor {} may not submit for user {}",
            actor.id, request.user_id
        )));
    }

    let inputs = request.channel_inputs();
    if inputs.is_empty() {
        return Err(ApiError::BadRequest("No modality data provided".to_string()));
    }

    let assessment_type = request.assessment_type.unwrap_or_else(|| request.derived_type());
    let pending = db::assessments::create_assessment(&state.db, request.user_id, assessment_type).await?;

    tracing::info!(
        assessment_id = %pending.id,
        user_id = %request.user_id,
        channels = inputs.len(),
        "Assessment submission started"
    );

    let modality_scores = state.dispatcher.collect_scores(&inputs).await;

    let composite = composite::combine(&modality_scores)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut metadata = AssessmentMetadata {
        duration_seconds: (Utc::now() - pending.created_at).num_seconds(),
        channel_count: modality_scores.len(),
        fallback_channels: modality_scores
            .iter()
            .filter(|s| s.is_fallback)
            .map(|s| s.channel)
            .collect(),
        provider_versions: Default::default(),
    };
    if let Some(version) = state.dispatcher.provider_version() {
        for score in modality_scores.iter().filter(|s| !s.is_fallback) {
            metadata
                .provider_versions
                .insert(score.channel.as_str().to_string(), version.clone());
        }
    }

    let assessment =
        db::assessments::finalize(&state.db, pending.id, &modality_scores, &composite, &metadata)
            .await?;

    tracing::info!(
        assessment_id = %assessment.id,
        overall_score = composite.overall_score,
        stress_level = %composite.stress_level,
        fallback_channels = metadata.fallback_channels.len(),
        "Assessment completed"
    );

    Ok(Json(assessment))
}

/// GET /api/assessments/:id
async fn get_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(assessment_id): Path<Uuid>,
) -> ApiResult<Json<Assessment>> {
    let actor = resolve_actor(&headers)?;
    let assessment = super::load_assessment(&state, assessment_id).await?;

    if !actor.can_read_assessment(assessment.user_id) {
        return Err(ApiError::Forbidden(format!(
            "actor {} may not read assessment {}",
            actor.id, assessment_id
        )));
    }

    Ok(Json(assessment))
}

/// Query parameters for history listing
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// History listing response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: Uuid,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub assessments: Vec<AssessmentSummary>,
}

/// GET /api/users/:user_id/assessments
async fn list_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let actor = resolve_actor(&headers)?;
    if !actor.can_read_history(user_id) {
        return Err(ApiError::Forbidden(format!(
            "actor {} may not read history for user {}",
            actor.id, user_id
        )));
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_one(&state.db)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let pagination = calculate_pagination(total, query.page);
    let (assessments, _) =
        db::assessments::list_history(&state.db, user_id, PAGE_SIZE, pagination.offset).await?;

    Ok(Json(HistoryResponse {
        user_id,
        total,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        assessments,
    }))
}
