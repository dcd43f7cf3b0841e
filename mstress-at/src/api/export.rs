//! Assessment history export (CSV / JSON summary)

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;
use crate::models::AssessmentSummary;
use crate::AppState;

use super::resolve_actor;

/// Export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route(
        "/api/users/:user_id/assessments/export",
        get(export_history),
    )
}

/// Export format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
}

/// GET /api/users/:user_id/assessments/export?format=csv|json
///
/// Summary rows for every assessment of the user, newest first. Defaults to
/// JSON when no format is given.
async fn export_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let actor = resolve_actor(&headers)?;
    if !actor.can_read_history(user_id) {
        return Err(ApiError::Forbidden(format!(
            "actor {} may not export history for user {}",
            actor.id, user_id
        )));
    }

    let (summaries, _) = db::assessments::list_history(&state.db, user_id, i64::MAX, 0).await?;

    match query.format.unwrap_or(ExportFormat::Json) {
        ExportFormat::Json => Ok(Json(summaries).into_response()),
        ExportFormat::Csv => {
            let body = to_csv(&summaries);
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}

const CSV_HEADER: &str = "id,assessment_type,status,completed_at,overall_score,stress_level,confidence,channel_count,fallback_count,review_status";

/// Render summary rows as CSV (RFC 4180 quoting)
fn to_csv(summaries: &[AssessmentSummary]) -> String {
    let mut out = String::with_capacity(64 * (summaries.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for summary in summaries {
        let fields = [
            summary.id.to_string(),
            summary.assessment_type.as_str().to_string(),
            summary.status.as_str().to_string(),
            summary
                .completed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            summary
                .overall_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_default(),
            summary
                .stress_level
                .map(|l| l.as_str().to_string())
                .unwrap_or_default(),
            summary
                .confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_default(),
            summary.channel_count.to_string(),
            summary.fallback_count.to_string(),
            summary
                .review_status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

/// Quote a field when it contains a comma, quote, or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
