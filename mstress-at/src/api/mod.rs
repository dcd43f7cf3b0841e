//! HTTP API for mstress-at
//!
//! All routes except `/health` require gateway-resolved actor headers
//! (`x-actor-id`, `x-actor-role`); capability decisions are centralized in
//! `mstress_common::capability`.

pub mod assessments;
pub mod export;
pub mod health;
pub mod reviews;

use axum::http::HeaderMap;
use uuid::Uuid;

use mstress_common::{Actor, Role};

use crate::error::ApiError;
use crate::AppState;

pub use assessments::assessment_routes;
pub use export::export_routes;
pub use health::health_routes;
pub use reviews::review_routes;

/// Resolve the acting identity from gateway-supplied headers
///
/// The upstream identity collaborator authenticates the caller and forwards
/// `x-actor-id` (UUID) and `x-actor-role` (`user` / `reviewer` / `admin`).
/// Absent or malformed headers are a 403.
pub fn resolve_actor(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| ApiError::Forbidden("Missing or invalid x-actor-id header".to_string()))?;

    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::Forbidden("Missing or invalid x-actor-role header".to_string()))?;

    Ok(Actor::new(id, role))
}

/// Load a completed-or-not assessment, mapping absence to 404
pub(crate) async fn load_assessment(
    state: &AppState,
    assessment_id: Uuid,
) -> Result<crate::models::Assessment, ApiError> {
    crate::db::assessments::get_assessment(&state.db, assessment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {} not found", assessment_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_actor_happy_path() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert("x-actor-role", HeaderValue::from_static("reviewer"));

        let actor = resolve_actor(&headers).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Reviewer);
    }

    #[test]
    fn test_resolve_actor_missing_headers_forbidden() {
        let headers = HeaderMap::new();
        assert!(matches!(resolve_actor(&headers), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_resolve_actor_bad_role_forbidden() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-actor-id",
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        headers.insert("x-actor-role", HeaderValue::from_static("root"));
        assert!(matches!(resolve_actor(&headers), Err(ApiError::Forbidden(_))));
    }
}
