//! mstress-at library interface
//!
//! Assessment Aggregation & Review Triage service: normalizes modality
//! provider outputs, synthesizes fallbacks on provider failure, combines
//! present channels into a composite stress record, persists completed
//! assessments immutably, and runs the human review triage queue.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod providers;
pub mod scoring;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::providers::ChannelDispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Per-channel provider dispatcher (fallback-only when no provider is
    /// configured)
    pub dispatcher: Arc<ChannelDispatcher>,
}

impl AppState {
    pub fn new(db: SqlitePool, dispatcher: ChannelDispatcher) -> Self {
        Self {
            db,
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::assessment_routes())
        .merge(api::review_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .with_state(state)
}
