//! Database access for mstress-at
//!
//! SQLite via sqlx. Nested structures (modality scores, composite result,
//! metadata) are stored as JSON TEXT columns; timestamps are RFC-3339 TEXT.
//! The uniqueness guarantees the triage engine relies on live here as
//! schema constraints, not application conventions.

pub mod assessments;
pub mod reviews;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to mstress.db (created if missing) and initializes tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests
///
/// Capped at a single connection: every pooled connection to `:memory:`
/// would otherwise open its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Initialize assessment and review tables
///
/// `reviews.assessment_id` carries the UNIQUE constraint that enforces the
/// at-most-one-review invariant; `assessments.stress_level` is denormalized
/// from the composite for the triage query.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            assessment_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'in_progress',
            stress_level TEXT,
            modality_scores TEXT NOT NULL DEFAULT '[]',
            composite TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assessments_user ON assessments(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assessments_triage ON assessments(status, stress_level, completed_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            assessment_id TEXT NOT NULL UNIQUE REFERENCES assessments(id),
            reviewer_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            review_score REAL,
            risk_assessment TEXT,
            comments TEXT,
            flagged_for_follow_up INTEGER NOT NULL DEFAULT 0,
            follow_up_notes TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (assessments, reviews)");

    Ok(())
}
