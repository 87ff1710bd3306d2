//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisResponse, AnalysisRow, CachedAnalysis};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_text: String,
    pub job_desc_text: String,
}

/// POST /api/analyze
///
/// Resolves a gap analysis for a (resume, job description) pair through the
/// two-tier cache; the analyzer is only invoked on a full miss. `cached` in
/// the response tells the caller which happened.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let response = state
        .cache
        .resolve(
            &request.resume_text,
            &request.job_desc_text,
            state.analyzer.as_ref(),
        )
        .await?;

    Ok(Json(response))
}

/// GET /api/analyses/:id
///
/// Fetches a previously stored analysis by id. Always served from the durable
/// store, so `cached` is true.
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let row: Option<AnalysisRow> = sqlx::query_as(
        "SELECT id, created_at, missing_skills, learning_steps, interview_questions
         FROM analyses
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))?;

    Ok(Json(AnalysisResponse::from_entry(
        CachedAnalysis::from(row),
        true,
    )))
}
