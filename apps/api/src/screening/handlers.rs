//! Axum route handlers for the Screening API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::pipeline::{AnalysisSummary, ReassessmentSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default = "default_true")]
    pub use_llm: bool,
    #[serde(default = "default_true")]
    pub trigger_ranking: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateDirectivesRequest {
    /// `null` or blank clears the directives.
    pub private_directives: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/candidates/:id/analysis?use_llm=true&trigger_ranking=true
///
/// Runs the full scoring pipeline for one application.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalysisSummary>, AppError> {
    let summary = state
        .screening
        .analyze_application(candidate_id, params.use_llm, params.trigger_ranking)
        .await?;
    Ok(Json(summary))
}

/// GET /api/v1/candidates/:id/analysis
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<AnalysisSummary>, AppError> {
    state
        .screening
        .get_analysis_results(candidate_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("Candidate {candidate_id} has not been analyzed"))
        })
}

/// PUT /api/v1/jobs/:id/directives
///
/// Stores new private directives, re-scores every analyzed candidate and
/// re-ranks the job. Responds after the whole fan-out completes.
pub async fn handle_update_directives(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<UpdateDirectivesRequest>,
) -> Result<Json<ReassessmentSummary>, AppError> {
    let summary = state
        .screening
        .update_private_directives(job_id, request.private_directives)
        .await?;
    Ok(Json(summary))
}
