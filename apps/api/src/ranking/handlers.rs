//! Axum route handlers for the Ranking API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ranking::RankEntry;
use crate::ranking::service::RankingSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StoredRankingResponse {
    pub job_id: Uuid,
    pub rankings: Vec<RankEntry>,
}

/// POST /api/v1/jobs/:id/ranking
///
/// Ranks every analyzed candidate of the job now and replaces the stored ranking.
pub async fn handle_rank_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<RankingSummary>, AppError> {
    let summary = state
        .screening
        .ranking()
        .rank_candidates_for_job(job_id)
        .await?;
    Ok(Json(summary))
}

/// GET /api/v1/jobs/:id/ranking
pub async fn handle_get_ranking(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<StoredRankingResponse>, AppError> {
    let rankings = state.screening.ranking().get_ranking(job_id).await?;
    Ok(Json(StoredRankingResponse { job_id, rankings }))
}
