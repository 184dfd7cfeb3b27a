use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::LlmGateway;
use crate::models::ranking::RankEntry;
use crate::ranking::ranker::{rank_candidates, RankingCandidate};
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize)]
pub struct RankingSummary {
    pub job_id: Uuid,
    pub candidate_count: usize,
    pub rankings: Vec<RankEntry>,
    pub model_used: Option<String>,
}

/// Loads a job's analyzed candidates, ranks them and replaces the stored ranking.
#[derive(Clone)]
pub struct RankingService {
    store: Arc<dyn RecordStore>,
    llm: LlmGateway,
}

impl RankingService {
    pub fn new(store: Arc<dyn RecordStore>, llm: LlmGateway) -> Self {
        Self { store, llm }
    }

    pub async fn rank_candidates_for_job(&self, job_id: Uuid) -> Result<RankingSummary, AppError> {
        let job = self
            .store
            .get_job(job_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

        let candidates: Vec<RankingCandidate> = self
            .store
            .list_scored_candidates(job_id)
            .await
            .map_err(AppError::Internal)?
            .iter()
            .filter_map(RankingCandidate::from_candidate)
            .collect();

        let outcome = rank_candidates(&self.llm, &job, &candidates).await?;

        self.store
            .replace_ranking(job_id, &outcome.entries)
            .await
            .map_err(AppError::Internal)?;

        info!(%job_id, candidates = candidates.len(), "Ranking replaced");

        Ok(RankingSummary {
            job_id,
            candidate_count: candidates.len(),
            rankings: outcome.entries,
            model_used: outcome.model_used,
        })
    }

    /// The stored ranking, best first. Empty when the job was never ranked.
    pub async fn get_ranking(&self, job_id: Uuid) -> Result<Vec<RankEntry>, AppError> {
        self.store
            .get_job(job_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

        self.store.get_ranking(job_id).await.map_err(AppError::Internal)
    }
}
