use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One candidate's position in a job's comparative ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    /// 1 = best.
    pub rank: u32,
    pub ranking_score: u8,
    pub reasoning: String,
    pub key_differentiators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankEntryRow {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub rank: i32,
    pub ranking_score: i32,
    pub reasoning: String,
    pub key_differentiators: Vec<String>,
    pub ranked_at: DateTime<Utc>,
}

impl From<RankEntryRow> for RankEntry {
    fn from(row: RankEntryRow) -> Self {
        RankEntry {
            candidate_id: row.candidate_id,
            candidate_name: row.candidate_name,
            rank: row.rank.max(0) as u32,
            ranking_score: row.ranking_score.clamp(0, 100) as u8,
            reasoning: row.reasoning,
            key_differentiators: row.key_differentiators,
        }
    }
}
