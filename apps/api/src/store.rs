//! Record store: the persistence seam for candidates, jobs, companies and rankings.
//!
//! `PgStore` is the production implementation. Services only see `RecordStore`,
//! so tests run against an in-memory double.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::analysis::{AnalysisResult, GuardedScores};
use crate::models::candidate::Candidate;
use crate::models::job::{Company, Job};
use crate::models::ranking::{RankEntry, RankEntryRow};
use crate::models::resume::ResumeProfile;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_candidate(&self, candidate_id: Uuid) -> Result<Option<Candidate>>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>>;

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>>;

    async fn update_resume_profile(&self, candidate_id: Uuid, profile: &ResumeProfile)
        -> Result<()>;

    /// Writes the analysis and its guarded scores in one write.
    async fn save_analysis(
        &self,
        candidate_id: Uuid,
        analysis: &AnalysisResult,
        scores: &GuardedScores,
    ) -> Result<()>;

    /// Candidates of a job that have both a stored analysis and guarded scores.
    async fn list_scored_candidates(&self, job_id: Uuid) -> Result<Vec<Candidate>>;

    async fn update_job_directives(&self, job_id: Uuid, directives: Option<&str>) -> Result<()>;

    /// Replaces the job's whole ranking with `entries`.
    async fn replace_ranking(&self, job_id: Uuid, entries: &[RankEntry]) -> Result<()>;

    async fn get_ranking(&self, job_id: Uuid) -> Result<Vec<RankEntry>>;
}

/// Postgres-backed record store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get_candidate(&self, candidate_id: Uuid) -> Result<Option<Candidate>> {
        Ok(
            sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT id, name FROM companies WHERE id = $1")
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_resume_profile(
        &self,
        candidate_id: Uuid,
        profile: &ResumeProfile,
    ) -> Result<()> {
        sqlx::query("UPDATE candidates SET resume_profile = $1 WHERE id = $2")
            .bind(Json(profile))
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_analysis(
        &self,
        candidate_id: Uuid,
        analysis: &AnalysisResult,
        scores: &GuardedScores,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent analysis writes for the same candidate.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM candidates WHERE id = $1 FOR UPDATE")
                .bind(candidate_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            anyhow::bail!("Candidate {candidate_id} disappeared before analysis was stored");
        }

        sqlx::query(
            r#"
            UPDATE candidates
            SET analysis = $1,
                guarded_scores = $2,
                final_score = $3,
                resume_score = $4,
                answers_score = $5,
                analyzed_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(Json(analysis))
        .bind(Json(scores))
        .bind(scores.overall_score as i16)
        .bind(scores.resume_score as i16)
        .bind(scores.answers_score as i16)
        .bind(candidate_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Stored analysis for candidate {candidate_id} (final score {})",
            scores.overall_score
        );
        Ok(())
    }

    async fn list_scored_candidates(&self, job_id: Uuid) -> Result<Vec<Candidate>> {
        Ok(sqlx::query_as::<_, Candidate>(
            r#"
            SELECT * FROM candidates
            WHERE job_id = $1 AND analysis IS NOT NULL AND guarded_scores IS NOT NULL
            ORDER BY created_at, id
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_job_directives(&self, job_id: Uuid, directives: Option<&str>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET private_directives = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(directives)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Job {job_id} not found");
        }
        Ok(())
    }

    async fn replace_ranking(&self, job_id: Uuid, entries: &[RankEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM candidate_rankings WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO candidate_rankings
                    (job_id, candidate_id, candidate_name, rank, ranking_score,
                     reasoning, key_differentiators)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(job_id)
            .bind(entry.candidate_id)
            .bind(&entry.candidate_name)
            .bind(entry.rank as i32)
            .bind(entry.ranking_score as i32)
            .bind(&entry.reasoning)
            .bind(&entry.key_differentiators)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Replaced ranking for job {job_id} ({} entries)", entries.len());
        Ok(())
    }

    async fn get_ranking(&self, job_id: Uuid) -> Result<Vec<RankEntry>> {
        let rows = sqlx::query_as::<_, RankEntryRow>(
            "SELECT * FROM candidate_rankings WHERE job_id = $1 ORDER BY rank ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RankEntry::from).collect())
    }
}
