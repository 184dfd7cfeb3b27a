//! Application pipeline: sequences one application through scoring.
//!
//! Flow: Parsed → Consolidated → Analyzed → Guarded → Persisted → RankingTriggered.
//!
//! Failures before analysis completes abort with the raw error. After analysis,
//! a persistence failure still returns the computed result (stored = false), and
//! ranking is handed to the ranking queue; enqueue failures are only logged.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::ResumeTextSource;
use crate::llm_client::LlmGateway;
use crate::models::analysis::{AnalysisResult, Compliance, GuardedScores};
use crate::models::candidate::Candidate;
use crate::models::job::{Company, Job};
use crate::models::resume::ResumeProfile;
use crate::ranking::queue::{RankingQueue, RankingReason, RankingTask};
use crate::ranking::service::{RankingService, RankingSummary};
use crate::screening::analyzer::{analyze_application as run_analysis, AnalysisInput};
use crate::screening::consolidator::consolidate;
use crate::screening::guardrail::apply_guardrail;
use crate::screening::resume_parser::structure_resume;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Parsed,
    Consolidated,
    Analyzed,
    Guarded,
    Persisted,
    RankingTriggered,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Parsed => "parsed",
            PipelineStage::Consolidated => "consolidated",
            PipelineStage::Analyzed => "analyzed",
            PipelineStage::Guarded => "guarded",
            PipelineStage::Persisted => "persisted",
            PipelineStage::RankingTriggered => "ranking_triggered",
        };
        f.write_str(name)
    }
}

/// What callers see of an analysis. Scores are always the guarded values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub stored: bool,
    pub ranking_triggered: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub resume_strengths: Vec<String>,
    pub resume_weaknesses: Vec<String>,
    pub answers_strengths: Vec<String>,
    pub answers_weaknesses: Vec<String>,
    pub remarks: String,
    pub compliance: Option<Compliance>,
    pub final_score: u8,
    pub resume_score: u8,
    pub answers_score: u8,
    pub signatures: Vec<&'static str>,
}

impl AnalysisSummary {
    fn new(
        candidate: &Candidate,
        analysis: &AnalysisResult,
        scores: &GuardedScores,
        stored: bool,
    ) -> Self {
        Self {
            candidate_id: candidate.id,
            job_id: candidate.job_id,
            stored,
            ranking_triggered: false,
            strengths: analysis.overall_strengths.clone(),
            weaknesses: analysis.overall_weaknesses.clone(),
            resume_strengths: analysis.resume_strengths.clone(),
            resume_weaknesses: analysis.resume_weaknesses.clone(),
            answers_strengths: analysis.answers_strengths.clone(),
            answers_weaknesses: analysis.answers_weaknesses.clone(),
            remarks: analysis.remarks.clone(),
            compliance: analysis.compliance.clone(),
            final_score: scores.overall_score,
            resume_score: scores.resume_score,
            answers_score: scores.answers_score,
            signatures: scores.signatures.labels(),
        }
    }
}

/// Outcome of re-scoring a job's candidates after its directives changed.
#[derive(Debug, Clone, Serialize)]
pub struct ReassessmentSummary {
    pub job_id: Uuid,
    pub reassessed: usize,
    pub failed: Vec<Uuid>,
    pub ranking: Option<RankingSummary>,
    pub ranking_error: Option<String>,
}

/// The scoring service. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct ScreeningService {
    store: Arc<dyn RecordStore>,
    llm: LlmGateway,
    extractor: Arc<dyn ResumeTextSource>,
    ranking_queue: Arc<dyn RankingQueue>,
    ranking: RankingService,
    reassessment_concurrency: usize,
}

impl ScreeningService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        llm: LlmGateway,
        extractor: Arc<dyn ResumeTextSource>,
        ranking_queue: Arc<dyn RankingQueue>,
        reassessment_concurrency: usize,
    ) -> Self {
        let ranking = RankingService::new(store.clone(), llm.clone());
        Self {
            store,
            llm,
            extractor,
            ranking_queue,
            ranking,
            reassessment_concurrency: reassessment_concurrency.max(1),
        }
    }

    pub fn ranking(&self) -> &RankingService {
        &self.ranking
    }

    /// Scores one application end to end.
    pub async fn analyze_application(
        &self,
        candidate_id: Uuid,
        use_llm: bool,
        trigger_ranking: bool,
    ) -> Result<AnalysisSummary, AppError> {
        let candidate = self.load_candidate(candidate_id).await?;
        let job = self.load_job(candidate.job_id).await?;
        let resume_url = candidate.resume_url().ok_or_else(|| {
            AppError::Validation(format!("Candidate {candidate_id} has no resume URL"))
        })?;
        let company = self.load_company(&job).await;

        let resume_text = self
            .extractor
            .extract_text(resume_url)
            .await
            .map_err(|e| AppError::Extraction(format!("{e:#}")))?;

        let profile = structure_resume(&self.llm, &resume_text, use_llm).await?;
        log_stage(candidate_id, PipelineStage::Parsed);

        // Partial progress is acceptable: the profile is stored even if analysis later fails.
        if let Err(e) = self.store.update_resume_profile(candidate_id, &profile).await {
            warn!(%candidate_id, "Failed to store resume profile: {e:#}");
        }

        let (analysis, scores) = self.score(&job, company.as_ref(), &candidate, &profile).await?;

        let stored = match self.store.save_analysis(candidate_id, &analysis, &scores).await {
            Ok(()) => {
                log_stage(candidate_id, PipelineStage::Persisted);
                true
            }
            Err(e) => {
                error!(%candidate_id, "Failed to store analysis, returning unstored result: {e:#}");
                false
            }
        };

        let mut summary = AnalysisSummary::new(&candidate, &analysis, &scores, stored);

        if trigger_ranking {
            if stored {
                summary.ranking_triggered = self.trigger_ranking(job.id).await;
                if summary.ranking_triggered {
                    log_stage(candidate_id, PipelineStage::RankingTriggered);
                }
            } else {
                warn!(%candidate_id, "Skipping ranking trigger: analysis was not stored");
            }
        }

        Ok(summary)
    }

    /// Returns the stored analysis, if the candidate has one.
    pub async fn get_analysis_results(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<AnalysisSummary>, AppError> {
        let candidate = self.load_candidate(candidate_id).await?;
        Ok(candidate
            .scored()
            .map(|(analysis, scores)| AnalysisSummary::new(&candidate, analysis, scores, true)))
    }

    /// Replaces a job's private directives, re-scores every analyzed candidate,
    /// then ranks once.
    pub async fn update_private_directives(
        &self,
        job_id: Uuid,
        directives: Option<String>,
    ) -> Result<ReassessmentSummary, AppError> {
        self.load_job(job_id).await?;

        let directives = directives
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.store
            .update_job_directives(job_id, directives.as_deref())
            .await
            .map_err(AppError::Internal)?;
        info!(%job_id, has_directives = directives.is_some(), "Private directives updated");

        self.reassess_job(job_id).await
    }

    /// Fans out one analysis per scored candidate (bounded concurrency), waits for
    /// all of them, then runs exactly one ranking. If that ranking fails it is
    /// queued for the worker as a `CriteriaChanged` task.
    pub async fn reassess_job(&self, job_id: Uuid) -> Result<ReassessmentSummary, AppError> {
        let job = Arc::new(self.load_job(job_id).await?);
        let company = Arc::new(self.load_company(&job).await);
        let candidates = self
            .store
            .list_scored_candidates(job_id)
            .await
            .map_err(AppError::Internal)?;

        info!(%job_id, candidates = candidates.len(), "Reassessing candidates");

        let semaphore = Arc::new(Semaphore::new(self.reassessment_concurrency));
        let mut pending: HashSet<Uuid> = candidates.iter().map(|c| c.id).collect();
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let service = self.clone();
            let job = job.clone();
            let company = company.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let candidate_id = candidate.id;
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        service
                            .reassess_candidate(&job, Option::as_ref(&company), &candidate)
                            .await
                    }
                    Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                        "Reassessment semaphore closed: {e}"
                    ))),
                };
                (candidate_id, result)
            });
        }

        let mut reassessed = 0;
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((candidate_id, Ok(()))) => {
                    pending.remove(&candidate_id);
                    reassessed += 1;
                }
                Ok((candidate_id, Err(e))) => {
                    pending.remove(&candidate_id);
                    warn!(%job_id, %candidate_id, "Reassessment failed: {e}");
                    failed.push(candidate_id);
                }
                Err(e) => error!(%job_id, "Reassessment task panicked: {e}"),
            }
        }
        // Whatever never reported back died with its task.
        failed.extend(pending);

        let (ranking, ranking_error) = match self.ranking.rank_candidates_for_job(job_id).await {
            Ok(summary) => (Some(summary), None),
            Err(e) => {
                error!(
                    %job_id,
                    "Ranking after reassessment failed, handing it to the worker: {e}"
                );
                let task = RankingTask::new(job_id, RankingReason::CriteriaChanged);
                if let Err(qe) = self.ranking_queue.enqueue(task).await {
                    warn!(%job_id, "Failed to enqueue ranking retry: {qe}");
                }
                (None, Some(e.to_string()))
            }
        };

        Ok(ReassessmentSummary {
            job_id,
            reassessed,
            failed,
            ranking,
            ranking_error,
        })
    }

    async fn reassess_candidate(
        &self,
        job: &Job,
        company: Option<&Company>,
        candidate: &Candidate,
    ) -> Result<(), AppError> {
        let profile = match &candidate.resume_profile {
            Some(profile) => profile.0.clone(),
            None => match candidate.resume_url() {
                Some(url) => ResumeProfile::raw_only(
                    self.extractor
                        .extract_text(url)
                        .await
                        .map_err(|e| AppError::Extraction(format!("{e:#}")))?,
                ),
                None => ResumeProfile::default(),
            },
        };

        let (analysis, scores) = self.score(job, company, candidate, &profile).await?;
        self.store
            .save_analysis(candidate.id, &analysis, &scores)
            .await
            .map_err(AppError::Internal)?;
        log_stage(candidate.id, PipelineStage::Persisted);
        Ok(())
    }

    /// Consolidate → analyze → guard. Shared by first-time scoring and reassessment.
    async fn score(
        &self,
        job: &Job,
        company: Option<&Company>,
        candidate: &Candidate,
        profile: &ResumeProfile,
    ) -> Result<(AnalysisResult, GuardedScores), AppError> {
        let answers = consolidate(candidate.cover_letter.as_deref(), &candidate.answers, job);
        log_stage(candidate.id, PipelineStage::Consolidated);

        let analysis = run_analysis(
            &self.llm,
            &AnalysisInput {
                job,
                company,
                profile,
                answers: &answers,
            },
        )
        .await?;
        log_stage(candidate.id, PipelineStage::Analyzed);

        let scores = apply_guardrail(&analysis, job.directives());
        log_stage(candidate.id, PipelineStage::Guarded);

        Ok((analysis, scores))
    }

    async fn trigger_ranking(&self, job_id: Uuid) -> bool {
        match self
            .ranking_queue
            .enqueue(RankingTask::new(job_id, RankingReason::AnalysisCompleted))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(%job_id, "Failed to enqueue ranking task: {e}");
                false
            }
        }
    }

    async fn load_candidate(&self, candidate_id: Uuid) -> Result<Candidate, AppError> {
        self.store
            .get_candidate(candidate_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    async fn load_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        self.store
            .get_job(job_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
    }

    /// The company only sharpens the prompt; a missing one is logged, not fatal.
    async fn load_company(&self, job: &Job) -> Option<Company> {
        match self.store.get_company(job.company_id).await {
            Ok(Some(company)) => Some(company),
            Ok(None) => {
                warn!(job_id = %job.id, "Company {} not found", job.company_id);
                None
            }
            Err(e) => {
                warn!(job_id = %job.id, "Failed to load company: {e:#}");
                None
            }
        }
    }
}

fn log_stage(candidate_id: Uuid, stage: PipelineStage) {
    info!(%candidate_id, %stage, "Application pipeline stage reached");
}
