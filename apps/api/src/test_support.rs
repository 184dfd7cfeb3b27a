//! In-memory doubles shared by the unit tests: a scripted LLM backend, a record
//! store, a fixed resume text source and a queue that always fails.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use crate::extraction::ResumeTextSource;
use crate::llm_client::{CallOptions, CompletionBackend, LlmError, LlmGateway, ProviderKind};
use crate::models::analysis::{AnalysisResult, GuardedScores};
use crate::models::candidate::{ApplicationAnswer, Candidate};
use crate::models::job::{Company, Job, JobQuestion, QuestionKind};
use crate::models::ranking::RankEntry;
use crate::models::resume::ResumeProfile;
use crate::ranking::queue::{QueueError, RankingQueue, RankingTask};
use crate::store::RecordStore;

// ────────────────────────────────────────────────────────────────────────────
// Scripted LLM backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String),
    Unavailable,
    ServerError,
}

/// Replays a fixed script of replies, one per call, and records the models asked for.
pub struct ScriptedBackend {
    kind: ProviderKind,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(kind: ProviderKind, script: Vec<Scripted>) -> Self {
        Self {
            kind,
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(
        &self,
        model: &str,
        _prompt: &str,
        _options: &CallOptions,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(model.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Unavailable) => Err(LlmError::ModelUnavailable {
                model: model.to_string(),
                message: "model_not_found".to_string(),
            }),
            Some(Scripted::ServerError) => Err(LlmError::Api {
                status: 500,
                message: "internal server error".to_string(),
            }),
            None => Err(LlmError::Api {
                status: 500,
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// A single-provider gateway over a scripted backend with models
/// `test-model` then `test-model-fallback`.
pub fn gateway_with(
    kind: ProviderKind,
    script: Vec<Scripted>,
) -> (LlmGateway, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(kind, script));
    let gateway = LlmGateway::with_backends(vec![(
        backend.clone() as Arc<dyn CompletionBackend>,
        vec!["test-model".to_string(), "test-model-fallback".to_string()],
    )])
    .unwrap();
    (gateway, backend)
}

/// A well-formed analysis reply with every score set to `overall` and the given
/// overall-level points.
pub fn analysis_reply(overall: u8, strengths: &[&str], weaknesses: &[&str]) -> String {
    json!({
        "resume_strengths": [],
        "resume_weaknesses": [],
        "answers_strengths": [],
        "answers_weaknesses": [],
        "overall_strengths": strengths,
        "overall_weaknesses": weaknesses,
        "remarks": "Scripted analysis.",
        "resume_score": overall,
        "answers_score": overall,
        "overall_match_score": overall
    })
    .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

const SAMPLE_COMPANY_ID: Uuid = Uuid::from_u128(0x5a17_c0de);

pub fn sample_company() -> Company {
    Company {
        id: SAMPLE_COMPANY_ID,
        name: "Acme Corp".to_string(),
    }
}

pub fn sample_job(directives: Option<&str>) -> Job {
    let now = Utc::now();
    Job {
        id: Uuid::new_v4(),
        company_id: SAMPLE_COMPANY_ID,
        title: "Senior Backend Engineer".to_string(),
        description: "Build and operate the payments platform.".to_string(),
        requirements: "5+ years of backend development; Rust or Go; PostgreSQL.".to_string(),
        responsibilities: "Design services, review code, mentor engineers.".to_string(),
        private_directives: directives.map(str::to_string),
        questions: Json(vec![
            JobQuestion {
                id: "authorized".to_string(),
                text: "Are you legally authorized to work in the US?".to_string(),
                kind: QuestionKind::Knockout,
            },
            JobQuestion {
                id: "why_us".to_string(),
                text: "Why do you want to work at Acme Corp?".to_string(),
                kind: QuestionKind::Custom,
            },
        ]),
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_candidate(job_id: Uuid, name: &str) -> Candidate {
    Candidate {
        id: Uuid::new_v4(),
        job_id,
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        resume_url: Some(format!("s3://resumes/{}.pdf", name.to_lowercase().replace(' ', "_"))),
        cover_letter: Some("Dear Acme Corp team, I would love to join.".to_string()),
        answers: Json(vec![
            ApplicationAnswer {
                question_id: "authorized".to_string(),
                kind: QuestionKind::Knockout,
                answer: json!(true),
            },
            ApplicationAnswer {
                question_id: "why_us".to_string(),
                kind: QuestionKind::Custom,
                answer: json!("Your payments work is the best in the industry."),
            },
        ]),
        resume_profile: None,
        analysis: None,
        guarded_scores: None,
        analyzed_at: None,
        created_at: Utc::now(),
    }
}

/// A candidate that already carries a stored analysis with the given guarded score.
pub fn scored_candidate(job_id: Uuid, name: &str, score: u8) -> Candidate {
    let analysis = AnalysisResult {
        overall_strengths: vec![format!("{name} has solid backend experience")],
        remarks: format!("{name} is a reasonable fit."),
        resume_score: score,
        answers_score: score,
        overall_score: score,
        ..Default::default()
    };
    let scores = GuardedScores {
        overall_score: score,
        resume_score: score,
        answers_score: score,
        ..Default::default()
    };
    Candidate {
        resume_profile: Some(Json(ResumeProfile::raw_only(format!("{name}\nBackend engineer")))),
        analysis: Some(Json(analysis)),
        guarded_scores: Some(Json(scores)),
        analyzed_at: Some(Utc::now()),
        ..sample_candidate(job_id, name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory record store
// ────────────────────────────────────────────────────────────────────────────

/// One job, its company, its candidates and its ranking.
pub struct MemoryStore {
    job: Mutex<Job>,
    company: Company,
    candidates: Mutex<Vec<Candidate>>,
    rankings: Mutex<HashMap<Uuid, Vec<RankEntry>>>,
    fail_analysis_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with_job(directives: Option<&str>) -> Self {
        Self {
            job: Mutex::new(sample_job(directives)),
            company: sample_company(),
            candidates: Mutex::new(Vec::new()),
            rankings: Mutex::new(HashMap::new()),
            fail_analysis_writes: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.lock().unwrap().id
    }

    pub fn job(&self) -> Job {
        self.job.lock().unwrap().clone()
    }

    pub fn add_candidate(&self, candidate: Candidate) -> Uuid {
        let id = candidate.id;
        self.candidates.lock().unwrap().push(candidate);
        id
    }

    /// Panics if the candidate was never added.
    pub fn candidate(&self, candidate_id: Uuid) -> Candidate {
        self.candidates
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == candidate_id)
            .cloned()
            .unwrap()
    }

    pub fn clear_candidates(&self) {
        self.candidates.lock().unwrap().clear();
    }

    pub fn ranking(&self, job_id: Uuid) -> Vec<RankEntry> {
        self.rankings
            .lock()
            .unwrap()
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every later `save_analysis` fails.
    pub fn fail_analysis_writes(&self) {
        self.fail_analysis_writes.store(true, Ordering::SeqCst);
    }

    fn with_candidate<T>(
        &self,
        candidate_id: Uuid,
        f: impl FnOnce(&mut Candidate) -> T,
    ) -> Result<T> {
        let mut candidates = self.candidates.lock().unwrap();
        match candidates.iter_mut().find(|c| c.id == candidate_id) {
            Some(candidate) => Ok(f(candidate)),
            None => bail!("Candidate {candidate_id} not found"),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_candidate(&self, candidate_id: Uuid) -> Result<Option<Candidate>> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == candidate_id)
            .cloned())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job = self.job.lock().unwrap();
        Ok((job.id == job_id).then(|| job.clone()))
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>> {
        Ok((self.company.id == company_id).then(|| self.company.clone()))
    }

    async fn update_resume_profile(
        &self,
        candidate_id: Uuid,
        profile: &ResumeProfile,
    ) -> Result<()> {
        self.with_candidate(candidate_id, |c| c.resume_profile = Some(Json(profile.clone())))
    }

    async fn save_analysis(
        &self,
        candidate_id: Uuid,
        analysis: &AnalysisResult,
        scores: &GuardedScores,
    ) -> Result<()> {
        if self.fail_analysis_writes.load(Ordering::SeqCst) {
            bail!("connection reset by peer");
        }
        self.with_candidate(candidate_id, |c| {
            c.analysis = Some(Json(analysis.clone()));
            c.guarded_scores = Some(Json(*scores));
            c.analyzed_at = Some(Utc::now());
        })
    }

    async fn list_scored_candidates(&self, job_id: Uuid) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.job_id == job_id && c.scored().is_some())
            .cloned()
            .collect())
    }

    async fn update_job_directives(&self, job_id: Uuid, directives: Option<&str>) -> Result<()> {
        let mut job = self.job.lock().unwrap();
        if job.id != job_id {
            bail!("Job {job_id} not found");
        }
        job.private_directives = directives.map(str::to_string);
        Ok(())
    }

    async fn replace_ranking(&self, job_id: Uuid, entries: &[RankEntry]) -> Result<()> {
        self.rankings.lock().unwrap().insert(job_id, entries.to_vec());
        Ok(())
    }

    async fn get_ranking(&self, job_id: Uuid) -> Result<Vec<RankEntry>> {
        Ok(self.ranking(job_id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Other collaborators
// ────────────────────────────────────────────────────────────────────────────

/// Returns the same resume text for every URL.
pub struct StaticTextSource {
    text: String,
}

impl StaticTextSource {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl ResumeTextSource for StaticTextSource {
    async fn extract_text(&self, _resume_url: &str) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// A text source that crashes the task calling it.
pub struct PanickingTextSource;

#[async_trait]
impl ResumeTextSource for PanickingTextSource {
    async fn extract_text(&self, resume_url: &str) -> Result<String> {
        panic!("extractor crashed on {resume_url}")
    }
}

/// A ranking queue whose every operation fails.
pub struct FailingQueue;

#[async_trait]
impl RankingQueue for FailingQueue {
    async fn enqueue(&self, _task: RankingTask) -> Result<(), QueueError> {
        Err(QueueError::Closed)
    }

    async fn next(&self) -> Result<Option<RankingTask>, QueueError> {
        Err(QueueError::Closed)
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}
