use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::analysis::{AnalysisResult, GuardedScores};
use crate::models::job::QuestionKind;
use crate::models::resume::ResumeProfile;

/// One answer submitted with an application. `answer` is whatever the form produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAnswer {
    pub question_id: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub answer: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub answers: Json<Vec<ApplicationAnswer>>,
    pub resume_profile: Option<Json<ResumeProfile>>,
    pub analysis: Option<Json<AnalysisResult>>,
    pub guarded_scores: Option<Json<GuardedScores>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Analysis and guarded scores are written together; a candidate is rankable
    /// only when both are present.
    pub fn scored(&self) -> Option<(&AnalysisResult, &GuardedScores)> {
        match (&self.analysis, &self.guarded_scores) {
            (Some(analysis), Some(scores)) => Some((&analysis.0, &scores.0)),
            _ => None,
        }
    }

    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}
