use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of a screening question or application answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Yes/no screening question that can disqualify a candidate.
    Knockout,
    Custom,
    /// Voluntary equal-employment-opportunity field.
    Eeo,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Knockout => "knockout",
            QuestionKind::Custom => "custom",
            QuestionKind::Eeo => "eeo",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQuestion {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub responsibilities: String,
    /// Internal hiring-team instructions. When present they dominate analysis and ranking.
    pub private_directives: Option<String>,
    pub questions: Json<Vec<JobQuestion>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Directives with surrounding whitespace removed; blank directives count as absent.
    pub fn directives(&self) -> Option<&str> {
        self.private_directives
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn question_text(&self, question_id: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
}
