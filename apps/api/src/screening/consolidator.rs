//! Response Consolidator: merges the cover letter and every application answer
//! into one labeled text block for the analysis prompt.
//!
//! Order: cover letter, knockout answers, custom answers, EEO fields.
//! Pure and idempotent.

use serde_json::Value;

use crate::models::candidate::ApplicationAnswer;
use crate::models::job::{Job, QuestionKind};

const NO_ANSWER: &str = "(no answer)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedAnswers {
    pub text: String,
    pub answer_count: usize,
    pub has_cover_letter: bool,
}

impl ConsolidatedAnswers {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Renders the cover letter and answers. Question text comes from the job when
/// the job defines the question, otherwise the raw question id is shown.
pub fn consolidate(
    cover_letter: Option<&str>,
    answers: &[ApplicationAnswer],
    job: &Job,
) -> ConsolidatedAnswers {
    let mut sections = Vec::new();

    let cover_letter = cover_letter.map(str::trim).filter(|c| !c.is_empty());
    if let Some(letter) = cover_letter {
        sections.push(format!("=== COVER LETTER ===\n{letter}"));
    }

    let mut answer_count = 0;
    for (kind, heading) in [
        (QuestionKind::Knockout, "SCREENING (KNOCKOUT) QUESTIONS"),
        (QuestionKind::Custom, "ADDITIONAL QUESTIONS"),
        (QuestionKind::Eeo, "EEO (VOLUNTARY SELF-IDENTIFICATION)"),
    ] {
        let lines: Vec<String> = answers
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| render_answer(a, job))
            .collect();
        if lines.is_empty() {
            continue;
        }
        answer_count += lines.len();
        sections.push(format!("=== {heading} ===\n{}", lines.join("\n")));
    }

    ConsolidatedAnswers {
        text: sections.join("\n\n"),
        answer_count,
        has_cover_letter: cover_letter.is_some(),
    }
}

fn render_answer(answer: &ApplicationAnswer, job: &Job) -> String {
    let value = render_value(&answer.answer);
    match answer.kind {
        // EEO fields are flat "field: value" pairs.
        QuestionKind::Eeo => {
            let label = job.question_text(&answer.question_id).unwrap_or(&answer.question_id);
            format!("[eeo:{}] {label}: {value}", answer.question_id)
        }
        kind => {
            let question = job
                .question_text(&answer.question_id)
                .unwrap_or(&answer.question_id);
            format!(
                "[{}:{}] Q: {question}\nA: {value}",
                kind.label(),
                answer.question_id
            )
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => NO_ANSWER.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => NO_ANSWER.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(render_value)
                .filter(|p| p != NO_ANSWER)
                .collect();
            if parts.is_empty() {
                NO_ANSWER.to_string()
            } else {
                parts.join(", ")
            }
        }
        Value::Object(_) => value.to_string(),
    }
}
