//! Comparative Ranker: orders every analyzed candidate of a job in one model call.
//!
//! The model's ordering is never trusted as-is: unknown ids are dropped,
//! duplicates keep their first occurrence, ranks are re-numbered 1..N and any
//! candidate the model forgot is appended with score 0.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::DIRECTIVE_PRIORITY_INSTRUCTION;
use crate::llm_client::{strip_json_fences, CallOptions, LlmGateway};
use crate::models::analysis::AnalysisResult;
use crate::models::candidate::Candidate;
use crate::models::job::Job;
use crate::models::ranking::RankEntry;
use crate::ranking::prompts::{
    NOT_RANKED_REASONING, RANKING_DIRECTIVES_TEMPLATE, RANKING_PROMPT_TEMPLATE, RANKING_SYSTEM,
};
use crate::screening::schema::{self, JsonObject};

const RANKING_TEMPERATURE: f32 = 0.2;
const SOLE_CANDIDATE_REASONING: &str = "Only analyzed candidate for this job.";
/// Output budget per ranked candidate, on top of the default.
const TOKENS_PER_CANDIDATE: u32 = 256;
const MAX_RANKING_TOKENS: u32 = 16_384;

/// One analyzed candidate as the ranker sees it.
#[derive(Debug, Clone)]
pub struct RankingCandidate {
    pub id: Uuid,
    pub name: String,
    pub analysis: AnalysisResult,
    /// Guarded overall score.
    pub final_score: u8,
}

impl RankingCandidate {
    /// `None` unless the candidate has both a stored analysis and guarded scores.
    pub fn from_candidate(candidate: &Candidate) -> Option<Self> {
        let (analysis, scores) = candidate.scored()?;
        Some(Self {
            id: candidate.id,
            name: candidate.name.clone(),
            analysis: analysis.clone(),
            final_score: scores.overall_score,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankingOutcome {
    pub entries: Vec<RankEntry>,
    /// `None` when no model call was needed.
    pub model_used: Option<String>,
}

/// Produces a full strict ordering of `candidates` for `job`.
pub async fn rank_candidates(
    llm: &LlmGateway,
    job: &Job,
    candidates: &[RankingCandidate],
) -> Result<RankingOutcome, AppError> {
    match candidates {
        [] => return Ok(RankingOutcome::default()),
        [only] => {
            return Ok(RankingOutcome {
                entries: vec![RankEntry {
                    candidate_id: only.id,
                    candidate_name: only.name.clone(),
                    rank: 1,
                    ranking_score: 100,
                    reasoning: SOLE_CANDIDATE_REASONING.to_string(),
                    key_differentiators: Vec::new(),
                }],
                model_used: None,
            })
        }
        _ => {}
    }

    let prompt = build_ranking_prompt(job, candidates);
    let budget = (candidates.len() as u32)
        .saturating_mul(TOKENS_PER_CANDIDATE)
        .saturating_add(CallOptions::default().max_output_tokens)
        .min(MAX_RANKING_TOKENS);
    let options = CallOptions::with_temperature(RANKING_TEMPERATURE)
        .system(RANKING_SYSTEM)
        .max_output_tokens(budget);
    let reply = llm
        .call(&prompt, &options)
        .await
        .map_err(|e| AppError::Llm(format!("Comparative ranking failed: {e}")))?;

    let items = ranking_items(&reply.text)?;
    let entries = reconcile(items, candidates);

    info!(
        job_id = %job.id,
        "Ranked {} candidates via {}/{}",
        entries.len(),
        reply.provider_used,
        reply.model_used
    );

    Ok(RankingOutcome {
        entries,
        model_used: Some(reply.model_used),
    })
}

pub fn build_ranking_prompt(job: &Job, candidates: &[RankingCandidate]) -> String {
    let directives_block = job
        .directives()
        .map(|d| {
            RANKING_DIRECTIVES_TEMPLATE
                .replace("{directive_instruction}", DIRECTIVE_PRIORITY_INSTRUCTION)
                .replace("{directives}", d)
        })
        .unwrap_or_default();

    let candidates_block = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| render_candidate(i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n");

    RANKING_PROMPT_TEMPLATE
        .replace("{candidate_count}", &candidates.len().to_string())
        .replace("{job_title}", &job.title)
        .replace("{job_description}", &job.description)
        .replace("{job_requirements}", &job.requirements)
        .replace("{job_responsibilities}", &job.responsibilities)
        .replace("{directives_block}", &directives_block)
        .replace("{candidates_block}", &candidates_block)
}

fn render_candidate(position: usize, candidate: &RankingCandidate) -> String {
    let a = &candidate.analysis;
    let mut lines = vec![
        format!("--- Candidate {position} ---"),
        format!("ID: {}", candidate.id),
        format!("Name: {}", candidate.name),
        format!("Guarded score: {}/100", candidate.final_score),
        format!("Overall strengths: {}", join_points(&a.overall_strengths)),
        format!("Overall weaknesses: {}", join_points(&a.overall_weaknesses)),
        format!("Resume strengths: {}", join_points(&a.resume_strengths)),
        format!("Resume weaknesses: {}", join_points(&a.resume_weaknesses)),
        format!("Answer strengths: {}", join_points(&a.answers_strengths)),
        format!("Answer weaknesses: {}", join_points(&a.answers_weaknesses)),
        format!("Remarks: {}", a.remarks),
    ];
    if let Some(c) = &a.compliance {
        lines.push(format!(
            "Directive compliance: meets={} score={} ({})",
            c.meets_requirements, c.compliance_score, c.reasoning
        ));
    }
    lines.join("\n")
}

fn join_points(points: &[String]) -> String {
    if points.is_empty() {
        "(none)".to_string()
    } else {
        points.join("; ")
    }
}

/// Extracts the ranking array from `{"rankings": [...]}` or a bare array.
fn ranking_items(text: &str) -> Result<Vec<Value>, AppError> {
    let cleaned = strip_json_fences(text);

    let parsed = serde_json::from_str::<Value>(cleaned).ok().or_else(|| {
        // tolerate prose around the payload
        let start = cleaned.find(|c: char| c == '{' || c == '[')?;
        let end = cleaned.rfind(|c: char| c == '}' || c == ']')?;
        (end > start)
            .then(|| serde_json::from_str::<Value>(&cleaned[start..=end]).ok())
            .flatten()
    });

    match parsed {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Object(mut obj)) => match obj.remove("rankings") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::Llm(
                "Ranking response has no rankings array".to_string(),
            )),
        },
        _ => Err(AppError::Llm(
            "Ranking response is not valid JSON".to_string(),
        )),
    }
}

/// Turns the model's items into exactly one entry per input candidate.
pub fn reconcile(items: Vec<Value>, candidates: &[RankingCandidate]) -> Vec<RankEntry> {
    let known: HashMap<Uuid, &RankingCandidate> = candidates.iter().map(|c| (c.id, c)).collect();
    let mut seen = HashSet::new();
    let mut ranked: Vec<(u32, usize, RankEntry)> = Vec::new();

    for (order, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let Some(id) = schema::opt_string(obj, &["candidate_id", "id"])
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        else {
            warn!("Ranking entry without a usable candidate_id dropped");
            continue;
        };
        let Some(candidate) = known.get(&id) else {
            warn!(%id, "Ranking entry for unknown candidate dropped");
            continue;
        };
        if !seen.insert(id) {
            warn!(%id, "Duplicate ranking entry dropped");
            continue;
        }

        ranked.push((
            model_rank(obj).unwrap_or(u32::MAX),
            order,
            RankEntry {
                candidate_id: id,
                candidate_name: candidate.name.clone(),
                rank: 0,
                ranking_score: schema::score(obj, &["ranking_score", "score"])
                    .unwrap_or(candidate.final_score),
                reasoning: schema::string_or_empty(obj, &["reasoning", "rationale"]),
                key_differentiators: schema::string_list(
                    obj,
                    &["key_differentiators", "differentiators"],
                ),
            },
        ));
    }

    ranked.sort_by_key(|(rank, order, _)| (*rank, *order));

    let mut entries: Vec<RankEntry> = ranked.into_iter().map(|(_, _, entry)| entry).collect();

    for candidate in candidates.iter().filter(|c| !seen.contains(&c.id)) {
        warn!(candidate_id = %candidate.id, "Candidate omitted from ranking, appending");
        entries.push(RankEntry {
            candidate_id: candidate.id,
            candidate_name: candidate.name.clone(),
            rank: 0,
            ranking_score: 0,
            reasoning: NOT_RANKED_REASONING.to_string(),
            key_differentiators: Vec::new(),
        });
    }

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    entries
}

fn model_rank(obj: &JsonObject) -> Option<u32> {
    match obj.get("rank")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .map(|r| r.min(u32::MAX as u64) as u32),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderKind;
    use crate::models::analysis::Compliance;
    use crate::test_support::{gateway_with, sample_job, Scripted};
    use serde_json::json;

    fn candidate(name: &str, score: u8) -> RankingCandidate {
        RankingCandidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            analysis: AnalysisResult {
                overall_strengths: vec![format!("{name} ships reliably")],
                remarks: format!("{name} remarks"),
                ..Default::default()
            },
            final_score: score,
        }
    }

    fn item(id: Uuid, rank: u32, score: u8) -> Value {
        json!({
            "candidate_id": id.to_string(),
            "rank": rank,
            "ranking_score": score,
            "reasoning": "because",
            "key_differentiators": ["x"]
        })
    }

    fn assert_strict_ordering(entries: &[RankEntry], candidates: &[RankingCandidate]) {
        assert_eq!(entries.len(), candidates.len());
        let ranks: Vec<u32> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=candidates.len() as u32).collect::<Vec<_>>());
        let ids: HashSet<Uuid> = entries.iter().map(|e| e.candidate_id).collect();
        assert_eq!(ids.len(), candidates.len());
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_ranking() {
        let (llm, backend) = gateway_with(ProviderKind::Anthropic, vec![]);
        let outcome = rank_candidates(&llm, &sample_job(None), &[]).await.unwrap();
        assert!(outcome.entries.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_candidate_ranks_first_without_model_call() {
        let (llm, backend) = gateway_with(ProviderKind::Anthropic, vec![]);
        let only = candidate("Solo", 61);
        let outcome = rank_candidates(&llm, &sample_job(None), &[only.clone()]).await.unwrap();

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].rank, 1);
        assert_eq!(outcome.entries[0].ranking_score, 100);
        assert_eq!(outcome.entries[0].candidate_id, only.id);
        assert!(outcome.model_used.is_none());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_ordering_is_applied() {
        let a = candidate("Ada", 80);
        let b = candidate("Brian", 70);
        let reply = json!({ "rankings": [item(b.id, 1, 90), item(a.id, 2, 75)] }).to_string();
        let (llm, _) = gateway_with(ProviderKind::Anthropic, vec![Scripted::Text(reply)]);

        let candidates = vec![a.clone(), b.clone()];
        let outcome = rank_candidates(&llm, &sample_job(None), &candidates).await.unwrap();

        assert_strict_ordering(&outcome.entries, &candidates);
        assert_eq!(outcome.entries[0].candidate_id, b.id);
        assert_eq!(outcome.entries[0].ranking_score, 90);
        assert_eq!(outcome.model_used.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn test_bare_array_in_fences_is_accepted() {
        let a = candidate("Ada", 80);
        let b = candidate("Brian", 70);
        let reply = format!(
            "```json\n{}\n```",
            json!([item(a.id, 1, 88), item(b.id, 2, 60)])
        );
        let (llm, _) = gateway_with(ProviderKind::OpenAi, vec![Scripted::Text(reply)]);

        let outcome = rank_candidates(&llm, &sample_job(None), &[a.clone(), b]).await.unwrap();
        assert_eq!(outcome.entries[0].candidate_id, a.id);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_an_error() {
        let (llm, _) = gateway_with(
            ProviderKind::Anthropic,
            vec![Scripted::Text("I would rank Ada first.".to_string())],
        );
        let err = rank_candidates(&llm, &sample_job(None), &[candidate("A", 1), candidate("B", 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[test]
    fn test_omitted_candidate_is_appended_with_zero_score() {
        let a = candidate("Ada", 80);
        let b = candidate("Brian", 70);
        let c = candidate("Chen", 65);
        let candidates = vec![a.clone(), b.clone(), c.clone()];

        let entries = reconcile(vec![item(c.id, 1, 95), item(a.id, 2, 85)], &candidates);

        assert_strict_ordering(&entries, &candidates);
        assert_eq!(entries[2].candidate_id, b.id);
        assert_eq!(entries[2].ranking_score, 0);
        assert!(entries[2].reasoning.starts_with("Not ranked"));
    }

    #[test]
    fn test_unknown_and_duplicate_ids_are_dropped() {
        let a = candidate("Ada", 80);
        let b = candidate("Brian", 70);
        let candidates = vec![a.clone(), b.clone()];

        let entries = reconcile(
            vec![
                item(Uuid::new_v4(), 1, 99),
                item(a.id, 2, 90),
                item(a.id, 1, 10),
                json!({"candidate_id": "not-a-uuid", "rank": 1}),
                item(b.id, 3, 70),
            ],
            &candidates,
        );

        assert_strict_ordering(&entries, &candidates);
        assert_eq!(entries[0].candidate_id, a.id);
        assert_eq!(entries[0].ranking_score, 90);
        assert_eq!(entries[1].candidate_id, b.id);
    }

    #[test]
    fn test_tied_or_missing_ranks_keep_response_order() {
        let a = candidate("Ada", 80);
        let b = candidate("Brian", 70);
        let c = candidate("Chen", 65);
        let candidates = vec![a.clone(), b.clone(), c.clone()];

        let entries = reconcile(
            vec![
                json!({"candidate_id": c.id.to_string(), "reasoning": "no rank"}),
                item(b.id, 2, 70),
                item(a.id, 2, 72),
            ],
            &candidates,
        );

        let order: Vec<Uuid> = entries.iter().map(|e| e.candidate_id).collect();
        assert_eq!(order, vec![b.id, a.id, c.id]);
        // missing score falls back to the guarded score
        assert_eq!(entries[2].ranking_score, 65);
    }

    #[test]
    fn test_string_ranks_are_parsed() {
        let mut obj = JsonObject::new();
        obj.insert("rank".to_string(), json!("#3"));
        assert_eq!(model_rank(&obj), Some(3));
        obj.insert("rank".to_string(), json!(2.0));
        assert_eq!(model_rank(&obj), Some(2));
        obj.insert("rank".to_string(), json!(null));
        assert_eq!(model_rank(&obj), None);
    }

    #[test]
    fn test_prompt_carries_directives_and_every_candidate() {
        let mut a = candidate("Ada", 80);
        a.analysis.compliance = Some(Compliance {
            meets_requirements: false,
            compliance_score: 10,
            reasoning: "Needs sponsorship".to_string(),
        });
        let b = candidate("Brian", 70);
        let prompt =
            build_ranking_prompt(&sample_job(Some("US citizens only")), &[a.clone(), b.clone()]);

        assert!(prompt.contains("Rank ALL 2 candidates"));
        assert!(prompt.contains(&a.id.to_string()));
        assert!(prompt.contains(&b.id.to_string()));
        assert!(prompt.contains("PRIVATE DIRECTIVES:\nUS citizens only"));
        assert!(prompt.contains("meets=false score=10"));

        let plain = build_ranking_prompt(&sample_job(None), &[a, b]);
        assert!(!plain.contains("PRIVATE DIRECTIVES"));
    }
}
