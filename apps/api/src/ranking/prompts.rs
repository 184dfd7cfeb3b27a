// LLM prompt constants for the comparative ranker.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for comparative ranking: enforces JSON-only output.
pub const RANKING_SYSTEM: &str = "You are a hiring committee chair comparing every \
    applicant for one role side by side. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Ranking prompt template.
/// Replace: {job_title}, {job_description}, {job_requirements}, {job_responsibilities},
/// {directives_block}, {candidate_count}, {candidates_block}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"Rank ALL {candidate_count} candidates below for this role, best first.

JOB TITLE: {job_title}

JOB DESCRIPTION:
{job_description}

REQUIREMENTS:
{job_requirements}

RESPONSIBILITIES:
{job_responsibilities}
{directives_block}
CANDIDATES:
{candidates_block}

Return a JSON object with this EXACT schema:
{
  "rankings": [
    {
      "candidate_id": "the candidate's ID exactly as given",
      "rank": 1,
      "ranking_score": 0,
      "reasoning": "Why this candidate sits at this position relative to the others",
      "key_differentiators": ["What separates this candidate from the neighbours"]
    }
  ]
}

Rules:
- Include every candidate exactly once. Use each rank from 1 to {candidate_count} exactly once; no ties.
- ranking_score is 0-100 and must decrease as rank increases.
- Compare candidates against each other, not only against the job.
- The guarded score is the calibrated evaluation of each application. Do not rank a candidate far above their guarded score without a concrete reason."#;

/// Inserted only when the job has private directives.
/// Replace: {directive_instruction}, {directives}
pub const RANKING_DIRECTIVES_TEMPLATE: &str = r#"
{directive_instruction}
Order candidates who violate the directives below every candidate who satisfies them.

PRIVATE DIRECTIVES:
{directives}
"#;

/// Reasoning attached to a candidate the model left out of its ordering.
pub const NOT_RANKED_REASONING: &str =
    "Not ranked: the candidate was missing from the comparative ranking response.";
