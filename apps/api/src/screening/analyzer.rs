//! Comprehensive Analyzer: one model call that evaluates resume, answers and the
//! application as a whole against a job.
//!
//! Flow: build prompt → gateway call (temperature 0.3) → parse object →
//! per-field validation with fallbacks. Errors only when the call fails or the
//! response is not a JSON object.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{DIRECTIVE_PRIORITY_INSTRUCTION, SCORE_CONSISTENCY_INSTRUCTION};
use crate::llm_client::{parse_json_object, CallOptions, LlmGateway, LlmReply};
use crate::models::analysis::{AnalysisResult, Compliance};
use crate::models::job::{Company, Job};
use crate::models::resume::ResumeProfile;
use crate::screening::consolidator::ConsolidatedAnswers;
use crate::screening::guardrail::overall_ceiling;
use crate::screening::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, COMPLIANCE_SCHEMA_FRAGMENT,
    DIRECTIVES_BLOCK_TEMPLATE, EMPTY_RESUME_NOTE,
};
use crate::screening::resume_parser::render_profile;
use crate::screening::schema::{self, JsonObject};
use crate::screening::signatures::detect_signatures;

const ANALYSIS_TEMPERATURE: f32 = 0.3;
const NO_RESPONSES_NOTE: &str = "(The candidate submitted no cover letter and no answers.)";

/// Everything the analyzer needs about one application.
pub struct AnalysisInput<'a> {
    pub job: &'a Job,
    pub company: Option<&'a Company>,
    pub profile: &'a ResumeProfile,
    pub answers: &'a ConsolidatedAnswers,
}

/// Runs the comprehensive analysis for one application.
pub async fn analyze_application(
    llm: &LlmGateway,
    input: &AnalysisInput<'_>,
) -> Result<AnalysisResult, AppError> {
    let prompt = build_analysis_prompt(input);
    let options = CallOptions::with_temperature(ANALYSIS_TEMPERATURE).system(ANALYSIS_SYSTEM);

    let reply = llm
        .call(&prompt, &options)
        .await
        .map_err(|e| AppError::Llm(format!("Comprehensive analysis failed: {e}")))?;

    let analysis = parse_analysis(&reply, input.job.directives())?;
    info!(
        "Analysis complete via {}/{}: overall={} resume={} answers={} compliance={}",
        reply.provider_used,
        reply.model_used,
        analysis.overall_score,
        analysis.resume_score,
        analysis.answers_score,
        analysis.compliance.is_some()
    );
    Ok(analysis)
}

/// Fills the analysis template. Compliance keys are requested only with directives.
pub fn build_analysis_prompt(input: &AnalysisInput<'_>) -> String {
    let job = input.job;
    let directives = job.directives();

    let resume_block = if input.profile.is_empty() {
        EMPTY_RESUME_NOTE.to_string()
    } else {
        render_profile(input.profile)
    };

    let answers_block = if input.answers.is_empty() {
        NO_RESPONSES_NOTE.to_string()
    } else {
        input.answers.text.clone()
    };

    let directives_block = directives
        .map(|d| {
            DIRECTIVES_BLOCK_TEMPLATE
                .replace("{directive_instruction}", DIRECTIVE_PRIORITY_INSTRUCTION)
                .replace("{directives}", d)
        })
        .unwrap_or_default();

    let company_name = input
        .company
        .map(|c| c.name.as_str())
        .unwrap_or("the hiring organization");

    ANALYSIS_PROMPT_TEMPLATE
        .replace("{consistency_instruction}", SCORE_CONSISTENCY_INSTRUCTION)
        .replace("{company_name}", company_name)
        .replace("{job_title}", &job.title)
        .replace("{job_description}", or_none(&job.description))
        .replace("{job_requirements}", or_none(&job.requirements))
        .replace("{job_responsibilities}", or_none(&job.responsibilities))
        .replace("{directives_block}", &directives_block)
        .replace(
            "{compliance_schema}",
            if directives.is_some() {
                COMPLIANCE_SCHEMA_FRAGMENT
            } else {
                ""
            },
        )
        // candidate-supplied text goes in last so its braces are never treated as placeholders
        .replace("{resume_block}", &resume_block)
        .replace("{answers_block}", &answers_block)
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(not specified)"
    } else {
        text
    }
}

/// Validates the model reply into an `AnalysisResult`.
pub fn parse_analysis(
    reply: &LlmReply,
    directives: Option<&str>,
) -> Result<AnalysisResult, AppError> {
    let obj = parse_json_object(&reply.text)
        .map_err(|e| AppError::Llm(format!("Analysis response unusable: {e}")))?;

    let mut analysis = analysis_from_json(&obj, directives);
    analysis.model_used = Some(reply.model_used.clone());
    analysis.provider_used = Some(reply.provider_used);
    Ok(analysis)
}

/// Per-field validation. Missing scores are recomputed from the point lists.
pub fn analysis_from_json(obj: &JsonObject, directives: Option<&str>) -> AnalysisResult {
    let mut analysis = AnalysisResult {
        resume_strengths: schema::string_list(obj, &["resume_strengths"]),
        resume_weaknesses: schema::string_list(obj, &["resume_weaknesses"]),
        answers_strengths: schema::string_list(obj, &["answers_strengths", "response_strengths"]),
        answers_weaknesses: schema::string_list(
            obj,
            &["answers_weaknesses", "response_weaknesses"],
        ),
        overall_strengths: schema::string_list(obj, &["overall_strengths", "strengths"]),
        overall_weaknesses: schema::string_list(obj, &["overall_weaknesses", "weaknesses"]),
        remarks: schema::string_or_empty(obj, &["remarks", "summary"]),
        compliance: directives.and_then(|_| parse_compliance(obj)),
        ..AnalysisResult::default()
    };

    analysis.resume_score = schema::score(obj, &["resume_score"]).unwrap_or_else(|| {
        warn!("Analysis missing resume_score, deriving from points");
        schema::ratio_score(analysis.resume_strengths.len(), analysis.resume_weaknesses.len())
    });
    analysis.answers_score = schema::score(obj, &["answers_score", "responses_score"])
        .unwrap_or_else(|| {
            warn!("Analysis missing answers_score, deriving from points");
            schema::ratio_score(analysis.answers_strengths.len(), analysis.answers_weaknesses.len())
        });
    analysis.overall_score = match schema::score(obj, &["overall_match_score", "overall_score"]) {
        Some(score) => score,
        None => {
            warn!("Analysis missing overall score, deriving from points");
            fallback_overall_score(&analysis, directives)
        }
    };

    analysis
}

/// Ratio-based overall score, capped by the same signature ceiling the guardrail uses.
fn fallback_overall_score(analysis: &AnalysisResult, directives: Option<&str>) -> u8 {
    let ratio = schema::ratio_score(
        analysis.overall_strengths.len(),
        analysis.overall_weaknesses.len(),
    );
    let signatures = detect_signatures(
        &analysis.weakness_text(),
        &analysis.remarks_text(),
        directives,
    );
    match overall_ceiling(&signatures, analysis.strength_count(), analysis.weakness_count()) {
        Some(ceiling) => (f64::from(ratio).min(ceiling).round()) as u8,
        None => ratio,
    }
}

fn parse_compliance(obj: &JsonObject) -> Option<Compliance> {
    let c = schema::object(obj, &["compliance", "directive_compliance"])?;
    let meets_requirements = schema::boolean(c, &["meets_requirements", "meets"]).unwrap_or(false);
    let compliance_score = schema::score(c, &["compliance_score", "score"])
        .unwrap_or(if meets_requirements { 100 } else { 0 });
    Some(Compliance {
        meets_requirements,
        compliance_score,
        reasoning: schema::string_or_empty(c, &["reasoning", "explanation"]),
    })
}
