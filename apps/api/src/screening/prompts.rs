// All LLM prompt constants for the screening module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for resume structuring: enforces JSON-only output.
pub const RESUME_STRUCTURE_SYSTEM: &str = "You are an expert resume parser. \
    Extract structured facts from resume text exactly as written. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT invent facts that are not in the resume.";

/// Resume structuring prompt template. Replace `{resume_text}` before sending.
pub const RESUME_STRUCTURE_PROMPT_TEMPLATE: &str = r#"Extract the candidate's resume into a JSON object with this EXACT schema:
{
  "name": "Full name or null",
  "email": "Email or null",
  "phone": "Phone or null",
  "location": "City, region or null",
  "skills": ["Rust", "PostgreSQL"],
  "experience": [
    {
      "title": "Senior Backend Engineer",
      "organization": "Acme Corp",
      "duration": "Jan 2020 - Present",
      "description": "One or two sentences of what they did"
    }
  ],
  "education": [
    {
      "credential": "BSc Computer Science",
      "institution": "State University",
      "period": "2012 - 2016"
    }
  ],
  "certifications": ["AWS Solutions Architect"]
}

Rules:
- Use null for unknown scalar fields and [] for unknown lists.
- Copy organization and institution names verbatim.
- Do NOT summarise away dates; keep them as written.

RESUME TEXT:
{resume_text}"#;

/// System prompt for the comprehensive analysis.
pub const ANALYSIS_SYSTEM: &str = "You are a senior technical recruiter evaluating one \
    job application. You are rigorous, evidence-based and never inflate scores. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// Comprehensive analysis prompt template.
/// Replace: {consistency_instruction}, {company_name}, {job_title}, {job_description},
///          {job_requirements}, {job_responsibilities}, {directives_block},
///          {resume_block}, {answers_block}, {compliance_schema}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"{consistency_instruction}

HIRING ORGANIZATION: {company_name}
ROLE: {job_title}

JOB DESCRIPTION:
{job_description}

REQUIREMENTS:
{job_requirements}

RESPONSIBILITIES:
{job_responsibilities}
{directives_block}
CANDIDATE RESUME:
{resume_block}

CANDIDATE APPLICATION RESPONSES:
{answers_block}

Evaluate the resume on its own, the application responses on their own, and the
application as a whole against this role. Check whether the cover letter or answers
are addressed to {company_name}; if they name a different organization, state that
the application is addressed to a different organization.

Return a JSON object with EXACTLY these keys:
{
  "resume_strengths": ["..."],
  "resume_weaknesses": ["..."],
  "answers_strengths": ["..."],
  "answers_weaknesses": ["..."],
  "overall_strengths": ["..."],
  "overall_weaknesses": ["..."],
  "remarks": "Two to four sentences for the hiring team",
  "resume_score": 0,
  "answers_score": 0,
  "overall_match_score": 0{compliance_schema}
}

All scores are integers from 0 to 100."#;

/// Inserted into the analysis template only when the job has private directives.
pub const COMPLIANCE_SCHEMA_FRAGMENT: &str = r#",
  "compliance": {
    "meets_requirements": true,
    "compliance_score": 0,
    "reasoning": "How the candidate does or does not satisfy the private directives"
  }"#;

/// Inserted into the analysis template only when the job has private directives.
/// Replace: {directive_instruction}, {directives}
pub const DIRECTIVES_BLOCK_TEMPLATE: &str = r#"
{directive_instruction}

PRIVATE DIRECTIVES:
{directives}
"#;

/// Placed in the resume block when structuring recovered nothing at all.
pub const EMPTY_RESUME_NOTE: &str = "NOTE: The resume contains zero usable content. \
    It may be blank, image-only, or corrupted. Treat the resume as unreadable.";
