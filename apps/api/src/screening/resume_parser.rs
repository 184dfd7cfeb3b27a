//! Resume Structuring: turns extracted resume text into a `ResumeProfile`.
//!
//! The model's output is validated field by field; anything it gets wrong
//! degrades to an empty field instead of failing the parse.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{parse_json_object, CallOptions, LlmGateway};
use crate::models::resume::{EducationEntry, ExperienceEntry, ResumeProfile};
use crate::screening::prompts::{RESUME_STRUCTURE_PROMPT_TEMPLATE, RESUME_STRUCTURE_SYSTEM};
use crate::screening::schema::{self, JsonObject};

const STRUCTURING_TEMPERATURE: f32 = 0.1;

/// Structures resume text. Returns a raw-text-only profile when `use_llm` is off,
/// the text is empty, or the model output is unusable.
///
/// Errors only when the gateway fails outright and there is no raw text to fall back on.
pub async fn structure_resume(
    llm: &LlmGateway,
    resume_text: &str,
    use_llm: bool,
) -> Result<ResumeProfile, AppError> {
    if !use_llm || resume_text.trim().is_empty() {
        return Ok(ResumeProfile::raw_only(resume_text));
    }

    let prompt = RESUME_STRUCTURE_PROMPT_TEMPLATE.replace("{resume_text}", resume_text);
    let options =
        CallOptions::with_temperature(STRUCTURING_TEMPERATURE).system(RESUME_STRUCTURE_SYSTEM);

    let reply = match llm.call(&prompt, &options).await {
        Ok(reply) => reply,
        Err(e) => {
            // resume_text is non-empty here, so the raw text is always a usable fallback
            warn!("Resume structuring failed, keeping raw text only: {e}");
            return Ok(ResumeProfile::raw_only(resume_text));
        }
    };

    match parse_json_object(&reply.text) {
        Ok(obj) => {
            let profile = profile_from_json(&obj, resume_text);
            info!(
                "Structured resume: {} skills, {} experience entries, {} education entries",
                profile.skills.len(),
                profile.experience.len(),
                profile.education.len()
            );
            Ok(profile)
        }
        Err(e) => {
            warn!("Resume structuring output unusable, keeping raw text only: {e}");
            Ok(ResumeProfile::raw_only(resume_text))
        }
    }
}

/// Maps a model JSON object onto a profile, defaulting every field that fails validation.
pub fn profile_from_json(obj: &JsonObject, raw_text: &str) -> ResumeProfile {
    let contact = schema::object(obj, &["contact", "contact_info"]);
    let contact_field = |keys: &[&str]| {
        schema::opt_string(obj, keys).or_else(|| contact.and_then(|c| schema::opt_string(c, keys)))
    };

    ResumeProfile {
        name: contact_field(&["name", "full_name"]),
        email: contact_field(&["email"]),
        phone: contact_field(&["phone", "phone_number"]),
        location: contact_field(&["location", "address"]),
        skills: dedup_case_insensitive(schema::string_list(obj, &["skills", "technical_skills"])),
        experience: schema::object_list(obj, &["experience", "work_experience"])
            .into_iter()
            .map(|e| ExperienceEntry {
                title: schema::opt_string(e, &["title", "role", "position"]),
                organization: schema::opt_string(e, &["organization", "company", "employer"]),
                duration: schema::opt_string(e, &["duration", "dates", "period"]),
                description: schema::opt_string(e, &["description", "summary"]),
            })
            .filter(|e| e != &ExperienceEntry::default())
            .collect(),
        education: schema::object_list(obj, &["education"])
            .into_iter()
            .map(|e| EducationEntry {
                credential: schema::opt_string(e, &["credential", "degree"]),
                institution: schema::opt_string(e, &["institution", "school", "university"]),
                period: schema::opt_string(e, &["period", "dates", "year"]),
            })
            .filter(|e| e != &EducationEntry::default())
            .collect(),
        certifications: dedup_case_insensitive(schema::string_list(obj, &["certifications"])),
        raw_text: raw_text.to_string(),
    }
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

/// Renders a profile as prompt text. Structured fields first, raw text when nothing was structured.
pub fn render_profile(profile: &ResumeProfile) -> String {
    if !profile.has_structure() {
        return profile.raw_text.trim().to_string();
    }

    let mut out = String::new();
    for (label, value) in [
        ("Name", &profile.name),
        ("Email", &profile.email),
        ("Phone", &profile.phone),
        ("Location", &profile.location),
    ] {
        if let Some(v) = value {
            out.push_str(&format!("{label}: {v}\n"));
        }
    }
    if !profile.skills.is_empty() {
        out.push_str(&format!("Skills: {}\n", profile.skills.join(", ")));
    }
    if !profile.experience.is_empty() {
        out.push_str("Experience:\n");
        for e in &profile.experience {
            out.push_str(&format!(
                "- {} at {} ({})\n",
                e.title.as_deref().unwrap_or("Unknown title"),
                e.organization.as_deref().unwrap_or("unknown organization"),
                e.duration.as_deref().unwrap_or("dates unknown"),
            ));
            if let Some(d) = &e.description {
                out.push_str(&format!("  {d}\n"));
            }
        }
    }
    if !profile.education.is_empty() {
        out.push_str("Education:\n");
        for e in &profile.education {
            out.push_str(&format!(
                "- {}, {} ({})\n",
                e.credential.as_deref().unwrap_or("Unknown credential"),
                e.institution.as_deref().unwrap_or("unknown institution"),
                e.period.as_deref().unwrap_or("dates unknown"),
            ));
        }
    }
    if !profile.certifications.is_empty() {
        out.push_str(&format!("Certifications: {}\n", profile.certifications.join(", ")));
    }
    out.trim_end().to_string()
}
