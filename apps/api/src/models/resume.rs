use serde::{Deserialize, Serialize};

/// Structured view of a candidate's resume. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<String>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub credential: Option<String>,
    pub institution: Option<String>,
    pub period: Option<String>,
}

impl ResumeProfile {
    /// A profile holding only the extracted text.
    pub fn raw_only(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    /// True when at least one structured field was recovered.
    pub fn has_structure(&self) -> bool {
        self.name.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.location.is_some()
            || !self.skills.is_empty()
            || !self.experience.is_empty()
            || !self.education.is_empty()
            || !self.certifications.is_empty()
    }

    /// Truly empty: no structure and no usable raw text.
    pub fn is_empty(&self) -> bool {
        !self.has_structure() && self.raw_text.trim().is_empty()
    }
}
