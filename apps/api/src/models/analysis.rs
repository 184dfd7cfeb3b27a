use serde::{Deserialize, Serialize};

use crate::llm_client::ProviderKind;

/// Result of checking a candidate against a job's private directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    pub meets_requirements: bool,
    pub compliance_score: u8,
    pub reasoning: String,
}

/// Validated output of the comprehensive analysis call. Scores are the model's
/// raw values (0-100) before any guardrail is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub resume_strengths: Vec<String>,
    pub resume_weaknesses: Vec<String>,
    pub answers_strengths: Vec<String>,
    pub answers_weaknesses: Vec<String>,
    pub overall_strengths: Vec<String>,
    pub overall_weaknesses: Vec<String>,
    pub remarks: String,
    pub resume_score: u8,
    pub answers_score: u8,
    pub overall_score: u8,
    /// Present only when the job carries private directives.
    pub compliance: Option<Compliance>,
    pub model_used: Option<String>,
    pub provider_used: Option<ProviderKind>,
}

impl AnalysisResult {
    pub fn strength_count(&self) -> usize {
        self.resume_strengths.len() + self.answers_strengths.len() + self.overall_strengths.len()
    }

    pub fn weakness_count(&self) -> usize {
        self.resume_weaknesses.len() + self.answers_weaknesses.len() + self.overall_weaknesses.len()
    }

    /// Every weakness at every granularity, one per line.
    pub fn weakness_text(&self) -> String {
        self.resume_weaknesses
            .iter()
            .chain(&self.answers_weaknesses)
            .chain(&self.overall_weaknesses)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Remarks plus the compliance reasoning, which often carries the sponsorship statement.
    pub fn remarks_text(&self) -> String {
        match &self.compliance {
            Some(c) if !c.reasoning.is_empty() => format!("{}\n{}", self.remarks, c.reasoning),
            _ => self.remarks.clone(),
        }
    }
}

/// Failure patterns detected deterministically in the analysis text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureSet {
    pub resume_corruption: bool,
    pub wrong_organization: bool,
    pub experience_gap: bool,
    pub citizenship_conflict: bool,
}

impl SignatureSet {
    pub fn count(&self) -> usize {
        [
            self.resume_corruption,
            self.wrong_organization,
            self.experience_gap,
            self.citizenship_conflict,
        ]
        .iter()
        .filter(|fired| **fired)
        .count()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.resume_corruption {
            labels.push("resume_corruption");
        }
        if self.wrong_organization {
            labels.push("wrong_organization");
        }
        if self.experience_gap {
            labels.push("experience_gap");
        }
        if self.citizenship_conflict {
            labels.push("citizenship_conflict");
        }
        labels
    }
}

/// Scores after deterministic ceiling enforcement. Invariant: 0 ≤ guarded ≤ raw ≤ 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardedScores {
    pub overall_score: u8,
    pub resume_score: u8,
    pub answers_score: u8,
    pub signatures: SignatureSet,
    /// The overall ceiling, when at least one signature fired.
    pub ceiling: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_count_and_labels() {
        let set = SignatureSet {
            resume_corruption: true,
            experience_gap: true,
            ..SignatureSet::default()
        };
        assert_eq!(set.count(), 2);
        assert!(set.any());
        assert_eq!(set.labels(), vec!["resume_corruption", "experience_gap"]);
        assert!(!SignatureSet::default().any());
    }

    #[test]
    fn test_remarks_text_includes_compliance_reasoning() {
        let analysis = AnalysisResult {
            remarks: "Solid backend profile.".to_string(),
            compliance: Some(Compliance {
                meets_requirements: false,
                compliance_score: 10,
                reasoning: "Candidate requires visa sponsorship.".to_string(),
            }),
            ..AnalysisResult::default()
        };
        let text = analysis.remarks_text();
        assert!(text.contains("Solid backend profile."));
        assert!(text.contains("requires visa sponsorship"));
    }
}
