//! Score Guardrail: deterministic post-processing of the model's raw scores.
//!
//! Never calls the model. Detects failure signatures in the analysis text,
//! derives an overall ceiling from them, and clamps every score so that
//! `0 <= guarded <= raw <= 100` always holds.

use tracing::info;

use crate::models::analysis::{AnalysisResult, GuardedScores, SignatureSet};
use crate::screening::signatures::detect_signatures;

/// Ceiling when corruption, experience gap and wrong organization fire together.
const TRIPLE_FAILURE_CEILING: f64 = 25.0;
const FOUR_SIGNATURE_CEILING: f64 = 25.0;
const THREE_SIGNATURE_CEILING: f64 = 30.0;
const TWO_SIGNATURE_CEILING: f64 = 35.0;
const CORRUPTION_ONLY_CEILING: f64 = 40.0;
const EXPERIENCE_GAP_ONLY_CEILING: f64 = 50.0;
const WRONG_ORGANIZATION_MULTIPLIER: f64 = 0.75;
const CITIZENSHIP_PENALTY: f64 = 15.0;
const WEAKNESS_DOMINANT_CEILING: f64 = 30.0;
/// Outer bound whenever any signature fired.
const ANY_SIGNATURE_CEILING: f64 = 50.0;
/// Lower bound of the ceiling when four signatures fired.
const FOUR_SIGNATURE_FLOOR: f64 = 20.0;

const RESUME_CORRUPTION_CAP: f64 = 40.0;
const RESUME_EXPERIENCE_GAP_CAP: f64 = 50.0;

/// Compliance may trail overall by this many points before overall is pulled down.
const COMPLIANCE_GAP_TOLERANCE: f64 = 20.0;
/// Overall never drops below this share of its prior value when pulled toward compliance.
const COMPLIANCE_PULL_FLOOR: f64 = 0.7;

/// Overall-score ceiling for a signature set, or `None` when nothing fired.
///
/// `strengths`/`weaknesses` are the total point counts across all granularities.
pub fn overall_ceiling(
    signatures: &SignatureSet,
    strengths: usize,
    weaknesses: usize,
) -> Option<f64> {
    let count = signatures.count();
    if count == 0 {
        return None;
    }

    let mut ceiling = if signatures.resume_corruption
        && signatures.experience_gap
        && signatures.wrong_organization
    {
        TRIPLE_FAILURE_CEILING
    } else if count >= 4 {
        FOUR_SIGNATURE_CEILING
    } else if count == 3 {
        THREE_SIGNATURE_CEILING
    } else if count == 2 {
        TWO_SIGNATURE_CEILING
    } else if signatures.resume_corruption {
        CORRUPTION_ONLY_CEILING
    } else if signatures.experience_gap {
        EXPERIENCE_GAP_ONLY_CEILING
    } else if signatures.wrong_organization {
        100.0 * WRONG_ORGANIZATION_MULTIPLIER
    } else {
        // citizenship conflict alone: only the flat penalty and the outer bound apply
        100.0
    };

    if signatures.citizenship_conflict {
        ceiling -= CITIZENSHIP_PENALTY;
    }

    if weaknesses > strengths && (signatures.resume_corruption || signatures.experience_gap) {
        ceiling = ceiling.min(WEAKNESS_DOMINANT_CEILING);
    }

    ceiling = ceiling.min(ANY_SIGNATURE_CEILING);
    if count >= 4 {
        ceiling = ceiling.max(FOUR_SIGNATURE_FLOOR);
    }

    Some(ceiling.clamp(0.0, 100.0))
}

/// Applies the guardrail to a validated analysis.
pub fn apply_guardrail(
    analysis: &AnalysisResult,
    private_directives: Option<&str>,
) -> GuardedScores {
    let signatures = detect_signatures(
        &analysis.weakness_text(),
        &analysis.remarks_text(),
        private_directives,
    );
    let ceiling = overall_ceiling(
        &signatures,
        analysis.strength_count(),
        analysis.weakness_count(),
    );

    let raw_overall = f64::from(analysis.overall_score);
    let raw_resume = f64::from(analysis.resume_score);
    let raw_answers = f64::from(analysis.answers_score);

    let mut overall = match ceiling {
        Some(c) => raw_overall.min(c),
        None => raw_overall,
    };

    let mut resume = raw_resume;
    if signatures.resume_corruption {
        resume = resume.min(RESUME_CORRUPTION_CAP);
    }
    if signatures.experience_gap {
        resume = resume.min(RESUME_EXPERIENCE_GAP_CAP);
    }

    let mut answers = raw_answers;
    if signatures.wrong_organization {
        answers *= WRONG_ORGANIZATION_MULTIPLIER;
    }

    let directives_present = private_directives.is_some_and(|d| !d.trim().is_empty());
    if let (true, Some(compliance)) = (directives_present, &analysis.compliance) {
        let compliance_score = f64::from(compliance.compliance_score);
        if overall - compliance_score > COMPLIANCE_GAP_TOLERANCE {
            let pulled = (overall + compliance_score) / 2.0;
            overall = pulled.max(overall * COMPLIANCE_PULL_FLOOR);
        }
    }

    let guarded = GuardedScores {
        overall_score: to_score(overall, analysis.overall_score),
        resume_score: to_score(resume, analysis.resume_score),
        answers_score: to_score(answers, analysis.answers_score),
        signatures,
        ceiling: ceiling.map(|c| c.round() as u8),
    };

    if signatures.any() || guarded.overall_score != analysis.overall_score {
        info!(
            signatures = ?signatures.labels(),
            ceiling = ?guarded.ceiling,
            "Guardrail clamped scores: overall {} -> {}, resume {} -> {}, answers {} -> {}",
            analysis.overall_score,
            guarded.overall_score,
            analysis.resume_score,
            guarded.resume_score,
            analysis.answers_score,
            guarded.answers_score
        );
    }

    guarded
}

/// Rounds into [0, 100] and never above the raw score.
fn to_score(value: f64, raw: u8) -> u8 {
    let value = if value.is_finite() { value } else { 0.0 };
    (value.round().clamp(0.0, 100.0) as u8).min(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::Compliance;
    use proptest::prelude::*;

    fn signatures(c: bool, w: bool, g: bool, v: bool) -> SignatureSet {
        SignatureSet {
            resume_corruption: c,
            wrong_organization: w,
            experience_gap: g,
            citizenship_conflict: v,
        }
    }

    fn analysis(overall: u8, strengths: Vec<&str>, weaknesses: Vec<&str>) -> AnalysisResult {
        AnalysisResult {
            overall_strengths: strengths.into_iter().map(String::from).collect(),
            overall_weaknesses: weaknesses.into_iter().map(String::from).collect(),
            overall_score: overall,
            resume_score: overall,
            answers_score: overall,
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn test_no_signatures_no_ceiling() {
        assert_eq!(overall_ceiling(&SignatureSet::default(), 0, 10), None);
    }

    #[test]
    fn test_ceiling_table() {
        // single signatures
        assert_eq!(overall_ceiling(&signatures(true, false, false, false), 5, 1), Some(40.0));
        assert_eq!(overall_ceiling(&signatures(false, false, true, false), 5, 1), Some(50.0));
        // wrong organization alone: 100 * 0.75 = 75, then the outer bound of 50
        assert_eq!(overall_ceiling(&signatures(false, true, false, false), 5, 1), Some(50.0));
        // citizenship alone: 100 - 15 = 85, then the outer bound of 50
        assert_eq!(overall_ceiling(&signatures(false, false, false, true), 5, 1), Some(50.0));
        // two signatures
        assert_eq!(overall_ceiling(&signatures(true, false, true, false), 5, 1), Some(35.0));
        assert_eq!(overall_ceiling(&signatures(false, true, false, true), 5, 1), Some(20.0));
        // three without the triple failure
        assert_eq!(overall_ceiling(&signatures(true, true, false, true), 5, 1), Some(15.0));
        // four signatures: 25 - 15 = 10, floored at 20
        assert_eq!(overall_ceiling(&signatures(true, true, true, true), 5, 1), Some(20.0));
    }

    #[test]
    fn test_triple_failure_is_always_25() {
        let set = signatures(true, true, true, false);
        assert_eq!(overall_ceiling(&set, 10, 0), Some(25.0));
        assert_eq!(overall_ceiling(&set, 0, 10), Some(25.0));
    }

    #[test]
    fn test_weakness_dominance_caps_at_30() {
        let set = signatures(true, false, true, false);
        assert_eq!(overall_ceiling(&set, 1, 4), Some(30.0));
        // wrong organization alone does not trigger weakness dominance
        let set = signatures(false, true, false, false);
        assert_eq!(overall_ceiling(&set, 0, 4), Some(50.0));
    }

    #[test]
    fn test_student_with_corrupted_resume_example() {
        let a = analysis(
            92,
            vec!["Enthusiastic", "Relevant coursework"],
            vec![
                "Resume is corrupted and unreadable",
                "Appears to be a student, lacking the required 5 years",
            ],
        );
        let guarded = apply_guardrail(&a, None);
        assert_eq!(guarded.signatures.count(), 2);
        assert_eq!(guarded.ceiling, Some(35));
        assert_eq!(guarded.overall_score, 35);
        // resume: min(92, 40, 50)
        assert_eq!(guarded.resume_score, 40);
        // answers untouched without wrong organization
        assert_eq!(guarded.answers_score, 92);
    }

    #[test]
    fn test_triple_failure_example_ceiling_25() {
        let a = analysis(
            88,
            vec!["Good attitude"],
            vec![
                "Resume is unreadable",
                "Lacks required experience",
                "Cover letter is addressed to a different company",
            ],
        );
        let guarded = apply_guardrail(&a, None);
        assert_eq!(guarded.ceiling, Some(25));
        assert_eq!(guarded.overall_score, 25);
        assert_eq!(guarded.answers_score, 66);
    }

    #[test]
    fn test_low_raw_is_not_raised_to_ceiling() {
        let a = analysis(12, vec![], vec!["Resume is corrupted"]);
        let guarded = apply_guardrail(&a, None);
        assert_eq!(guarded.overall_score, 12);
    }

    #[test]
    fn test_clean_analysis_is_untouched() {
        let a = analysis(81, vec!["Strong Rust"], vec!["Limited Kafka exposure"]);
        let guarded = apply_guardrail(&a, None);
        assert_eq!(guarded.overall_score, 81);
        assert_eq!(guarded.resume_score, 81);
        assert_eq!(guarded.answers_score, 81);
        assert_eq!(guarded.ceiling, None);
    }

    #[test]
    fn test_sponsorship_without_directives_is_not_penalised() {
        let a = analysis(85, vec!["Great fit"], vec!["Candidate requires visa sponsorship"]);
        let guarded = apply_guardrail(&a, None);
        assert!(!guarded.signatures.any());
        assert_eq!(guarded.overall_score, 85);
    }

    #[test]
    fn test_citizenship_conflict_with_directives() {
        let a = analysis(85, vec!["Great fit"], vec!["Candidate requires visa sponsorship"]);
        let guarded = apply_guardrail(&a, Some("US citizens only, no sponsorship."));
        assert!(guarded.signatures.citizenship_conflict);
        assert_eq!(guarded.overall_score, 50);
    }

    #[test]
    fn test_candidate_meeting_directive_keeps_raw_overall() {
        let mut a = analysis(90, vec!["Strong Go"], vec!["Limited Kafka exposure"]);
        a.compliance = Some(Compliance {
            meets_requirements: true,
            compliance_score: 95,
            reasoning: "Candidate is a green card holder and does not require sponsorship."
                .into(),
        });
        let guarded = apply_guardrail(
            &a,
            Some("US citizens or green card holders only; no sponsorship."),
        );
        assert!(!guarded.signatures.any());
        assert_eq!(guarded.overall_score, 90);
        assert_eq!(guarded.ceiling, None);
    }

    #[test]
    fn test_sponsoring_directive_is_not_penalised() {
        let a = analysis(85, vec!["Great fit"], vec!["Candidate requires H-1B sponsorship"]);
        let guarded = apply_guardrail(
            &a,
            Some("Citizenship is not a factor; we sponsor H-1B visas for strong candidates."),
        );
        assert!(!guarded.signatures.citizenship_conflict);
        assert_eq!(guarded.overall_score, 85);
    }

    #[test]
    fn test_compliance_pull_toward_compliance() {
        let mut a = analysis(90, vec!["Strong"], vec![]);
        a.compliance = Some(Compliance {
            meets_requirements: false,
            compliance_score: 40,
            reasoning: "Does not satisfy the on-site directive".into(),
        });
        let guarded = apply_guardrail(&a, Some("On-site in Berlin only."));
        // midpoint 65, floor 63
        assert_eq!(guarded.overall_score, 65);

        a.compliance.as_mut().unwrap().compliance_score = 0;
        let guarded = apply_guardrail(&a, Some("On-site in Berlin only."));
        // midpoint 45 is below 70% of 90
        assert_eq!(guarded.overall_score, 63);
    }

    #[test]
    fn test_compliance_within_tolerance_is_ignored() {
        let mut a = analysis(80, vec!["Strong"], vec![]);
        a.compliance = Some(Compliance {
            meets_requirements: true,
            compliance_score: 65,
            reasoning: "Mostly aligned".into(),
        });
        assert_eq!(apply_guardrail(&a, Some("Prefer fintech")).overall_score, 80);
        // without directives compliance is never consulted
        a.compliance.as_mut().unwrap().compliance_score = 0;
        assert_eq!(apply_guardrail(&a, None).overall_score, 80);
    }

    proptest! {
        #[test]
        fn prop_guarded_never_exceeds_raw(
            overall in 0u8..=100,
            resume in 0u8..=100,
            answers in 0u8..=100,
            corrupt in any::<bool>(),
            wrong in any::<bool>(),
            gap in any::<bool>(),
            visa in any::<bool>(),
            strengths in 0usize..5,
            compliance in proptest::option::of(0u8..=100),
        ) {
            let mut weaknesses = vec!["Limited exposure to Kafka".to_string()];
            if corrupt { weaknesses.push("Resume is corrupted".into()); }
            if wrong { weaknesses.push("Cover letter addressed to a different company".into()); }
            if gap { weaknesses.push("Lacks required experience".into()); }
            if visa { weaknesses.push("Candidate requires visa sponsorship".into()); }

            let a = AnalysisResult {
                overall_strengths: (0..strengths).map(|i| format!("strength {i}")).collect(),
                overall_weaknesses: weaknesses,
                overall_score: overall,
                resume_score: resume,
                answers_score: answers,
                compliance: compliance.map(|score| Compliance {
                    meets_requirements: score >= 50,
                    compliance_score: score,
                    reasoning: String::new(),
                }),
                ..AnalysisResult::default()
            };
            let guarded = apply_guardrail(&a, Some("US citizens only"));

            prop_assert!(guarded.overall_score <= overall);
            prop_assert!(guarded.resume_score <= resume);
            prop_assert!(guarded.answers_score <= answers);
            prop_assert!(guarded.overall_score <= 100);
            if !guarded.signatures.any() && compliance.is_none() {
                prop_assert_eq!(guarded.overall_score, overall);
            }
        }

        #[test]
        fn prop_zero_signatures_is_identity(
            overall in 0u8..=100,
            resume in 0u8..=100,
            answers in 0u8..=100,
        ) {
            let a = AnalysisResult {
                overall_strengths: vec!["Clear communicator".into()],
                overall_weaknesses: vec!["Limited cloud exposure".into()],
                overall_score: overall,
                resume_score: resume,
                answers_score: answers,
                ..AnalysisResult::default()
            };
            let guarded = apply_guardrail(&a, None);
            prop_assert_eq!(guarded.overall_score, overall);
            prop_assert_eq!(guarded.resume_score, resume);
            prop_assert_eq!(guarded.answers_score, answers);
        }
    }
}
