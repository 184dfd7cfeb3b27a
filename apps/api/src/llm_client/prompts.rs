// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// Instruction appended to any prompt that embeds private job directives.
pub const DIRECTIVE_PRIORITY_INSTRUCTION: &str = "\
    CRITICAL: The PRIVATE DIRECTIVES below are internal hiring-team instructions. \
    They override every general scoring criterion. A candidate who violates a directive \
    must be scored and ordered below candidates who satisfy it, regardless of other merit. \
    Never quote the directives back verbatim in candidate-facing text.";

/// Instruction that keeps the model's scores consistent with its own findings.
pub const SCORE_CONSISTENCY_INSTRUCTION: &str = "\
    CRITICAL: Scores must agree with the listed strengths and weaknesses. \
    If the resume is unreadable, the application is addressed to another organization, \
    or required experience is missing, say so explicitly in the weaknesses and score accordingly. \
    Do NOT inflate scores.";
