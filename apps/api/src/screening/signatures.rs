//! Failure-signature detection.
//!
//! One pure function scans the analysis's own language for known failure
//! patterns. The analyzer's fallback scoring and the guardrail both call it,
//! so the two paths can never disagree about what fired.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::analysis::SignatureSet;

/// Compiled, case-insensitive signature patterns.
pub struct SignaturePatterns;

impl SignaturePatterns {
    /// Resume text unreadable, corrupted or empty.
    pub fn resume_corruption() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)\bcorrupt(?:ed|ion)?\b|\bunreadable\b|\billegible\b|\bgarbled\b|\bgibberish\b|(?:could\s+not|cannot|can't|unable\s+to)\s+(?:be\s+)?(?:read|parsed?|extract(?:ed)?)\b|\bno\s+(?:usable|readable|legible)\s+(?:content|text|information)\b|\b(?:blank|empty)\s+resume\b|\bencoding\s+(?:issues?|errors?|problems?)\b|\bzero\s+usable\s+content\b",
            )
            .expect("Valid resume corruption regex")
        });
        &PATTERN
    }

    /// Cover letter or answers written for a different organization.
    pub fn wrong_organization() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)\b(?:addressed|written|directed|tailored|intended)\s+(?:to|for)\s+(?:a\s+|an\s+|the\s+)?(?:different|another|other|wrong)\s+(?:company|organi[sz]ation|employer|firm)\b|\bwrong\s+(?:company|organi[sz]ation|employer)\b|\bmentions?\s+(?:a\s+|an\s+)?(?:different|another)\s+(?:company|organi[sz]ation|employer)\b|\b(?:references?|names?)\s+(?:a\s+|an\s+)?(?:different|another)\s+(?:company|organi[sz]ation|employer)\b|\bgeneric\s+(?:cover\s+letter\s+)?(?:copied|reused)\s+from\s+(?:a\s+|an\s+)?(?:another|different)\s+application\b",
            )
            .expect("Valid wrong organization regex")
        });
        &PATTERN
    }

    /// Explicit statement that required experience is lacking.
    pub fn experience_gap() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)\black(?:s|ing)?\s+(?:the\s+)?(?:(?:required|necessary|minimum|sufficient)\s+(?:\d+\+?\s*)?(?:years?|experience)|\d+\+?\s*years?)\b|\b(?:does\s+not|doesn't|fails?\s+to|did\s+not)\s+(?:meet|have|possess|demonstrate)\s+(?:the\s+)?(?:required|minimum|necessary)\s+(?:\d+\+?\s*)?(?:years|experience)\b|\binsufficient\s+(?:professional\s+|relevant\s+|work\s+)?experience\b|\bno\s+(?:professional|relevant|prior|industry)\s+(?:work\s+)?experience\b|\bappears\s+to\s+be\s+(?:a\s+|an\s+)?(?:student|recent\s+graduate|new\s+graduate|intern)\b|\bbelow\s+the\s+(?:required|minimum)\s+(?:years|experience)\b",
            )
            .expect("Valid experience gap regex")
        });
        &PATTERN
    }

    /// Directive language requiring citizenship or refusing sponsorship.
    ///
    /// A directive that only mentions citizenship, or says sponsorship is offered,
    /// does not match.
    pub fn citizenship_requirement() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)\bmust\s+(?:be|hold)\s+(?:an?\s+)?(?:u\.?s\.?\s+|us\s+|\w+\s+)?citizen(?:s|ship)?\b|\bcitizens?\b(?:\s+(?:and|or)\s+(?:\w+\s+){0,3}?\w+)?\s+only\b|\bonly\s+(?:\w+\s+){0,2}citizens\b|\bcitizenship\s+(?:is\s+)?(?:required|mandatory|a\s+must)\b|\brequires?\s+(?:\w+\s+){0,2}citizenship\b|\b(?:no|without)\s+(?:visa\s+)?sponsorship\b|\b(?:cannot|can't|will\s+not|won't|do\s+not|don't|does\s+not|doesn't|unable\s+to|not\s+able\s+to)\s+(?:provide\s+|offer\s+)?(?:visa\s+)?sponsor|\bsponsorship\s+(?:is\s+)?(?:not\s+(?:available|offered|provided)|unavailable)\b|\bgreen\s+card\s+holders?\s+only\b",
            )
            .expect("Valid citizenship requirement regex")
        });
        &PATTERN
    }

    /// Candidate language stating the candidate needs sponsorship.
    pub fn needs_sponsorship() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)\b(?:requires?|required|needs?|needing|requiring|will\s+require|would\s+require|will\s+need|would\s+need|seeking)\s+(?:\w+\s+)?(?:visa\s+|h-?1b\s+|work\s+|employment\s+)?sponsorship\b|\bsponsorship\s+(?:is\s+|would\s+be\s+|will\s+be\s+)?(?:required|needed|necessary)\b|\bon\s+an?\s+(?:h-?1b|f-?1|opt|tn|l-?1)\b",
            )
            .expect("Valid sponsorship need regex")
        });
        &PATTERN
    }
}

/// Words that may sit between a negator and the phrase it negates.
const NEGATION_FILLERS: &[&str] = &[
    "a", "actually", "all", "an", "any", "appear", "appears", "at", "be", "been", "being",
    "currently", "did", "do", "does", "has", "have", "in", "is", "need", "needs", "seem",
    "seems", "the", "to", "was", "way", "were", "will", "would",
];

/// Longest run of filler words a negator may reach across.
const NEGATION_REACH: usize = 3;

/// True when some match of `pattern` in `text` is not negated.
///
/// A match is negated when a negator ("not", "no", "never", "without", any
/// "n't" contraction) closes the same clause right before it, with at most a
/// few filler words in between: "does not require sponsorship",
/// "no sponsorship required", "not in any way corrupted".
fn affirms(pattern: &Regex, text: &str) -> bool {
    pattern
        .find_iter(text)
        .any(|m| !negated_before(&text[..m.start()]))
}

fn negated_before(prefix: &str) -> bool {
    let clause = prefix
        .rsplit(|c: char| matches!(c, '.' | ';' | ',' | ':' | '!' | '?' | '(' | '\n'))
        .next()
        .unwrap_or("");

    let mut fillers = 0;
    for word in clause.split_whitespace().rev() {
        let word = word
            .replace('\u{2019}', "'")
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
            .to_lowercase();
        if is_negator(&word) {
            return true;
        }
        if fillers == NEGATION_REACH || !NEGATION_FILLERS.contains(&word.as_str()) {
            return false;
        }
        fillers += 1;
    }
    false
}

fn is_negator(word: &str) -> bool {
    matches!(word, "not" | "no" | "never" | "without" | "nor" | "cannot") || word.ends_with("n't")
}

/// Detects failure signatures in the analysis text.
///
/// The citizenship conflict fires only when the directives demand citizenship or
/// refuse sponsorship AND the candidate text says sponsorship is needed. Without
/// directives it can never fire. Negated statements never count.
pub fn detect_signatures(
    weakness_text: &str,
    remarks_text: &str,
    private_directives: Option<&str>,
) -> SignatureSet {
    let candidate_text = format!("{weakness_text}\n{remarks_text}");

    let citizenship_conflict = private_directives
        .is_some_and(|d| affirms(SignaturePatterns::citizenship_requirement(), d))
        && affirms(SignaturePatterns::needs_sponsorship(), &candidate_text);

    SignatureSet {
        resume_corruption: affirms(SignaturePatterns::resume_corruption(), &candidate_text),
        wrong_organization: affirms(SignaturePatterns::wrong_organization(), &candidate_text),
        experience_gap: affirms(SignaturePatterns::experience_gap(), &candidate_text),
        citizenship_conflict,
    }
}
