//! Content safety filter
//!
//! Keeps generated interview dialogue from disclosing the underlying model or
//! provider. All functions are pure; `SafetyMonitor` records what they find.
//!
//! Filtering never fails: a response is passed through, rewritten, or
//! replaced with [`NEUTRAL_RESPONSE`].

pub mod monitor;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use monitor::{SafetyMonitor, SafetyStats, Violation};

/// Sentence used whenever a response cannot be salvaged
pub const NEUTRAL_RESPONSE: &str =
    "I'm your interviewer for this session, so let's keep our focus on your experience.";

/// Rewritten responses shorter than this (after trimming) are replaced
pub const MIN_RESIDUAL_CHARS: usize = 20;

/// Block-list terms with their substitutions, longest variants first
const BLOCK_LIST: &[(&str, &str)] = &[
    ("large language model", "interviewer"),
    ("language model", "interviewer"),
    ("ai assistant", "interviewer"),
    ("ai model", "interviewer"),
    ("as an ai", "as your interviewer"),
    ("google deepmind", "our team"),
    ("deepmind", "our team"),
    ("openai", "our team"),
    ("anthropic", "our team"),
    ("mistral ai", "our team"),
    ("meta ai", "our team"),
    ("chatgpt", "your interviewer"),
    ("gpt-4o", "your interviewer"),
    ("gpt-4", "your interviewer"),
    ("gpt-3.5", "your interviewer"),
    ("claude", "your interviewer"),
    ("gemini", "your interviewer"),
    ("bard", "your interviewer"),
    ("llama", "your interviewer"),
];

/// Self-disclosure statements; a sentence matching any of these is removed
const DISCLOSURE_PATTERNS: &[&str] = &[
    r"(?i)\bi(?:['’]m|\s+am)\s+(?:just\s+|only\s+)?(?:an?\s+)?(?:ai|artificial intelligence|chatbot|bot|virtual assistant|language model|large language model)\b",
    r"(?i)\bpowered\s+by\s+\w+",
    r"(?i)\b(?:built|created|developed|trained|made)\s+by\s+(?:openai|anthropic|google|meta|mistral)\b",
    r"(?i)\bmy\s+(?:underlying\s+)?(?:model|training data|creators?)\b",
];

/// Direct questions about who or what the interviewer is
const IDENTITY_PATTERNS: &[&str] = &[
    r"(?i)\bare\s+you\s+(?:an?\s+)?(?:ai|bot|robot|machine|human|real person|chatbot|chatgpt|gpt)\b",
    r"(?i)\bwho\s+(?:made|created|built|trained|programmed|developed)\s+you\b",
    r"(?i)\bwhat\s+(?:ai|model|llm|language model)\s+(?:are\s+you|is\s+this|do\s+you\s+use)\b",
    r"(?i)\bwhich\s+(?:ai|model|llm|company)\s+(?:are\s+you|is\s+this|powers\s+you|made\s+you)\b",
    r"(?i)\bwhat(?:['’]s|\s+is)\s+your\s+(?:underlying\s+)?(?:model|architecture)\b",
    r"(?i)\bare\s+you\s+(?:powered|built|made)\s+by\b",
];

fn compile_pattern(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Never matches
        Err(_) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(e) => panic!("hardcoded fallback regex must compile: {e}"),
        },
    }
}

static BLOCK_REGEXES: Lazy<Vec<(Regex, &'static str, &'static str)>> = Lazy::new(|| {
    BLOCK_LIST
        .iter()
        .map(|(term, replacement)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            (compile_pattern(&pattern), *term, *replacement)
        })
        .collect()
});

static DISCLOSURE_REGEXES: Lazy<Vec<Regex>> =
    Lazy::new(|| DISCLOSURE_PATTERNS.iter().map(|p| compile_pattern(p)).collect());

static IDENTITY_REGEXES: Lazy<Vec<Regex>> =
    Lazy::new(|| IDENTITY_PATTERNS.iter().map(|p| compile_pattern(p)).collect());

/// Result of a forbidden-content scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub found: bool,
    /// Matched terms, lower-cased, first occurrence order
    pub terms: Vec<String>,
}

/// What `filter_response` did to a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Unchanged,
    Rewritten,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    pub text: String,
    pub action: FilterAction,
    pub terms: Vec<String>,
}

impl FilterResult {
    pub fn is_modified(&self) -> bool {
        self.action != FilterAction::Unchanged
    }
}

/// Case-insensitive scan against the block-list and disclosure patterns
pub fn detect_forbidden_content(text: &str) -> Detection {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |term: String| {
        if !terms.contains(&term) {
            terms.push(term);
        }
    };

    for (regex, term, _) in BLOCK_REGEXES.iter() {
        if regex.is_match(text) {
            push(term.to_string());
        }
    }
    for regex in DISCLOSURE_REGEXES.iter() {
        for found in regex.find_iter(text) {
            push(found.as_str().to_lowercase());
        }
    }

    Detection {
        found: !terms.is_empty(),
        terms,
    }
}

pub fn is_identity_question(text: &str) -> bool {
    IDENTITY_REGEXES.iter().any(|regex| regex.is_match(text))
}

/// Make a candidate response safe to speak
///
/// An identity question always gets the neutral sentence. Otherwise clean
/// text passes through; tainted text loses its self-disclosure sentences and
/// has block-list terms substituted, falling back to the neutral sentence
/// when too little survives.
pub fn filter_response(text: &str, originating_question: Option<&str>) -> FilterResult {
    let detection = detect_forbidden_content(text);

    if originating_question.is_some_and(is_identity_question) {
        return neutral(detection.terms);
    }
    if !detection.found {
        return FilterResult {
            text: text.to_string(),
            action: FilterAction::Unchanged,
            terms: Vec::new(),
        };
    }

    let kept: Vec<&str> = split_sentences(text)
        .into_iter()
        .filter(|sentence| !DISCLOSURE_REGEXES.iter().any(|r| r.is_match(sentence)))
        .collect();
    let rewritten = substitute_terms(&kept.join(" "));
    let residual = rewritten.trim();

    if residual.chars().count() < MIN_RESIDUAL_CHARS {
        return neutral(detection.terms);
    }

    FilterResult {
        text: residual.to_string(),
        action: FilterAction::Rewritten,
        terms: detection.terms,
    }
}

fn neutral(terms: Vec<String>) -> FilterResult {
    FilterResult {
        text: NEUTRAL_RESPONSE.to_string(),
        action: FilterAction::Neutral,
        terms,
    }
}

fn substitute_terms(text: &str) -> String {
    BLOCK_REGEXES
        .iter()
        .fold(text.to_string(), |acc, (regex, _, replacement)| {
            regex.replace_all(&acc, *replacement).into_owned()
        })
}

/// Split after `.`, `!` or `?` followed by whitespace; terminators stay attached
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next, n)) = chars.peek() {
                if n.is_whitespace() {
                    let sentence = text[start..i + c.len_utf8()].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = next;
                }
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
