//! Voice intent parsing.
//!
//! Turns a raw voice-transcribed utterance into a structured code-execution
//! request: the candidate source text, the classified intent, and an
//! advisory confidence score. Extraction is layered: explicit execution
//! templates first, then code fences, then structural single-line
//! heuristics over the voice-normalized text, and finally a whole-utterance
//! fallback when the text itself reads like code.

pub mod normalize;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub use normalize::clean_code;

/// What the speaker wants done with the extracted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeIntent {
    Execute,
    Explain,
    Debug,
    Modify,
}

impl CodeIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Explain => "explain",
            Self::Debug => "debug",
            Self::Modify => "modify",
        }
    }
}

/// A structured code-execution request extracted from one utterance.
///
/// Immutable once created. `confidence` is advisory metadata only and never
/// gates execution.
#[derive(Debug, Clone, Serialize)]
pub struct CodeRequest {
    /// The lowercased, trimmed utterance the request was extracted from.
    pub original_text: String,
    /// Candidate source after voice-artifact normalization. Never empty.
    pub extracted_code: String,
    pub intent: CodeIntent,
    /// Fixed for this system; kept for forward compatibility of consumers.
    pub language: &'static str,
    /// Extraction confidence in [0, 1].
    pub confidence: f32,
}

/// Cheap negative filter: an utterance without any of these substrings is
/// never a code request.
const CODE_INDICATORS: &[&str] = &[
    "run", "execute", "eval", "python", "code", "script", "print", "def", "for", "if", "import",
    "=", "()", "[]",
];

const EXPLAIN_KEYWORDS: &[&str] = &["explain", "what does", "how does", "describe"];
const DEBUG_KEYWORDS: &[&str] = &["debug", "fix", "error", "problem", "issue"];
const MODIFY_KEYWORDS: &[&str] = &["change", "modify", "update", "alter", "improve"];

/// "run/execute/python: <code>" style templates, tried against the raw
/// lowercased utterance before anything else.
static EXECUTION_TEMPLATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)(?:run|execute|eval(?:uate)?)\s+(?:this\s+)?(?:python\s+)?code[:\s]*(.+)",
        r"(?s)(?:can you|please)\s+(?:run|execute)\s+(.+)",
        r"(?s)execute[:\s]+(.+)",
        r"(?s)run[:\s]+(.+)",
        r"(?s)python[:\s]+(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid execution template"))
    .collect()
});

/// Fenced and inline backtick code blocks.
static FENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?s)```(?:python)?\s*\n?(.*?)\n?```", r"`([^`]+)`"]
        .iter()
        .map(|p| Regex::new(p).expect("invalid fence pattern"))
        .collect()
});

/// Single-line structural heuristics, tried against the voice-normalized
/// text: assignment, print call, loop/branch headers, function definition.
static LINE_HEURISTICS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:^|\s)([a-zA-Z_][a-zA-Z0-9_]*\s*=.+)",
        r"(?:^|\s)(print\s*\(.+\))",
        r"(?:^|\s)(for\s+.+:)",
        r"(?:^|\s)(if\s+.+:)",
        r"(?:^|\s)(def\s+[a-zA-Z_][a-zA-Z0-9_]*\s*\(.+\):)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid line heuristic"))
    .collect()
});

/// Whole-text structural indicators for the fallback path.
static STRUCTURE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[a-zA-Z_][a-zA-Z0-9_]*\s*=",
        r"print\s*\(",
        r"def\s+[a-zA-Z_]",
        r"for\s+.+\s+in\s+",
        r"if\s+.+:",
        r"import\s+[a-zA-Z_]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid structure pattern"))
    .collect()
});

static PRINT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"print\s*\(").expect("invalid regex"));
static ASSIGN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z_][a-zA-Z0-9_]*\s*=").expect("invalid regex"));
static DEF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"def\s+[a-zA-Z_]").expect("invalid regex"));

/// Parse one utterance into a code request, or `None` when the text does
/// not ask for anything code-related or no candidate source can be
/// extracted.
pub fn parse_voice_input(input: &str) -> Option<CodeRequest> {
    let text = input.trim().to_lowercase();

    if !is_code_request(&text) {
        return None;
    }

    let intent = classify_intent(&text);
    let extracted_code = extract_code(&text)?;

    if extracted_code.is_empty() {
        return None;
    }

    let confidence = confidence_score(&text, &extracted_code, intent);

    Some(CodeRequest {
        original_text: text,
        extracted_code,
        intent,
        language: "python",
        confidence,
    })
}

fn is_code_request(text: &str) -> bool {
    CODE_INDICATORS.iter().any(|needle| text.contains(needle))
}

/// Keyword groups are checked in priority order; execution is the default
/// when nothing more specific matches.
fn classify_intent(text: &str) -> CodeIntent {
    if EXPLAIN_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        CodeIntent::Explain
    } else if DEBUG_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        CodeIntent::Debug
    } else if MODIFY_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        CodeIntent::Modify
    } else {
        CodeIntent::Execute
    }
}

fn extract_code(text: &str) -> Option<String> {
    for template in EXECUTION_TEMPLATES.iter() {
        if let Some(captures) = template.captures(text) {
            let candidate = captures.get(1)?.as_str().trim();
            return Some(clean_code(candidate));
        }
    }

    for fence in FENCE_PATTERNS.iter() {
        if let Some(captures) = fence.captures(text) {
            let candidate = captures.get(1)?.as_str().trim();
            return Some(clean_code(candidate));
        }
    }

    // Spoken utterances carry no literal symbols, so the structural
    // heuristics run over the voice-normalized form.
    let normalized = clean_code(text);

    for heuristic in LINE_HEURISTICS.iter() {
        if let Some(captures) = heuristic.captures(&normalized) {
            let candidate = captures.get(1)?.as_str().trim();
            return Some(candidate.to_string());
        }
    }

    if looks_like_code(&normalized) {
        return Some(normalized);
    }

    None
}

fn looks_like_code(text: &str) -> bool {
    STRUCTURE_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Weighted extraction confidence, capped at 1.0. Advisory only.
fn confidence_score(text: &str, code: &str, intent: CodeIntent) -> f32 {
    let mut confidence: f32 = 0.0;

    if intent == CodeIntent::Execute {
        confidence += 0.3;
    }

    if PRINT_PATTERN.is_match(code) {
        confidence += 0.2;
    }
    if ASSIGN_PATTERN.is_match(code) {
        confidence += 0.2;
    }
    if DEF_PATTERN.is_match(code) {
        confidence += 0.3;
    }

    if text.contains('`') {
        confidence += 0.4;
    }

    if ["run", "execute", "eval", "python"]
        .iter()
        .any(|kw| text.contains(kw))
    {
        confidence += 0.2;
    }

    confidence.min(1.0)
}
