//! Normalization of voice-to-text artifacts in candidate code.
//!
//! Speech recognizers spell punctuation out ("x equals 5 period print open
//! paren x close paren"); this module maps the spoken tokens back to their
//! literal symbols and fixes the incidental spacing the substitution leaves
//! behind.

use once_cell::sync::Lazy;
use regex::Regex;

/// A spoken-token substitution applied to extracted code.
struct TokenRule {
    pattern: Regex,
    replacement: &'static str,
}

impl TokenRule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("invalid token rule"),
            replacement,
        }
    }
}

/// Punctuation words consume adjacent whitespace so `5 period print`
/// becomes `5.print`; operator and delimiter words substitute in place and
/// leave spacing to the collapse rules below.
static TOKEN_RULES: Lazy<Vec<TokenRule>> = Lazy::new(|| {
    vec![
        TokenRule::new(r"(?i)\s*\b(?:period|dot)\b\s*", "."),
        TokenRule::new(r"(?i)\s*\bcomma\b\s*", ","),
        TokenRule::new(r"(?i)\s*\bcolon\b\s*", ":"),
        TokenRule::new(r"(?i)\s*\bsemicolon\b\s*", ";"),
        TokenRule::new(r"(?i)\bequals\b", "="),
        TokenRule::new(r"(?i)\bplus\b", "+"),
        TokenRule::new(r"(?i)\bminus\b", "-"),
        TokenRule::new(r"(?i)\b(?:open paren|left paren)\b", "("),
        TokenRule::new(r"(?i)\b(?:close paren|right paren)\b", ")"),
        TokenRule::new(r"(?i)\b(?:open bracket|left bracket)\b", "["),
        TokenRule::new(r"(?i)\b(?:close bracket|right bracket)\b", "]"),
        TokenRule::new(r"(?i)\b(?:quote|quotes)\b", "\""),
    ]
});

static COLLAPSE_ASSIGN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*=\s*").expect("invalid regex"));
static COLLAPSE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\s*").expect("invalid regex"));
static COLLAPSE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\)\s*").expect("invalid regex"));
static COLLAPSE_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").expect("invalid regex"));

/// Map spoken punctuation/operator tokens to literal symbols and collapse
/// the incidental whitespace around `=`, `(`, `)` and `,`.
///
/// Idempotent: applying it to already-clean code is a no-op.
pub fn clean_code(text: &str) -> String {
    let mut code = text.to_string();

    for rule in TOKEN_RULES.iter() {
        code = rule.pattern.replace_all(&code, rule.replacement).into_owned();
    }

    code = COLLAPSE_ASSIGN.replace_all(&code, "=").into_owned();
    code = COLLAPSE_OPEN.replace_all(&code, "(").into_owned();
    code = COLLAPSE_CLOSE.replace_all(&code, ")").into_owned();
    code = COLLAPSE_COMMA.replace_all(&code, ", ").into_owned();

    code.trim().to_string()
}
