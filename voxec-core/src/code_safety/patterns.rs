//! Regex rule table for dangerous constructs.
//!
//! A fixed, ordered list of (pattern, severity, description, suggestion)
//! records scanned case-insensitively over the whole source. Every match
//! anywhere in the source yields its own violation; the table is data, not
//! code, so rules are trivially testable and extensible.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::{Severity, Violation};

/// One entry of the dangerous-pattern table.
pub struct PatternRule {
    pub regex: Regex,
    pub severity: Severity,
    pub description: &'static str,
    pub suggestion: &'static str,
}

impl PatternRule {
    fn new(
        pattern: &str,
        severity: Severity,
        description: &'static str,
        suggestion: &'static str,
    ) -> Self {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .expect("invalid dangerous-pattern rule");
        Self {
            regex,
            severity,
            description,
            suggestion,
        }
    }
}

/// The rule table, ordered critical to low.
pub static PATTERN_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    vec![
        PatternRule::new(
            r"\b(exec|eval)\s*\(",
            Severity::Critical,
            "dynamic code execution",
            "avoid exec() and eval()",
        ),
        PatternRule::new(
            r"\b__import__\s*\(",
            Severity::Critical,
            "dynamic import",
            "use a plain import statement",
        ),
        PatternRule::new(
            r"\bcompile\s*\(",
            Severity::Critical,
            "runtime code compilation",
            "avoid compiling code at runtime",
        ),
        PatternRule::new(
            r#"\bgetattr\s*\([^,]+,\s*["'][^"']*__[^"']*["']"#,
            Severity::Critical,
            "reflective access to private attributes",
            "avoid reaching for dunder attributes via getattr",
        ),
        PatternRule::new(
            r"\bos\.system\s*\(",
            Severity::High,
            "system command execution",
            "shelling out is not allowed here",
        ),
        PatternRule::new(
            r"\bsubprocess\.(call|run|Popen)",
            Severity::High,
            "subprocess invocation",
            "spawning processes is not allowed here",
        ),
        PatternRule::new(
            r#"\bopen\s*\([^)]*["'][^"']*\.\.[^"']*["']"#,
            Severity::High,
            "path traversal in file open",
            "avoid .. segments in file paths",
        ),
        PatternRule::new(
            r"\bpickle\.(loads?|dumps?)\s*\(",
            Severity::High,
            "pickle deserialization",
            "pickle can execute arbitrary code",
        ),
        PatternRule::new(
            r"\b(input|raw_input)\s*\(",
            Severity::High,
            "interactive input",
            "there is no interactive console in a voice session",
        ),
        PatternRule::new(
            r"\bimport\s+(os|sys|subprocess|socket|urllib|requests)",
            Severity::Medium,
            "import of a process or network module",
            "review whether this module is needed",
        ),
        PatternRule::new(
            r"\bfile\s*\(",
            Severity::Medium,
            "legacy file() builtin",
            "use open() instead of file()",
        ),
        PatternRule::new(
            r"\bglobals\s*\(\)",
            Severity::Medium,
            "global namespace introspection",
            "avoid touching the global namespace",
        ),
        PatternRule::new(
            r"\blocals\s*\(\)",
            Severity::Medium,
            "local namespace introspection",
            "avoid namespace manipulation",
        ),
        PatternRule::new(
            r"\bdel\s+",
            Severity::Low,
            "variable deletion",
            "consider whether deletion is necessary",
        ),
        PatternRule::new(
            r"\b(exit|quit)\s*\(",
            Severity::Low,
            "program termination call",
            "let the snippet run to completion instead",
        ),
    ]
});

/// Scan the source against every rule in table order.
pub fn analyze(source: &str) -> Vec<Violation> {
    let lines: Vec<&str> = source.lines().collect();
    let mut violations = Vec::new();

    for rule in PATTERN_RULES.iter() {
        for matched in rule.regex.find_iter(source) {
            let line = source[..matched.start()].matches('\n').count() + 1;
            let snippet = lines
                .get(line - 1)
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| matched.as_str().to_string());

            violations.push(Violation {
                kind: "pattern_match".to_string(),
                severity: rule.severity,
                description: rule.description.to_string(),
                snippet,
                line: Some(line),
                suggestion: Some(rule.suggestion.to_string()),
            });
        }
    }

    violations
}
