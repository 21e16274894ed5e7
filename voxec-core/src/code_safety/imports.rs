//! Import allow/block-list pass.
//!
//! Scans each line for `import X` / `from X import ...` forms, extracts the
//! root module name, and cross-references it against a fixed blocked set
//! (process, OS, network, serialization, and reflection-capable modules)
//! and a fixed safe set (pure computation, text, and data-structure
//! modules). Blocked roots are critical; roots in neither set are medium
//! "unknown_import" findings that need review but are not necessarily
//! malicious.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::{Severity, Violation};

/// Modules that can reach the OS, the network, other processes, or the
/// interpreter internals. Never importable, regardless of configuration.
static BLOCKED_IMPORTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "os",
        "sys",
        "subprocess",
        "socket",
        "urllib",
        "urllib2",
        "urllib3",
        "requests",
        "http",
        "ftplib",
        "smtplib",
        "telnetlib",
        "xmlrpc",
        "pickle",
        "cPickle",
        "marshal",
        "shelve",
        "dbm",
        "gdbm",
        "ctypes",
        "multiprocessing",
        "threading",
        "thread",
        "_thread",
        "importlib",
        "imp",
        "pkgutil",
        "modulefinder",
        "runpy",
        "code",
        "codeop",
        "py_compile",
        "compileall",
        "dis",
        "ast",
    ]
    .into_iter()
    .collect()
});

/// Pure-computation modules that are always fine to import.
static SAFE_IMPORTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "math",
        "random",
        "datetime",
        "time",
        "calendar",
        "json",
        "csv",
        "base64",
        "hashlib",
        "uuid",
        "collections",
        "itertools",
        "functools",
        "operator",
        "re",
        "string",
        "textwrap",
        "unicodedata",
        "decimal",
        "fractions",
        "statistics",
        "copy",
        "pprint",
        "reprlib",
    ]
    .into_iter()
    .collect()
});

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*import\s+([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)")
        .expect("invalid import pattern")
});

static FROM_IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*from\s+([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s+import")
        .expect("invalid from-import pattern")
});

/// Check every import line against the blocked and safe sets.
///
/// `extra_allowed` extends the safe set with configured pre-approved module
/// names; it never overrides the blocked set.
pub fn analyze(source: &str, extra_allowed: &HashSet<String>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let module = IMPORT_LINE
            .captures(line)
            .or_else(|| FROM_IMPORT_LINE.captures(line))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str());

        let Some(module) = module else { continue };
        let root = module.split('.').next().unwrap_or(module);

        if BLOCKED_IMPORTS.contains(root) {
            violations.push(Violation {
                kind: "blocked_import".to_string(),
                severity: Severity::Critical,
                description: format!("blocked import: {root}"),
                snippet: line.trim().to_string(),
                line: Some(index + 1),
                suggestion: Some(format!("importing {root} is not allowed")),
            });
        } else if !SAFE_IMPORTS.contains(root) && !extra_allowed.contains(root) {
            violations.push(Violation {
                kind: "unknown_import".to_string(),
                severity: Severity::Medium,
                description: format!("unknown or unverified import: {root}"),
                snippet: line.trim().to_string(),
                line: Some(index + 1),
                suggestion: Some(format!("importing {root} needs review")),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_extra() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn os_import_is_blocked() {
        let violations = analyze("import os", &no_extra());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "blocked_import");
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn from_import_uses_root_module() {
        let violations = analyze("from subprocess import run", &no_extra());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "blocked_import");
    }

    #[test]
    fn dotted_import_is_judged_by_root() {
        let violations = analyze("import os.path", &no_extra());
        assert_eq!(violations[0].kind, "blocked_import");
        assert_eq!(violations[0].description, "blocked import: os");
    }

    #[test]
    fn safe_import_is_clean() {
        assert!(analyze("import math\nfrom json import loads", &no_extra()).is_empty());
    }

    #[test]
    fn unfamiliar_import_is_medium() {
        let violations = analyze("import numpy", &no_extra());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "unknown_import");
        assert_eq!(violations[0].severity, Severity::Medium);
    }

    #[test]
    fn extra_allowance_covers_unknown_module() {
        let allowed: HashSet<String> = ["numpy".to_string()].into_iter().collect();
        assert!(analyze("import numpy", &allowed).is_empty());
    }

    #[test]
    fn extra_allowance_does_not_unblock() {
        let allowed: HashSet<String> = ["pickle".to_string()].into_iter().collect();
        let violations = analyze("import pickle", &allowed);
        assert_eq!(violations[0].kind, "blocked_import");
    }

    #[test]
    fn import_inside_expression_is_ignored() {
        // Only leading import statements count; the pattern pass handles
        // the rest.
        assert!(analyze("x = 'import os'", &no_extra()).is_empty());
    }

    #[test]
    fn line_numbers_are_recorded() {
        let violations = analyze("import math\nimport sys", &no_extra());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(2));
    }

    #[test]
    fn indented_import_is_still_checked() {
        let violations = analyze("def f():\n    import socket", &no_extra());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "blocked_import");
    }
}
