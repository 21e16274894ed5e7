//! Syntax-tree inspection pass.
//!
//! Parses the snippet with tree-sitter-python and walks every node looking
//! for calls to dynamic-execution primitives and for dunder attribute
//! access. Best-effort: if the parser yields no tree the pass returns no
//! findings and the regex/import passes still run; `ERROR` nodes in a
//! partial tree do not abort the walk.

use std::sync::Mutex;
use std::sync::OnceLock;

use tree_sitter::Node;

use super::{Severity, Violation};

/// Builtins that execute or compile code at runtime.
const DYNAMIC_EXECUTION_PRIMITIVES: &[&str] = &["exec", "eval", "compile", "__import__"];

/// Lazy-initialized tree-sitter python parser (wrapped in Mutex for mutation)
static PYTHON_PARSER: OnceLock<Mutex<tree_sitter::Parser>> = OnceLock::new();

fn get_python_parser() -> &'static Mutex<tree_sitter::Parser> {
    PYTHON_PARSER.get_or_init(|| {
        let mut parser = tree_sitter::Parser::new();
        let lang: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&lang)
            .expect("Failed to load python grammar");
        Mutex::new(parser)
    })
}

/// Walk the syntax tree of `source` and report dangerous constructs.
pub fn analyze(source: &str) -> Vec<Violation> {
    let parser_guard = get_python_parser();
    let mut parser = match parser_guard.lock() {
        Ok(parser) => parser,
        Err(poisoned) => poisoned.into_inner(),
    };

    let Some(tree) = parser.parse(source, None) else {
        tracing::debug!("python parse produced no tree, skipping syntax pass");
        return Vec::new();
    };

    let lines: Vec<&str> = source.lines().collect();
    let mut violations = Vec::new();
    collect_violations(tree.root_node(), source, &lines, &mut violations);
    violations
}

fn collect_violations(node: Node, source: &str, lines: &[&str], out: &mut Vec<Violation>) {
    match node.kind() {
        "call" => {
            if let Some(function) = node.child_by_field_name("function")
                && function.kind() == "identifier"
                && let Ok(name) = function.utf8_text(source.as_bytes())
                && DYNAMIC_EXECUTION_PRIMITIVES.contains(&name)
            {
                out.push(violation_at(
                    node,
                    lines,
                    "dangerous_function",
                    Severity::Critical,
                    format!("use of dangerous function: {name}"),
                    Some(format!("avoid calling {name}() in voice-submitted code")),
                ));
            }
        }
        "attribute" => {
            if let Some(attribute) = node.child_by_field_name("attribute")
                && let Ok(name) = attribute.utf8_text(source.as_bytes())
                && name.starts_with("__")
                && name.ends_with("__")
            {
                out.push(violation_at(
                    node,
                    lines,
                    "private_access",
                    Severity::High,
                    format!("access to private attribute: {name}"),
                    Some("avoid touching dunder attributes".to_string()),
                ));
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_violations(child, source, lines, out);
    }
}

fn violation_at(
    node: Node,
    lines: &[&str],
    kind: &str,
    severity: Severity,
    description: String,
    suggestion: Option<String>,
) -> Violation {
    let row = node.start_position().row;
    let snippet = lines.get(row).map(|l| l.trim().to_string()).unwrap_or_default();

    Violation {
        kind: kind.to_string(),
        severity,
        description,
        snippet,
        line: Some(row + 1),
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_call_is_dangerous_function() {
        let violations = analyze("eval('1 + 1')");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "dangerous_function");
        assert_eq!(violations[0].severity, Severity::Critical);
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn exec_compile_and_dunder_import_are_flagged() {
        for source in ["exec('x')", "compile('x', 'f', 'exec')", "__import__('os')"] {
            let violations = analyze(source);
            assert!(
                violations.iter().any(|v| v.kind == "dangerous_function"),
                "expected a finding for {source}"
            );
        }
    }

    #[test]
    fn dunder_attribute_access_is_private_access() {
        let violations = analyze("x.__dict__");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "private_access");
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn method_call_named_eval_on_object_is_not_flagged() {
        // my_obj.eval(...) is an attribute call, not the builtin.
        assert!(analyze("model.eval()").is_empty());
    }

    #[test]
    fn nested_call_is_found() {
        let violations = analyze("def f():\n    return eval('2')\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(2));
        assert_eq!(violations[0].snippet, "return eval('2')");
    }

    #[test]
    fn garbage_input_does_not_panic() {
        let violations = analyze("@@@ not python at all (((");
        assert!(violations.is_empty());
    }

    #[test]
    fn clean_code_has_no_findings() {
        assert!(analyze("total = sum(range(10))\nprint(total)").is_empty());
    }
}
