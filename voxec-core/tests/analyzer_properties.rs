//! Analyzer-wide properties: the guarantees the execution gate relies on.

use proptest::prelude::*;
use voxec_core::{CodeSecurityAnalyzer, Severity};

#[test]
fn every_dynamic_execution_primitive_is_critical() {
    let analyzer = CodeSecurityAnalyzer::new();
    let samples = [
        "exec('x = 1')",
        "eval('2 + 2')",
        "compile('pass', '<s>', 'exec')",
        "__import__('math')",
        "result = eval(user_input)",
        "if ok:\n    exec(payload)",
    ];

    for source in samples {
        let violations = analyzer.analyze(source);
        assert!(
            violations.iter().any(|v| v.severity == Severity::Critical),
            "expected a critical finding for {source:?}"
        );
    }
}

#[test]
fn every_blocked_module_import_is_critical() {
    let analyzer = CodeSecurityAnalyzer::new();
    for module in ["os", "sys", "subprocess", "socket", "pickle", "ctypes"] {
        let source = format!("import {module}");
        let violations = analyzer.analyze(&source);
        assert!(
            violations
                .iter()
                .any(|v| v.kind == "blocked_import" && v.severity == Severity::Critical),
            "expected a blocked_import finding for {source:?}"
        );
    }
}

#[test]
fn unknown_module_import_is_exactly_one_medium_finding() {
    let analyzer = CodeSecurityAnalyzer::new();
    for module in ["numpy", "pandas", "requestz", "mymodule"] {
        let source = format!("import {module}");
        let violations = analyzer.analyze(&source);
        assert_eq!(violations.len(), 1, "for {source:?}");
        assert_eq!(violations[0].kind, "unknown_import");
        assert_eq!(violations[0].severity, Severity::Medium);
    }
}

#[test]
fn safe_module_imports_are_clean() {
    let analyzer = CodeSecurityAnalyzer::new();
    for module in ["math", "json", "itertools", "statistics"] {
        let source = format!("import {module}");
        assert!(
            analyzer.analyze(&source).is_empty(),
            "expected no findings for {source:?}"
        );
    }
}

proptest! {
    // Identical source must always produce the identical violation list;
    // the gate's determinism depends on it.
    #[test]
    fn analyzer_is_idempotent(source in ".{0,300}") {
        let analyzer = CodeSecurityAnalyzer::new();
        let first = analyzer.analyze(&source);
        let second = analyzer.analyze(&source);
        prop_assert_eq!(first, second);
    }

    // Arbitrary single-line text must never flag a critical finding unless
    // it actually names a dangerous construct.
    #[test]
    fn benign_identifiers_are_never_critical(name in "[a-z][a-z0-9]{0,12}") {
        prop_assume!(!["exec", "eval", "compile"].contains(&name.as_str()));
        let analyzer = CodeSecurityAnalyzer::new();
        let source = format!("{name} = 1");
        let criticals = analyzer
            .analyze(&source)
            .into_iter()
            .filter(|v| v.severity == Severity::Critical)
            .count();
        prop_assert_eq!(criticals, 0);
    }
}
