//! Voice-friendly rendering of execution results.
//!
//! Pure text shaping for the text-to-speech layer: acknowledge the
//! execution, read output back with symbols spelled out, soften Python
//! error noise, and lead with the most severe finding when the analyzer
//! had something to say. Nothing here influences gating.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::code_safety::{Severity, Violation};
use crate::exec::ExecutionOutcome;
use crate::intent::{CodeIntent, CodeRequest};

const MAX_SPOKEN_OUTPUT_CHARS: usize = 200;
const MAX_SPOKEN_ERROR_CHARS: usize = 150;

static FILE_LINE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"File ".*", line \d+"#).expect("invalid regex"));
static TRACEBACK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Traceback \(most recent call last\):").expect("invalid regex"));
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("invalid regex"));

/// Render a voice response for one execution outcome.
///
/// Critical findings produce a refusal message; non-critical findings on a
/// successful run are surfaced as a spoken warning before the output.
pub fn execution_response(request: &CodeRequest, outcome: &ExecutionOutcome) -> String {
    if let Some(critical) = outcome
        .violations
        .iter()
        .find(|v| v.severity == Severity::Critical)
    {
        return blocked_response(critical);
    }

    let warning = outcome
        .violations
        .iter()
        .filter(|v| v.severity >= Severity::Medium)
        .max_by_key(|v| v.severity);

    if outcome.success {
        success_response(request, outcome, warning)
    } else {
        error_response(&outcome.output)
    }
}

/// Heuristic explanation for `explain` intents, without running anything.
pub fn explain_response(request: &CodeRequest) -> String {
    debug_assert_eq!(request.intent, CodeIntent::Explain);

    let code = request.extracted_code.to_lowercase();
    let mut parts = vec!["Let me explain this code for you.".to_string()];

    if code.contains("print") {
        parts.push("It prints output to the screen.".to_string());
    }
    if code.contains('=') && !code.contains("==") {
        parts.push("It assigns values to variables.".to_string());
    }
    if code.contains("for") {
        parts.push("It iterates with a for loop.".to_string());
    }
    if code.contains("if") {
        parts.push("It branches on a condition.".to_string());
    }
    if code.contains("def") {
        parts.push("It defines one or more functions.".to_string());
    }

    parts.push("Would you like me to run it?".to_string());
    parts.join(" ")
}

fn blocked_response(critical: &Violation) -> String {
    let mut parts = vec![
        "I couldn't execute your code due to security concerns.".to_string(),
        format!("The main issue is: {}.", critical.description),
    ];
    if let Some(suggestion) = &critical.suggestion {
        parts.push(format!("{suggestion}."));
    }
    parts.join(" ")
}

fn success_response(
    request: &CodeRequest,
    outcome: &ExecutionOutcome,
    warning: Option<&Violation>,
) -> String {
    let mut parts = Vec::new();

    if let Some(warning) = warning {
        parts.push(
            "I executed your code successfully, but I noticed a security concern.".to_string(),
        );
        parts.push(format!("Warning: {}.", warning.description));
    } else if request.intent == CodeIntent::Execute {
        parts.push("I've executed your Python code successfully.".to_string());
    } else {
        parts.push("The code ran successfully.".to_string());
    }

    let output = outcome.output.trim();
    if output.is_empty() {
        parts.push("The code executed without producing any output.".to_string());
    } else {
        let mut spoken = output.to_string();
        if spoken.chars().count() > MAX_SPOKEN_OUTPUT_CHARS {
            spoken = spoken.chars().take(MAX_SPOKEN_OUTPUT_CHARS).collect();
            spoken.push_str("... and more");
        }
        parts.push(format!("The output is: {}", make_speech_friendly(&spoken)));
    }

    parts.join(" ")
}

fn error_response(error: &str) -> String {
    let mut parts = vec!["I encountered an error while executing your code.".to_string()];

    let simplified = simplify_error(error);
    if !simplified.is_empty() {
        parts.push(format!("The error is: {simplified}"));
    }

    let lowered = error.to_lowercase();
    if lowered.contains("syntax") {
        parts.push("This looks like a syntax error. Would you like help fixing the code?".to_string());
    } else if lowered.contains("name") && lowered.contains("not defined") {
        parts.push("A variable or function is used before it is defined.".to_string());
    } else {
        parts.push("Would you like me to help debug this?".to_string());
    }

    parts.join(" ")
}

/// Replace symbols with words so a speech synthesizer reads them sensibly.
pub fn make_speech_friendly(text: &str) -> String {
    let mut spoken = text.to_string();

    for (symbol, word) in [
        ("==", " equals "),
        ("!=", " not equals "),
        ("<=", " less than or equal to "),
        (">=", " greater than or equal to "),
        ("<", " less than "),
        (">", " greater than "),
        ("&&", " and "),
        ("||", " or "),
    ] {
        spoken = spoken.replace(symbol, word);
    }

    spoken = BARE_NUMBER.replace_all(&spoken, "number $1").into_owned();
    spoken = spoken.replace('_', " underscore ");
    spoken = spoken.replace('-', " dash ");

    spoken
}

/// Strip traceback noise from a Python error and cap its spoken length.
pub fn simplify_error(error: &str) -> String {
    let mut message = TRACEBACK_HEADER.replace_all(error, "").into_owned();
    message = FILE_LINE_NOISE
        .replace_all(&message, "In your code")
        .into_owned();

    for (class, softened) in [
        ("SyntaxError:", "Syntax error:"),
        ("NameError:", "Name error:"),
        ("TypeError:", "Type error:"),
        ("ValueError:", "Value error:"),
        ("IndentationError:", "Indentation error:"),
        ("ZeroDivisionError:", "Division by zero:"),
    ] {
        message = message.replace(class, softened);
    }

    let message = message.trim();
    if message.chars().count() > MAX_SPOKEN_ERROR_CHARS {
        let capped: String = message.chars().take(MAX_SPOKEN_ERROR_CHARS).collect();
        format!("{capped}...")
    } else {
        message.to_string()
    }
}
