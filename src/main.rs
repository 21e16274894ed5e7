//! voxec - voice-triggered code execution guard
//!
//! Thin binary entry point: parses an utterance, runs the security
//! pipeline, and delegates execution to a local `python3` subprocess
//! standing in for the real sandbox collaborator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use voxec_core::{
    CodeIntent, CodeSecurityAnalyzer, SecureExecutor, SessionIdentity, VoxecConfig,
    parse_voice_input, speech,
};

mod runner;

use runner::PythonProcessRunner;

#[derive(Parser)]
#[command(name = "voxec", version, about = "Voice-triggered code execution guard")]
struct Cli {
    /// Path to voxec.toml; defaults to ./voxec.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a code request from a voice utterance and print it as JSON.
    Parse { utterance: String },

    /// Run the security analyzer over source text and print the findings.
    Analyze { source: String },

    /// Drive the full pipeline: parse, analyze, gate, and execute.
    Run {
        utterance: String,

        /// Session identifier reported to the monitor.
        #[arg(long, default_value = "cli-session")]
        session: String,

        /// Optional user identifier; rate limits key on it when present.
        #[arg(long)]
        user: Option<String>,

        /// Interpreter the demo sandbox adapter invokes.
        #[arg(long, default_value = "python3")]
        interpreter: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = VoxecConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Parse { utterance } => handle_parse(&utterance),
        Commands::Analyze { source } => handle_analyze(&config, &source),
        Commands::Run {
            utterance,
            session,
            user,
            interpreter,
        } => handle_run(config, &utterance, session, user, interpreter).await,
    }
}

fn handle_parse(utterance: &str) -> Result<()> {
    match parse_voice_input(utterance) {
        Some(request) => {
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        None => {
            println!("not a code request");
            Ok(())
        }
    }
}

fn handle_analyze(config: &VoxecConfig, source: &str) -> Result<()> {
    let analyzer = CodeSecurityAnalyzer::with_allowed_imports(&config.limits.allowed_imports);
    let violations = analyzer.analyze(source);

    if violations.is_empty() {
        println!("no violations");
    } else {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    }
    Ok(())
}

async fn handle_run(
    config: VoxecConfig,
    utterance: &str,
    session: String,
    user: Option<String>,
    interpreter: String,
) -> Result<()> {
    let Some(request) = parse_voice_input(utterance) else {
        println!("not a code request");
        return Ok(());
    };

    tracing::info!(
        intent = request.intent.as_str(),
        confidence = request.confidence,
        "parsed code request"
    );

    if request.intent == CodeIntent::Explain {
        println!("{}", speech::explain_response(&request));
        return Ok(());
    }

    let runner = Arc::new(PythonProcessRunner::new(interpreter));
    let executor = SecureExecutor::new(config, runner);
    let identity = SessionIdentity::new(session, user);

    let outcome = executor
        .secure_execute(&request.extracted_code, &identity)
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    println!();
    println!("{}", speech::execution_response(&request, &outcome));

    Ok(())
}
