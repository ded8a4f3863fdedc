//! `gymcoach ask`: one coach turn, with optional proposal confirmation.

use gymcoach_agent::{AgentStreamEvent, Coach, Proposal, RepairOutcome, TurnRequest, TurnResult};
use gymcoach_config::CoachConfig;
use gymcoach_contracts::ResponseMode;
use gymcoach_providers::OpenAiCompatProvider;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct AskArgs {
    pub message: String,
    pub mode: Option<String>,
    pub no_context: bool,
    pub enable_writes: bool,
    pub yes: bool,
    pub json: bool,
    pub data: Option<PathBuf>,
}

pub async fn run(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    // Check for API key early so the error is clear
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GYMCOACH_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", CoachConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let mode = args.mode.as_deref().map(str::parse::<ResponseMode>).transpose()?;
    let store = super::load_store(args.data.as_deref())?;
    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    config.agent.stream &= !args.json;
    let stream = config.agent.stream;
    let coach = Coach::new(provider, store, config)?;

    let mut request = TurnRequest::new(args.message).with_write_tools(args.enable_writes);
    request.mode = mode;
    if args.no_context {
        request = request.without_context();
    }

    let (tx, rx) = mpsc::channel(64);
    let printer = tokio::spawn(print_events(rx, stream));
    let result = coach.run_turn(request, Some(tx)).await;
    let streamed = printer.await.unwrap_or_default();
    let mut result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, &streamed);
    }

    for proposal in &mut result.pending_proposals {
        settle(&coach, proposal, args.yes).await?;
    }
    Ok(())
}

/// Progress goes to stderr; with streaming on, answer deltas go to stdout.
/// Returns whatever was streamed.
async fn print_events(mut rx: mpsc::Receiver<AgentStreamEvent>, stream: bool) -> String {
    let mut streamed = String::new();
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Delta { content } if stream => {
                print!("{content}");
                let _ = std::io::stdout().flush();
                streamed.push_str(&content);
            }
            AgentStreamEvent::ToolCall { name, .. } => eprintln!("  → {name}"),
            AgentStreamEvent::ToolResult { name, success: false, .. } => eprintln!("  ✗ {name} failed"),
            AgentStreamEvent::ProposalQueued { tool, summary, .. } => eprintln!("  ? {tool}: {summary}"),
            AgentStreamEvent::Repairing { mode, reason } => eprintln!("  ↻ fixing {mode} answer: {reason}"),
            AgentStreamEvent::Error { message } => eprintln!("  [Error] {message}"),
            _ => {}
        }
    }
    streamed
}

fn print_result(result: &TurnResult, streamed: &str) {
    // A repaired or enveloped answer differs from what was streamed.
    let changed = result.diagnostics.repair != RepairOutcome::NotNeeded || streamed.trim() != result.assistant_text.trim();
    if streamed.is_empty() {
        println!("{}", result.assistant_text);
    } else if changed {
        println!();
        println!();
        println!("{}", result.assistant_text);
    } else {
        println!();
    }

    if let Some(draft) = &result.action_draft {
        println!();
        println!("  Draft: {} ({}, confidence {:.2})", draft.title, draft.kind.as_str(), draft.confidence);
        if let Ok(payload) = serde_json::to_string_pretty(&draft.payload) {
            println!("{payload}");
        }
    }

    let d = &result.diagnostics;
    eprintln!();
    eprintln!(
        "  mode={} calls={} iterations={} repair={:?} context={}B fingerprint={}",
        d.mode,
        d.model_calls,
        d.loop_iterations,
        d.repair,
        d.snapshot.bytes,
        &result.fingerprint.hash[..12.min(result.fingerprint.hash.len())]
    );
}

async fn settle(coach: &Coach, proposal: &mut Proposal, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let confirmed = yes || prompt(&format!("  Apply \"{}\"? [y/N] ", proposal.summary))?;
    if !confirmed {
        proposal.cancel()?;
        println!("  Cancelled: {}", proposal.summary);
        return Ok(());
    }

    coach.confirm_proposal(proposal).await?;
    match &proposal.error {
        None => println!("  Applied: {}", proposal.summary),
        Some(e) => println!("  Failed: {} ({e})", proposal.summary),
    }
    Ok(())
}

fn prompt(question: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{question}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
