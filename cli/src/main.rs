//! Thin binary shell around `warden-core`: reads `ToolCall` JSON lines from
//! stdin, evaluates each one, and writes an `ApprovalResult` (or a
//! structured error payload) as a JSON line to stdout.
//!
//! Standing in for the LLM-client collaborator that would otherwise drive
//! this loop, the same way the teacher workspace's `cli` crate is a thin
//! shell around its own engine crate.

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use warden_core::evaluator::{self, EvalError, MatchArgument};
use warden_core::GateConfig;
use warden_types::{ErrorPayload, ToolCall};

#[derive(Debug, Parser)]
#[command(name = "warden", about = "Approval-gate policy engine")]
struct Cli {
    #[command(flatten)]
    gate: warden_config::GateCliArgs,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}

fn install_interrupt_handler() -> Arc<AtomicBool> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    // `ctrlc`'s handler runs signal-adjacent code; setting an atomic flag is
    // the one thing it's safe to do here (spec §4.1.2, §5).
    if let Err(err) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!(error = %err, "failed to install interrupt handler");
    }
    interrupt
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = warden_config::load(cli.gate.config_path.as_deref());
    warden_config::apply_cli_overrides(&mut config, &cli.gate)
        .context("invalid --allow / --allow-category flag")?;

    let interrupt = install_interrupt_handler();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let stdout = std::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading a line from stdin")? {
        if interrupt.load(Ordering::SeqCst) {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => evaluate_one(&mut config, &call, &interrupt).await,
            Err(err) => serde_json::json!({
                "error": "invalid_tool_call",
                "message": err.to_string(),
            }),
        };

        let mut handle = stdout.lock();
        serde_json::to_writer(&mut handle, &output).context("writing result line")?;
        handle.write_all(b"\n").context("writing result line")?;
    }

    Ok(())
}

async fn evaluate_one(
    config: &mut GateConfig,
    call: &ToolCall,
    interrupt: &Arc<AtomicBool>,
) -> serde_json::Value {
    match evaluator::evaluate(config, call, MatchArgument::default(), interrupt).await {
        Ok(result) => serde_json::json!({ "result": result }),
        Err(EvalError::NoPromptSurface) => ErrorPayload::OperationDenied {
            message: "no terminal or subagent channel available to prompt on".to_string(),
        }
        .to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_read_call_is_allowed_without_a_terminal() {
        let mut config = GateConfig::new();
        let interrupt = Arc::new(AtomicBool::new(false));
        let call = ToolCall::new("1", "read_file", r#"{"path":"/tmp/x"}"#);
        let output = evaluate_one(&mut config, &call, &interrupt).await;
        assert_eq!(output["result"], "allowed");
    }

    #[tokio::test]
    async fn shell_call_with_no_prompt_surface_reports_operation_denied() {
        let mut config = GateConfig::new();
        let interrupt = Arc::new(AtomicBool::new(false));
        let call = ToolCall::new("1", "shell", r#"{"command":"rm -rf /"}"#);
        let output = evaluate_one(&mut config, &call, &interrupt).await;
        assert_eq!(output["error"], "operation_denied");
    }

    #[test]
    fn yolo_flag_parses_alongside_repeated_allow_flags() {
        let cli = Cli::parse_from([
            "warden",
            "--yolo",
            "--allow",
            "read_file:^/tmp/.*$",
            "--allow-category",
            "network",
        ]);
        assert!(cli.gate.yolo);
        assert_eq!(cli.gate.allow, vec!["read_file:^/tmp/.*$".to_string()]);
        assert_eq!(cli.gate.allow_category, vec!["network".to_string()]);
    }
}
