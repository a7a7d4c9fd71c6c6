//! The policy evaluator's linear pipeline (spec §4.1).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;

use warden_types::{
    matches_shell_prefix, ApprovalResult, GateAction, GateCategory, ShellDialect, ToolCall,
};

use crate::config::GateConfig;
use crate::prompt::{self, PromptOutcome};
use crate::proxy;

/// The match-target argument name a tool can declare, resolved by the
/// caller before evaluation (spec §4.1.1: "if the tool declares a specific
/// argument name"). Tools without one match against the whole arguments
/// document.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchArgument<'a>(pub Option<&'a str>);

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("evaluator needed to prompt but this process owns neither a terminal nor a subagent channel")]
    NoPromptSurface,
}

/// Evaluate one tool call against `config`, returning one of the five
/// approval outcomes. Never contradicts an earlier positive match within
/// the same evaluation (spec §4.1 contract).
pub async fn evaluate(
    config: &mut GateConfig,
    call: &ToolCall,
    match_argument: MatchArgument<'_>,
    interrupt: &Arc<AtomicBool>,
) -> Result<ApprovalResult, EvalError> {
    // Step 1: master-enable (a `--yolo` run bypasses everything).
    if !config.master_enabled {
        tracing::debug!(tool = %call.name, "master-enable disabled, allowing unconditionally");
        return Ok(ApprovalResult::Allowed);
    }

    // Step 2: resolve category.
    let category = resolve_category(call);

    // Step 3: category action.
    match config.action_for(category) {
        GateAction::Allow => {
            tracing::info!(tool = %call.name, %category, outcome = "allowed", "category default");
            return Ok(ApprovalResult::Allowed);
        }
        GateAction::Deny => {
            tracing::info!(tool = %call.name, %category, outcome = "denied", "category default");
            return Ok(ApprovalResult::Denied);
        }
        GateAction::Gate => {}
    }

    // Step 4: allowlist match.
    if allowlist_matches(config, call, category, match_argument) {
        tracing::info!(tool = %call.name, %category, outcome = "allowed", "allowlist match");
        return Ok(ApprovalResult::Allowed);
    }

    // Step 5: rate limit.
    let now = SystemTime::now();
    if config.denial_tracker(&call.name).is_some_and(|t| t.is_rate_limited(now)) {
        tracing::info!(tool = %call.name, %category, outcome = "rate_limited", "");
        return Ok(ApprovalResult::RateLimited);
    }

    // Step 6: prompt, locally or via the subagent proxy.
    let outcome = prompt_for_decision(config, call, interrupt).await?;

    // Steps 7-8: update the denial tracker.
    match outcome {
        ApprovalResult::Denied => {
            config.denial_tracker_mut(&call.name).record_denial(now);
        }
        ApprovalResult::Allowed | ApprovalResult::AllowedAlways => {
            config.denial_tracker_mut(&call.name).reset();
        }
        ApprovalResult::Aborted | ApprovalResult::RateLimited => {}
    }

    tracing::info!(tool = %call.name, %category, ?outcome, "prompt result");
    Ok(outcome)
}

fn resolve_category(call: &ToolCall) -> GateCategory {
    let by_name = GateCategory::from_tool_name(&call.name);
    if by_name != GateCategory::Dynamic {
        return by_name;
    }
    // A dynamic tool may self-declare its category via a metadata
    // directive, honoured only when present and parseable.
    call.parsed_arguments()
        .as_ref()
        .and_then(|args| args.get("__gate_category"))
        .and_then(|v| v.as_str())
        .and_then(GateCategory::parse)
        .unwrap_or(GateCategory::Dynamic)
}

fn allowlist_matches(
    config: &GateConfig,
    call: &ToolCall,
    category: GateCategory,
    match_argument: MatchArgument<'_>,
) -> bool {
    if category == GateCategory::Shell {
        return shell_allowlist_matches(config, call);
    }

    let Some(target) = resolve_match_target(call, match_argument) else {
        // Parse failure: "no match" per spec §7 class 3, proceed to prompt.
        return false;
    };
    config
        .regex_allowlist()
        .iter()
        .filter(|entry| entry.tool == call.name)
        .any(|entry| entry.matches(&target))
}

fn resolve_match_target(call: &ToolCall, match_argument: MatchArgument<'_>) -> Option<String> {
    match match_argument.0 {
        Some(field) => call.argument_field(field),
        None => Some(call.arguments.clone()),
    }
}

fn shell_allowlist_matches(config: &GateConfig, call: &ToolCall) -> bool {
    let Some(command) = call.argument_field("command") else {
        return false;
    };
    let dialect = call
        .argument_field("shell")
        .and_then(|s| ShellDialect::parse(&s))
        .unwrap_or_else(ShellDialect::host_default);
    let parsed = warden_shell::parse(&command, dialect);
    if !parsed.is_safe_for_matching() {
        return false;
    }
    config
        .shell_allowlist()
        .iter()
        .any(|entry| matches_shell_prefix(&parsed, entry))
}

async fn prompt_for_decision(
    config: &mut GateConfig,
    call: &ToolCall,
    interrupt: &Arc<AtomicBool>,
) -> Result<ApprovalResult, EvalError> {
    if let Some(channel) = config.channel.as_mut() {
        let result = proxy::child::request_approval(channel, call).await;
        return Ok(result);
    }

    if !prompt::owns_terminal() {
        return Err(EvalError::NoPromptSurface);
    }

    let outcome = prompt::prompt_user(call, interrupt)
        .await
        .unwrap_or(PromptOutcome::Aborted);

    Ok(match outcome {
        PromptOutcome::Allow => ApprovalResult::Allowed,
        PromptOutcome::Deny => ApprovalResult::Denied,
        PromptOutcome::AllowAlways => {
            let entry = crate::config_allow_always::synthesize_entry(call);
            config.add_allowlist_entry(entry);
            ApprovalResult::AllowedAlways
        }
        PromptOutcome::Aborted => ApprovalResult::Aborted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use warden_types::RegexEntry;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall::new("1", name, arguments)
    }

    #[tokio::test]
    async fn yolo_mode_allows_everything() {
        let mut config = GateConfig::new();
        config.master_enabled = false;
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = evaluate(&mut config, &call("shell", r#"{"command":"rm -rf /"}"#), MatchArgument::default(), &interrupt)
            .await
            .unwrap();
        assert_eq!(result, ApprovalResult::Allowed);
    }

    #[tokio::test]
    async fn file_read_default_allows() {
        let mut config = GateConfig::new();
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = evaluate(&mut config, &call("read_file", r#"{"path":"x"}"#), MatchArgument::default(), &interrupt)
            .await
            .unwrap();
        assert_eq!(result, ApprovalResult::Allowed);
    }

    #[tokio::test]
    async fn category_deny_override_denies_without_prompting() {
        let mut config = GateConfig::new();
        config.set_category_action(GateCategory::FileRead, GateAction::Deny);
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = evaluate(&mut config, &call("read_file", "{}"), MatchArgument::default(), &interrupt)
            .await
            .unwrap();
        assert_eq!(result, ApprovalResult::Denied);
    }

    #[tokio::test]
    async fn regex_allowlist_match_allows_without_prompting() {
        let mut config = GateConfig::new();
        config.add_allowlist_entry(warden_types::AllowlistEntry::Regex(RegexEntry::new(
            "http_fetch",
            "^https://example\\.com/.*$",
        )));
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = evaluate(
            &mut config,
            &call("http_fetch", r#"https://example.com/ok"#),
            MatchArgument::default(),
            &interrupt,
        )
        .await
        .unwrap();
        assert_eq!(result, ApprovalResult::Allowed);
    }

    #[tokio::test]
    async fn shell_chain_never_matches_allowlist_prefix() {
        let mut config = GateConfig::new();
        config.add_allowlist_entry(
            warden_types::AllowlistEntry::shell_prefix(
                vec!["git".into(), "status".into()],
                None,
            )
            .unwrap(),
        );
        let interrupt = Arc::new(AtomicBool::new(false));
        // No terminal and no subagent channel in a test process: the
        // evaluator reaches the prompt step and must report that it has no
        // surface to prompt on, rather than silently allowing.
        let result = evaluate(
            &mut config,
            &call("shell", r#"{"command":"git status; rm -rf /"}"#),
            MatchArgument::default(),
            &interrupt,
        )
        .await;
        assert!(matches!(result, Err(EvalError::NoPromptSurface)));
    }

    #[tokio::test]
    async fn rate_limited_tool_short_circuits_before_prompting() {
        let mut config = GateConfig::new();
        let now = SystemTime::now();
        config.denial_tracker_mut("shell").record_denial(now);
        config.denial_tracker_mut("shell").record_denial(now);
        config.denial_tracker_mut("shell").record_denial(now);
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = evaluate(
            &mut config,
            &call("shell", r#"{"command":"echo hi"}"#),
            MatchArgument::default(),
            &interrupt,
        )
        .await
        .unwrap();
        assert_eq!(result, ApprovalResult::RateLimited);
    }
}
