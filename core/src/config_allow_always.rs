//! Synthesizes an allowlist entry from an `AllowedAlways` prompt response
//! (spec §4.1.3).

use warden_types::{AllowlistEntry, GateCategory, RegexEntry, ShellDialect, ToolCall};

/// Turn `call` into the allowlist entry it should be remembered as.
///
/// For `shell`, the parsed token prefix becomes a shell-prefix entry tagged
/// with the call's own dialect. For everything else, a regex anchors the
/// match target to its current literal value, escaped.
#[must_use]
pub fn synthesize_entry(call: &ToolCall) -> AllowlistEntry {
    if GateCategory::from_tool_name(&call.name) == GateCategory::Shell {
        if let Some(command) = call.argument_field("command") {
            let dialect = call
                .argument_field("shell")
                .and_then(|s| ShellDialect::parse(&s))
                .unwrap_or_else(ShellDialect::host_default);
            let parsed = warden_shell::parse(&command, dialect);
            if let Ok(entry) = AllowlistEntry::shell_prefix(parsed.tokens, Some(dialect)) {
                return entry;
            }
        }
    }

    let target = call.arguments.clone();
    let pattern = format!("^{}$", regex::escape(&target));
    AllowlistEntry::Regex(RegexEntry::new(call.name.clone(), pattern))
}
