//! JSON config file parsing and CLI flag overlay for the approval-gate
//! policy engine (spec §6).
//!
//! Config errors are logged and fall back to defaults (spec §7 class 4:
//! "the engine never fails-open on config error") — a malformed file yields
//! the same conservative defaults as no file at all, never a bypass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use warden_types::{AllowlistEntry, GateAction, GateCategory};

use warden_core::GateConfig;

/// An internal cap on `--allow` flags per invocation (spec §6: "an internal
/// cap (>=16) is documented"). Shares the session-allowlist cap `GateConfig`
/// already enforces for runtime "allow-always" additions.
pub const MAX_CLI_ALLOW_FLAGS: usize = warden_core::config::MAX_SESSION_ALLOWLIST_ENTRIES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("--allow spec {0:?} is not of the form <tool>:<rest>")]
    InvalidAllowSpec(String),
    #[error("--allow spec {0:?} has an empty shell token list")]
    EmptyShellAllowSpec(String),
    #[error("too many --allow flags: at most {MAX_CLI_ALLOW_FLAGS} are accepted per run")]
    TooManyAllowFlags,
}

/// The `approval_gates` root object of the JSON config file.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    approval_gates: Option<ApprovalGatesSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ApprovalGatesSection {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    categories: HashMap<String, String>,
    #[serde(default)]
    allowlist: Vec<AllowlistEntryFile>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AllowlistEntryFile {
    Shell {
        tool: String,
        command: Vec<String>,
        #[serde(default)]
        shell: Option<String>,
    },
    Regex {
        tool: String,
        pattern: String,
    },
}

/// Load a [`GateConfig`] from `path`, falling back to
/// [`GateConfig::default`] (with a logged warning) if the file is missing,
/// unreadable, or malformed. This is the entry point most callers want.
#[must_use]
pub fn load(path: Option<&Path>) -> GateConfig {
    let Some(path) = path else {
        return GateConfig::new();
    };
    match load_from_file(path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "falling back to default approval-gate config");
            GateConfig::new()
        }
    }
}

/// Load a [`GateConfig`] from `path`, propagating any error instead of
/// silently defaulting. Useful for callers (and tests) that want to
/// distinguish "no config" from "config present but broken".
pub fn load_from_file(path: &Path) -> Result<GateConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text, path)
}

fn parse_str(text: &str, path: &Path) -> Result<GateConfig, ConfigError> {
    let file: ConfigFile = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = GateConfig::new();
    let Some(section) = file.approval_gates else {
        return Ok(config);
    };

    config.master_enabled = section.enabled;

    for (name, action_name) in &section.categories {
        let Some(category) = GateCategory::parse(name) else {
            tracing::warn!(category = %name, "ignoring unknown category key in config");
            continue;
        };
        let Some(action) = GateAction::parse(action_name) else {
            tracing::warn!(category = %name, action = %action_name, "ignoring invalid action value in config");
            continue;
        };
        config.set_category_action(category, action);
    }

    for entry in section.allowlist {
        match build_allowlist_entry(entry) {
            Ok(entry) => config.add_allowlist_entry(entry),
            Err(err) => tracing::warn!(error = %err, "skipping invalid allowlist entry in config"),
        }
    }

    Ok(config)
}

fn build_allowlist_entry(entry: AllowlistEntryFile) -> Result<AllowlistEntry, ConfigError> {
    match entry {
        AllowlistEntryFile::Shell { command, shell, .. } => {
            if command.is_empty() {
                return Err(ConfigError::EmptyShellAllowSpec(String::new()));
            }
            let dialect = shell.as_deref().and_then(warden_types::ShellDialect::parse);
            AllowlistEntry::shell_prefix(command, dialect)
                .map_err(|_| ConfigError::EmptyShellAllowSpec(String::new()))
        }
        AllowlistEntryFile::Regex { tool, pattern } => Ok(AllowlistEntry::regex(tool, pattern)),
    }
}

/// CLI flags that overlay a loaded [`GateConfig`] (spec §6's "CLI surface").
#[derive(Debug, Default, Clone, clap::Args)]
pub struct GateCliArgs {
    /// Set master-enable to false for this process, bypassing every gate.
    #[arg(long)]
    pub yolo: bool,

    /// Add one session allowlist entry: `<tool>:<rest>`. For `shell`,
    /// `<rest>` is a comma-separated token list; for anything else, an
    /// extended regular expression. Repeatable.
    #[arg(long = "allow", value_name = "SPEC")]
    pub allow: Vec<String>,

    /// Set one category's action to `allow` outright. Repeatable.
    #[arg(long = "allow-category", value_name = "NAME")]
    pub allow_category: Vec<String>,

    /// Path to the JSON config file (default: none, built-in defaults).
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

/// Apply `args` on top of an already-loaded `config`, per spec §6.
pub fn apply_cli_overrides(config: &mut GateConfig, args: &GateCliArgs) -> Result<(), ConfigError> {
    if args.yolo {
        config.master_enabled = false;
    }

    if args.allow.len() > MAX_CLI_ALLOW_FLAGS {
        return Err(ConfigError::TooManyAllowFlags);
    }
    for spec in &args.allow {
        config.add_allowlist_entry(parse_allow_spec(spec)?);
    }

    for name in &args.allow_category {
        let Some(category) = GateCategory::parse(name) else {
            tracing::warn!(category = %name, "ignoring unknown --allow-category value");
            continue;
        };
        config.set_category_action(category, GateAction::Allow);
    }

    Ok(())
}

/// Parse one `--allow <tool>:<rest>` flag into an [`AllowlistEntry`].
pub fn parse_allow_spec(spec: &str) -> Result<AllowlistEntry, ConfigError> {
    let (tool, rest) = spec
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidAllowSpec(spec.to_string()))?;

    if tool == "shell" {
        let tokens: Vec<String> = rest
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        AllowlistEntry::shell_prefix(tokens, None)
            .map_err(|_| ConfigError::InvalidAllowSpec(spec.to_string()))
    } else {
        Ok(AllowlistEntry::regex(tool, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/no/such/warden-config.json")));
        assert!(config.master_enabled);
    }

    #[test]
    fn malformed_json_falls_back_to_defaults_without_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = load(Some(&path));
        assert!(config.master_enabled);
    }

    #[test]
    fn parses_categories_and_both_allowlist_shapes() {
        let json = r#"{
            "approval_gates": {
                "enabled": true,
                "categories": { "file-write": "allow", "shell": "gate" },
                "allowlist": [
                    { "tool": "read_file", "pattern": "^/tmp/.*$" },
                    { "tool": "shell", "command": ["git", "status"], "shell": "posix" }
                ]
            }
        }"#;
        let config = parse_str(json, Path::new("test.json")).unwrap();
        assert_eq!(config.action_for(GateCategory::FileWrite), GateAction::Allow);
        assert_eq!(config.action_for(GateCategory::Shell), GateAction::Gate);
        assert_eq!(config.regex_allowlist().len(), 1);
        assert_eq!(config.shell_allowlist().len(), 1);
    }

    #[test]
    fn unknown_category_key_is_ignored_not_fatal() {
        let json = r#"{"approval_gates": {"categories": {"not-a-category": "allow"}}}"#;
        let config = parse_str(json, Path::new("test.json")).unwrap();
        assert_eq!(config.action_for(GateCategory::FileWrite), GateCategory::FileWrite.default_action());
    }

    #[test]
    fn invalid_action_value_is_ignored_not_fatal() {
        let json = r#"{"approval_gates": {"categories": {"shell": "maybe"}}}"#;
        let config = parse_str(json, Path::new("test.json")).unwrap();
        assert_eq!(config.action_for(GateCategory::Shell), GateCategory::Shell.default_action());
    }

    #[test]
    fn empty_shell_command_array_is_skipped() {
        let json = r#"{"approval_gates": {"allowlist": [{"tool":"shell","command":[]}]}}"#;
        let config = parse_str(json, Path::new("test.json")).unwrap();
        assert_eq!(config.shell_allowlist().len(), 0);
    }

    #[test]
    fn allow_spec_for_shell_splits_on_commas() {
        let entry = parse_allow_spec("shell:git,status").unwrap();
        match entry {
            AllowlistEntry::ShellPrefix(s) => assert_eq!(s.tokens, vec!["git", "status"]),
            AllowlistEntry::Regex(_) => panic!("expected shell prefix"),
        }
    }

    #[test]
    fn allow_spec_for_other_tool_is_a_regex() {
        let entry = parse_allow_spec("http_fetch:^https://example\\.com/.*$").unwrap();
        match entry {
            AllowlistEntry::Regex(r) => assert!(r.matches("https://example.com/x")),
            AllowlistEntry::ShellPrefix(_) => panic!("expected regex"),
        }
    }

    #[test]
    fn allow_spec_without_colon_is_rejected() {
        assert!(matches!(parse_allow_spec("not-a-spec"), Err(ConfigError::InvalidAllowSpec(_))));
    }

    #[test]
    fn yolo_flag_overrides_master_enable() {
        let mut config = GateConfig::new();
        let args = GateCliArgs {
            yolo: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &args).unwrap();
        assert!(!config.master_enabled);
    }

    #[test]
    fn allow_category_flag_sets_category_to_allow() {
        let mut config = GateConfig::new();
        let args = GateCliArgs {
            allow_category: vec!["shell".to_string()],
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &args).unwrap();
        assert_eq!(config.action_for(GateCategory::Shell), GateAction::Allow);
    }

    #[test]
    fn too_many_allow_flags_is_rejected() {
        let mut config = GateConfig::new();
        let args = GateCliArgs {
            allow: vec!["read_file:.".to_string(); MAX_CLI_ALLOW_FLAGS + 1],
            ..Default::default()
        };
        assert!(matches!(
            apply_cli_overrides(&mut config, &args),
            Err(ConfigError::TooManyAllowFlags)
        ));
    }
}
