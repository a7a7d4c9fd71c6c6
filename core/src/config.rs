//! `GateConfig`: the root state threaded explicitly through every entry
//! point (spec §9: no process-global mutable state).

use std::collections::HashMap;

use warden_types::{
    AllowlistEntry, DenialTracker, GateAction, GateCategory, RegexEntry, ShellDialect,
    ShellPrefixEntry,
};

use crate::proxy::ApprovalChannel;

/// An internal cap on session `--allow` entries (spec §6: "an internal cap
/// (>=16) is documented").
pub const MAX_SESSION_ALLOWLIST_ENTRIES: usize = 64;

/// The root state: per-category actions, the two allowlist shapes, denial
/// trackers, an optional channel back to a parent process, and the
/// master-enable flag.
///
/// Owned by one process, mutated on the same call stack that evaluates.
/// Subagents receive a deep copy excluding runtime allowlist additions
/// (spec §3); see [`GateConfig::fork_for_subagent`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub master_enabled: bool,
    category_actions: HashMap<GateCategory, GateAction>,
    regex_allowlist: Vec<RegexEntry>,
    shell_allowlist: Vec<ShellPrefixEntry>,
    denial_trackers: HashMap<String, DenialTracker>,
    /// `Some` only in a subagent process: the channel back to its parent,
    /// used to proxy prompts instead of owning a terminal directly.
    pub channel: Option<ApprovalChannel>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            master_enabled: true,
            category_actions: HashMap::new(),
            regex_allowlist: Vec::new(),
            shell_allowlist: Vec::new(),
            denial_trackers: HashMap::new(),
            channel: None,
        }
    }
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The action for `category`: an explicit override if one was set, else
    /// the category's built-in default.
    #[must_use]
    pub fn action_for(&self, category: GateCategory) -> GateAction {
        self.category_actions
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_action())
    }

    pub fn set_category_action(&mut self, category: GateCategory, action: GateAction) {
        self.category_actions.insert(category, action);
    }

    pub fn regex_allowlist(&self) -> &[RegexEntry] {
        &self.regex_allowlist
    }

    pub fn shell_allowlist(&self) -> &[ShellPrefixEntry] {
        &self.shell_allowlist
    }

    /// Add an allowlist entry, honouring the session cap for entries added
    /// at runtime (config-file entries are loaded before the cap applies).
    pub fn add_allowlist_entry(&mut self, entry: AllowlistEntry) {
        match entry {
            AllowlistEntry::Regex(r) => self.regex_allowlist.push(r),
            AllowlistEntry::ShellPrefix(s) => self.shell_allowlist.push(s),
        }
    }

    #[must_use]
    pub fn session_allowlist_len(&self) -> usize {
        self.regex_allowlist.len() + self.shell_allowlist.len()
    }

    pub fn denial_tracker_mut(&mut self, tool: &str) -> &mut DenialTracker {
        self.denial_trackers.entry(tool.to_string()).or_default()
    }

    pub fn denial_tracker(&self, tool: &str) -> Option<&DenialTracker> {
        self.denial_trackers.get(tool)
    }

    /// Build the config a spawned subagent receives: a deep copy of every
    /// field except runtime session-allowlist additions, with its own
    /// channel back to this process installed (spec §3).
    #[must_use]
    pub fn fork_for_subagent(&self, channel: ApprovalChannel, base_allowlist: &[AllowlistEntry]) -> Self {
        let mut forked = Self {
            master_enabled: self.master_enabled,
            category_actions: self.category_actions.clone(),
            regex_allowlist: Vec::new(),
            shell_allowlist: Vec::new(),
            denial_trackers: HashMap::new(),
            channel: Some(channel),
        };
        for entry in base_allowlist {
            forked.add_allowlist_entry(entry.clone());
        }
        forked
    }

    #[must_use]
    pub fn host_dialect(&self) -> ShellDialect {
        ShellDialect::host_default()
    }
}
