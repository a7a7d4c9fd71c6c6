//! Core data model for the approval-gate policy engine.
//!
//! No IO, no async: every type here is a plain value that can be constructed,
//! serialized, and compared without touching the filesystem, a pipe, or a
//! terminal. The crates that give these types behavior (`warden-shell`,
//! `warden-fsverify`, `warden-core`) depend on this one, never the reverse.

pub mod allowlist;
pub mod approved_path;
pub mod category;
pub mod denial;
pub mod error;
pub mod error_payload;
pub mod proxy_wire;
pub mod shell_cmd;
pub mod tool_call;

pub use allowlist::{
    matches_shell_prefix, AllowlistEntry, AllowlistEntryError, RegexEntry, ShellPrefixEntry,
};
pub use approved_path::{ApprovedPath, FileIdentity};
pub use category::{GateAction, GateCategory};
pub use denial::DenialTracker;
pub use error::WardenError;
pub use error_payload::ErrorPayload;
pub use proxy_wire::{ApprovalRequestMsg, ApprovalResponseMsg};
pub use shell_cmd::{ParsedShellCommand, ShellDialect};
pub use tool_call::ToolCall;

/// Outcome of evaluating a single [`ToolCall`] against a `GateConfig`.
///
/// Mirrors the five outcomes in the spec's policy-evaluator contract. `Denied`
/// and `RateLimited` are terminal policy states, not errors (spec §7.1) —
/// they are represented here as ordinary variants, never as an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResult {
    Allowed,
    Denied,
    AllowedAlways,
    Aborted,
    RateLimited,
}

impl ApprovalResult {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed | Self::AllowedAlways)
    }
}

/// The four-choice keystroke a user can answer a prompt with (spec §4.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Allow,
    Deny,
    AllowAlways,
    ShowDetails,
}

impl PromptChoice {
    /// Parse a single keystroke byte into a prompt choice.
    ///
    /// Returns `None` for any key that isn't part of the protocol; the caller
    /// re-prompts rather than treating an unrecognized key as a choice.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'y' | 'Y' => Some(Self::Allow),
            'n' | 'N' => Some(Self::Deny),
            'a' | 'A' => Some(Self::AllowAlways),
            '?' => Some(Self::ShowDetails),
            _ => None,
        }
    }
}
