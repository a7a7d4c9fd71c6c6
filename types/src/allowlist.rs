//! Allowlist entries: the sum type over regex-match and shell-prefix rules.

use crate::shell_cmd::{equivalence_class_of, ParsedShellCommand, ShellDialect};

/// An allowlist entry, as a tagged union rather than a struct with nullable
/// fields (spec §9: "a faithful implementation should use sum types").
#[derive(Debug, Clone)]
pub enum AllowlistEntry {
    Regex(RegexEntry),
    ShellPrefix(ShellPrefixEntry),
}

/// A regex entry: matches a per-tool extracted string against a compiled
/// pattern.
///
/// `compiled` is `None` when the source pattern failed to compile; per
/// spec §9, such an entry is retained rather than dropped, and simply never
/// matches anything ("invalid-and-skipped", a harmless no-op).
#[derive(Debug, Clone)]
pub struct RegexEntry {
    pub tool: String,
    pub pattern: String,
    pub compiled: Option<regex::Regex>,
}

impl RegexEntry {
    #[must_use]
    pub fn new(tool: impl Into<String>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let compiled = regex::Regex::new(&pattern).ok();
        Self {
            tool: tool.into(),
            pattern,
            compiled,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.compiled.is_some()
    }

    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        self.compiled
            .as_ref()
            .is_some_and(|re| re.is_match(target))
    }
}

/// A shell-prefix entry: an ordered token sequence plus an optional dialect
/// tag. `dialect = None` means "any dialect", enabling the restricted
/// cross-dialect equivalence described in spec §4.1.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellPrefixEntry {
    pub tokens: Vec<String>,
    pub dialect: Option<ShellDialect>,
}

/// Empty shell-prefix entries are rejected at construction (spec §6: "Empty
/// arrays are rejected").
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AllowlistEntryError {
    #[error("shell prefix entry must have at least one token")]
    EmptyShellPrefix,
}

impl ShellPrefixEntry {
    pub fn new(
        tokens: Vec<String>,
        dialect: Option<ShellDialect>,
    ) -> Result<Self, AllowlistEntryError> {
        if tokens.is_empty() {
            return Err(AllowlistEntryError::EmptyShellPrefix);
        }
        Ok(Self { tokens, dialect })
    }
}

impl AllowlistEntry {
    #[must_use]
    pub fn regex(tool: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Regex(RegexEntry::new(tool, pattern))
    }

    pub fn shell_prefix(
        tokens: Vec<String>,
        dialect: Option<ShellDialect>,
    ) -> Result<Self, AllowlistEntryError> {
        Ok(Self::ShellPrefix(ShellPrefixEntry::new(tokens, dialect)?))
    }
}

/// Does `parsed` match `entry`'s shell-prefix rule?
///
/// An unsafe-flagged command never matches any entry (spec §4.1.1, §8
/// invariant). First-token cross-dialect equivalence applies only when the
/// entry carries no dialect tag, and only when either the prefix is a
/// single token or every remaining token matches literally.
#[must_use]
pub fn matches_shell_prefix(parsed: &ParsedShellCommand, entry: &ShellPrefixEntry) -> bool {
    if !parsed.is_safe_for_matching() {
        return false;
    }
    if let Some(dialect) = entry.dialect {
        if dialect != parsed.dialect {
            return false;
        }
        return tokens_literal_prefix(&parsed.tokens, &entry.tokens);
    }

    if parsed.tokens.len() < entry.tokens.len() {
        return false;
    }
    if tokens_literal_prefix(&parsed.tokens, &entry.tokens) {
        return true;
    }
    if entry.tokens.len() == 1 {
        return first_token_equivalent(&parsed.tokens[0], &entry.tokens[0]);
    }
    first_token_equivalent(&parsed.tokens[0], &entry.tokens[0])
        && parsed.tokens[1..entry.tokens.len()] == entry.tokens[1..]
}

fn tokens_literal_prefix(tokens: &[String], prefix: &[String]) -> bool {
    tokens.len() >= prefix.len() && tokens[..prefix.len()] == *prefix
}

fn first_token_equivalent(observed: &str, entry_first: &str) -> bool {
    if observed == entry_first {
        return true;
    }
    match equivalence_class_of(observed) {
        Some(class) => class.contains(&entry_first),
        None => false,
    }
}
