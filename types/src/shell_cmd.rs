//! Output of the cross-shell command parser.

/// Which of the three shell dialects a command was (or should be) parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellDialect {
    Posix,
    Cmd,
    #[serde(rename = "powershell")]
    PowerShell,
}

impl ShellDialect {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "posix" => Some(Self::Posix),
            "cmd" => Some(Self::Cmd),
            "powershell" => Some(Self::PowerShell),
            _ => None,
        }
    }

    /// Dialect inferred from the host platform when the caller doesn't name
    /// one explicitly.
    #[must_use]
    pub fn host_default() -> Self {
        if cfg!(windows) {
            Self::PowerShell
        } else {
            Self::Posix
        }
    }
}

/// A shell command after tokenisation and unsafe-construct classification.
///
/// Invariant (spec §3): if any of the five boolean flags is set, the command
/// is never safe for allowlist matching, regardless of its tokens.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedShellCommand {
    pub tokens: Vec<String>,
    pub has_chain: bool,
    pub has_pipe: bool,
    pub has_subshell: bool,
    pub has_redirect: bool,
    pub is_dangerous: bool,
    pub dialect: ShellDialect,
}

impl ParsedShellCommand {
    /// Safe-for-matching iff none of the five unsafe flags is set.
    #[must_use]
    pub fn is_safe_for_matching(&self) -> bool {
        !(self.has_chain
            || self.has_pipe
            || self.has_subshell
            || self.has_redirect
            || self.is_dangerous)
    }
}

/// Cross-dialect equivalence groups for the first token of a command
/// (spec §9: "treat as data, not code"). Each inner slice is one equivalence
/// class; entries within a class are considered the same command across
/// dialects when an allowlist entry carries no dialect tag.
pub static FIRST_TOKEN_EQUIVALENCE_CLASSES: &[&[&str]] = &[
    &["ls", "dir", "Get-ChildItem", "gci"],
    &["cat", "type", "Get-Content", "gc"],
    &["rm", "del", "erase", "Remove-Item", "ri"],
    &["cp", "copy", "Copy-Item", "ci"],
    &["mv", "move", "ren", "rename", "Move-Item"],
    &["mkdir", "md", "New-Item"],
    &["pwd", "cd", "Get-Location", "gl"],
    &["echo", "Write-Output", "Write-Host"],
    &["grep", "findstr", "Select-String", "sls"],
];

/// Look up the equivalence class containing `token`, if any.
#[must_use]
pub fn equivalence_class_of(token: &str) -> Option<&'static [&'static str]> {
    FIRST_TOKEN_EQUIVALENCE_CLASSES
        .iter()
        .find(|class| class.iter().any(|candidate| *candidate == token))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(tokens: &[&str], dialect: ShellDialect) -> ParsedShellCommand {
        ParsedShellCommand {
            tokens: tokens.iter().map(|s| (*s).to_string()).collect(),
            has_chain: false,
            has_pipe: false,
            has_subshell: false,
            has_redirect: false,
            is_dangerous: false,
            dialect,
        }
    }

    #[test]
    fn any_unsafe_flag_disqualifies_matching() {
        let mut cmd = clean(&["git", "status"], ShellDialect::Posix);
        assert!(cmd.is_safe_for_matching());
        cmd.has_chain = true;
        assert!(!cmd.is_safe_for_matching());
    }

    #[test]
    fn equivalence_class_contains_ls_family() {
        let class = equivalence_class_of("Get-ChildItem").expect("class exists");
        assert!(class.contains(&"ls"));
        assert!(class.contains(&"dir"));
    }

    #[test]
    fn dialect_round_trips_through_name() {
        for dialect in [ShellDialect::Posix, ShellDialect::Cmd, ShellDialect::PowerShell] {
            let name = serde_json::to_value(dialect).unwrap();
            let name = name.as_str().unwrap().to_string();
            assert_eq!(ShellDialect::parse(&name), Some(dialect));
        }
    }
}
