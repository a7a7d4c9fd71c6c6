//! Tool categories and the per-category policy action.

use std::fmt;

/// Closed enumeration of tool categories. Every tool belongs to exactly one.
///
/// `Dynamic` is the fallback for names absent from the fixed lookup table; a
/// dynamic tool may self-declare a category via a metadata directive, which
/// is honoured only when present and parseable (spec §4.1 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateCategory {
    FileRead,
    FileWrite,
    Shell,
    Network,
    Memory,
    Subagent,
    Mcp,
    PythonDynamic,
    Dynamic,
}

impl GateCategory {
    /// The fixed tool-name -> category lookup table. Names not present here
    /// resolve to [`GateCategory::Dynamic`].
    #[must_use]
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "read_file" | "list_directory" | "grep" | "glob" => Self::FileRead,
            "write_file" | "edit_file" | "delete_file" => Self::FileWrite,
            "shell" | "run_command" => Self::Shell,
            "http_fetch" | "web_search" => Self::Network,
            "remember" | "recall" => Self::Memory,
            "spawn_subagent" => Self::Subagent,
            "mcp_call" => Self::Mcp,
            "python_exec" => Self::PythonDynamic,
            _ => Self::Dynamic,
        }
    }

    /// Parse a category name as it may appear in a config file's
    /// `approval_gates.categories` keys or a self-declared metadata
    /// directive on a dynamic tool.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "file-read" => Self::FileRead,
            "file-write" => Self::FileWrite,
            "shell" => Self::Shell,
            "network" => Self::Network,
            "memory" => Self::Memory,
            "subagent" => Self::Subagent,
            "mcp" => Self::Mcp,
            "python-dynamic" => Self::PythonDynamic,
            "dynamic" => Self::Dynamic,
            _ => return None,
        })
    }

    #[must_use]
    pub fn default_action(self) -> GateAction {
        match self {
            Self::FileRead => GateAction::Allow,
            Self::FileWrite | Self::Shell | Self::Network | Self::PythonDynamic => {
                GateAction::Gate
            }
            Self::Memory => GateAction::Allow,
            Self::Subagent => GateAction::Gate,
            Self::Mcp => GateAction::Gate,
            Self::Dynamic => GateAction::Gate,
        }
    }
}

impl fmt::Display for GateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileRead => "file-read",
            Self::FileWrite => "file-write",
            Self::Shell => "shell",
            Self::Network => "network",
            Self::Memory => "memory",
            Self::Subagent => "subagent",
            Self::Mcp => "mcp",
            Self::PythonDynamic => "python-dynamic",
            Self::Dynamic => "dynamic",
        };
        f.write_str(s)
    }
}

/// Per-category policy action: `allow`, `gate`, or `deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Allow,
    Gate,
    Deny,
}

impl GateAction {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "allow" => Some(Self::Allow),
            "gate" => Some(Self::Gate),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_name_is_dynamic() {
        assert_eq!(GateCategory::from_tool_name("frobnicate"), GateCategory::Dynamic);
    }

    #[test]
    fn known_tool_names_resolve() {
        assert_eq!(GateCategory::from_tool_name("shell"), GateCategory::Shell);
        assert_eq!(GateCategory::from_tool_name("write_file"), GateCategory::FileWrite);
    }

    #[test]
    fn category_parse_roundtrips_display() {
        for cat in [
            GateCategory::FileRead,
            GateCategory::FileWrite,
            GateCategory::Shell,
            GateCategory::Network,
            GateCategory::Memory,
            GateCategory::Subagent,
            GateCategory::Mcp,
            GateCategory::PythonDynamic,
            GateCategory::Dynamic,
        ] {
            let rendered = cat.to_string();
            assert_eq!(GateCategory::parse(&rendered), Some(cat));
        }
    }

    #[test]
    fn action_parse_rejects_unknown() {
        assert_eq!(GateAction::parse("maybe"), None);
    }
}
