//! Structured refusals reported back to the model (spec §6).

use serde_json::{json, Value};

/// A structured error payload returned to the model in place of a tool
/// result. Each variant corresponds to one of the stable machine tags listed
/// in spec §6.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    OperationDenied { message: String },
    RateLimited { tool: String, retry_after_secs: u64 },
    ProtectedFile { path: String, message: String },
    SymlinkRejected { path: String },
    PathChanged { path: String },
    FileDeleted { path: String },
    FileExists { path: String },
    NetworkFsWarning { path: String, message: String },
    VerificationFailed { message: String },
}

impl ErrorPayload {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::OperationDenied { .. } => "operation_denied",
            Self::RateLimited { .. } => "rate_limited",
            Self::ProtectedFile { .. } => "protected_file",
            Self::SymlinkRejected { .. } => "symlink_rejected",
            Self::PathChanged { .. } => "path_changed",
            Self::FileDeleted { .. } => "file_deleted",
            Self::FileExists { .. } => "file_exists",
            Self::NetworkFsWarning { .. } => "network_fs_warning",
            Self::VerificationFailed { .. } => "verification_failed",
        }
    }

    /// Build the JSON object sent to the model. `serde_json` already escapes
    /// `"`, `\`, and control characters below `0x20` (including the named
    /// escapes `\b \f \n \r \t`) per the JSON grammar when serializing a
    /// string, which is the full set spec §6 requires; `Value::String`
    /// round-trips are exercised in tests rather than assumed.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::OperationDenied { message } => json!({
                "error": self.tag(),
                "message": message,
            }),
            Self::RateLimited { tool, retry_after_secs } => json!({
                "error": self.tag(),
                "message": format!("{tool} is rate-limited for {retry_after_secs}s"),
                "tool": tool,
                "retry_after": retry_after_secs,
            }),
            Self::ProtectedFile { path, message } => json!({
                "error": self.tag(),
                "message": message,
                "path": path,
            }),
            Self::SymlinkRejected { path } => json!({
                "error": self.tag(),
                "message": format!("{path} is a symlink and was rejected"),
                "path": path,
            }),
            Self::PathChanged { path } => json!({
                "error": self.tag(),
                "message": format!("{path} changed identity since approval"),
                "path": path,
            }),
            Self::FileDeleted { path } => json!({
                "error": self.tag(),
                "message": format!("{path} was deleted since approval"),
                "path": path,
            }),
            Self::FileExists { path } => json!({
                "error": self.tag(),
                "message": format!("{path} already exists"),
                "path": path,
            }),
            Self::NetworkFsWarning { path, message } => json!({
                "error": self.tag(),
                "message": message,
                "path": path,
            }),
            Self::VerificationFailed { message } => json!({
                "error": self.tag(),
                "message": message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_carries_tool_and_retry_after() {
        let payload = ErrorPayload::RateLimited {
            tool: "shell".into(),
            retry_after_secs: 60,
        };
        let json = payload.to_json();
        assert_eq!(json["error"], "rate_limited");
        assert_eq!(json["tool"], "shell");
        assert_eq!(json["retry_after"], 60);
    }

    #[test]
    fn control_characters_in_message_are_escaped() {
        let payload = ErrorPayload::OperationDenied {
            message: "line one\nline two\ttabbed \"quoted\"".into(),
        };
        let rendered = serde_json::to_string(&payload.to_json()).unwrap();
        assert!(rendered.contains(r"\n"));
        assert!(rendered.contains(r"\t"));
        assert!(rendered.contains(r#"\""#));
        assert!(!rendered.contains('\n'));
    }

    #[test]
    fn tags_match_spec_stable_names() {
        assert_eq!(
            ErrorPayload::ProtectedFile {
                path: "/etc/shadow".into(),
                message: "blocked".into()
            }
            .tag(),
            "protected_file"
        );
        assert_eq!(ErrorPayload::FileExists { path: "/tmp/x".into() }.tag(), "file_exists");
    }
}
