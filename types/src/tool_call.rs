//! The evaluator's input: a single proposed tool invocation.

/// A tool invocation proposed by the model, awaiting an approval decision.
///
/// `arguments` is carried as the raw JSON text the model produced, not a
/// pre-parsed [`serde_json::Value`]: a malformed argument document is a
/// distinct, testable failure (spec §7 class 3, "parse failures of tool
/// arguments"), and that distinction only exists if parsing happens inside
/// the evaluator rather than before it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse `arguments` as JSON, returning `None` on malformed input.
    ///
    /// Callers that need to distinguish "no match" from "malformed" for
    /// error-payload purposes should call [`serde_json::from_str`] directly
    /// instead; this helper is for allowlist matching, where both outcomes
    /// are "proceed to prompting" (spec §7 class 3).
    #[must_use]
    pub fn parsed_arguments(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.arguments).ok()
    }

    /// Extract a named string field from the arguments document, or `None`
    /// if the document doesn't parse or the field is absent/non-string.
    #[must_use]
    pub fn argument_field(&self, field: &str) -> Option<String> {
        self.parsed_arguments()?
            .get(field)?
            .as_str()
            .map(str::to_owned)
    }
}
