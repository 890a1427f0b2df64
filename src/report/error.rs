//! Report parsing error types.

/// A report segment was closed but its body is not valid JSON.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to parse report: {reason}")]
pub struct ReportParseError {
    /// The trimmed report body that failed to decode.
    pub input: String,
    /// Decoder message.
    pub reason: String,
}

impl ReportParseError {
    pub(crate) fn new(input: impl Into<String>, err: &serde_json::Error) -> Self {
        Self {
            input: input.into(),
            reason: err.to_string(),
        }
    }
}
