//! Report types and delimiter configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ReportParseError;

/// Default token opening a report segment.
pub const DEFAULT_OPEN: &str = "<<<REPORT";

/// Default token closing a report segment.
pub const DEFAULT_CLOSE: &str = "REPORT>>>";

/// Tokens that frame a report inside process output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDelimiters {
    /// Token that opens a report.
    pub open: String,
    /// Token that closes a report.
    pub close: String,
}

impl Default for ReportDelimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}

impl ReportDelimiters {
    /// Create delimiters from custom tokens.
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Check the tokens are usable: both non-empty and distinct.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the tokens are unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err("report delimiters must not be empty".to_string());
        }
        if self.open == self.close {
            return Err(format!(
                "report open and close delimiters must differ (both are {:?})",
                self.open
            ));
        }
        Ok(())
    }
}

/// One decoded report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(serde_json::Value);

impl Report {
    /// Wrap an already decoded value.
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Borrow the decoded JSON value.
    #[must_use]
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Take the decoded JSON value.
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Decode the report into a typed structure.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the report does not match `T`.
    pub fn parse_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }
}

impl From<serde_json::Value> for Report {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Output of scanning a chunk, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Text outside any report, without the whitespace touching a delimiter
    /// or either end of the stream. Never whitespace-only.
    Stray(String),
    /// A fully delimited and decoded report.
    Report(Report),
    /// A fully delimited report whose body is not valid JSON.
    Invalid(ReportParseError),
    /// The stream ended inside a report: the whitespace before the open
    /// token, the token and the partial body, verbatim.
    Unterminated(String),
}
