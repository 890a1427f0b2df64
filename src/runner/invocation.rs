//! Concrete program invocations.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Target platform tag such as `linux`, `darwin` or `win32`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Windows tag.
    pub const WINDOWS: &'static str = "win32";

    /// Create a platform from a tag such as `linux`, `darwin` or `win32`.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Platform of the running host.
    #[must_use]
    pub fn host() -> Self {
        let tag = match std::env::consts::OS {
            "windows" => Self::WINDOWS,
            "macos" => "darwin",
            other => other,
        };
        Self::new(tag)
    }

    /// The raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for Windows targets.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::WINDOWS) || self.0.eq_ignore_ascii_case("windows")
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// A program and its argument vector, ready to hand to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run a command line through the platform shell.
    #[must_use]
    pub fn shell(command_line: impl Into<String>, platform: &Platform) -> Self {
        if platform.is_windows() {
            Self::new("cmd", vec!["/C".to_string(), command_line.into()])
        } else {
            Self::new("sh", vec!["-c".to_string(), command_line.into()])
        }
    }

    /// Render as a single POSIX shell command line, escaping each word.
    #[must_use]
    pub fn to_command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|word| shell_escape::unix::escape(Cow::Borrowed(word)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Escape one shell word for the given platform's shell.
pub(crate) fn escape_for<'a>(word: &'a str, platform: &Platform) -> Cow<'a, str> {
    if platform.is_windows() {
        shell_escape::windows::escape(Cow::Borrowed(word))
    } else {
        shell_escape::unix::escape(Cow::Borrowed(word))
    }
}
