//! Runner selection and command translation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::invocation::escape_for;
use super::{Invocation, Platform};

/// Strategy used to execute a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// Run the command verbatim through the platform shell.
    #[default]
    Default,
    /// Run a package script with npm.
    Npm,
    /// Run a package script with yarn.
    Yarn,
}

impl RunnerKind {
    /// Every known runner.
    pub const ALL: [Self; 3] = [Self::Default, Self::Npm, Self::Yarn];

    /// Look up a runner by name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Pick the runner for a command from its leading token.
    #[must_use]
    pub fn detect(command: &str) -> Self {
        match command.split_whitespace().next() {
            Some("npm") => Self::Npm,
            Some("yarn") => Self::Yarn,
            _ => Self::Default,
        }
    }

    /// Runner name as used in configuration and `force_runner`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }

    /// Translate a command and its extra arguments into an invocation.
    #[must_use]
    pub fn invocation(self, command: &str, args: &[String], platform: &Platform) -> Invocation {
        match self {
            Self::Default => {
                let mut line = command.trim().to_string();
                for arg in args {
                    line.push(' ');
                    line.push_str(&escape_for(arg, platform));
                }
                Invocation::shell(line, platform)
            }
            Self::Npm => {
                let mut argv = vec!["run".to_string(), "--silent".to_string()];
                argv.extend(script_words(command));
                argv.extend(args.iter().cloned());
                Invocation::new(package_manager_program("npm", platform), argv)
            }
            Self::Yarn => {
                let mut argv = vec!["--silent".to_string()];
                argv.extend(script_words(command));
                argv.extend(args.iter().cloned());
                Invocation::new(package_manager_program("yarn", platform), argv)
            }
        }
    }

    /// Clean up a stray output segment. Returns `None` when nothing is left.
    /// The default runner keeps segments untouched.
    ///
    /// Package managers print lifecycle banners around the script output;
    /// those lines carry no diagnostic value and are dropped.
    #[must_use]
    pub fn filter_stray(self, segment: &str) -> Option<String> {
        let kept = match self {
            Self::Default => return Some(segment.to_string()),
            Self::Npm => retain_lines(segment, |line| {
                !(line.starts_with("> ") && line.contains('@'))
            }),
            Self::Yarn => retain_lines(segment, |line| {
                !(line.starts_with("yarn run v")
                    || line.starts_with("$ ")
                    || line.starts_with("Done in "))
            }),
        };

        let trimmed = kept.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Words of the script part of a command: a leading package-manager token,
/// and a `run` following it, are stripped.
fn script_words(command: &str) -> Vec<String> {
    let mut words = command.split_whitespace().peekable();
    if words
        .next_if(|word| matches!(*word, "npm" | "yarn"))
        .is_some()
    {
        words.next_if_eq(&"run");
    }
    words.map(String::from).collect()
}

fn package_manager_program(name: &str, platform: &Platform) -> String {
    if platform.is_windows() {
        format!("{name}.cmd")
    } else {
        name.to_string()
    }
}

fn retain_lines(segment: &str, keep: impl Fn(&str) -> bool) -> String {
    segment
        .lines()
        .filter(|line| keep(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
