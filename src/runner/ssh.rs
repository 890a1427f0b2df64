//! Remote execution through the `ssh` client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Invocation;

/// Connection settings for running a process on a remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshOptions {
    /// Remote host name or address.
    pub host: String,
    /// Remote user, if not the ssh default.
    pub user: Option<String>,
    /// Remote port, if not 22.
    pub port: Option<u16>,
    /// Private key passed with `-i`.
    pub identity_file: Option<PathBuf>,
    /// Extra arguments passed to `ssh` before the destination.
    pub extra_args: Vec<String>,
}

impl SshOptions {
    /// Create options for a host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the remote user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the remote port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the identity file.
    #[must_use]
    pub fn identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// `user@host`, or just the host.
    #[must_use]
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// Wrap a local invocation so it runs on the remote host.
    #[must_use]
    pub fn wrap(&self, invocation: &Invocation) -> Invocation {
        let mut args = Vec::new();

        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(self.destination());
        args.push("--".to_string());
        args.push(invocation.to_command_line());

        Invocation::new("ssh", args)
    }
}
