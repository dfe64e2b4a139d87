//! Shell execution seam
//!
//! Everything the controller launches goes through [`CommandRunner`], so the
//! launch order and exact command lines can be checked without a testbed.
//! [`ShellRunner`] runs local commands through `sh -c` and remote ones over
//! one [`SshShell`] per node.

use std::collections::HashMap;
use std::process::Command;
use std::thread;
use std::time::Duration;

use spurs::{cmd, Execute, SshError, SshShell, SshSpawnHandle};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Port appended to node names that do not carry one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Whether a remote command is waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Block until the command exits
    Foreground,
    /// Start the command and return immediately
    Background,
}

/// Exit status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    code: Option<i32>,
}

impl CommandOutcome {
    /// Command exited with `code`.
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Command was started in the background, or killed by a signal.
    #[must_use]
    pub const fn detached() -> Self {
        Self { code: None }
    }

    /// Exit code, if the command was waited for and exited normally.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// True for exit code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Runs shell commands locally or on a remote node.
pub trait CommandRunner {
    /// Run `command` through the local shell and wait for it.
    ///
    /// # Errors
    ///
    /// [`Error::CommandFailed`] if the shell cannot be started.
    fn run_local(&mut self, command: &str) -> Result<CommandOutcome>;

    /// Run `command` on `host`.
    ///
    /// # Errors
    ///
    /// [`Error::CommandFailed`] if the remote shell cannot be started.
    fn run_remote(&mut self, host: &str, command: &str, mode: RunMode) -> Result<CommandOutcome>;

    /// Run `command` locally and return its stdout.
    ///
    /// # Errors
    ///
    /// [`Error::CommandFailed`] if the shell cannot be started.
    fn capture(&mut self, command: &str) -> Result<String>;

    /// Wait `seconds` of wall-clock time.
    fn sleep(&mut self, seconds: u64);

    /// Wait for every background command started so far.
    ///
    /// Called once the background processes have been killed.
    fn join_background(&mut self) {}
}

/// `host:port` for a node name, keeping an explicit port.
#[must_use]
pub fn ssh_address(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_SSH_PORT}")
    }
}

/// [`CommandRunner`] backed by `sh -c` locally and `spurs` shells remotely.
pub struct ShellRunner {
    user: String,
    shells: HashMap<String, SshShell>,
    background: Vec<(String, SshSpawnHandle)>,
}

impl ShellRunner {
    /// Runner that logs into remote nodes as `user` with the default key.
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            shells: HashMap::new(),
            background: Vec::new(),
        }
    }

    /// Remote user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of background commands not yet joined.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.background.len()
    }

    fn shell(&mut self, host: &str) -> Result<&SshShell> {
        if !self.shells.contains_key(host) {
            let address = ssh_address(host);
            info!(host, user = %self.user, "opening ssh shell");
            let shell = SshShell::with_default_key(&self.user, address.as_str())
                .map_err(|e| remote_failure(&format!("ssh {}@{address}", self.user), &e))?;
            self.shells.insert(host.to_string(), shell);
        }
        self.shells
            .get(host)
            .ok_or_else(|| Error::Other(format!("no ssh shell for {host}")))
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("root")
    }
}

fn spawn_failure(command: &str, err: &std::io::Error) -> Error {
    warn!(command, error = %err, "command could not be started");
    Error::CommandFailed {
        command: command.to_string(),
        reason: err.to_string(),
    }
}

fn remote_failure(command: &str, err: &SshError) -> Error {
    warn!(command, error = %err, "remote command could not be started");
    Error::CommandFailed {
        command: command.to_string(),
        reason: err.to_string(),
    }
}

fn outcome(command: &str, status: std::process::ExitStatus) -> CommandOutcome {
    match status.code() {
        Some(0) => CommandOutcome::exited(0),
        Some(code) => {
            warn!(command, code, "command exited with non-zero status");
            CommandOutcome::exited(code)
        }
        None => {
            warn!(command, "command terminated by signal");
            CommandOutcome::detached()
        }
    }
}

/// Map a finished remote command; a non-zero exit is an outcome, not an error.
fn remote_outcome(
    host: &str,
    command: &str,
    result: std::result::Result<spurs::SshOutput, SshError>,
) -> Result<CommandOutcome> {
    match result {
        Ok(_) => Ok(CommandOutcome::exited(0)),
        Err(SshError::NonZeroExit { exit, .. }) => {
            warn!(host, command, code = exit, "remote command exited with non-zero status");
            Ok(CommandOutcome::exited(exit))
        }
        Err(e) => Err(remote_failure(command, &e)),
    }
}

impl CommandRunner for ShellRunner {
    fn run_local(&mut self, command: &str) -> Result<CommandOutcome> {
        debug!(command, "local");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|e| spawn_failure(command, &e))?;
        Ok(outcome(command, status))
    }

    fn run_remote(&mut self, host: &str, command: &str, mode: RunMode) -> Result<CommandOutcome> {
        debug!(host, command, ?mode, "remote");
        let shell = self.shell(host)?;
        match mode {
            RunMode::Foreground => remote_outcome(host, command, shell.run(cmd!("{}", command))),
            RunMode::Background => {
                let handle = shell
                    .spawn(cmd!("{}", command))
                    .map_err(|e| remote_failure(command, &e))?;
                self.background.push((host.to_string(), handle));
                Ok(CommandOutcome::detached())
            }
        }
    }

    fn capture(&mut self, command: &str) -> Result<String> {
        debug!(command, "capture");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| spawn_failure(command, &e))?;
        if !output.status.success() {
            warn!(command, code = ?output.status.code(), "command exited with non-zero status");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn sleep(&mut self, seconds: u64) {
        thread::sleep(Duration::from_secs(seconds));
    }

    fn join_background(&mut self) {
        for (host, handle) in self.background.drain(..) {
            let (_, result) = handle.join();
            // killed forwarders exit non-zero
            if let Err(e) = remote_outcome(&host, "background command", result) {
                warn!(host = %host, error = %e, "background command failed");
            }
        }
    }
}
