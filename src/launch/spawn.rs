use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::args::split_args;
use super::env::expand_env;
use super::pidfile;
use crate::error::{LaunchStep, ProcessError, Result};
use crate::system::platform;

/// Everything needed to start one command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Executable name or path; bare names are looked up in `PATH`.
    pub command: String,
    /// Argument string, split with shell quoting rules.
    pub args: String,
    /// Working directory; the launcher's own when unset.
    pub dir: Option<PathBuf>,
    /// Ordered `KEY=VALUE` assignments, see [`expand_env`].
    pub env: Vec<String>,
    pub pid_file: Option<PathBuf>,
    pub write_pid_file: bool,
}

impl LaunchConfig {
    pub fn new(command: impl Into<String>) -> Self {
        LaunchConfig {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, assignment: impl Into<String>) -> Self {
        self.env.push(assignment.into());
        self
    }

    pub fn with_pid_file(mut self, path: impl AsRef<Path>) -> Self {
        self.pid_file = Some(path.as_ref().to_path_buf());
        self.write_pid_file = true;
        self
    }

    /// The pid file to record into, if recording is enabled.
    pub fn pid_file_target(&self) -> Option<&Path> {
        match &self.pid_file {
            Some(path) if self.write_pid_file => Some(path),
            _ => None,
        }
    }
}

/// Build the detached command for `config`.
///
/// Shared by [`start_process`] and the monitor so both paths resolve the
/// directory, arguments and environment identically.
pub(crate) fn build_command(config: &LaunchConfig) -> Result<Command> {
    let mut command = Command::new(&config.command);

    if let Some(dir) = &config.dir {
        let dir = resolve_dir(dir)
            .map_err(|e| ProcessError::launch(LaunchStep::WorkingDirectory, &config.command, e))?;
        command.current_dir(dir);
    }

    let args = split_args(&config.args).map_err(|e| {
        ProcessError::launch(
            LaunchStep::Arguments,
            &config.command,
            io::Error::new(io::ErrorKind::InvalidInput, e),
        )
    })?;
    command.args(&args);

    // Applied on top of the inherited environment. A PATH set here is also
    // used to look up the program itself.
    for entry in expand_env(&config.env) {
        if let Some((key, value)) = entry.split_once('=') {
            command.env(key, value);
        }
    }

    platform::detach(&mut command);
    debug!(command = %config.command, ?args, dir = ?config.dir, "prepared command");
    Ok(command)
}

fn resolve_dir(dir: &Path) -> io::Result<PathBuf> {
    let resolved = std::path::absolute(dir)?;
    if !resolved.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", resolved.display()),
        ));
    }
    Ok(resolved)
}

/// Check the pid file target of `config` before anything is launched, see
/// [`pidfile::prepare`]. Returns the target to hand to [`record_pid`].
pub(crate) fn prepare_pid_file(config: &LaunchConfig) -> Result<Option<&Path>> {
    let target = config.pid_file_target();
    if let Some(path) = target {
        pidfile::prepare(path)?;
    }
    Ok(target)
}

/// Record `pid` in the prepared pid file, if any.
///
/// When the write fails the process is asked to terminate, so the caller
/// never ends up with a running process it has no pid for.
pub(crate) fn record_pid(target: Option<&Path>, pid: u32, command: &str) -> Result<()> {
    let Some(path) = target else {
        return Ok(());
    };
    match pidfile::write_pid(path, pid) {
        Ok(()) => {
            debug!(pid, path = %path.display(), "pid recorded");
            Ok(())
        }
        Err(err) => {
            warn!(pid, command, path = %path.display(), error = %err, "pid not recorded; terminating process");
            if let Err(stop_err) = platform::terminate(pid) {
                warn!(pid, error = %stop_err, "terminating unrecorded process failed");
            }
            Err(err)
        }
    }
}

/// Start `config` detached from this process and return its pid without
/// waiting for it to exit.
///
/// A configured pid file must not exist yet and its directory must be
/// creatable; both are checked before launching. The pid is written right
/// after the process is created.
pub fn start_process(config: &LaunchConfig) -> Result<u32> {
    let pid_file = prepare_pid_file(config)?;

    let mut command = build_command(config)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = command
        .spawn()
        .map_err(|e| ProcessError::launch(LaunchStep::Spawn, &config.command, e))?;
    let pid = child.id();
    info!(pid, command = %config.command, "process started");

    // Reap the child when it exits so it does not linger as a zombie while
    // this process keeps running.
    thread::spawn(move || {
        let _ = child.wait();
    });

    record_pid(pid_file, pid, &config.command)?;
    Ok(pid)
}
