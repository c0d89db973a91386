use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// The step of a launch that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchStep {
    WorkingDirectory,
    Arguments,
    Spawn,
    Wait,
}

impl fmt::Display for LaunchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LaunchStep::WorkingDirectory => "resolve working directory",
            LaunchStep::Arguments => "split arguments",
            LaunchStep::Spawn => "spawn",
            LaunchStep::Wait => "wait",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("refusing to touch pid {0}: pids below 2 are never inspected or signaled")]
    InvalidPid(i32),

    #[error("process {0} not found")]
    NotFound(i32),

    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("failed to {step} for `{command}`: {source}")]
    Launch {
        step: LaunchStep,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: ExitStatus },

    #[error("interrupted while waiting for `{command}`")]
    Interrupted { command: String },

    #[error("pid file {} already exists or its directory cannot be created", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to write pid file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read environment of process {pid}: {reason}")]
    Environ { pid: i32, reason: String },
}

impl ProcessError {
    pub(crate) fn launch(step: LaunchStep, command: &str, source: io::Error) -> Self {
        ProcessError::Launch {
            step,
            command: command.to_string(),
            source,
        }
    }

    /// True when the wait was cut short by an external interrupt rather than
    /// a failure of the supervised command.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ProcessError::Interrupted { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Pids 0 and 1 (and negative values, which address process groups) are
/// rejected before any OS call.
pub fn check_pid(pid: i32) -> Result<u32> {
    if pid <= 1 {
        return Err(ProcessError::InvalidPid(pid));
    }
    Ok(pid as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_pids_are_rejected() {
        for pid in [i32::MIN, -1, 0, 1] {
            assert!(matches!(check_pid(pid), Err(ProcessError::InvalidPid(p)) if p == pid));
        }
        assert_eq!(check_pid(2).unwrap(), 2);
    }

    #[test]
    fn launch_error_names_the_step() {
        let err = ProcessError::launch(
            LaunchStep::WorkingDirectory,
            "ls",
            io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        );
        assert_eq!(
            err.to_string(),
            "failed to resolve working directory for `ls`: no such directory"
        );
        assert!(!err.is_interrupted());
    }

    #[test]
    fn interrupted_is_distinguished_by_kind() {
        let err = ProcessError::Interrupted {
            command: "top".into(),
        };
        assert!(err.is_interrupted());
        assert!(!err.is_not_found());
    }
}
