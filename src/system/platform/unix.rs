use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::{Pid, setsid};
use tracing::debug;

use crate::error::{ProcessError, Result};

pub(super) fn detach(command: &mut Command) {
    // SAFETY: the hook runs in the forked child before exec and only calls
    // setsid(2), which is async-signal-safe.
    unsafe {
        command.pre_exec(|| setsid().map(|_| ()).map_err(io::Error::from));
    }
}

pub(super) fn terminate(pid: u32) -> Result<()> {
    let raw = pid as i32;
    debug!(pid, "sending SIGTERM");
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(ProcessError::NotFound(raw)),
        Err(errno) => Err(ProcessError::Signal {
            pid: raw,
            source: io::Error::from(errno),
        }),
    }
}
