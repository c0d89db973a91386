use tracing::{info, warn};

use super::platform;
use crate::error::{Result, check_pid};

/// Ask `pid` to terminate with the platform's termination request
/// (SIGTERM on Unix). Returns once the request is delivered; it does not
/// wait for the process to exit.
pub fn stop_service_by_pid(pid: i32) -> Result<()> {
    let pid = check_pid(pid)?;
    let signal = platform::termination_signal_name();
    match platform::terminate(pid) {
        Ok(()) => {
            info!(pid, signal, "termination requested");
            Ok(())
        }
        Err(err) => {
            warn!(pid, signal, error = %err, "termination request failed");
            Err(err)
        }
    }
}
