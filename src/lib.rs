pub mod config;
pub mod error;
pub mod format;
pub mod launch;
pub mod logging;
pub mod system;

pub use error::{LaunchStep, ProcessError, Result};
pub use launch::{LaunchConfig, run_process, start_process, stop_service};
pub use system::environ::{get_environ, recover_environ};
pub use system::inspect::{get_process, get_processes};
pub use system::kill::stop_service_by_pid;
pub use system::process::{ChildSnapshot, ProcessSnapshot};
