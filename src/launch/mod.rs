pub mod args;
pub mod env;
pub mod monitor;
pub mod pidfile;
pub mod spawn;

pub use monitor::{interrupt_signal, run_process, run_process_until, stop_service};
pub use spawn::{LaunchConfig, start_process};
