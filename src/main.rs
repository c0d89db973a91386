use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use svcproc::config::{self, Config, load_config, load_config_from_path};
use svcproc::launch::{LaunchConfig, pidfile};
use svcproc::logging::{LogFormat, init_tracing};
use svcproc::{ProcessError, get_environ, get_processes, run_process, start_process};
use svcproc::{stop_service, stop_service_by_pid};

/// Exit status used when a wait is cut short by Ctrl+C.
const INTERRUPTED_EXIT: u8 = 130;

#[derive(Parser)]
#[command(
    name = "svcproc",
    about = "Start, supervise, stop and inspect service processes"
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `svcproc=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a detached process and print its pid.
    Start(LaunchArgs),
    /// Run a process, streaming its output until it exits or Ctrl+C.
    Run(LaunchArgs),
    /// Ask a process to terminate.
    Stop { pid: i32 },
    /// Print process snapshots as JSON.
    Inspect {
        #[arg(required = true)]
        pids: Vec<i32>,
    },
    /// Print the environment of a process, one entry per line.
    Environ { pid: i32 },
    /// Manage a service defined in the config file.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Args)]
struct LaunchArgs {
    /// Executable name or path
    command: String,

    /// Argument string, split with shell quoting rules
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    args: String,

    /// Working directory
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Environment assignment `KEY=VALUE`; may reference earlier ones
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Record the pid in this file; it must not exist yet
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

impl From<LaunchArgs> for LaunchConfig {
    fn from(args: LaunchArgs) -> Self {
        LaunchConfig {
            command: args.command,
            args: args.args,
            dir: args.dir,
            env: args.env,
            write_pid_file: args.pid_file.is_some(),
            pid_file: args.pid_file,
        }
    }
}

#[derive(Subcommand)]
enum ServiceAction {
    Start { name: String },
    Stop { name: String },
    Status { name: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_tracing(&config.general.log_level, config.general.log_format)?;

    match dispatch(cli.command, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<ProcessError>() {
            Some(process_err) if process_err.is_interrupted() => {
                eprintln!("{process_err}");
                Ok(ExitCode::from(INTERRUPTED_EXIT))
            }
            _ => Err(err),
        },
    }
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ref level) = cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }

    config
}

async fn dispatch(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Start(args) => {
            let pid = start_process(&args.into())?;
            println!("{pid}");
        }
        Command::Run(args) => run_process(&args.into(), print_line).await?,
        Command::Stop { pid } => stop_service_by_pid(pid)?,
        Command::Inspect { pids } => {
            let snapshots = get_processes(&pids);
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Command::Environ { pid } => {
            for entry in get_environ(pid)? {
                println!("{entry}");
            }
        }
        Command::Service { action } => run_service_action(action, config).await?,
    }
    Ok(())
}

async fn run_service_action(action: ServiceAction, config: &Config) -> Result<()> {
    match action {
        ServiceAction::Start { name } => {
            let service = lookup_service(config, &name)?;
            let pid = start_process(&service.start)?;
            println!("{pid}");
        }
        ServiceAction::Stop { name } => {
            let service = lookup_service(config, &name)?;
            match &service.stop {
                Some(stop) => stop_service(stop, print_line).await?,
                None => {
                    let path = service_pid_file(service, &name)?;
                    let pid = pidfile::read_pid(path)?;
                    stop_service_by_pid(pid)?;
                    pidfile::remove(path)?;
                }
            }
        }
        ServiceAction::Status { name } => {
            let service = lookup_service(config, &name)?;
            let path = service_pid_file(service, &name)?;
            let pid = pidfile::read_pid(path)?;
            let snapshot = svcproc::get_process(pid)
                .wrap_err_with(|| format!("service `{name}` is not running"))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}

fn lookup_service<'a>(config: &'a Config, name: &str) -> Result<&'a config::ServiceConfig> {
    config
        .service(name)
        .ok_or_else(|| eyre!("no service named `{name}` in the config file"))
}

fn service_pid_file<'a>(
    service: &'a config::ServiceConfig,
    name: &str,
) -> Result<&'a std::path::Path> {
    service
        .start
        .pid_file
        .as_deref()
        .ok_or_else(|| eyre!("service `{name}` has no pid file configured"))
}

fn print_line(line: String) {
    println!("{line}");
}
