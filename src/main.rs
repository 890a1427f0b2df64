//! Report Runner - run commands and collect the structured reports they print.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use report_runner::config::{ConfigError, ConfigLoader};
use report_runner::display;
use report_runner::factory::{FactoryError, ProcessFactory};
use report_runner::process::{ProcessError, ProcessEvent, ProcessId, ProcessOptions};
use report_runner::runner::SshOptions;

#[derive(Parser)]
#[command(
    name = "report-runner",
    about = "Run commands and collect the structured reports they print",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command and print its reports as JSON lines.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Runner to use (default, npm, yarn). Detected from the command if omitted.
    #[arg(long)]
    runner: Option<String>,
    /// Process identifier. Generated if omitted.
    #[arg(long)]
    id: Option<String>,
    /// Target platform tag, such as linux or win32.
    #[arg(long)]
    platform: Option<String>,
    /// Working directory for the command.
    #[arg(long)]
    cwd: Option<PathBuf>,
    /// Run on this host through ssh.
    #[arg(long)]
    ssh_host: Option<String>,
    /// Remote user for ssh.
    #[arg(long, requires = "ssh_host")]
    ssh_user: Option<String>,
    /// Remote port for ssh.
    #[arg(long, requires = "ssh_host")]
    ssh_port: Option<u16>,
    /// Command followed by its arguments.
    #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
    command: Vec<String>,
}

impl RunArgs {
    fn to_options(&self) -> ProcessOptions {
        let (command, args) = self
            .command
            .split_first()
            .map_or((String::new(), &[][..]), |(c, a)| (c.clone(), a));

        let mut options = ProcessOptions::new(command).args(args.iter().cloned());
        if let Some(ref runner) = self.runner {
            options = options.force_runner(runner.clone());
        }
        if let Some(ref platform) = self.platform {
            options = options.platform(platform.as_str());
        }
        if let Some(ref dir) = self.cwd {
            options = options.working_dir(dir.clone());
        }
        if let Some(ref host) = self.ssh_host {
            let mut ssh = SshOptions::new(host.clone());
            if let Some(ref user) = self.ssh_user {
                ssh = ssh.user(user.clone());
            }
            if let Some(port) = self.ssh_port {
                ssh = ssh.port(port);
            }
            options = options.ssh(ssh);
        }
        options
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(ref args) => run(cli.config.clone(), args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<PathBuf>, args: &RunArgs) -> Result<ExitCode, RunError> {
    let loader = config_path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = loader.load()?;
    let factory = ProcessFactory::from_config(config);
    let pool = factory.pool().clone();

    let mut process = factory.make(args.to_options(), args.id.clone().map(ProcessId::from))?;
    let events = UnboundedReceiverStream::new(process.subscribe());
    display::print_process_start(process.id(), process.runner(), process.invocation());

    let running = process.spawn()?;
    let printer = tokio::spawn(print_events(events));

    let wait = running.wait();
    tokio::pin!(wait);
    let result = tokio::select! {
        result = &mut wait => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, cancelling processes");
            pool.cancel_all();
            wait.await
        }
    };

    // The channel closes once the driver drops the process.
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Report printer failed");
    }

    match result {
        Ok(summary) => {
            display::print_process_closed(&summary);
            Ok(ExitCode::from(u8::try_from(summary.exit_code).unwrap_or(1)))
        }
        Err(ProcessError::Interrupted { exit_code, message }) => {
            tracing::debug!(exit_code, "Process exited mid-report");
            display::print_error(&message);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

async fn print_events(mut events: UnboundedReceiverStream<ProcessEvent>) {
    while let Some(event) = events.next().await {
        match event {
            ProcessEvent::Report(report) => display::print_report(&report),
            ProcessEvent::InvalidReport { process_id, error } => {
                display::print_invalid_report(&process_id, &error);
            }
            ProcessEvent::Closed { .. } | ProcessEvent::Errored { .. } => {}
        }
    }
}
