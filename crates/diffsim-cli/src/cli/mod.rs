mod commands;

use clap::Parser;
use diffsim_core::domain::SimError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let sim_error = error.as_sim_error();
            eprintln!("{}", sim_error.diagnostic_line());
            eprintln!("{}", sim_error.fatal_exit_line());
            sim_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("diffsim".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "diffsim",
    version,
    about = "Single-particle X-ray diffraction simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Propagate a configured experiment and summarize the diffraction patterns
    Run(commands::RunArgs),
    /// Print the default configuration as JSON
    Defaults,
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => {
            init_tracing(args.verbose);
            commands::run_simulation_command(args)
        }
        CliCommand::Defaults => commands::run_defaults_command(),
    }
}

// RUST_LOG wins over --verbose when set.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SimError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SimError> for CliError {
    fn from(error: SimError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_sim_error(&self) -> SimError {
        match self {
            Self::Usage(message) => SimError::configuration("CONFIG.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SimError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
