use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "stackup", version, about = "Install and tear down the application stack")]
struct Cli {
    /// Debug-level engine logs on stderr. `STACKUP_LOG` takes precedence.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "stackup=debug,info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("STACKUP_LOG").unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Install {
            config,
            install,
            no_rollback,
            output,
        } => cmd::install::install_cmd(config, install, no_rollback, output).await,
        Command::Uninstall {
            config,
            install,
            force,
            output,
        } => cmd::uninstall::uninstall_cmd(config, install, force, output).await,
        Command::Status { config, output } => cmd::status::status_cmd(config, output).await,
        Command::Doctor { config, output } => cmd::doctor::doctor_cmd(config, output).await,
        Command::Config { config, output } => cmd::config::config_cmd(config, output).await,
    }
}
