use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, configure and start the stack. Rolls back on failure.
    Install {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        install: InstallArgs,
        /// Leave completed steps in place when a later step fails.
        #[arg(long)]
        no_rollback: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Stop the stack and remove everything install created.
    Uninstall {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        install: InstallArgs,
        /// Do not ask for confirmation.
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the current health of every configured service.
    Status {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check that required tools are installed and the config is valid.
    Doctor {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the effective configuration.
    Config {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
