use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// YAML or JSON config file. Falls back to `STACKUP_CONFIG`, then built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Flags shared by `install` and `uninstall`.
#[derive(Debug, Args, Clone)]
pub struct InstallArgs {
    /// Log every step instead of running it.
    #[arg(long)]
    pub dry_run: bool,
    /// Per-step timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Where the generated credentials file lives.
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    #[arg(long)]
    pub install_dir: Option<PathBuf>,
}
