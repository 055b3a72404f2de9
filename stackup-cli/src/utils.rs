use std::path::PathBuf;
use std::sync::Arc;

use stackup_core::{load_config, validate_config, ConfigError, ConfigOverrides, StackConfig, StackupError};
use stackup_exec::workflow::{
    CompositeEventSink, EventSink, StdoutEventSink, TextEventSink, TracingEventSink,
};

use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::{ConfigArgs, InstallArgs, OutputArgs};

pub fn config_path(args: &ConfigArgs) -> Option<PathBuf> {
    args.config
        .clone()
        .or_else(|| std::env::var_os("STACKUP_CONFIG").map(PathBuf::from))
}

/// Loads the config file (or defaults), applies command-line overrides and re-validates.
pub fn load_stack_config(
    args: &ConfigArgs,
    overrides: Option<&ConfigOverrides>,
) -> Result<StackConfig, ConfigError> {
    let mut config = load_config(config_path(args).as_deref())?;
    if let Some(overrides) = overrides {
        config.apply_overrides(overrides);
        validate_config(&config)?;
    }
    Ok(config)
}

pub fn overrides(install: &InstallArgs, no_rollback: bool) -> ConfigOverrides {
    ConfigOverrides {
        install_dir: install.install_dir.clone(),
        env_file: install.env_file.clone(),
        step_timeout_seconds: install.timeout,
        disable_rollback: no_rollback,
    }
}

/// Prints a config or plan error and returns the matching exit code.
pub fn report_error(output: &OutputArgs, err: &StackupError) -> i32 {
    match err {
        StackupError::Config(ConfigError::Invalid(invalid)) => {
            let lines = invalid
                .violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            print_error(
                output.format,
                output.quiet,
                &format!("{invalid}:\n  {}", lines.join("\n  ")),
            );
        }
        other => print_error(output.format, output.quiet, &other.to_string()),
    }
    exit_codes::CONFIG_INVALID
}

/// Progress goes to stdout as JSON lines or to stderr as text, and always to tracing.
pub fn event_sink(output: &OutputArgs) -> Arc<dyn EventSink> {
    let mut sink = CompositeEventSink::new();
    sink.add(Box::new(TracingEventSink));
    if !output.quiet {
        match output.format {
            OutputFormat::Json => sink.add(Box::new(StdoutEventSink)),
            OutputFormat::Text => sink.add(Box::new(TextEventSink)),
        }
    }
    Arc::new(sink)
}
