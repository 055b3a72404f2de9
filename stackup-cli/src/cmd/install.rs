use std::sync::Arc;

use stackup_core::StackupError;
use stackup_exec::plan::{Credentials, InstallPlan};
use stackup_exec::{InstallReport, Installer, Toolchain};

use crate::exit_codes;
use crate::output::{print_error, print_result, print_rollback_text, OutputFormat};
use crate::utils::{event_sink, load_stack_config, overrides, report_error};
use crate::{ConfigArgs, InstallArgs, OutputArgs};

pub async fn install_cmd(
    config: ConfigArgs,
    install: InstallArgs,
    no_rollback: bool,
    output: OutputArgs,
) -> i32 {
    let overrides = overrides(&install, no_rollback);
    let config = match load_stack_config(&config, Some(&overrides)) {
        Ok(c) => Arc::new(c),
        Err(e) => return report_error(&output, &StackupError::from(e)),
    };

    let tools = match Toolchain::system(&config) {
        Ok(t) => t,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to set up HTTP client: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let credentials = match Credentials::load_or_generate(&config.env_file()).await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            print_error(output.format, output.quiet, &format!("cannot reuse credentials: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let plan = match InstallPlan::install(config.clone(), &tools, credentials) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("invalid api url: {e}"));
            return exit_codes::CONFIG_INVALID;
        }
    };
    let plan = if install.dry_run { plan.into_dry_run() } else { plan };

    let installer = Installer::new(config.clone(), event_sink(&output));
    let report = match installer.install(&plan).await {
        Ok(r) => r,
        Err(e) => return report_error(&output, &StackupError::from(e)),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        print_install_text(&report, install.dry_run);
    } else {
        print_result(output.format, output.quiet, &report);
    }

    install_exit_code(&report)
}

fn print_install_text(report: &InstallReport, dry_run: bool) {
    let prefix = if dry_run { "dry run: " } else { "" };
    if report.succeeded() {
        println!(
            "{prefix}install complete ({} steps, run {})",
            report.outcome.completed_steps().len(),
            report.run_id
        );
        return;
    }

    if let Some(failure) = report.outcome.failure() {
        println!("{prefix}install failed: {failure}");
    }
    match &report.rollback {
        Some(rollback) => print_rollback_text(rollback),
        None => println!(
            "rollback disabled; completed steps left in place: {}",
            report.outcome.completed_steps().join(", ")
        ),
    }
}

fn install_exit_code(report: &InstallReport) -> i32 {
    match &report.rollback {
        _ if report.succeeded() => exit_codes::SUCCESS,
        Some(rollback) if !rollback.succeeded => exit_codes::ROLLBACK_INCOMPLETE,
        _ => exit_codes::INSTALL_FAILED,
    }
}
