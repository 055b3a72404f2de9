use std::io::IsTerminal;
use std::sync::Arc;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use stackup_core::{StackConfig, StackupError};
use stackup_exec::plan::{Credentials, InstallPlan};
use stackup_exec::{Installer, Toolchain};

use crate::exit_codes;
use crate::output::{print_error, print_result, print_rollback_text, OutputFormat};
use crate::utils::{event_sink, load_stack_config, overrides, report_error};
use crate::{ConfigArgs, InstallArgs, OutputArgs};

pub async fn uninstall_cmd(
    config: ConfigArgs,
    install: InstallArgs,
    force: bool,
    output: OutputArgs,
) -> i32 {
    let overrides = overrides(&install, false);
    let config = match load_stack_config(&config, Some(&overrides)) {
        Ok(c) => Arc::new(c),
        Err(e) => return report_error(&output, &StackupError::from(e)),
    };

    if !force && !install.dry_run {
        if let Err(code) = confirm(&config, &output) {
            return code;
        }
    }

    let tools = match Toolchain::system(&config) {
        Ok(t) => t,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to set up HTTP client: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    // only the compensations are used; the fresh secrets are never written
    let plan = match InstallPlan::install(config.clone(), &tools, Arc::new(Credentials::generate())) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("invalid api url: {e}"));
            return exit_codes::CONFIG_INVALID;
        }
    };
    let plan = if install.dry_run { plan.into_dry_run() } else { plan };

    let report = Installer::new(config.clone(), event_sink(&output))
        .uninstall(&plan)
        .await;

    if output.format == OutputFormat::Text && !output.quiet {
        print_rollback_text(&report.rollback);
        if report.rollback.is_clean() {
            println!("uninstall complete (run {})", report.run_id);
        }
    } else {
        print_result(output.format, output.quiet, &report);
    }

    if report.rollback.succeeded {
        exit_codes::SUCCESS
    } else {
        exit_codes::ROLLBACK_INCOMPLETE
    }
}

fn confirm(config: &StackConfig, output: &OutputArgs) -> Result<(), i32> {
    if !std::io::stdin().is_terminal() {
        print_error(
            output.format,
            output.quiet,
            "refusing to uninstall without confirmation; pass --force in non-interactive use",
        );
        return Err(exit_codes::ABORTED);
    }

    let prompt = format!(
        "Stop project `{}` and delete everything under {}?",
        config.project,
        config.install_dir.display()
    );
    match Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
    {
        Ok(true) => Ok(()),
        Ok(false) => {
            print_error(output.format, output.quiet, "uninstall aborted");
            Err(exit_codes::ABORTED)
        }
        Err(e) => {
            print_error(output.format, output.quiet, &format!("confirmation failed: {e}"));
            Err(exit_codes::ABORTED)
        }
    }
}
