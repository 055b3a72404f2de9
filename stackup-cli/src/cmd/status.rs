use serde::Serialize;
use stackup_core::{ServiceHealth, StackupError};
use stackup_exec::Toolchain;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{load_stack_config, report_error};
use crate::{ConfigArgs, OutputArgs};

#[derive(Serialize)]
struct StatusResult {
    project: String,
    all_ready: bool,
    services: Vec<ServiceHealth>,
}

/// One poll iteration, no waiting. Exits non-zero unless every service is ready.
pub async fn status_cmd(config: ConfigArgs, output: OutputArgs) -> i32 {
    let config = match load_stack_config(&config, None) {
        Ok(c) => c,
        Err(e) => return report_error(&output, &StackupError::from(e)),
    };
    let tools = match Toolchain::system(&config) {
        Ok(t) => t,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to set up HTTP client: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let snapshot = tools.poller().snapshot(&config.services).await;
    let services: Vec<ServiceHealth> = config
        .services
        .iter()
        .filter_map(|id| snapshot.get(id).cloned())
        .collect();
    let all_ready = services.iter().all(ServiceHealth::is_ready);
    let result = StatusResult {
        project: config.project.clone(),
        all_ready,
        services,
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("project {}:", result.project);
        for s in &result.services {
            let icon = if s.is_ready() { "✓" } else { "✗" };
            println!("  {icon} {s}");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if all_ready {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUNTIME_ERROR
    }
}
