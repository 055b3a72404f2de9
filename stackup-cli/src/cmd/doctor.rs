use serde::Serialize;
use stackup_exec::tools::{probe_program, REQUIRED_PROGRAMS};

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::utils::{config_path, load_stack_config};
use crate::{ConfigArgs, OutputArgs};

#[derive(Serialize)]
struct Check {
    name: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Check {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "ok".to_string(),
            message: Some(message.into()),
        }
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct DoctorResult {
    checks: Vec<Check>,
    all_passed: bool,
}

pub async fn doctor_cmd(config: ConfigArgs, output: OutputArgs) -> i32 {
    let mut checks = Vec::new();

    for program in REQUIRED_PROGRAMS {
        checks.push(match probe_program(program).await {
            Ok(version) => Check::ok(program, version),
            Err(e) => Check::error(program, e.to_string()),
        });
    }
    checks.push(check_config(&config));

    let all_passed = checks.iter().all(|c| c.status == "ok");
    let result = DoctorResult { checks, all_passed };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("Environment checks:");
        for c in &result.checks {
            let icon = if c.status == "ok" { "✓" } else { "✗" };
            print!("  {} {}: {}", icon, c.name, c.status);
            if let Some(msg) = &c.message {
                print!(" - {msg}");
            }
            println!();
        }
        if result.all_passed {
            println!("\nAll checks passed.");
        } else {
            println!("\nSome checks failed.");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if all_passed {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUNTIME_ERROR
    }
}

fn check_config(args: &ConfigArgs) -> Check {
    let source = config_path(args)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    match load_stack_config(args, None) {
        Ok(config) => Check::ok(
            "config",
            format!("{source}: {} services, install dir {}", config.services.len(), config.install_dir.display()),
        ),
        Err(e) => Check::error("config", format!("{source}: {e}")),
    }
}
