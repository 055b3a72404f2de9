use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_result<T: Serialize>(format: OutputFormat, quiet: bool, result: &T) {
    if quiet {
        return;
    }
    let rendered = match format {
        OutputFormat::Text => serde_json::to_string_pretty(result),
        OutputFormat::Json => serde_json::to_string(result),
    };
    if let Ok(json) = rendered {
        println!("{json}");
    }
}

pub fn print_error(format: OutputFormat, quiet: bool, message: &str) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => eprintln!("error: {message}"),
        OutputFormat::Json => {
            let err = serde_json::json!({"error": message});
            eprintln!("{}", serde_json::to_string(&err).unwrap_or_default());
        }
    }
}

/// Operator-facing rollback summary: what was undone, what failed, what is still there.
pub fn print_rollback_text(report: &stackup_core::RollbackReport) {
    if !report.compensated.is_empty() {
        println!("undone: {}", report.compensated.join(", "));
    }
    if !report.failures.is_empty() {
        println!("compensation failures:");
        for failure in &report.failures {
            println!("  - {failure}");
        }
    }
    if !report.leftovers.is_empty() {
        println!("still present (remove manually):");
        for item in &report.leftovers {
            println!("  - {item}");
        }
    }
}
