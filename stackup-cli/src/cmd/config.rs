use stackup_core::StackupError;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{load_stack_config, report_error};
use crate::{ConfigArgs, OutputArgs};

/// Prints the validated configuration with defaults filled in.
pub async fn config_cmd(config: ConfigArgs, output: OutputArgs) -> i32 {
    let config = match load_stack_config(&config, None) {
        Ok(c) => c,
        Err(e) => return report_error(&output, &StackupError::from(e)),
    };

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &config),
        OutputFormat::Text => match serde_yaml::to_string(&config) {
            Ok(yaml) if !output.quiet => print!("{yaml}"),
            Ok(_) => {}
            Err(e) => {
                print_error(output.format, output.quiet, &format!("failed to render config: {e}"));
                return exit_codes::RUNTIME_ERROR;
            }
        },
    }
    exit_codes::SUCCESS
}
