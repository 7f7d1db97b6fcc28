use crate::cli::args::{CheckArgs, OutputFormat, RunArgs};
use crate::config::Config;
use crate::logging;
use crate::scenario::Scenario;
use crate::ui::formatter::Formatter;
use crate::ToolError;

fn print_info(message: impl AsRef<str>) {
    println!("{}", Formatter::info(message));
}

fn print_success(message: impl AsRef<str>) {
    println!("{}", Formatter::success(message));
}

/// Execute the run command
pub fn run(args: RunArgs, config: &Config) -> miette::Result<()> {
    let format = args.format();
    if format == OutputFormat::Text {
        print_info(format!("Loading scenario: {:?}", args.scenario));
    }
    let scenario = Scenario::load(&args.scenario)?;
    let report = scenario.run(config.ledger)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                ToolError::FileError(format!("Failed to serialize report: {}", e))
            })?;
            println!("{}", json);
        }
        OutputFormat::Text => println!("{}", Formatter::format_report(&report)),
    }
    logging::log_display(
        format!("{} call(s) recorded", report.calls.len()),
        logging::LogLevel::Debug,
    );

    if report.passed() {
        Ok(())
    } else {
        Err(ToolError::ScenarioFailed(format!(
            "`{}` had {} failure(s)",
            report.name,
            report.failures()
        ))
        .into())
    }
}

/// Execute the check command
pub fn check(args: CheckArgs, config: &Config) -> miette::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let summary = scenario.check(config.ledger)?;
    print_success(format!(
        "Scenario is valid ({})",
        Formatter::format_summary(scenario.name(), &summary)
    ));
    Ok(())
}
