//! Library side of the `ibmi-analyze` command.

pub mod cli;
pub mod output;

use std::process::ExitCode;

use ibmi_pipeline::run_with_config;
use miette::Result;
use tracing::debug;

pub use cli::Cli;
pub use output::OutputFormat;

/// Run the analysis described by `cli`, printing to stdout.
///
/// Returns exit code 1 when any error diagnostic was produced. Config
/// problems are returned as errors for the caller to report.
pub fn execute(cli: &Cli) -> Result<ExitCode> {
    let config = cli.pipeline_config()?;
    debug!(?config, files = cli.files.len(), "starting analysis");

    let result = run_with_config(&cli.inputs(), &config);
    print!("{}", output::render(&result, cli.format, cli.tree)?);
    if cli.format == OutputFormat::Json {
        println!();
    }

    Ok(if result.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
