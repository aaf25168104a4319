//! Command-line arguments and their translation into a pipeline run.

use std::path::PathBuf;

use clap::Parser;
use ibmi_pipeline::{InputSpec, Kind, Mode, PipelineConfig};
use miette::Result;

use crate::output::OutputFormat;

/// Parse and analyze IBM i CL, RPG, DB2 and DSPF source files.
#[derive(Debug, Parser)]
#[command(name = "ibmi-analyze", version, about)]
pub struct Cli {
    /// Source files to analyze.
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Kind of every file: auto, cl, rpg, db2 or dspf.
    #[arg(long, default_value = "auto", value_name = "KIND")]
    pub kind: Kind,

    /// Analyzers to run: auto, cl, rpg, db2, dspf or combined [default: combined].
    #[arg(long, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// TOML configuration file.
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Use only the heuristic fallback parsers.
    #[arg(long)]
    pub no_grammar: bool,

    /// Print AST trees (and the RPG graph) after each summary.
    #[arg(long)]
    pub tree: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// One input per file, all with the `--kind` given.
    pub fn inputs(&self) -> Vec<InputSpec> {
        self.files.iter().map(|f| InputSpec::new(f, self.kind)).collect()
    }

    /// The config file, if any, with command-line flags applied on top.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if self.no_grammar {
            config.grammar = false;
        }
        config.validate()?;
        Ok(config)
    }
}
