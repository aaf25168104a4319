//! Per-file dispatch to the language analyzers over a worker pool.

use std::path::{Path, PathBuf};

use ibmi_cl::ClAnalysis;
use ibmi_db2::Db2Analysis;
use ibmi_dspf::DspfAnalysis;
use ibmi_encoding::{load_with, TextEncoding, DEFAULT_ENCODINGS};
use ibmi_lang_core::{has_errors, Diagnostic};
use ibmi_rpg::RpgAnalysis;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::kind::{infer_from_content, infer_from_path, Kind, Mode};

/// One file to analyze and its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub kind: Kind,
}

impl InputSpec {
    pub fn new(path: impl Into<PathBuf>, kind: Kind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// An input whose kind is inferred.
    pub fn auto(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Kind::Auto)
    }
}

/// Everything a pipeline run produced, grouped by language.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineResult {
    pub cl: Vec<ClAnalysis>,
    pub rpg: Vec<RpgAnalysis>,
    pub db2: Vec<Db2Analysis>,
    pub dspf: Vec<DspfAnalysis>,
    /// Every diagnostic of the run, in input order.
    pub diagnostics: Vec<Diagnostic>,
    /// Inputs no analyzer ran on.
    pub skipped: Vec<PathBuf>,
}

impl PipelineResult {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// Number of files an analyzer ran on.
    pub fn analyzed_count(&self) -> usize {
        self.cl.len() + self.rpg.len() + self.db2.len() + self.dspf.len()
    }

    fn push(&mut self, outcome: FileOutcome) {
        self.diagnostics.extend(outcome.diagnostics);
        match outcome.analyzed {
            Some(Analyzed::Cl(analysis)) => self.cl.push(analysis),
            Some(Analyzed::Rpg(analysis)) => self.rpg.push(analysis),
            Some(Analyzed::Db2(analysis)) => self.db2.push(analysis),
            Some(Analyzed::Dspf(analysis)) => self.dspf.push(analysis),
            None => self.skipped.push(outcome.path),
        }
    }
}

enum Analyzed {
    Cl(ClAnalysis),
    Rpg(RpgAnalysis),
    Db2(Db2Analysis),
    Dspf(DspfAnalysis),
}

struct FileOutcome {
    path: PathBuf,
    analyzed: Option<Analyzed>,
    diagnostics: Vec<Diagnostic>,
}

impl FileOutcome {
    fn skipped(path: &Path, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            path: path.to_path_buf(),
            analyzed: None,
            diagnostics,
        }
    }
}

/// The four analyzers configured once and shared by every worker.
struct Dispatcher {
    mode: Mode,
    encodings: Vec<TextEncoding>,
    cl: ibmi_cl::Analyzer,
    rpg: ibmi_rpg::Analyzer,
    db2: ibmi_db2::Analyzer,
    dspf: ibmi_dspf::Analyzer,
}

impl Dispatcher {
    fn new(config: &PipelineConfig) -> Self {
        let encodings = config.text_encodings().unwrap_or_else(|err| {
            warn!(error = %err, "invalid encoding list, using defaults");
            DEFAULT_ENCODINGS.to_vec()
        });
        let grammar = config.grammar;
        Self {
            mode: config.mode,
            cl: ibmi_cl::Analyzer::new()
                .with_parser(ibmi_cl::Parser::with_grammar(grammar))
                .with_encodings(encodings.clone()),
            rpg: ibmi_rpg::Analyzer::new()
                .with_parser(ibmi_rpg::Parser::with_grammar(grammar))
                .with_encodings(encodings.clone()),
            db2: ibmi_db2::Analyzer::new()
                .with_parser(ibmi_db2::Parser::with_grammar(grammar))
                .with_encodings(encodings.clone()),
            dspf: ibmi_dspf::Analyzer::new()
                .with_parser(ibmi_dspf::Parser::with_grammar(grammar))
                .with_encodings(encodings.clone()),
            encodings,
        }
    }

    fn process(&self, input: &InputSpec) -> FileOutcome {
        let path = input.path.as_path();
        let shown = path.display().to_string();

        let mut kind = match input.kind {
            Kind::Auto => infer_from_path(path),
            declared => declared,
        };
        // Text read while sniffing is analyzed directly instead of reloaded.
        let mut source = None;
        if kind == Kind::Auto {
            match load_with(path, &self.encodings) {
                Ok(text) => {
                    kind = infer_from_content(&text, &shown);
                    source = Some(text);
                }
                Err(err) => {
                    warn!(path = %shown, error = %err, "could not load file for kind inference");
                    let diagnostic = Diagnostic::error(shown, 0, 0, err.to_string());
                    return FileOutcome::skipped(path, vec![diagnostic]);
                }
            }
        }

        let Some(selected) = self.mode.select(kind) else {
            debug!(path = %shown, %kind, mode = %self.mode, "no analyzer selected");
            return FileOutcome::skipped(path, Vec::new());
        };
        debug!(path = %shown, %kind, analyzer = %selected, "dispatching");

        let source = source.as_deref();
        let analyzed = match selected {
            Kind::Cl => Analyzed::Cl(match source {
                Some(text) => self.cl.analyze_source(text, &shown),
                None => self.cl.analyze(path),
            }),
            Kind::Rpg => Analyzed::Rpg(match source {
                Some(text) => self.rpg.analyze_source(text, &shown),
                None => self.rpg.analyze(path),
            }),
            Kind::Db2 => Analyzed::Db2(match source {
                Some(text) => self.db2.analyze_source(text, &shown),
                None => self.db2.analyze(path),
            }),
            Kind::Dspf => Analyzed::Dspf(match source {
                Some(text) => self.dspf.analyze_source(text, &shown),
                None => self.dspf.analyze(path),
            }),
            Kind::Auto => return FileOutcome::skipped(path, Vec::new()),
        };
        let diagnostics = match &analyzed {
            Analyzed::Cl(a) => a.diagnostics.clone(),
            Analyzed::Rpg(a) => a.diagnostics.clone(),
            Analyzed::Db2(a) => a.diagnostics.clone(),
            Analyzed::Dspf(a) => a.diagnostics.clone(),
        };
        FileOutcome {
            path: path.to_path_buf(),
            analyzed: Some(analyzed),
            diagnostics,
        }
    }
}

/// Run the pipeline with the default configuration and the given mode.
pub fn run(inputs: &[InputSpec], mode: Mode) -> PipelineResult {
    let config = PipelineConfig {
        mode,
        ..PipelineConfig::default()
    };
    run_with_config(inputs, &config)
}

/// Analyze every input, in parallel, returning results in input order.
///
/// Never fails: unreadable files and unresolvable kinds are reported through
/// `diagnostics` and `skipped`.
pub fn run_with_config(inputs: &[InputSpec], config: &PipelineConfig) -> PipelineResult {
    let dispatcher = Dispatcher::new(config);
    let outcomes: Vec<FileOutcome> = match worker_pool(config.max_workers) {
        Some(pool) => pool.install(|| inputs.par_iter().map(|input| dispatcher.process(input)).collect()),
        None => inputs.par_iter().map(|input| dispatcher.process(input)).collect(),
    };

    let mut result = PipelineResult::default();
    for outcome in outcomes {
        result.push(outcome);
    }
    info!(
        files = inputs.len(),
        analyzed = result.analyzed_count(),
        skipped = result.skipped.len(),
        diagnostics = result.diagnostics.len(),
        "pipeline finished"
    );
    result
}

/// A dedicated pool when a worker count is configured.
fn worker_pool(max_workers: Option<usize>) -> Option<rayon::ThreadPool> {
    let workers = max_workers?;
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            warn!(workers, error = %err, "could not build worker pool, using the global pool");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_outcomes_are_grouped_by_language() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            InputSpec::auto(write(dir.path(), "A.clle", "PGM\nCALL PGM(FOO)\nENDPGM\n")),
            InputSpec::auto(write(dir.path(), "B.sql", "SELECT A FROM T;\n")),
            InputSpec::auto(write(dir.path(), "C.txt", "nothing to see\n")),
        ];
        let result = run(&inputs, Mode::Combined);
        assert_eq!(result.cl.len(), 1);
        assert_eq!(result.db2.len(), 1);
        assert_eq!(result.analyzed_count(), 2);
        assert_eq!(result.skipped, vec![inputs[2].path.clone()]);
    }

    #[test]
    fn test_sniffed_text_is_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "MEMBER", "**FREE\ndcl-s count int(10);\n");
        let result = run(&[InputSpec::auto(&path)], Mode::Auto);
        assert_eq!(result.rpg.len(), 1);
        assert!(result.rpg[0].ast.as_ref().unwrap().is_free_format);
    }

    #[test]
    fn test_worker_pool_sizes() {
        assert!(worker_pool(None).is_none());
        assert_eq!(worker_pool(Some(2)).map(|p| p.current_num_threads()), Some(2));
    }
}
