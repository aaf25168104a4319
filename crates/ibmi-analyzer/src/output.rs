//! Text and JSON rendering of a pipeline result.

use clap::ValueEnum;
use ibmi_pipeline::PipelineResult;
use miette::{IntoDiagnostic, Result};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render `result` in `format`.
pub fn render(result: &PipelineResult, format: OutputFormat, trees: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result, trees)),
        OutputFormat::Json => render_json(result),
    }
}

/// Diagnostics first, one per line, then one block per analyzed file.
pub fn render_text(result: &PipelineResult, trees: bool) -> String {
    let mut blocks = Vec::new();

    let mut head: Vec<String> = result.diagnostics.iter().map(ToString::to_string).collect();
    head.extend(result.skipped.iter().map(|p| format!("skipped: {}", p.display())));
    if !head.is_empty() {
        blocks.push(head.join("\n"));
    }

    let mut push = |summary: &str, tree: &str, graph: Option<String>| {
        blocks.push(summary.to_string());
        if trees {
            blocks.push(tree.to_string());
            blocks.extend(graph);
        }
    };
    for a in &result.cl {
        push(&a.summary, &a.ast_tree, None);
    }
    for a in &result.rpg {
        let graph = a.ast.is_some().then(|| a.graph.to_mermaid());
        push(&a.summary, &a.ast_tree, graph);
    }
    for a in &result.db2 {
        push(&a.summary, &a.ast_tree, None);
    }
    for a in &result.dspf {
        push(&a.summary, &a.ast_tree, None);
    }

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// The whole result as pretty-printed JSON.
pub fn render_json(result: &PipelineResult) -> Result<String> {
    serde_json::to_string_pretty(result).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibmi_pipeline::{run, InputSpec, Mode};

    fn sample() -> (tempfile::TempDir, PipelineResult) {
        let dir = tempfile::tempdir().unwrap();
        let rpg = dir.path().join("CALC.rpgle");
        std::fs::write(&rpg, "**FREE\ndcl-s x int(10);\nx = 1;\n").unwrap();
        let inputs = vec![InputSpec::auto(&rpg), InputSpec::auto(dir.path().join("GONE.sql"))];
        let result = run(&inputs, Mode::Combined);
        (dir, result)
    }

    #[test]
    fn test_text_layout() {
        let (_dir, result) = sample();
        let text = render_text(&result, false);
        let first = text.lines().next().unwrap();
        assert!(first.contains("GONE.sql:0:0: [error] file not found"), "{first}");
        assert!(text.contains("Summarization/Analysis Report"));
        assert!(!text.contains("AST Representation"));
        assert!(!text.contains("graph TD"));
    }

    #[test]
    fn test_trees_and_graph() {
        let (_dir, result) = sample();
        let text = render_text(&result, true);
        assert!(text.contains("AST Representation"));
        assert_eq!(text.matches("graph TD").count(), 1);
    }

    #[test]
    fn test_json_is_the_pipeline_result() {
        let (_dir, result) = sample();
        let json: serde_json::Value = serde_json::from_str(&render_json(&result).unwrap()).unwrap();
        assert_eq!(json["rpg"].as_array().unwrap().len(), 1);
        assert_eq!(json["db2"].as_array().unwrap().len(), 1);
        assert_eq!(json["diagnostics"][0]["severity"], "error");
        assert!(json["skipped"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_empty_result_renders_nothing() {
        assert_eq!(render_text(&PipelineResult::default(), true), "");
    }
}
