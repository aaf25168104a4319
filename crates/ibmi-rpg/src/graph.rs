//! Parent/child graph over the RPG AST, rendered as a Mermaid flowchart.

use std::fmt::Write;

use serde::Serialize;

use crate::ast::{Program, Statement};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: usize,
    pub label: String,
}

/// Program, procedures and statements as nodes; edges run parent to child.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RpgGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<(usize, usize)>,
}

impl RpgGraph {
    pub fn from_program(program: &Program) -> Self {
        let mut graph = Self::default();
        let root = graph.add(format!("RpgProgram {}", program.loc.file));
        for stmt in &program.main_body {
            graph.statement(root, stmt);
        }
        for procedure in &program.procedures {
            let id = graph.add(format!("Procedure {}", procedure.name));
            graph.edges.push((root, id));
            for stmt in &procedure.body {
                graph.statement(id, stmt);
            }
        }
        graph
    }

    fn add(&mut self, label: String) -> usize {
        let id = self.nodes.len() + 1;
        self.nodes.push(GraphNode { id, label });
        id
    }

    fn statement(&mut self, parent: usize, stmt: &Statement) {
        let id = self.add(statement_label(stmt));
        self.edges.push((parent, id));
        for child in stmt.children() {
            self.statement(id, child);
        }
    }

    /// `graph TD` source with one `nN["label"]` line per node followed by
    /// the edges.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        for node in &self.nodes {
            let label = node.label.replace('"', "#quot;");
            let _ = writeln!(out, "    n{}[\"{label}\"]", node.id);
        }
        for (from, to) in &self.edges {
            let _ = writeln!(out, "    n{from} --> n{to}");
        }
        out
    }
}

fn statement_label(stmt: &Statement) -> String {
    match stmt {
        Statement::Assign { target, .. } => format!("Assign {}", target.text()),
        Statement::Call { name, .. } => format!("Call {name}"),
        Statement::If { .. } => "If".to_string(),
        Statement::Select { .. } => "Select".to_string(),
        Statement::DoFor { kind, .. } => kind.as_str().to_string(),
        Statement::Return { .. } => "Return".to_string(),
        Statement::EmbeddedSql(sql) => format!("SQL {}", sql.stmt_type.as_deref().unwrap_or("?")),
    }
}
