//! Statement-splitting heuristic SQL parser.
//!
//! Never fails and never reports. The script is cut into candidate
//! statements at `;` outside quotes and comments, block comments are
//! blanked, `--` comment lines are dropped from each candidate, and the first keyword picks a targeted
//! extractor. Extractors only look for clause keywords at parenthesis depth
//! zero; they do not parse expressions. Candidates that start with anything
//! else are ignored.

use ibmi_lang_core::{normalize_line_endings, Diagnostic, LineIndex, ParseStrategy, QuoteTracker, SourceLocation};

use crate::ast::{
    ColumnDef, DdlKind, DdlStmt, DeleteStmt, InsertStmt, OrderItem, Predicate, Script, SelectStmt, Statement,
    TableRef, UpdateStmt,
};

/// Keywords that end a SELECT clause.
const SELECT_CLAUSES: &[&str] = &[
    "FROM", "WHERE", "GROUP BY", "HAVING", "ORDER BY", "FETCH", "OFFSET", "LIMIT", "UNION", "EXCEPT",
    "INTERSECT", "FOR", "WITH", "OPTIMIZE",
];

/// Words that follow a table name without being its alias.
const NOT_ALIASES: &[&str] = &[
    "AS", "ON", "USING", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "EXCEPTION", "WHERE",
    "SET", "GROUP", "ORDER", "FETCH", "WITH", "FOR", "UNION",
];

const CONSTRAINT_STARTS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "PERIOD"];

/// The always-succeeding DB2 strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackParser;

impl ParseStrategy for FallbackParser {
    type Ast = Script;

    fn name(&self) -> &'static str {
        "db2-fallback"
    }

    fn parse(&self, text: &str, file: &str) -> (Script, Vec<Diagnostic>) {
        let text = normalize_line_endings(text);
        let index = LineIndex::new(&text);
        let mut script = Script::empty(file);
        let text = blank_block_comments(&text);

        for (offset, candidate) in split_statements(&text) {
            let Some((start, body)) = strip_comment_lines(candidate) else {
                continue;
            };
            let (line, column) = index.line_col((offset + start) as u32);
            let loc = script.loc.at(line, column);
            if let Some(statement) = Candidate::new(&body).statement(&loc) {
                script.statements.push(statement);
            }
        }
        (script, Vec::new())
    }
}

/// Split at `;` outside quotes, `--` comments and `/* */` comments. Yields
/// each candidate with its byte offset.
pub fn split_statements(text: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut scan = CommentTracker::default();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        if scan.step(c, next) == Region::Code && c == ';' {
            parts.push((start, &text[start..i]));
            start = i + 1;
        }
    }
    if start < text.len() {
        parts.push((start, &text[start..]));
    }
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Quoted,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy, Default)]
enum Scan {
    #[default]
    Code,
    Line,
    Block,
    /// On the `*` of `/*`.
    Opening,
    /// On the `/` of `*/`.
    Closing,
}

/// Classifies each character of a script as code, quoted text or comment.
#[derive(Debug, Default)]
struct CommentTracker {
    quotes: QuoteTracker,
    state: Scan,
}

impl CommentTracker {
    fn step(&mut self, c: char, next: Option<char>) -> Region {
        match self.state {
            Scan::Line => {
                if c == '\n' {
                    self.state = Scan::Code;
                }
                Region::LineComment
            }
            Scan::Opening => {
                self.state = Scan::Block;
                Region::BlockComment
            }
            Scan::Closing => {
                self.state = Scan::Code;
                Region::BlockComment
            }
            Scan::Block => {
                if c == '*' && next == Some('/') {
                    self.state = Scan::Closing;
                }
                Region::BlockComment
            }
            Scan::Code => {
                if self.quotes.step(c) {
                    return Region::Quoted;
                }
                match (c, next) {
                    ('-', Some('-')) => {
                        self.state = Scan::Line;
                        Region::LineComment
                    }
                    ('/', Some('*')) => {
                        self.state = Scan::Opening;
                        Region::BlockComment
                    }
                    _ => Region::Code,
                }
            }
        }
    }
}

/// Replace `/* */` comments with spaces. Newlines and byte offsets survive.
fn blank_block_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut scan = CommentTracker::default();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        if scan.step(c, next) == Region::BlockComment && c != '\n' {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

/// Drop `--` comment lines and trailing `--` comments. Returns the offset of
/// the first kept character within `candidate` and the trimmed text.
fn strip_comment_lines(candidate: &str) -> Option<(usize, String)> {
    let mut first: Option<usize> = None;
    let mut kept: Vec<&str> = Vec::new();
    let mut line_start = 0;

    for line in candidate.split('\n') {
        let code = cut_comment(line);
        if !code.trim().is_empty() {
            if first.is_none() {
                first = Some(line_start + (code.len() - code.trim_start().len()));
            }
            kept.push(code.trim_end());
        }
        line_start += line.len() + 1;
    }
    let body = kept.join("\n").trim().to_string();
    first.map(|offset| (offset, body))
}

fn cut_comment(line: &str) -> &str {
    let mut quotes = QuoteTracker::new();
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        if !quotes.step(c) && c == '-' && prev == '-' {
            return &line[..i - 1];
        }
        prev = c;
    }
    line
}

/// One statement with whitespace outside quotes collapsed, plus an
/// upper-cased copy with identical byte offsets for keyword search.
struct Candidate<'a> {
    original: &'a str,
    flat: String,
    upper: String,
}

impl<'a> Candidate<'a> {
    fn new(original: &'a str) -> Self {
        let flat = collapse_whitespace(original);
        let upper = flat.to_ascii_uppercase();
        Self { original, flat, upper }
    }

    fn statement(&self, loc: &SourceLocation) -> Option<Statement> {
        let first = self.upper.split([' ', '(']).next().unwrap_or("");
        match first {
            "SELECT" => Some(Statement::Select(self.select(0, loc))),
            "WITH" => {
                let at = self.find(0, "SELECT")?;
                Some(Statement::Select(self.select(at, loc)))
            }
            "INSERT" => Some(Statement::Insert(self.insert(loc))),
            "UPDATE" => Some(Statement::Update(self.update(loc))),
            "DELETE" => Some(Statement::Delete(self.delete(loc))),
            "CREATE" => self.create(loc).map(Statement::Ddl),
            _ => None,
        }
    }

    /// Byte offset of `keyword` at depth zero, outside quotes, on word
    /// boundaries, searching from `from`.
    fn find(&self, from: usize, keyword: &str) -> Option<usize> {
        let bytes = self.upper.as_bytes();
        let mut quotes = QuoteTracker::new();
        let mut depth = 0i32;
        for (i, c) in self.upper.char_indices() {
            if quotes.step(c) {
                continue;
            }
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ if depth == 0 && i >= from && self.upper[i..].starts_with(keyword) => {
                    let before = i == 0 || !is_word_byte(bytes[i - 1]);
                    let after = bytes.get(i + keyword.len()).map_or(true, |&b| !is_word_byte(b));
                    if before && after {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Text from `from` up to the nearest of `enders`, trimmed.
    fn section(&self, from: usize, enders: &[&str]) -> &str {
        let end = enders
            .iter()
            .filter_map(|kw| self.find(from, kw))
            .min()
            .unwrap_or(self.flat.len());
        self.flat[from..end.max(from)].trim()
    }

    /// Section after `keyword`, if the keyword is present.
    fn clause(&self, from: usize, keyword: &str, enders: &[&str]) -> Option<&str> {
        let at = self.find(from, keyword)?;
        Some(self.section(at + keyword.len(), enders))
    }

    /// The first word after `at`, and the offset just past it.
    fn word_after(&self, at: usize) -> (&str, usize) {
        let rest = &self.flat[at..];
        let skipped = rest.len() - rest.trim_start().len();
        let start = at + skipped;
        let len = self.flat[start..]
            .find(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .unwrap_or(self.flat.len() - start);
        (&self.flat[start..start + len], start + len)
    }

    /// A table name after `at` with an optional alias.
    fn table_after(&self, at: usize, loc: &SourceLocation) -> (TableRef, usize) {
        let (name, end) = self.word_after(at);
        let (next, next_end) = self.word_after(end);
        let upper_next = next.to_ascii_uppercase();
        let (alias, end) = if upper_next == "AS" {
            let (alias, alias_end) = self.word_after(next_end);
            (Some(alias.to_ascii_uppercase()), alias_end)
        } else if !next.is_empty() && is_name(next) && !NOT_ALIASES.contains(&upper_next.as_str()) {
            (Some(upper_next), next_end)
        } else {
            (None, end)
        };
        (TableRef::from_qualified(loc.clone(), &fold_unquoted(name), alias), end)
    }

    fn where_clause(&self, from: usize, enders: &[&str], loc: &SourceLocation) -> Option<Predicate> {
        self.clause(from, "WHERE", enders)
            .filter(|text| !text.is_empty())
            .map(|text| Predicate::raw(loc.clone(), text))
    }

    fn select(&self, at: usize, loc: &SourceLocation) -> SelectStmt {
        let mut select = SelectStmt::new(loc.clone());
        let mut start = at + "SELECT".len();
        if let Some(distinct) = self.find(start, "DISTINCT").filter(|&d| self.flat[start..d].trim().is_empty()) {
            select.distinct = true;
            start = distinct + "DISTINCT".len();
        }
        select.columns = split_top_level(self.section(start, SELECT_CLAUSES), ',');

        let after_from: &[&str] = &SELECT_CLAUSES[1..];
        if let Some(from) = self.clause(start, "FROM", after_from) {
            select.from_tables = split_top_level(from, ',')
                .iter()
                .flat_map(|item| split_joins(item))
                .filter_map(|item| table_item(&item, loc))
                .collect();
        }
        select.where_clause = self.where_clause(start, &SELECT_CLAUSES[2..], loc);
        if let Some(group) = self.clause(start, "GROUP BY", &SELECT_CLAUSES[3..]) {
            select.group_by = split_top_level(group, ',');
        }
        if let Some(order) = self.clause(start, "ORDER BY", &SELECT_CLAUSES[5..]) {
            select.order_by = split_top_level(order, ',').into_iter().map(order_item).collect();
        }
        if let Some(fetch) = self.clause(start, "FETCH", &["OPTIMIZE", "FOR", "WITH"]) {
            select.fetch_first = fetch.split_whitespace().find_map(|w| w.parse().ok());
        }
        select
    }

    fn insert(&self, loc: &SourceLocation) -> InsertStmt {
        let into = self.find(0, "INTO").map_or("INSERT".len(), |i| i + "INTO".len());
        let (name, end) = self.word_after(into);
        let table = TableRef::from_qualified(loc.clone(), &fold_unquoted(name), None);
        let rest = self.flat[end..].trim_start();
        let columns = if rest.starts_with('(') && !rest[1..].trim_start().to_ascii_uppercase().starts_with("SELECT") {
            split_top_level(paren_group(rest).unwrap_or(""), ',')
                .into_iter()
                .map(|c| c.to_ascii_uppercase())
                .collect()
        } else {
            Vec::new()
        };

        let mut values = Vec::new();
        if let Some(at) = self.find(end, "VALUES") {
            let mut rows = self.flat[at + "VALUES".len()..].trim_start();
            if !rows.starts_with('(') {
                values.push(split_top_level(rows, ','));
            }
            while let Some(row) = paren_group(rows) {
                values.push(split_top_level(row, ','));
                rows = rows[row.len() + 2..].trim_start().trim_start_matches(',').trim_start();
            }
        }
        let select = self
            .find(end, "SELECT")
            .filter(|_| values.is_empty())
            .map(|at| Box::new(self.select(at, loc)));
        InsertStmt {
            loc: loc.clone(),
            table,
            columns,
            values,
            select,
        }
    }

    fn update(&self, loc: &SourceLocation) -> UpdateStmt {
        let (table, _) = self.table_after("UPDATE".len(), loc);
        let set_clauses = self
            .clause(0, "SET", &["WHERE", "WITH", "SKIP"])
            .map(|set| {
                split_top_level(set, ',')
                    .into_iter()
                    .map(|pair| match pair.split_once('=') {
                        Some((column, value)) => (column.trim().to_ascii_uppercase(), value.trim().to_string()),
                        None => (pair.to_ascii_uppercase(), String::new()),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        UpdateStmt {
            loc: loc.clone(),
            table,
            set_clauses,
            where_clause: self.where_clause(0, &["WITH", "SKIP"], loc),
        }
    }

    fn delete(&self, loc: &SourceLocation) -> DeleteStmt {
        let from = self.find(0, "FROM").map_or("DELETE".len(), |i| i + "FROM".len());
        let (table, _) = self.table_after(from, loc);
        DeleteStmt {
            loc: loc.clone(),
            table,
            where_clause: self.where_clause(0, &["WITH", "SKIP"], loc),
        }
    }

    fn create(&self, loc: &SourceLocation) -> Option<DdlStmt> {
        let mut at = "CREATE".len();
        for optional in ["OR REPLACE", "UNIQUE", "ENCODED VECTOR"] {
            if self.upper[at..].trim_start().starts_with(optional) {
                at = self.find(at, optional)? + optional.len();
            }
        }
        let (object, end) = self.word_after(at);
        let kind = match object.to_ascii_uppercase().as_str() {
            "TABLE" => DdlKind::Table,
            "VIEW" => DdlKind::View,
            "INDEX" => DdlKind::Index,
            _ => return None,
        };
        let (name, end) = self.word_after(end);
        let mut ddl = DdlStmt::new(loc.clone(), kind, &fold_unquoted(name), self.original);

        match ddl.kind {
            DdlKind::Table => {
                if let Some(elements) = paren_group(self.flat[end..].trim_start()) {
                    ddl.columns = split_top_level(elements, ',')
                        .iter()
                        .filter_map(|element| column_def(element, loc))
                        .collect();
                }
            }
            DdlKind::View => {
                if let Some(query) = self.find(end, "SELECT") {
                    ddl.query = Some(Box::new(self.select(query, loc)));
                }
            }
            DdlKind::Index => {
                if let Some(on) = self.find(end, "ON") {
                    let (table, _) = self.word_after(on + "ON".len());
                    ddl.on_table = Some(TableRef::from_qualified(loc.clone(), &fold_unquoted(table), None));
                }
            }
            DdlKind::Other => {}
        }
        Some(ddl)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'@' | b'$')
}

fn is_name(word: &str) -> bool {
    word.bytes().all(is_word_byte) || (word.starts_with('"') && word.ends_with('"'))
}

/// Upper-case ordinary identifiers; delimited identifiers keep their case.
fn fold_unquoted(name: &str) -> String {
    let mut quotes = QuoteTracker::new();
    name.chars()
        .map(|c| if quotes.step(c) { c } else { c.to_ascii_uppercase() })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteTracker::new();
    let mut pending = false;
    for c in text.chars() {
        if !quotes.step(c) && c.is_whitespace() {
            pending = !out.is_empty();
            continue;
        }
        if pending {
            out.push(' ');
            pending = false;
        }
        out.push(c);
    }
    out
}

/// Split on `sep` outside quotes and parentheses; pieces are trimmed and
/// empty pieces dropped.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteTracker::new();
    let mut depth = 0i32;
    for c in text.chars() {
        if !quotes.step(c) {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ if c == sep && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
        }
        current.push(c);
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Contents of the balanced group that `text` starts with.
fn paren_group(text: &str) -> Option<&str> {
    if !text.starts_with('(') {
        return None;
    }
    let mut quotes = QuoteTracker::new();
    let mut depth = 0;
    for (i, c) in text.char_indices() {
        if quotes.step(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a FROM item at its `JOIN` keywords.
fn split_joins(item: &str) -> Vec<String> {
    let candidate = Candidate::new(item);
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(at) = candidate.find(start, "JOIN") {
        pieces.push(candidate.flat[start..at].to_string());
        start = at + "JOIN".len();
    }
    pieces.push(candidate.flat[start..].to_string());
    pieces
}

/// A table reference from one FROM item; derived tables are skipped.
fn table_item(item: &str, loc: &SourceLocation) -> Option<TableRef> {
    let item = item.trim();
    if item.is_empty() || item.starts_with('(') {
        return None;
    }
    let candidate = Candidate::new(item);
    let (table, _) = candidate.table_after(0, loc);
    Some(table)
}

fn order_item(text: String) -> OrderItem {
    let upper = text.to_ascii_uppercase();
    let (expr, descending) = if let Some(expr) = upper.strip_suffix(" DESC") {
        (text[..expr.len()].to_string(), true)
    } else if let Some(expr) = upper.strip_suffix(" ASC") {
        (text[..expr.len()].to_string(), false)
    } else {
        (text, false)
    };
    OrderItem { expr, descending }
}

fn column_def(element: &str, loc: &SourceLocation) -> Option<ColumnDef> {
    let mut words = element.split_whitespace();
    let name = words.next()?;
    let upper_name = name.to_ascii_uppercase();
    if CONSTRAINT_STARTS.contains(&upper_name.as_str()) {
        return None;
    }
    let data_type = words.next().unwrap_or("").to_ascii_uppercase();
    let nullable = !element.to_ascii_uppercase().contains("NOT NULL");
    Some(ColumnDef {
        loc: loc.clone(),
        name: if name.starts_with('"') {
            name.trim_matches('"').to_string()
        } else {
            upper_name
        },
        data_type,
        nullable,
        constraints: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Script {
        let (script, diags) = FallbackParser.parse(text, "F.sql");
        assert!(diags.is_empty());
        script
    }

    #[test]
    fn test_select_schema_split() {
        let script = parse("SELECT A,B FROM SCHEMA.TBL");
        let Statement::Select(select) = &script.statements[0] else {
            panic!("expected select");
        };
        assert_eq!(select.columns, vec!["A", "B"]);
        assert_eq!(select.from_tables[0].schema.as_deref(), Some("SCHEMA"));
        assert_eq!(select.from_tables[0].name, "TBL");
    }

    #[test]
    fn test_select_clauses() {
        let script = parse(
            "SELECT DISTINCT o.id, SUM(o.amt) total\n\
             FROM app.orders o JOIN app.lines AS l ON l.id = o.id, qgpl/cust\n\
             WHERE o.status = 'X; Y' GROUP BY o.id ORDER BY total DESC FETCH FIRST 5 ROWS ONLY",
        );
        let Statement::Select(select) = &script.statements[0] else {
            panic!("expected select");
        };
        assert!(select.distinct);
        assert_eq!(select.columns, vec!["o.id", "SUM(o.amt) total"]);
        let tables: Vec<_> = select
            .from_tables
            .iter()
            .map(|t| (t.qualified_name(), t.alias.clone()))
            .collect();
        assert_eq!(
            tables,
            vec![
                ("APP.ORDERS".to_string(), Some("O".to_string())),
                ("APP.LINES".to_string(), Some("L".to_string())),
                ("QGPL.CUST".to_string(), None),
            ]
        );
        assert_eq!(select.where_clause.as_ref().unwrap().left.as_ref().unwrap().text(), "o.status = 'X; Y'");
        assert_eq!(select.group_by, vec!["o.id"]);
        assert_eq!(select.order_by[0].expr, "total");
        assert!(select.order_by[0].descending);
        assert_eq!(select.fetch_first, Some(5));
    }

    #[test]
    fn test_semicolon_inside_string_does_not_split() {
        let script = parse("INSERT INTO LOG (MSG) VALUES ('a;b');\nDELETE FROM LOG WHERE MSG = 'x;y'");
        assert_eq!(script.statements.len(), 2);
        let Statement::Insert(insert) = &script.statements[0] else {
            panic!("expected insert");
        };
        assert_eq!(insert.values, vec![vec!["'a;b'".to_string()]]);
        assert_eq!(insert.columns, vec!["MSG"]);
    }

    #[test]
    fn test_semicolon_inside_block_comment_does_not_split() {
        let script = parse("/* purge; then reload */\nDELETE FROM LOG /* old; rows */ WHERE AGE > 30;\nSELECT A /* ; */ FROM T");
        assert_eq!(script.statements.len(), 2);
        assert_eq!(script.statements[0].loc().line, 2);
        let Statement::Delete(delete) = &script.statements[0] else {
            panic!("expected delete");
        };
        assert_eq!(delete.table.name, "LOG");
        let condition = delete.where_clause.as_ref().and_then(|w| w.left.as_ref()).map(|o| o.text());
        assert_eq!(condition.as_deref(), Some("AGE > 30"));
        let Statement::Select(select) = &script.statements[1] else {
            panic!("expected select");
        };
        assert_eq!(select.columns, vec!["A"]);
    }

    #[test]
    fn test_block_comment_markers_inside_strings_are_text() {
        let parts = split_statements("SELECT '/*' FROM T; SELECT '*/;' FROM U");
        assert_eq!(parts.len(), 2);
        assert_eq!(blank_block_comments("A/*x\ny*/B"), "A   \n   B");
    }

    #[test]
    fn test_quoted_names_keep_their_case() {
        let script = parse("SELECT A FROM \"my.lib\".\"Odd\"; SELECT A FROM db1.sch.tbl");
        let tables: Vec<_> = script
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::Select(select) => select.from_tables.first().cloned(),
                _ => None,
            })
            .map(|t| (t.schema, t.name))
            .collect();
        assert_eq!(
            tables,
            vec![
                (Some("my.lib".to_string()), "Odd".to_string()),
                (Some("SCH".to_string()), "TBL".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_lines_removed_and_lines_tracked() {
        let script = parse("-- header\n\nUPDATE T SET A = 1, B = 'z' -- trailing; not a split\nWHERE C = 2;\n-- only a comment;\n\nDELETE FROM QTEMP.W");
        assert_eq!(script.statements.len(), 2);
        assert_eq!(script.statements[0].loc().line, 3);
        assert_eq!(script.statements[1].loc().line, 7);
        let Statement::Update(update) = &script.statements[0] else {
            panic!("expected update");
        };
        assert_eq!(
            update.set_clauses,
            vec![("A".to_string(), "1".to_string()), ("B".to_string(), "'z'".to_string())]
        );
        assert!(update.where_clause.is_some());
    }

    #[test]
    fn test_create_statements() {
        let script = parse(
            "CREATE TABLE APP.ORDERS (ID INTEGER NOT NULL, AMT DECIMAL(9,2), PRIMARY KEY (ID));\n\
             CREATE OR REPLACE VIEW APP.V AS SELECT ID FROM APP.ORDERS;\n\
             CREATE UNIQUE INDEX APP.IX ON APP.ORDERS (ID);\n\
             CREATE ALIAS APP.A FOR APP.ORDERS",
        );
        assert_eq!(script.statements.len(), 3);
        let Statement::Ddl(table) = &script.statements[0] else {
            panic!("expected ddl");
        };
        assert_eq!(table.kind, DdlKind::Table);
        assert_eq!(table.schema.as_deref(), Some("APP"));
        assert_eq!(table.body, "CREATE TABLE APP.ORDERS (ID INTEGER NOT NULL, AMT DECIMAL(9,2), PRIMARY KEY (ID))");
        let columns: Vec<_> = table.columns.iter().map(|c| (c.name.as_str(), c.data_type.as_str(), c.nullable)).collect();
        assert_eq!(columns, vec![("ID", "INTEGER", false), ("AMT", "DECIMAL(9,2)", true)]);
        let Statement::Ddl(view) = &script.statements[1] else {
            panic!("expected ddl");
        };
        assert_eq!(view.kind, DdlKind::View);
        assert_eq!(view.query.as_ref().unwrap().from_tables[0].name, "ORDERS");
        let Statement::Ddl(index) = &script.statements[2] else {
            panic!("expected ddl");
        };
        assert_eq!(index.on_table.as_ref().unwrap().qualified_name(), "APP.ORDERS");
    }

    #[test]
    fn test_insert_select_and_unknown_statements() {
        let script = parse("CALL FOO; INSERT INTO ARCHIVE SELECT * FROM ORDERS WHERE D < CURRENT DATE; GARBAGE");
        assert_eq!(script.statements.len(), 1);
        let Statement::Insert(insert) = &script.statements[0] else {
            panic!("expected insert");
        };
        assert_eq!(insert.table.name, "ARCHIVE");
        assert_eq!(insert.select.as_ref().unwrap().from_tables[0].name, "ORDERS");
    }

    #[test]
    fn test_split_offsets() {
        let parts = split_statements("A; 'b;c'; -- d;e\nF");
        let texts: Vec<_> = parts.iter().map(|(_, t)| *t).collect();
        assert_eq!(texts, vec!["A", " 'b;c'", " -- d;e\nF"]);
        assert_eq!(parts[1].0, 2);
    }
}
