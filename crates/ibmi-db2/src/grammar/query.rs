//! Queries, conditions and value expressions.
//!
//! ```text
//! query     := [ WITH cte { ',' cte } ] term { (UNION | EXCEPT | INTERSECT) [ALL] term } tail
//! term      := select | '(' query ')'
//! select    := SELECT [DISTINCT | ALL] items [ INTO targets ] [ FROM refs ]
//!              [ WHERE cond ] [ GROUP BY exprs ] [ HAVING cond ]
//! tail      := { ORDER BY order | OFFSET n ROWS | FETCH FIRST [n] ROWS ONLY
//!              | LIMIT n | FOR READ ONLY | FOR UPDATE [OF names] | WITH iso
//!              | OPTIMIZE FOR n ROWS }
//! ref       := primary { [INNER | LEFT | RIGHT | FULL | CROSS | EXCEPTION] JOIN primary [ON cond] }
//! cond      := and { OR and }
//! and       := not { AND not }
//! not       := NOT not | EXISTS '(' query ')' | '(' cond ')' | simple
//! simple    := expr ( cmp expr | [NOT] LIKE expr | [NOT] IN list | [NOT] BETWEEN expr AND expr
//!              | IS [NOT] NULL )?
//! expr      := unary { ('+' | '-' | '*' | '/' | '||' | CONCAT) unary }
//! ```
//!
//! Value expressions are validated but kept as text; a bare column
//! reference is remembered so predicates can expose it as a column.

use crate::ast::{ColumnRef, OrderItem, Operand, Predicate, PredicateKind, SelectStmt, TableRef};

use super::lexer::TokenKind;
use super::{ParseResult, Parser, RESERVED};

const COMPARISONS: &[&str] = &["=", "<>", "!=", "¬=", "<", ">", "<=", ">=", "¬<", "¬>"];

const ARITHMETIC: &[&str] = &["+", "-", "*", "/", "||", "%"];

/// Unit keywords that may follow a value in date arithmetic.
const DURATIONS: &[&str] = &[
    "YEAR", "YEARS", "MONTH", "MONTHS", "DAY", "DAYS", "HOUR", "HOURS", "MINUTE", "MINUTES", "SECOND",
    "SECONDS", "MICROSECOND", "MICROSECONDS",
];

/// Functions whose arguments use keywords (`EXTRACT(YEAR FROM x)`); their
/// argument lists are skipped rather than parsed.
const KEYWORD_ARGUMENT_FUNCTIONS: &[&str] = &["EXTRACT", "TRIM", "SUBSTRING", "POSITION", "OVERLAY", "XMLSERIALIZE"];

/// Prefixes of typed string literals such as `DATE '2024-01-01'`.
const TYPED_LITERALS: &[&str] = &["DATE", "TIME", "TIMESTAMP", "X", "GX", "UX", "BX"];

/// A parsed value expression.
#[derive(Debug, Clone)]
pub(super) struct Span {
    pub start: u32,
    pub end: u32,
    /// Qualified column name when the expression is a lone column reference.
    pub column: Option<String>,
}

impl<'s> Parser<'s> {
    /// A full query, collecting the queries nested in it.
    pub(super) fn query(&mut self) -> ParseResult<SelectStmt> {
        self.nested.push(Vec::new());
        let result = self.query_body();
        let subqueries = self.nested.pop().unwrap_or_default();
        result.map(|mut select| {
            select.subqueries.extend(subqueries);
            select
        })
    }

    /// `'(' query ')'` used inside another statement; the query is recorded
    /// as a subquery of the enclosing one.
    fn nested_query(&mut self) -> ParseResult<Span> {
        let open = self.expect(TokenKind::LParen, "'('")?.start;
        let select = self.query()?;
        self.expect(TokenKind::RParen, "')'")?;
        if let Some(frame) = self.nested.last_mut() {
            frame.push(select);
        }
        Ok(Span {
            start: open,
            end: self.prev_end(),
            column: None,
        })
    }

    fn at_query_start(&self, n: usize) -> bool {
        self.nth_is_keyword(n, "SELECT") || self.nth_is_keyword(n, "WITH")
    }

    fn query_body(&mut self) -> ParseResult<SelectStmt> {
        if self.eat_keyword("WITH") {
            self.eat_keyword("RECURSIVE");
            loop {
                self.name()?;
                if self.at(TokenKind::LParen) {
                    self.name_list()?;
                }
                self.expect_keyword("AS")?;
                self.nested_query()?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let mut select = self.query_term()?;
        while self.at_any_keyword(&["UNION", "EXCEPT", "INTERSECT"]) {
            self.pos += 1;
            if !self.eat_keyword("ALL") {
                self.eat_keyword("DISTINCT");
            }
            let other = self.query_term()?;
            select.unions.push(other);
        }
        self.query_tail(&mut select)?;
        Ok(select)
    }

    fn query_term(&mut self) -> ParseResult<SelectStmt> {
        if self.at(TokenKind::LParen) {
            self.pos += 1;
            let select = self.query_body()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(select);
        }
        self.select_core()
    }

    fn select_core(&mut self) -> ParseResult<SelectStmt> {
        let start = self.expect_keyword("SELECT")?.start;
        let mut select = SelectStmt::new(self.loc(start));
        if self.eat_keyword("DISTINCT") {
            select.distinct = true;
        } else {
            self.eat_keyword("ALL");
        }
        select.columns = self.select_list()?;

        if self.eat_keyword("INTO") {
            loop {
                self.expr()?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        if self.eat_keyword("FROM") {
            loop {
                self.table_reference(&mut select)?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        select.where_clause = self.where_clause()?;
        if self.eat_keyword("GROUP") {
            self.expect_keyword("BY")?;
            loop {
                let item = self.expr()?;
                select.group_by.push(self.text(item.start, item.end));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        if self.eat_keyword("HAVING") {
            select.having = Some(self.condition()?);
        }
        Ok(select)
    }

    fn select_list(&mut self) -> ParseResult<Vec<String>> {
        let mut columns = Vec::new();
        loop {
            let start = self.peek().map_or(0, |t| t.start);
            if self.at_operator("*") {
                self.pos += 1;
            } else if self.at_name()
                && self.nth(1).is_some_and(|t| t.kind == TokenKind::Dot)
                && self.nth(2).is_some_and(|t| t.kind == TokenKind::Operator && t.text == "*")
            {
                self.pos += 3;
            } else {
                self.expr()?;
                self.alias()?;
            }
            columns.push(self.text(start, self.prev_end()));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(columns)
    }

    fn table_reference(&mut self, select: &mut SelectStmt) -> ParseResult<()> {
        self.table_primary(select)?;
        loop {
            let joined = if self.at_keyword("JOIN") {
                true
            } else if self.at_any_keyword(&["INNER", "CROSS", "EXCEPTION"]) {
                self.pos += 1;
                true
            } else if self.at_any_keyword(&["LEFT", "RIGHT", "FULL"]) {
                self.pos += 1;
                if !self.eat_keyword("OUTER") {
                    self.eat_keyword("EXCEPTION");
                }
                true
            } else {
                false
            };
            if !joined {
                return Ok(());
            }
            self.expect_keyword("JOIN")?;
            self.table_primary(select)?;
            if self.eat_keyword("ON") {
                let condition = self.condition()?;
                select.join_conditions.push(condition);
            } else if self.eat_keyword("USING") {
                self.name_list()?;
            }
        }
    }

    fn table_primary(&mut self, select: &mut SelectStmt) -> ParseResult<()> {
        if self.at(TokenKind::LParen) && self.at_query_start(1) {
            self.nested_query()?;
            self.correlation()?;
            return Ok(());
        }
        if self.at_any_keyword(&["TABLE", "LATERAL"]) && self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) {
            self.pos += 1;
            self.skip_parenthesized()?;
            self.correlation()?;
            return Ok(());
        }
        let (qualified, start) = self.qualified_name()?;
        let alias = self.alias()?;
        select
            .from_tables
            .push(TableRef::from_qualified(self.loc(start), &qualified, alias));
        Ok(())
    }

    /// Correlation name of a derived table, with optional column names.
    fn correlation(&mut self) -> ParseResult<()> {
        if self.alias()?.is_some() && self.at(TokenKind::LParen) {
            self.name_list()?;
        }
        Ok(())
    }

    fn query_tail(&mut self, select: &mut SelectStmt) -> ParseResult<()> {
        loop {
            if self.at_keyword("ORDER") {
                self.pos += 1;
                self.expect_keyword("BY")?;
                loop {
                    let item = self.expr()?;
                    let expr = self.text(item.start, item.end);
                    let descending = self.eat_keyword("DESC");
                    if !descending {
                        self.eat_keyword("ASC");
                    }
                    if self.eat_keyword("NULLS") {
                        self.pos += 1;
                    }
                    select.order_by.push(OrderItem { expr, descending });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            } else if self.eat_keyword("OFFSET") {
                self.expr()?;
                if !self.eat_keyword("ROWS") {
                    self.eat_keyword("ROW");
                }
            } else if self.eat_keyword("FETCH") {
                if !self.eat_keyword("FIRST") {
                    self.expect_keyword("NEXT")?;
                }
                let count = match self.peek() {
                    Some(t) if t.kind == TokenKind::Number => {
                        let n = t.text.parse().ok();
                        self.pos += 1;
                        n
                    }
                    _ => Some(1),
                };
                if !self.eat_keyword("ROWS") {
                    self.expect_keyword("ROW")?;
                }
                self.expect_keyword("ONLY")?;
                select.fetch_first = count;
            } else if self.eat_keyword("LIMIT") {
                let count = self.expect(TokenKind::Number, "row count")?;
                select.fetch_first = count.text.parse().ok();
                if self.eat_keyword("OFFSET") {
                    self.expect(TokenKind::Number, "row count")?;
                }
            } else if self.at_keyword("FOR") && self.nth(1).is_some_and(|t| matches!(t.text.as_str(), "READ" | "FETCH")) {
                self.pos += 2;
                self.expect_keyword("ONLY")?;
            } else if self.at_keyword("FOR") && self.nth_is_keyword(1, "UPDATE") {
                self.pos += 2;
                if self.eat_keyword("OF") {
                    loop {
                        self.name()?;
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
            } else if self.eat_keyword("OPTIMIZE") {
                self.expect_keyword("FOR")?;
                self.expect(TokenKind::Number, "row count")?;
                if !self.eat_keyword("ROWS") {
                    self.expect_keyword("ROW")?;
                }
            } else if self.at_keyword("SKIP") && self.nth_is_keyword(1, "LOCKED") {
                self.pos += 2;
                self.expect_keyword("DATA")?;
            } else if self.at_keyword("WITH") {
                let before = self.pos;
                self.isolation_clause();
                if self.pos == before {
                    return Ok(());
                }
            } else {
                return Ok(());
            }
        }
    }

    /// `[ WHERE cond ]`, including the positioned `WHERE CURRENT OF cursor`.
    pub(super) fn where_clause(&mut self) -> ParseResult<Option<Predicate>> {
        if !self.at_keyword("WHERE") {
            return Ok(None);
        }
        let start = self.advance().map_or(0, |t| t.start);
        if self.at_keyword("CURRENT") && self.nth_is_keyword(1, "OF") {
            self.pos += 2;
            let (cursor, _) = self.name()?;
            return Ok(Some(Predicate::raw(self.loc(start), format!("CURRENT OF {cursor}"))));
        }
        self.condition().map(Some)
    }

    pub(super) fn condition(&mut self) -> ParseResult<Predicate> {
        let first = self.and_condition()?;
        if !self.at_keyword("OR") {
            return Ok(first);
        }
        let loc = first.loc.clone();
        let mut children = vec![first];
        while self.eat_keyword("OR") {
            children.push(self.and_condition()?);
        }
        Ok(Predicate::group(loc, PredicateKind::Or, children))
    }

    fn and_condition(&mut self) -> ParseResult<Predicate> {
        let first = self.not_condition()?;
        if !self.at_keyword("AND") {
            return Ok(first);
        }
        let loc = first.loc.clone();
        let mut children = vec![first];
        while self.eat_keyword("AND") {
            children.push(self.not_condition()?);
        }
        Ok(Predicate::group(loc, PredicateKind::And, children))
    }

    fn not_condition(&mut self) -> ParseResult<Predicate> {
        let start = self.peek().map_or(self.src.len() as u32, |t| t.start);
        if self.eat_keyword("NOT") {
            let inner = self.not_condition()?;
            return Ok(Predicate::group(self.loc(start), PredicateKind::Not, vec![inner]));
        }
        if self.at_keyword("EXISTS") && self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) {
            self.pos += 1;
            let span = self.nested_query()?;
            let text = self.text(span.start, span.end);
            return Ok(Predicate {
                loc: self.loc(start),
                kind: PredicateKind::Exists,
                left: None,
                right: Some(Operand::Value(text)),
                children: Vec::new(),
            });
        }
        if self.at(TokenKind::LParen) && !self.at_query_start(1) {
            // Either a parenthesized condition or an expression such as
            // `(A + 1) > 2`; try the condition first.
            let mark = self.mark();
            self.pos += 1;
            if let Ok(inner) = self.condition() {
                if self.eat(TokenKind::RParen) && !self.continues_expression() {
                    return Ok(inner);
                }
            }
            self.reset(mark);
        }
        self.simple_condition()
    }

    /// Whether the next token extends a value expression or comparison.
    fn continues_expression(&self) -> bool {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Operator => true,
            Some(t) if t.kind == TokenKind::Ident => match t.text.as_str() {
                "IS" | "IN" | "LIKE" | "BETWEEN" | "CONCAT" => true,
                "NOT" => self.nth(1).is_some_and(|n| matches!(n.text.as_str(), "IN" | "LIKE" | "BETWEEN")),
                _ => false,
            },
            _ => false,
        }
    }

    fn simple_condition(&mut self) -> ParseResult<Predicate> {
        let left = self.expr()?;
        let loc = self.loc(left.start);
        let left_operand = self.operand(&left);

        if self.eat_keyword("IS") {
            let kind = if self.eat_keyword("NOT") {
                PredicateKind::IsNotNull
            } else {
                PredicateKind::IsNull
            };
            self.expect_keyword("NULL")?;
            return Ok(Predicate::compare(loc, kind, left_operand, None));
        }

        let negated = self.at_keyword("NOT")
            && self.nth(1).is_some_and(|t| matches!(t.text.as_str(), "IN" | "LIKE" | "BETWEEN"));
        if negated {
            self.pos += 1;
        }

        let predicate = if self.eat_keyword("LIKE") {
            let pattern = self.expr()?;
            if self.eat_keyword("ESCAPE") {
                self.expr()?;
            }
            let right = self.operand(&pattern);
            Predicate::compare(loc.clone(), PredicateKind::Like, left_operand, Some(right))
        } else if self.eat_keyword("IN") {
            let list = if self.at(TokenKind::LParen) && self.at_query_start(1) {
                self.nested_query()?
            } else {
                self.in_list()?
            };
            let right = Operand::Value(self.text(list.start, list.end));
            Predicate::compare(loc.clone(), PredicateKind::In, left_operand, Some(right))
        } else if self.eat_keyword("BETWEEN") {
            let low = self.expr()?;
            self.expect_keyword("AND")?;
            let high = self.expr()?;
            let right = Operand::Value(self.text(low.start, high.end));
            Predicate::compare(loc.clone(), PredicateKind::Between, left_operand, Some(right))
        } else if let Some(op) = self
            .peek()
            .filter(|t| t.kind == TokenKind::Operator && COMPARISONS.contains(&t.text.as_str()))
            .map(|t| t.text.clone())
        {
            self.pos += 1;
            let right = if self.at_any_keyword(&["ANY", "ALL", "SOME"]) && self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) {
                self.pos += 1;
                self.nested_query()?
            } else {
                self.expr()?
            };
            let op = match op.as_str() {
                "!=" | "¬=" => "<>".to_string(),
                "¬<" => ">=".to_string(),
                "¬>" => "<=".to_string(),
                _ => op,
            };
            let right = self.operand(&right);
            Predicate::compare(loc.clone(), PredicateKind::Comparison(op), left_operand, Some(right))
        } else {
            // A boolean-valued expression on its own.
            return Ok(Predicate::raw(loc, self.text(left.start, left.end)));
        };

        if negated {
            return Ok(Predicate::group(loc, PredicateKind::Not, vec![predicate]));
        }
        Ok(predicate)
    }

    /// `'(' expr { ',' expr } ')'`.
    fn in_list(&mut self) -> ParseResult<Span> {
        let open = self.expect(TokenKind::LParen, "'('")?.start;
        loop {
            self.expr()?;
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Span {
            start: open,
            end: self.prev_end(),
            column: None,
        })
    }

    fn operand(&self, span: &Span) -> Operand {
        match &span.column {
            Some(column) => Operand::Column(ColumnRef::from_qualified(self.loc(span.start), column)),
            None => Operand::Value(self.text(span.start, span.end)),
        }
    }

    pub(super) fn expr(&mut self) -> ParseResult<Span> {
        let first = self.unary()?;
        let mut span = first;
        loop {
            let arithmetic = self
                .peek()
                .is_some_and(|t| t.kind == TokenKind::Operator && ARITHMETIC.contains(&t.text.as_str()));
            if !(arithmetic || self.at_keyword("CONCAT")) {
                return Ok(span);
            }
            self.pos += 1;
            let next = self.unary()?;
            span = Span {
                start: span.start,
                end: next.end,
                column: None,
            };
        }
    }

    fn unary(&mut self) -> ParseResult<Span> {
        if self.at_operator("-") || self.at_operator("+") {
            let start = self.advance().map_or(0, |t| t.start);
            let inner = self.unary()?;
            return Ok(Span {
                start,
                end: inner.end,
                column: None,
            });
        }
        let mut span = self.primary()?;
        if self.at_any_keyword(DURATIONS) {
            self.pos += 1;
            span = Span {
                start: span.start,
                end: self.prev_end(),
                column: None,
            };
        }
        Ok(span)
    }

    fn primary(&mut self) -> ParseResult<Span> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        let value = |parser: &Parser<'_>| Span {
            start: token.start,
            end: parser.prev_end(),
            column: None,
        };

        match token.kind {
            TokenKind::Number | TokenKind::String | TokenKind::Parameter => {
                self.pos += 1;
                Ok(value(self))
            }
            TokenKind::LParen if self.at_query_start(1) => self.nested_query(),
            TokenKind::LParen => {
                self.pos += 1;
                loop {
                    self.expr()?;
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(value(self))
            }
            TokenKind::QuotedIdent => self.column_or_call(),
            TokenKind::Ident => match token.text.as_str() {
                "NULL" | "DEFAULT" => {
                    self.pos += 1;
                    Ok(value(self))
                }
                "CASE" => {
                    self.case_expr()?;
                    Ok(value(self))
                }
                "CAST" if self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) => {
                    self.pos += 2;
                    self.expr()?;
                    self.expect_keyword("AS")?;
                    self.data_type()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    Ok(value(self))
                }
                "CURRENT" => {
                    self.pos += 1;
                    if self.peek().is_some_and(|t| t.kind == TokenKind::Ident && !RESERVED.contains(&t.text.as_str())) {
                        self.pos += 1;
                    }
                    Ok(value(self))
                }
                text if TYPED_LITERALS.contains(&text) && self.nth(1).is_some_and(|t| t.kind == TokenKind::String) => {
                    self.pos += 2;
                    Ok(value(self))
                }
                text if RESERVED.contains(&text) && !self.nth(1).is_some_and(|t| t.kind == TokenKind::LParen) => {
                    Err(self.unexpected("expression"))
                }
                _ => self.column_or_call(),
            },
            _ => Err(self.unexpected("expression")),
        }
    }

    /// A column reference or a function call.
    fn column_or_call(&mut self) -> ParseResult<Span> {
        let (qualified, start) = self.qualified_name()?;
        if !self.at(TokenKind::LParen) {
            return Ok(Span {
                start,
                end: self.prev_end(),
                column: Some(qualified),
            });
        }

        let function = qualified.rsplit('.').next().unwrap_or("");
        if KEYWORD_ARGUMENT_FUNCTIONS.contains(&function) {
            self.skip_parenthesized()?;
        } else {
            self.pos += 1;
            if !self.eat(TokenKind::RParen) {
                if !self.eat_keyword("DISTINCT") {
                    self.eat_keyword("ALL");
                }
                if self.at_operator("*") {
                    self.pos += 1;
                } else {
                    loop {
                        self.expr()?;
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
            }
        }
        if self.at_keyword("WITHIN") && self.nth_is_keyword(1, "GROUP") {
            self.pos += 2;
            self.skip_parenthesized()?;
        }
        if self.eat_keyword("OVER") {
            self.skip_parenthesized()?;
        }
        Ok(Span {
            start,
            end: self.prev_end(),
            column: None,
        })
    }

    /// `CASE [expr] WHEN ... THEN ... [ELSE ...] END`.
    fn case_expr(&mut self) -> ParseResult<()> {
        self.expect_keyword("CASE")?;
        let simple = !self.at_keyword("WHEN");
        if simple {
            self.expr()?;
        }
        if !self.at_keyword("WHEN") {
            return Err(self.unexpected("WHEN"));
        }
        while self.eat_keyword("WHEN") {
            if simple {
                self.expr()?;
            } else {
                self.condition()?;
            }
            self.expect_keyword("THEN")?;
            self.expr()?;
        }
        if self.eat_keyword("ELSE") {
            self.expr()?;
        }
        self.expect_keyword("END")?;
        Ok(())
    }

    /// A data type name with optional length arguments; returns its text.
    pub(super) fn data_type(&mut self) -> ParseResult<String> {
        let (_, start) = self.name()?;
        while self.at_any_keyword(&["PRECISION", "VARYING"]) {
            self.pos += 1;
        }
        if self.at(TokenKind::LParen) {
            self.skip_parenthesized()?;
        }
        Ok(self.text(start, self.prev_end()))
    }

    /// Consume a balanced `( ... )` group without interpreting it.
    pub(super) fn skip_parenthesized(&mut self) -> ParseResult<()> {
        let open = self.expect(TokenKind::LParen, "'('")?;
        let mut depth = 1;
        while let Some(token) = self.advance() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Semicolon => break,
                _ => {}
            }
        }
        Err(super::SyntaxError {
            offset: open.start,
            message: "missing ')' for this '('".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use ibmi_lang_core::{Diagnostic, ParseStrategy};

    use crate::ast::{Operand, PredicateKind, Statement};
    use crate::grammar::GrammarParser;

    fn select(text: &str) -> crate::ast::SelectStmt {
        let (mut script, diags) = GrammarParser.parse(text, "Q.sql");
        assert!(!diags.iter().any(Diagnostic::is_error), "{diags:?}");
        match script.statements.remove(0) {
            Statement::Select(select) => select,
            other => panic!("expected select, got {other:?}"),
        }
    }

    fn first_error(text: &str) -> String {
        let (_, diags) = GrammarParser.parse(text, "Q.sql");
        diags.into_iter().find(|d| d.is_error()).map(|d| d.message).unwrap_or_default()
    }

    #[test]
    fn test_select_clauses() {
        let s = select(
            "SELECT DISTINCT o.id, SUM(o.amt) AS total\n\
             FROM orders o\n\
             INNER JOIN lib.cust c ON c.id = o.cust\n\
             WHERE o.status <> 'X' AND c.region IS NOT NULL\n\
             GROUP BY o.id HAVING SUM(o.amt) > 100\n\
             ORDER BY total DESC, o.id\n\
             FETCH FIRST 10 ROWS ONLY",
        );
        assert!(s.distinct);
        assert_eq!(s.columns, vec!["o.id", "SUM(o.amt) AS total"]);
        let tables: Vec<_> = s.from_tables.iter().map(|t| (t.qualified_name(), t.alias.clone())).collect();
        assert_eq!(
            tables,
            vec![
                ("ORDERS".to_string(), Some("O".to_string())),
                ("LIB.CUST".to_string(), Some("C".to_string()))
            ]
        );
        assert_eq!(s.join_conditions.len(), 1);
        let cond = s.where_clause.unwrap();
        assert_eq!(cond.kind, PredicateKind::And);
        assert_eq!(cond.children[1].kind, PredicateKind::IsNotNull);
        assert_eq!(s.group_by, vec!["o.id"]);
        assert!(s.having.is_some());
        assert_eq!(s.order_by.len(), 2);
        assert!(s.order_by[0].descending);
        assert_eq!(s.fetch_first, Some(10));
    }

    #[test]
    fn test_predicate_shapes() {
        let s = select("SELECT * FROM T WHERE (A = 1 OR B LIKE 'X%') AND C NOT IN (1, 2) AND D BETWEEN 1 AND 5");
        let cond = s.where_clause.unwrap();
        let kinds: Vec<_> = cond.children.iter().map(|c| c.kind.clone()).collect();
        assert_eq!(kinds, vec![PredicateKind::Or, PredicateKind::Not, PredicateKind::Between]);
        assert_eq!(cond.children[1].children[0].kind, PredicateKind::In);
        assert_eq!(cond.children[2].right, Some(Operand::Value("1 AND 5".to_string())));
        let Some(Operand::Column(col)) = &cond.children[0].children[0].left else {
            panic!("expected column operand");
        };
        assert_eq!(col.name, "A");
    }

    #[test]
    fn test_parenthesized_arithmetic_is_not_a_condition() {
        let s = select("SELECT 1 FROM T WHERE (A + 1) * 2 > B");
        let cond = s.where_clause.unwrap();
        assert_eq!(cond.kind, PredicateKind::Comparison(">".to_string()));
        assert_eq!(cond.left, Some(Operand::Value("(A + 1) * 2".to_string())));
    }

    #[test]
    fn test_subqueries_and_unions() {
        let s = select(
            "WITH recent AS (SELECT id FROM orders WHERE dt > CURRENT DATE - 30 DAYS)\n\
             SELECT x.id FROM (SELECT id FROM recent) x\n\
             WHERE EXISTS (SELECT 1 FROM lines l WHERE l.id = x.id)\n\
             UNION ALL SELECT id FROM history",
        );
        let nested: Vec<_> = s.subqueries.iter().map(|q| q.from_tables[0].name.as_str()).collect();
        assert_eq!(nested, vec!["ORDERS", "RECENT", "LINES"]);
        assert_eq!(s.unions.len(), 1);
        assert_eq!(s.unions[0].from_tables[0].name, "HISTORY");
        assert_eq!(s.where_clause.unwrap().kind, PredicateKind::Exists);
    }

    #[test]
    fn test_expressions() {
        let s = select(
            "SELECT CASE WHEN a > 0 THEN 'P' ELSE 'N' END AS sign, CAST(b AS DECIMAL(9, 2)), \
             COUNT(*), COALESCE((SELECT MAX(v) FROM w), 0), DATE '2024-01-01', \
             TRIM(LEADING ' ' FROM c), a || b CONCAT c, -a \
             FROM SYSIBM.SYSDUMMY1 FOR READ ONLY WITH UR",
        );
        assert_eq!(s.columns.len(), 8);
        assert_eq!(s.columns[0], "CASE WHEN a > 0 THEN 'P' ELSE 'N' END AS sign");
        assert_eq!(s.subqueries.len(), 1);
    }

    #[test]
    fn test_whitespace_collapsed_outside_strings() {
        let s = select("SELECT a  +\n   b, 'x   y' FROM t");
        assert_eq!(s.columns, vec!["a + b", "'x   y'"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(first_error("SELECT A FROM"), "expected name, found end of input");
        assert_eq!(first_error("SELECT (A FROM T"), "expected ')', found 'FROM'");
        assert_eq!(first_error("SELECT A FROM T WHERE A NOT = 1"), "expected ';', found 'NOT'");
        assert_eq!(first_error("SELECT A FROM T WHERE A IS 1"), "expected NULL, found '1'");
        assert_eq!(first_error("SELECT CASE A END FROM T"), "expected WHEN, found 'END'");
        assert_eq!(first_error("SELECT A FROM T FETCH FIRST 5 ROWS"), "expected ONLY, found end of input");
    }
}
