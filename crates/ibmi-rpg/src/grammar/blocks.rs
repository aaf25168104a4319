//! Structured block assembly.
//!
//! Both formats open and close blocks one line or statement at a time, so
//! nesting is tracked with an explicit stack of open frames. Closing a frame
//! folds it into a [`Statement`] appended to the enclosing body. Monitor
//! groups and subroutines have no AST node; their bodies are spliced into
//! the enclosing body.

use ibmi_lang_core::SourceLocation;

use super::expr::binary;
use crate::ast::{ConditionalBlock, Expr, LoopKind, Statement};

/// Statement groups whose bodies are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Group {
    Monitor,
    Subroutine,
}

/// Block terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Closer {
    EndIf,
    EndSl,
    EndDo,
    EndFor,
    EndMon,
    EndSr,
    /// Fixed-format `END`: closes any IF, SELECT or loop.
    End,
}

impl Closer {
    fn keyword(self) -> &'static str {
        match self {
            Closer::EndIf => "ENDIF",
            Closer::EndSl => "ENDSL",
            Closer::EndDo => "ENDDO",
            Closer::EndFor => "ENDFOR",
            Closer::EndMon => "ENDMON",
            Closer::EndSr => "ENDSR",
            Closer::End => "END",
        }
    }
}

#[derive(Debug)]
enum Frame {
    If {
        loc: SourceLocation,
        condition: Expr,
        then_body: Vec<Statement>,
        else_ifs: Vec<ConditionalBlock>,
        else_body: Option<Vec<Statement>>,
    },
    Select {
        loc: SourceLocation,
        whens: Vec<ConditionalBlock>,
        other: Option<Vec<Statement>>,
    },
    Loop {
        loc: SourceLocation,
        kind: LoopKind,
        condition: Option<Expr>,
        body: Vec<Statement>,
    },
    Group {
        loc: SourceLocation,
        group: Group,
        body: Vec<Statement>,
    },
}

impl Frame {
    fn opener(&self) -> &'static str {
        match self {
            Frame::If { .. } => "IF",
            Frame::Select { .. } => "SELECT",
            Frame::Loop { kind, .. } => kind.as_str(),
            Frame::Group {
                group: Group::Monitor,
                ..
            } => "MONITOR",
            Frame::Group {
                group: Group::Subroutine,
                ..
            } => "BEGSR",
        }
    }

    fn loc(&self) -> &SourceLocation {
        match self {
            Frame::If { loc, .. }
            | Frame::Select { loc, .. }
            | Frame::Loop { loc, .. }
            | Frame::Group { loc, .. } => loc,
        }
    }

    fn accepts(&self, closer: Closer) -> bool {
        match (self, closer) {
            (Frame::If { .. }, Closer::EndIf) => true,
            (Frame::Select { .. }, Closer::EndSl) => true,
            (Frame::Loop { kind: LoopKind::For, .. }, Closer::EndFor) => true,
            (Frame::Loop { kind, .. }, Closer::EndDo) => *kind != LoopKind::For,
            (Frame::Group { group: Group::Monitor, .. }, Closer::EndMon) => true,
            (Frame::Group { group: Group::Subroutine, .. }, Closer::EndSr) => true,
            (Frame::Group { .. }, Closer::End) => false,
            (_, Closer::End) => true,
            _ => false,
        }
    }

    /// Body receiving statements right now. `None` between `SELECT` and its
    /// first `WHEN`.
    fn body(&mut self) -> Option<&mut Vec<Statement>> {
        match self {
            Frame::If {
                then_body,
                else_ifs,
                else_body,
                ..
            } => {
                if let Some(body) = else_body {
                    return Some(body);
                }
                match else_ifs.last_mut() {
                    Some(block) => Some(&mut block.body),
                    None => Some(then_body),
                }
            }
            Frame::Select { whens, other, .. } => match other {
                Some(body) => Some(body),
                None => whens.last_mut().map(|w| &mut w.body),
            },
            Frame::Loop { body, .. } | Frame::Group { body, .. } => Some(body),
        }
    }

    /// The condition a fixed-format `ANDxx`/`ORxx` continues.
    fn condition_mut(&mut self) -> Option<&mut Expr> {
        match self {
            Frame::If {
                condition,
                else_ifs,
                else_body: None,
                ..
            } => Some(match else_ifs.last_mut() {
                Some(block) => &mut block.condition,
                None => condition,
            }),
            Frame::Select {
                whens, other: None, ..
            } => whens.last_mut().map(|w| &mut w.condition),
            Frame::Loop { condition, .. } => condition.as_mut(),
            _ => None,
        }
    }

    /// Statements this frame contributes to its parent.
    fn fold(self) -> Vec<Statement> {
        match self {
            Frame::If {
                loc,
                condition,
                then_body,
                else_ifs,
                else_body,
            } => vec![Statement::If {
                loc,
                condition,
                then_body,
                else_ifs,
                else_body: else_body.unwrap_or_default(),
            }],
            Frame::Select { loc, whens, other } => vec![Statement::Select { loc, whens, other }],
            Frame::Loop {
                loc,
                kind,
                condition,
                body,
            } => vec![Statement::DoFor {
                loc,
                kind,
                condition,
                body,
            }],
            Frame::Group { body, .. } => body,
        }
    }
}

/// A block problem, reported by the caller at the offending line.
pub(crate) type BlockError = String;

#[derive(Debug, Default)]
pub(crate) struct BlockBuilder {
    root: Vec<Statement>,
    frames: Vec<Frame>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn body(&mut self) -> Result<&mut Vec<Statement>, BlockError> {
        match self.frames.last_mut() {
            None => Ok(&mut self.root),
            Some(frame) => frame
                .body()
                .ok_or_else(|| "statement between SELECT and its first WHEN".to_string()),
        }
    }

    pub fn push(&mut self, stmt: Statement) -> Result<(), BlockError> {
        self.body()?.push(stmt);
        Ok(())
    }

    /// The most recently added statement in the current body.
    pub fn last_mut(&mut self) -> Option<&mut Statement> {
        self.body().ok()?.last_mut()
    }

    pub fn open_if(&mut self, loc: SourceLocation, condition: Expr) {
        self.frames.push(Frame::If {
            loc,
            condition,
            then_body: Vec::new(),
            else_ifs: Vec::new(),
            else_body: None,
        });
    }

    pub fn else_if(&mut self, loc: SourceLocation, condition: Expr) -> Result<(), BlockError> {
        match self.frames.last_mut() {
            Some(Frame::If {
                else_ifs,
                else_body: None,
                ..
            }) => {
                else_ifs.push(ConditionalBlock {
                    loc,
                    condition,
                    body: Vec::new(),
                });
                Ok(())
            }
            Some(Frame::If { .. }) => Err("ELSEIF after ELSE".to_string()),
            _ => Err("ELSEIF without IF".to_string()),
        }
    }

    pub fn else_branch(&mut self) -> Result<(), BlockError> {
        match self.frames.last_mut() {
            Some(Frame::If { else_body, .. }) if else_body.is_none() => {
                *else_body = Some(Vec::new());
                Ok(())
            }
            Some(Frame::If { .. }) => Err("second ELSE for the same IF".to_string()),
            _ => Err("ELSE without IF".to_string()),
        }
    }

    pub fn open_select(&mut self, loc: SourceLocation) {
        self.frames.push(Frame::Select {
            loc,
            whens: Vec::new(),
            other: None,
        });
    }

    pub fn when(&mut self, loc: SourceLocation, condition: Expr) -> Result<(), BlockError> {
        match self.frames.last_mut() {
            Some(Frame::Select { whens, other: None, .. }) => {
                whens.push(ConditionalBlock {
                    loc,
                    condition,
                    body: Vec::new(),
                });
                Ok(())
            }
            Some(Frame::Select { .. }) => Err("WHEN after OTHER".to_string()),
            _ => Err("WHEN without SELECT".to_string()),
        }
    }

    pub fn other(&mut self) -> Result<(), BlockError> {
        match self.frames.last_mut() {
            Some(Frame::Select { other, .. }) if other.is_none() => {
                *other = Some(Vec::new());
                Ok(())
            }
            Some(Frame::Select { .. }) => Err("second OTHER for the same SELECT".to_string()),
            _ => Err("OTHER without SELECT".to_string()),
        }
    }

    pub fn open_loop(&mut self, loc: SourceLocation, kind: LoopKind, condition: Option<Expr>) {
        self.frames.push(Frame::Loop {
            loc,
            kind,
            condition,
            body: Vec::new(),
        });
    }

    pub fn open_group(&mut self, loc: SourceLocation, group: Group) {
        self.frames.push(Frame::Group {
            loc,
            group,
            body: Vec::new(),
        });
    }

    /// `ON-ERROR`: handler statements share the monitor's flattened body.
    pub fn on_error(&mut self) -> Result<(), BlockError> {
        match self.frames.last() {
            Some(Frame::Group {
                group: Group::Monitor,
                ..
            }) => Ok(()),
            _ => Err("ON-ERROR without MONITOR".to_string()),
        }
    }

    /// Join `extra` onto the open block's condition with `AND`/`OR`.
    pub fn extend_condition(&mut self, loc: SourceLocation, op: &str, extra: Expr) -> Result<(), BlockError> {
        let Some(condition) = self.frames.last_mut().and_then(Frame::condition_mut) else {
            return Err(format!("{op} without a condition to continue"));
        };
        let placeholder = Expr::raw(loc.clone(), "");
        let left = std::mem::replace(condition, placeholder);
        *condition = binary(loc, op, left, extra);
        Ok(())
    }

    pub fn close(&mut self, closer: Closer) -> Result<(), BlockError> {
        let Some(frame) = self.frames.last() else {
            return Err(format!("{} without an open block", closer.keyword()));
        };
        if !frame.accepts(closer) {
            return Err(format!(
                "{} does not close the open {} block",
                closer.keyword(),
                frame.opener()
            ));
        }
        if let Some(frame) = self.frames.pop() {
            let folded = frame.fold();
            self.body()?.extend(folded);
        }
        Ok(())
    }

    /// Close whatever is still open, returning the body and one message per
    /// unclosed block.
    pub fn finish(mut self) -> (Vec<Statement>, Vec<(SourceLocation, BlockError)>) {
        let mut errors = Vec::new();
        while let Some(frame) = self.frames.pop() {
            errors.push((frame.loc().clone(), format!("{} block is not closed", frame.opener())));
            let folded = frame.fold();
            match self.frames.last_mut() {
                Some(parent) => {
                    if let Some(body) = parent.body() {
                        body.extend(folded);
                    }
                }
                None => self.root.extend(folded),
            }
        }
        errors.reverse();
        (self.root, errors)
    }
}
