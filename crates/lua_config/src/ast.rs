//! Syntax tree produced by the parser. Immutable once built.

use crate::lexer::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub statements: Vec<Statement>,
    pub ret: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `include "file.lua"`, executed in the including file's environment.
    Include { basename: String, position: Position },
    /// `a.b[c] = expr`
    Assign {
        target: Path,
        value: Expr,
        position: Position,
    },
    /// `local name = expr`
    Local {
        name: String,
        value: Expr,
        position: Position,
    },
}

/// A variable followed by zero or more field accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub root: String,
    pub fields: Vec<Field>,
    pub position: Position,
}

impl Path {
    /// Dotted rendering used for builtin lookup and error messages.
    pub fn dotted(&self) -> String {
        let mut out = self.root.clone();
        for field in &self.fields {
            match field {
                Field::Name(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Field::Index(_) => out.push_str("[...]"),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Name(String),
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Str(String),
    Table {
        entries: Vec<TableEntry>,
        position: Position,
    },
    Var(Path),
    Call {
        function: Path,
        args: Vec<Expr>,
        position: Position,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        position: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableEntry {
    Named(String, Expr),
    Keyed(Expr, Expr),
    Positional(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}
