//! Expression tree

use crate::value::Value;

/// A compiled expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Quoted string, number, `true`, `false` or `null`
    Literal(Value),
    /// Bare identifier resolved against the context
    Var(String),
    /// `object.key`
    Member(Box<Expr>, String),
    /// `object[key]`
    Index(Box<Expr>, Box<Expr>),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    /// Logical or, doubling as the fallback operator
    Or,
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// The dotted path of a plain variable reference, if this is one
    ///
    /// `user.address.city` gives `Some("user.address.city")`; anything with
    /// indexing or operators gives `None`.
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Var(name) => Some(name.clone()),
            Expr::Member(object, key) => object.path().map(|p| format!("{}.{}", p, key)),
            _ => None,
        }
    }
}
