//! Flow syntax tree.

use crate::model::{Diagnostic, Location};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    /// Dotted path as written, e.g. `Core.Int` or `Int`.
    pub path: String,
    pub args: Vec<TypeExpr>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Name(String),
    Member {
        target: Box<Expr>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// `location` anchors diagnostics: the literal or name itself, the operator
/// of unary/binary/conditional expressions, the member name of an access.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
    height: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        let below = match &kind {
            ExprKind::Member { target, .. } => target.height,
            ExprKind::Unary { operand, .. } => operand.height,
            ExprKind::Binary { lhs, rhs, .. } => lhs.height.max(rhs.height),
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => test.height.max(then.height).max(otherwise.height),
            _ => 0,
        };
        Expr {
            kind,
            location,
            height: below + 1,
        }
    }

    /// Nodes on the longest path from here to a leaf, this one included.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Names and member chains rooted at a name denote storage.
    pub fn is_assignable(&self) -> bool {
        match &self.kind {
            ExprKind::Name(_) => true,
            ExprKind::Member { target, .. } => target.is_assignable(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub location: Location,
}

/// `fn name(params) -> [ref] type => body;`
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub params: Vec<Param>,
    pub by_ref: bool,
    pub return_type: TypeExpr,
    pub body: Expr,
    pub location: Location,
}

/// A parsed batch: the items that parsed cleanly plus every lexical and
/// syntax diagnostic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub items: Vec<Item>,
    pub diagnostics: Vec<Diagnostic>,
}
