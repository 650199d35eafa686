//! Name and type checking of parsed Flow items against linked references.

use std::collections::HashMap;

use super::parser::parse_type;
use super::syntax::*;
use crate::model::{Diagnostic, Location, ModuleReference, TypeExport};

pub const OBJECT: &str = "Core.Object";
pub const INT: &str = "Core.Int";
pub const FLOAT: &str = "Core.Float";
pub const BOOL: &str = "Core.Bool";
pub const STRING: &str = "Core.String";

/// Bound on base-chain walks, in case exports describe a cycle.
const MAX_BASE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Named { name: String, args: Vec<Ty> },
    Null,
    /// Already reported; suppresses follow-on diagnostics.
    Error,
}

impl Ty {
    pub fn named(name: &str) -> Ty {
        Ty::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    fn is(&self, expected: &str) -> bool {
        matches!(self, Ty::Named { name, args } if name == expected && args.is_empty())
    }

    fn is_numeric(&self) -> bool {
        self.is(INT) || self.is(FLOAT)
    }

    fn is_value_type(&self) -> bool {
        self.is(INT) || self.is(FLOAT) || self.is(BOOL)
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Null => write!(f, "<null>"),
            Ty::Error => write!(f, "?"),
        }
    }
}

/// Exported types visible to one compilation. The first module to export a
/// name wins.
pub struct TypeTable<'a> {
    types: HashMap<&'a str, &'a TypeExport>,
    namespaces: &'a [String],
}

impl<'a> TypeTable<'a> {
    pub fn new(references: &'a [std::sync::Arc<ModuleReference>], namespaces: &'a [String]) -> Self {
        let mut types = HashMap::new();
        for reference in references {
            for export in &reference.exports {
                types.entry(export.name.as_str()).or_insert(export);
            }
        }
        TypeTable { types, namespaces }
    }

    /// Exact full name first, then `namespace.path` for each import.
    pub fn lookup(&self, path: &str) -> Option<&'a TypeExport> {
        if let Some(&export) = self.types.get(path) {
            return Some(export);
        }
        self.namespaces
            .iter()
            .find_map(|ns| self.types.get(format!("{}.{}", ns, path).as_str()).copied())
    }
}

pub struct Checker<'a> {
    table: TypeTable<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub fn new(table: TypeTable<'a>) -> Self {
        Checker {
            table,
            diagnostics: Vec::new(),
        }
    }

    pub fn check(mut self, file: &SourceFile) -> Vec<Diagnostic> {
        for item in &file.items {
            self.check_item(item);
        }
        self.diagnostics
    }

    fn check_item(&mut self, item: &Item) {
        let mut params = HashMap::new();
        for param in &item.params {
            let ty = self.resolve_type(&param.ty);
            params.insert(param.name.as_str(), ty);
        }
        let return_type = self.resolve_type(&item.return_type);
        let body = self.type_of(&item.body, &params);

        if item.by_ref {
            if !item.body.is_assignable() {
                self.error(
                    "FX0131",
                    "The expression cannot be used as a reference because it is not assignable",
                    item.body.location,
                );
            } else if body != return_type && body != Ty::Error && return_type != Ty::Error {
                self.error(
                    "FX0029",
                    format!(
                        "Cannot bind a reference of type '{}' to '{}'",
                        body, return_type
                    ),
                    item.body.location,
                );
            }
        } else if !self.converts(&body, &return_type) {
            self.error(
                "FX0029",
                format!(
                    "Cannot implicitly convert type '{}' to '{}'",
                    body, return_type
                ),
                item.body.location,
            );
        }
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn resolve_type(&mut self, ty: &TypeExpr) -> Ty {
        let args: Vec<Ty> = ty.args.iter().map(|arg| self.resolve_type(arg)).collect();
        let Some(export) = self.table.lookup(&ty.path) else {
            self.error(
                "FX0246",
                format!(
                    "The type or namespace name '{}' could not be found (are you missing a module reference?)",
                    ty.path
                ),
                ty.location,
            );
            return Ty::Error;
        };
        if export.arity != args.len() {
            self.error(
                "FX0305",
                format!(
                    "Using the generic type '{}' requires {} type argument(s)",
                    export.name, export.arity
                ),
                ty.location,
            );
            return Ty::Error;
        }
        if args.contains(&Ty::Error) {
            return Ty::Error;
        }
        Ty::Named {
            name: export.name.clone(),
            args,
        }
    }

    /// Resolve a type name from export metadata without reporting anything.
    fn resolve_quiet(&self, text: &str) -> Ty {
        fn go(table: &TypeTable<'_>, ty: &TypeExpr) -> Option<Ty> {
            let export = table.lookup(&ty.path)?;
            if export.arity != ty.args.len() {
                return None;
            }
            let args = ty
                .args
                .iter()
                .map(|arg| go(table, arg))
                .collect::<Option<Vec<_>>>()?;
            Some(Ty::Named {
                name: export.name.clone(),
                args,
            })
        }
        parse_type(text)
            .and_then(|ty| go(&self.table, &ty))
            .unwrap_or(Ty::Error)
    }

    fn base_of(&self, ty: &Ty) -> Option<Ty> {
        let Ty::Named { name, .. } = ty else {
            return None;
        };
        let base = self.table.lookup(name)?.base.as_deref()?;
        Some(self.resolve_quiet(base))
    }

    fn derives_from(&self, from: &Ty, to: &Ty) -> bool {
        let mut current = self.base_of(from);
        for _ in 0..MAX_BASE_DEPTH {
            let Some(base) = current else {
                return false;
            };
            if &base == to {
                return true;
            }
            current = self.base_of(&base);
        }
        false
    }

    fn field_type(&self, ty: &Ty, field: &str) -> Option<Ty> {
        let mut current = Some(ty.clone());
        for _ in 0..MAX_BASE_DEPTH {
            let Some(Ty::Named { name, .. }) = &current else {
                return None;
            };
            let export = self.table.lookup(name)?;
            if let Some(found) = export.fields.iter().find(|f| f.name == field) {
                return Some(self.resolve_quiet(&found.type_name));
            }
            current = self.base_of(current.as_ref()?);
        }
        None
    }

    /// Implicit conversion: identity, Int → Float, null → reference types,
    /// anything → Object, derived → base.
    fn converts(&self, from: &Ty, to: &Ty) -> bool {
        match (from, to) {
            (Ty::Error, _) | (_, Ty::Error) => true,
            (Ty::Null, Ty::Null) => true,
            (Ty::Null, to) => !to.is_value_type(),
            (_, Ty::Null) => false,
            (from, to) => {
                from == to
                    || (from.is(INT) && to.is(FLOAT))
                    || to.is(OBJECT)
                    || self.derives_from(from, to)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn type_of(&mut self, expr: &Expr, params: &HashMap<&str, Ty>) -> Ty {
        match &expr.kind {
            ExprKind::Int(_) => Ty::named(INT),
            ExprKind::Float(_) => Ty::named(FLOAT),
            ExprKind::Str(_) => Ty::named(STRING),
            ExprKind::Bool(_) => Ty::named(BOOL),
            ExprKind::Null => Ty::Null,
            ExprKind::Name(name) => match params.get(name.as_str()) {
                Some(ty) => ty.clone(),
                None => {
                    self.error(
                        "FX0103",
                        format!("The name '{}' does not exist in the current context", name),
                        expr.location,
                    );
                    Ty::Error
                }
            },
            ExprKind::Member { target, name } => {
                let target = self.type_of(target, params);
                match target {
                    Ty::Error => Ty::Error,
                    Ty::Null => {
                        self.error(
                            "FX0023",
                            "Operator '.' cannot be applied to operand of type '<null>'",
                            expr.location,
                        );
                        Ty::Error
                    }
                    Ty::Named { .. } => match self.field_type(&target, name) {
                        Some(ty) => ty,
                        None => {
                            self.error(
                                "FX1061",
                                format!("'{}' does not contain a definition for '{}'", target, name),
                                expr.location,
                            );
                            Ty::Error
                        }
                    },
                }
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.type_of(operand, params);
                let ok = match op {
                    UnaryOp::Neg => operand.is_numeric(),
                    UnaryOp::Not => operand.is(BOOL),
                };
                if operand == Ty::Error || ok {
                    return operand;
                }
                self.error(
                    "FX0023",
                    format!(
                        "Operator '{}' cannot be applied to operand of type '{}'",
                        op.symbol(),
                        operand
                    ),
                    expr.location,
                );
                Ty::Error
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.type_of(lhs, params);
                let rhs = self.type_of(rhs, params);
                if lhs == Ty::Error || rhs == Ty::Error {
                    return Ty::Error;
                }
                match self.binary_result(*op, &lhs, &rhs) {
                    Some(ty) => ty,
                    None => {
                        self.error(
                            "FX0019",
                            format!(
                                "Operator '{}' cannot be applied to operands of type '{}' and '{}'",
                                op.symbol(),
                                lhs,
                                rhs
                            ),
                            expr.location,
                        );
                        Ty::Error
                    }
                }
            }
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => {
                let test_ty = self.type_of(test, params);
                if !self.converts(&test_ty, &Ty::named(BOOL)) {
                    self.error(
                        "FX0029",
                        format!("Cannot implicitly convert type '{}' to '{}'", test_ty, BOOL),
                        test.location,
                    );
                } else if let ExprKind::Bool(value) = test.kind {
                    self.diagnostics.push(Diagnostic::warning(
                        "FX8001",
                        format!("Condition is always {}", value),
                        test.location,
                    ));
                }

                let a = self.type_of(then, params);
                let b = self.type_of(otherwise, params);
                if a == Ty::Error || b == Ty::Error {
                    Ty::Error
                } else if self.converts(&a, &b) {
                    b
                } else if self.converts(&b, &a) {
                    a
                } else {
                    self.error(
                        "FX0173",
                        format!(
                            "Type of conditional expression cannot be determined because there is no implicit conversion between '{}' and '{}'",
                            a, b
                        ),
                        expr.location,
                    );
                    Ty::Error
                }
            }
        }
    }

    fn binary_result(&self, op: BinaryOp, lhs: &Ty, rhs: &Ty) -> Option<Ty> {
        let numeric = lhs.is_numeric() && rhs.is_numeric();
        let arithmetic = || {
            if lhs.is(INT) && rhs.is(INT) {
                Ty::named(INT)
            } else {
                Ty::named(FLOAT)
            }
        };
        match op {
            BinaryOp::Add if lhs.is(STRING) || rhs.is(STRING) => Some(Ty::named(STRING)),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                numeric.then(arithmetic)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                numeric.then(|| Ty::named(BOOL))
            }
            BinaryOp::Eq | BinaryOp::Ne => (numeric
                || self.converts(lhs, rhs)
                || self.converts(rhs, lhs))
            .then(|| Ty::named(BOOL)),
            BinaryOp::And | BinaryOp::Or => {
                (lhs.is(BOOL) && rhs.is(BOOL)).then(|| Ty::named(BOOL))
            }
        }
    }

    fn error(&mut self, code: &str, message: impl Into<String>, location: Location) {
        self.diagnostics
            .push(Diagnostic::error(code, message, location));
    }
}
