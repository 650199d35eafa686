//! Recursive-descent parser for Flow batches.
//!
//! Syntax errors are diagnostics. After an error the parser skips to the next
//! `fn`, so one broken fragment does not hide errors in the others.

use super::lexer::{Token, TokenKind, tokenize};
use super::syntax::*;
use crate::model::{Diagnostic, Location};

/// Parse a whole batch.
pub fn parse_source(source: &str) -> SourceFile {
    let (tokens, diagnostics) = tokenize(source);
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        diagnostics,
    };
    let items = parser.items();
    SourceFile {
        items,
        diagnostics: parser.diagnostics,
    }
}

/// Parse a standalone type name such as `Core.List<Orders.Order>`.
/// Returns `None` on any lexical or syntax error.
pub fn parse_type(text: &str) -> Option<TypeExpr> {
    let (tokens, diagnostics) = tokenize(text);
    if !diagnostics.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        diagnostics: Vec::new(),
    };
    let ty = parser.type_expr().ok()?;
    if !parser.at(&TokenKind::Eof) {
        return None;
    }
    Some(ty)
}

/// Marker for "a diagnostic was recorded, unwind to the item loop".
struct Recover;

type PResult<T> = Result<T, Recover>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open parentheses, conditionals, prefix operators and type argument
    /// lists around the current token.
    nesting: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Limit on `Parser::nesting`. Parsing recurses once per level.
const MAX_NESTING: usize = 64;

/// Limit on `Expr::height`. The checker recurses once per level.
const MAX_HEIGHT: usize = 256;

/// Binary precedence levels, loosest first.
const LEVELS: &[&[(TokenKind, BinaryOp)]] = &[
    &[(TokenKind::OrOr, BinaryOp::Or)],
    &[(TokenKind::AndAnd, BinaryOp::And)],
    &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::Ne)],
    &[
        (TokenKind::Lt, BinaryOp::Lt),
        (TokenKind::Le, BinaryOp::Le),
        (TokenKind::Gt, BinaryOp::Gt),
        (TokenKind::Ge, BinaryOp::Ge),
    ],
    &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
    &[
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::Percent, BinaryOp::Rem),
    ],
];

impl Parser {
    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    fn items(&mut self) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.at(&TokenKind::Eof) {
            if !self.at(&TokenKind::Fn) {
                self.expected("fn");
                self.advance();
                self.skip_to_item();
                continue;
            }
            match self.item() {
                Ok(item) => items.push(item),
                Err(Recover) => self.skip_to_item(),
            }
        }
        items
    }

    fn item(&mut self) -> PResult<Item> {
        let location = self.current().start;
        self.expect(TokenKind::Fn, "fn")?;
        let name = self.ident()?;

        self.expect(TokenKind::LParen, "(")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let location = self.current().start;
                let name = self.ident()?;
                self.expect(TokenKind::Colon, ":")?;
                let ty = self.type_expr()?;
                params.push(Param { name, ty, location });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, ")")?;

        self.expect(TokenKind::Arrow, "->")?;
        let by_ref = self.eat(&TokenKind::Ref);
        let return_type = self.type_expr()?;
        self.expect(TokenKind::FatArrow, "=>")?;
        let body = self.expr()?;
        self.expect(TokenKind::Semi, ";")?;

        Ok(Item {
            name,
            params,
            by_ref,
            return_type,
            body,
            location,
        })
    }

    fn type_expr(&mut self) -> PResult<TypeExpr> {
        self.enter()?;
        let ty = self.type_path();
        self.nesting -= 1;
        ty
    }

    fn type_path(&mut self) -> PResult<TypeExpr> {
        let location = self.current().start;
        let mut path = self.ident()?;
        while self.eat(&TokenKind::Dot) {
            path.push('.');
            path.push_str(&self.ident()?);
        }

        let mut args = Vec::new();
        if self.eat(&TokenKind::Lt) {
            loop {
                args.push(self.type_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, ">")?;
        }

        Ok(TypeExpr {
            path,
            args,
            location,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self) -> PResult<Expr> {
        self.enter()?;
        let expr = self.conditional();
        self.nesting -= 1;
        expr
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let test = self.binary(0)?;
        if !self.at(&TokenKind::Question) {
            return Ok(test);
        }
        let location = self.advance().start;
        let then = self.expr()?;
        self.expect(TokenKind::Colon, ":")?;
        let otherwise = self.expr()?;
        self.node(
            ExprKind::Conditional {
                test: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            location,
        )
    }

    fn binary(&mut self, level: usize) -> PResult<Expr> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = ops
            .iter()
            .find(|(kind, _)| self.at(kind))
            .map(|(_, op)| *op)
        {
            let location = self.advance().start;
            let rhs = self.binary(level + 1)?;
            lhs = self.node(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                location,
            )?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        let Some(op) = op else {
            return self.postfix();
        };
        let location = self.advance().start;
        self.enter()?;
        let operand = self.unary();
        self.nesting -= 1;
        self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand?),
            },
            location,
        )
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        while self.eat(&TokenKind::Dot) {
            let location = self.current().start;
            let name = self.ident()?;
            expr = self.node(
                ExprKind::Member {
                    target: Box::new(expr),
                    name,
                },
                location,
            )?;
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.current().clone();
        let kind = match token.kind {
            TokenKind::Int(v) => ExprKind::Int(v),
            TokenKind::Float(v) => ExprKind::Float(v),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Ident(name) => ExprKind::Name(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, ")")?;
                return Ok(inner);
            }
            other => {
                let location = self.error_location();
                self.diagnostics.push(Diagnostic::error(
                    "FX1525",
                    format!("Invalid expression term '{}'", other.describe()),
                    location,
                ));
                return Err(Recover);
            }
        };
        self.advance();
        Ok(Expr::new(kind, token.start))
    }

    fn node(&mut self, kind: ExprKind, location: Location) -> PResult<Expr> {
        let expr = Expr::new(kind, location);
        if expr.height() > MAX_HEIGHT {
            self.too_complex();
            return Err(Recover);
        }
        Ok(expr)
    }

    fn enter(&mut self) -> PResult<()> {
        if self.nesting >= MAX_NESTING {
            self.too_complex();
            return Err(Recover);
        }
        self.nesting += 1;
        Ok(())
    }

    fn too_complex(&mut self) {
        let location = self.error_location();
        self.diagnostics.push(Diagnostic::error(
            "FX8078",
            "An expression is too long or complex to compile",
            location,
        ));
    }

    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn current(&self) -> &Token {
        // The token list always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, text: &str) -> PResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            self.expected(text);
            Err(Recover)
        }
    }

    fn ident(&mut self) -> PResult<String> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            self.expected("identifier");
            Err(Recover)
        }
    }

    fn expected(&mut self, text: &str) {
        let location = self.error_location();
        let message = if text == "identifier" {
            "Identifier expected".to_string()
        } else {
            format!("Syntax error, '{}' expected", text)
        };
        self.diagnostics
            .push(Diagnostic::error("FX1003", message, location));
    }

    /// Where a missing-token error belongs: at the current token, unless it
    /// starts a later line than the previous token ended on; then right after
    /// the previous token, so the error stays on the fragment that caused it.
    fn error_location(&self) -> Location {
        let current = self.current().start;
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(prev) if current.line > prev.end.line => prev.end,
            _ => current,
        }
    }

    fn skip_to_item(&mut self) {
        while !self.at(&TokenKind::Fn) && !self.at(&TokenKind::Eof) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_item(source: &str) -> Item {
        let file = parse_source(source);
        assert!(file.diagnostics.is_empty(), "{:?}", file.diagnostics);
        assert_eq!(file.items.len(), 1);
        file.items.into_iter().next().unwrap()
    }

    #[test]
    fn parses_value_item() {
        let item = single_item("fn __expr0(a: Core.Int, b: Core.List<Core.Int>) -> Core.Int => a + 1;");
        assert_eq!(item.name, "__expr0");
        assert!(!item.by_ref);
        assert_eq!(item.params.len(), 2);
        assert_eq!(item.params[1].ty.path, "Core.List");
        assert_eq!(item.params[1].ty.args[0].path, "Core.Int");
        assert_eq!(item.return_type.path, "Core.Int");
    }

    #[test]
    fn parses_reference_item() {
        let item = single_item("fn r() -> ref Orders.Order => order.customer;");
        assert!(item.by_ref);
        assert!(item.body.is_assignable());
    }

    #[test]
    fn precedence_multiplication_binds_tighter() {
        let item = single_item("fn f() -> Core.Int => 1 + 2 * 3;");
        match item.body.kind {
            ExprKind::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn conditional_and_unary() {
        let item = single_item("fn f(a: Core.Bool) -> Core.Int => !a ? -1 : (2);");
        assert!(matches!(item.body.kind, ExprKind::Conditional { .. }));
        assert!(!item.body.is_assignable());
    }

    #[test]
    fn missing_operand_is_reported_on_its_line() {
        let file = parse_source("fn a() -> Core.Int => 1;\nfn b() -> Core.Int => 1 + ;\nfn c() -> Core.Int => 3;\n");
        assert_eq!(file.diagnostics.len(), 1);
        assert_eq!(file.diagnostics[0].code, "FX1525");
        assert_eq!(file.diagnostics[0].location.unwrap().line, 1);
        assert_eq!(file.items.len(), 2);
    }

    #[test]
    fn missing_semicolon_stays_on_previous_line() {
        let file = parse_source("fn a() -> Core.Int => 1 // swallowed;\nfn b() -> Core.Int => 2;\n");
        assert_eq!(file.diagnostics.len(), 1);
        assert_eq!(file.diagnostics[0].code, "FX1003");
        assert_eq!(file.diagnostics[0].location.unwrap().line, 0);
        assert_eq!(file.items.len(), 1);
    }

    #[test]
    fn trailing_junk_after_item() {
        let file = parse_source("fn a() -> Core.Int => x; y;\nfn b() -> Core.Int => 2;\n");
        assert_eq!(file.diagnostics.len(), 1);
        assert_eq!(file.diagnostics[0].message, "Syntax error, 'fn' expected");
        assert_eq!(file.diagnostics[0].location.unwrap().line, 0);
        assert_eq!(file.items.len(), 2);
    }

    fn single_error(source: &str) -> Diagnostic {
        let file = parse_source(source);
        assert_eq!(file.diagnostics.len(), 1, "{:?}", file.diagnostics);
        file.diagnostics.into_iter().next().unwrap()
    }

    #[test]
    fn moderate_nesting_parses() {
        let body = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        let item = single_item(&format!("fn f() -> Core.Int => {};", body));
        assert_eq!(item.body.height(), 1);

        let sum = vec!["1"; 200].join(" + ");
        let item = single_item(&format!("fn f() -> Core.Int => {};", sum));
        assert_eq!(item.body.height(), 200);
    }

    #[test]
    fn deep_parentheses_are_one_error() {
        let body = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let source = format!("fn a() -> Core.Int => {};\nfn b() -> Core.Int => 2;\n", body);
        let file = parse_source(&source);
        assert_eq!(file.diagnostics.len(), 1);
        assert_eq!(file.diagnostics[0].code, "FX8078");
        assert_eq!(file.diagnostics[0].location.unwrap().line, 0);
        assert_eq!(file.items.len(), 1);
        assert_eq!(file.items[0].name, "b");
    }

    #[test]
    fn long_prefix_chain_is_one_error() {
        let error = single_error(&format!("fn f() -> Core.Int => {}1;", "-".repeat(10_000)));
        assert_eq!(error.code, "FX8078");
        let error = single_error(&format!("fn f() -> Core.Bool => {}true;", "!".repeat(10_000)));
        assert_eq!(error.code, "FX8078");
    }

    #[test]
    fn long_operator_and_member_chains_are_one_error() {
        let sum = vec!["1"; 10_000].join(" + ");
        assert_eq!(single_error(&format!("fn f() -> Core.Int => {};", sum)).code, "FX8078");

        let path = format!("o{}", ".next".repeat(10_000));
        assert_eq!(single_error(&format!("fn f() -> Core.Int => {};", path)).code, "FX8078");

        let ternary = "true ? 1 : ".repeat(10_000);
        assert_eq!(single_error(&format!("fn f() -> Core.Int => {}2;", ternary)).code, "FX8078");
    }

    #[test]
    fn deep_type_arguments_are_rejected() {
        let ty = format!("{}Core.Int{}", "Core.List<".repeat(10_000), ">".repeat(10_000));
        assert!(parse_type(&ty).is_none());
        let error = single_error(&format!("fn f(a: {}) -> Core.Int => 1;", ty));
        assert_eq!(error.code, "FX8078");
    }

    #[test]
    fn parse_type_accepts_nested_generics() {
        let ty = parse_type("Core.List<Core.List<Core.Int>>").unwrap();
        assert_eq!(ty.args[0].args[0].path, "Core.Int");
    }

    #[test]
    fn parse_type_rejects_garbage() {
        assert!(parse_type("Core.List<").is_none());
        assert!(parse_type("Core Int").is_none());
        assert!(parse_type("").is_none());
    }
}
