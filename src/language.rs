//! Hook points a concrete expression language supplies.
//!
//! The orchestrator, cache and mapper only ever talk to a compiler through
//! these traits, so a language can be swapped without touching them.

use std::sync::Arc;

use crate::error::ValidatorError;
use crate::model::{Diagnostic, ModuleReference, TypeDescriptor};

/// A parsed single expression, used only to enumerate free identifiers.
pub trait ExpressionSyntax {
    /// Identifier tokens that may name free variables, in source order.
    fn identifiers(&self) -> Vec<String>;
}

/// One compilation unit, owned by a single validation call.
pub trait Compilation {
    type SyntaxTree;

    fn add_references(&mut self, references: Vec<Arc<ModuleReference>>);
    fn add_syntax_tree(&mut self, tree: Self::SyntaxTree);
    fn diagnostics(&self) -> Result<Vec<Diagnostic>, ValidatorError>;
}

/// A resolved free variable, formatted for the language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

pub trait ExpressionLanguage: Send + Sync {
    type Expression: ExpressionSyntax;
    type Compilation: Compilation;

    /// Display name, used in logs and fatal errors.
    fn name(&self) -> &str;

    /// Delimiters of the marker embedded in every generated fragment.
    fn marker(&self) -> &MarkerPattern;

    /// Language-correct reference to `ty`.
    fn type_name(&self, ty: &TypeDescriptor) -> String;

    /// Key under which identifiers are de-duplicated. Case-insensitive
    /// languages fold case here.
    fn identifier_key(&self, identifier: &str) -> String {
        identifier.to_string()
    }

    /// Single-line fragment returning the value of `expression`.
    fn value_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String;

    /// Single-line fragment returning an assignable reference to `expression`.
    fn reference_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String;

    fn create_compilation(
        &self,
        references: Vec<Arc<ModuleReference>>,
        namespaces: &[String],
    ) -> Self::Compilation;

    fn parse_expression(&self, text: &str) -> Result<Self::Expression, ValidatorError>;

    fn parse_batch(
        &self,
        source: &str,
    ) -> Result<<Self::Compilation as Compilation>::SyntaxTree, ValidatorError>;
}

/// A marker recovered from a generated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub expression_id: String,
    pub index: usize,
}

/// `open` + escaped expression id + `#` + index + `close`.
///
/// Ids are percent-encoded outside `[A-Za-z0-9_.:-]` so they can never
/// contain the delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPattern {
    open: &'static str,
    close: &'static str,
}

impl MarkerPattern {
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        MarkerPattern { open, close }
    }

    pub fn render(&self, expression_id: &str, index: usize) -> String {
        format!("{}{}#{}{}", self.open, escape_id(expression_id), index, self.close)
    }

    /// First well-formed marker on `line`.
    pub fn find(&self, line: &str) -> Option<Marker> {
        let mut rest = line;
        while let Some(start) = rest.find(self.open) {
            let body_start = &rest[start + self.open.len()..];
            if let Some(end) = body_start.find(self.close) {
                if let Some(marker) = parse_body(&body_start[..end]) {
                    return Some(marker);
                }
            }
            rest = body_start;
        }
        None
    }
}

fn parse_body(body: &str) -> Option<Marker> {
    let (id, index) = body.rsplit_once('#')?;
    Some(Marker {
        expression_id: unescape_id(id)?,
        index: index.parse().ok()?,
    })
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-')
}

fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn unescape_id(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = escaped.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if is_plain(b) => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}
