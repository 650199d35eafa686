//! Flow: the bundled reference expression language.
//!
//! A batch is a sequence of single-line items:
//!
//! ```text
//! /*@assign-1#0@*/ fn __expr0(count: Core.Int) -> Core.Int => count + 1;
//! ```
//!
//! Types resolve against the export tables of the linked module references,
//! so linking a module is what makes its types visible.

pub mod checker;
pub mod compilation;
pub mod lexer;
pub mod parser;
pub mod syntax;

use std::sync::Arc;

use crate::error::ValidatorError;
use crate::language::{ExpressionLanguage, ExpressionSyntax, MarkerPattern, Parameter};
use crate::model::{Module, ModuleKind, ModuleReference, TypeDescriptor, TypeExport};

pub use compilation::FlowCompilation;
pub use syntax::SourceFile;

use lexer::TokenKind;

static MARKER: MarkerPattern = MarkerPattern::new("/*@", "@*/");

/// Export table of the `Core` module.
pub fn core_exports() -> Vec<TypeExport> {
    vec![
        TypeExport::new(checker::OBJECT),
        TypeExport::new(checker::INT).extends(checker::OBJECT),
        TypeExport::new(checker::FLOAT).extends(checker::OBJECT),
        TypeExport::new(checker::BOOL).extends(checker::OBJECT),
        TypeExport::new(checker::STRING)
            .extends(checker::OBJECT)
            .field("length", checker::INT),
        TypeExport::new("Core.List")
            .generic(1)
            .extends(checker::OBJECT)
            .field("count", checker::INT),
        TypeExport::new("Core.Functional.Maybe")
            .generic(1)
            .extends(checker::OBJECT)
            .field("hasValue", checker::BOOL),
    ]
}

#[derive(Debug)]
pub struct FlowLanguage {
    core: Arc<Module>,
}

impl FlowLanguage {
    pub fn new() -> Self {
        FlowLanguage {
            core: Arc::new(Module::new("Core", ModuleKind::Static).with_exports(core_exports())),
        }
    }

    /// The module exporting the built-in types. Every Flow validation needs it.
    pub fn core_module(&self) -> &Arc<Module> {
        &self.core
    }
}

impl Default for FlowLanguage {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier tokens of one expression that are not member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionTokens {
    identifiers: Vec<String>,
}

impl ExpressionSyntax for ExpressionTokens {
    fn identifiers(&self) -> Vec<String> {
        self.identifiers.clone()
    }
}

fn parameter_list(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.type_name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExpressionLanguage for FlowLanguage {
    type Expression = ExpressionTokens;
    type Compilation = FlowCompilation;

    fn name(&self) -> &str {
        "Flow"
    }

    fn marker(&self) -> &MarkerPattern {
        &MARKER
    }

    fn type_name(&self, ty: &TypeDescriptor) -> String {
        ty.to_string()
    }

    fn value_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String {
        format!(
            "{} fn __expr{}({}) -> {} => {};",
            marker,
            index,
            parameter_list(parameters),
            return_type,
            expression
        )
    }

    fn reference_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String {
        format!(
            "{} fn __expr{}({}) -> ref {} => {};",
            marker,
            index,
            parameter_list(parameters),
            return_type,
            expression
        )
    }

    fn create_compilation(
        &self,
        references: Vec<Arc<ModuleReference>>,
        namespaces: &[String],
    ) -> FlowCompilation {
        FlowCompilation::new(references, namespaces)
    }

    /// Lexical errors are left for the batch compile to report with a
    /// location, so this never fails.
    fn parse_expression(&self, text: &str) -> Result<ExpressionTokens, ValidatorError> {
        let (tokens, _) = lexer::tokenize(text);
        let mut identifiers = Vec::new();
        let mut after_dot = false;
        for token in tokens {
            match token.kind {
                TokenKind::Ident(name) if !after_dot => identifiers.push(name),
                TokenKind::Dot => {
                    after_dot = true;
                    continue;
                }
                _ => {}
            }
            after_dot = false;
        }
        Ok(ExpressionTokens { identifiers })
    }

    fn parse_batch(&self, source: &str) -> Result<SourceFile, ValidatorError> {
        Ok(parser::parse_source(source))
    }
}
