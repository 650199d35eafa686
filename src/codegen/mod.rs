//! Codegen: ExpressionUnit → one line of compilable source.
//!
//! Public API: `CodeGenerator::generate(unit, index) -> String`

pub mod writer;

use std::collections::HashSet;

use tracing::trace;

use crate::error::ValidatorError;
use crate::language::{ExpressionLanguage, ExpressionSyntax, Parameter};
use crate::model::{ExpressionKind, ExpressionUnit};

pub use writer::SourceWriter;

pub struct CodeGenerator<'a, L: ExpressionLanguage> {
    language: &'a L,
}

impl<'a, L: ExpressionLanguage> CodeGenerator<'a, L> {
    pub fn new(language: &'a L) -> Self {
        Self { language }
    }

    /// Generate the fragment for `unit` at batch position `index`.
    ///
    /// Identifiers that do not resolve in the unit's environment are left out
    /// of the parameter list; the compiler then reports them as undefined.
    pub fn generate(&self, unit: &ExpressionUnit, index: usize) -> Result<String, ValidatorError> {
        let parameters = self.parameters(unit)?;
        let marker = self.language.marker().render(&unit.id, index);
        let return_type = self.language.type_name(&unit.result_type);

        let mut text = String::with_capacity(unit.text.len());
        writer::push_single_line(&mut text, &unit.text);

        let fragment = match unit.kind {
            ExpressionKind::Value => {
                self.language
                    .value_fragment(&marker, index, &parameters, &return_type, &text)
            }
            ExpressionKind::Reference => {
                self.language
                    .reference_fragment(&marker, index, &parameters, &return_type, &text)
            }
        };
        Ok(fragment)
    }

    /// Resolved free variables of `unit`, in first-occurrence order.
    fn parameters(&self, unit: &ExpressionUnit) -> Result<Vec<Parameter>, ValidatorError> {
        let syntax = self.language.parse_expression(&unit.text)?;

        let mut seen = HashSet::new();
        let mut parameters = Vec::new();
        for identifier in syntax.identifiers() {
            if !seen.insert(self.language.identifier_key(&identifier)) {
                continue;
            }
            match unit.environment.resolve(&identifier) {
                Some(ty) => parameters.push(Parameter {
                    type_name: self.language.type_name(&ty),
                    name: identifier,
                }),
                None => trace!(expression = %unit.id, %identifier, "identifier not in scope"),
            }
        }
        Ok(parameters)
    }
}
