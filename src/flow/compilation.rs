use std::sync::Arc;

use super::checker::{Checker, TypeTable};
use super::syntax::SourceFile;
use crate::error::ValidatorError;
use crate::language::Compilation;
use crate::model::{Diagnostic, ModuleReference};

/// A Flow compilation: linked references, imported namespaces and parsed
/// batches.
#[derive(Debug, Default)]
pub struct FlowCompilation {
    references: Vec<Arc<ModuleReference>>,
    namespaces: Vec<String>,
    trees: Vec<SourceFile>,
}

impl FlowCompilation {
    pub fn new(references: Vec<Arc<ModuleReference>>, namespaces: &[String]) -> Self {
        let mut compilation = FlowCompilation {
            references: Vec::new(),
            namespaces: namespaces.to_vec(),
            trees: Vec::new(),
        };
        compilation.add_references(references);
        compilation
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn references(&self) -> &[Arc<ModuleReference>] {
        &self.references
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }
}

impl Compilation for FlowCompilation {
    type SyntaxTree = SourceFile;

    /// References to a module already linked are ignored.
    fn add_references(&mut self, references: Vec<Arc<ModuleReference>>) {
        for reference in references {
            if !self.references.iter().any(|r| r.module == reference.module) {
                self.references.push(reference);
            }
        }
    }

    fn add_syntax_tree(&mut self, tree: SourceFile) {
        self.trees.push(tree);
    }

    /// Syntax diagnostics plus semantic ones, ordered by position.
    fn diagnostics(&self) -> Result<Vec<Diagnostic>, ValidatorError> {
        if self.trees.is_empty() {
            return Err(ValidatorError::compiler("Flow", "no syntax trees added"));
        }
        let mut diagnostics = Vec::new();
        for tree in &self.trees {
            diagnostics.extend(tree.diagnostics.iter().cloned());
            let table = TypeTable::new(&self.references, &self.namespaces);
            diagnostics.extend(Checker::new(table).check(tree));
        }
        diagnostics.sort_by_key(|d| d.location);
        Ok(diagnostics)
    }
}
