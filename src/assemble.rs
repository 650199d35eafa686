//! Compilation assembly for one validation batch.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::ValidatorError;
use crate::language::{Compilation, ExpressionLanguage};
use crate::model::{Module, ModuleId, TypeDescriptor};
use crate::references::ReferenceCache;

/// Builds and widens one compilation. Owned by a single validation call.
pub struct Assembler<'a, L: ExpressionLanguage> {
    language: &'a L,
    cache: &'a ReferenceCache,
    /// Modules already offered to this compilation, linked or not.
    linked: HashSet<ModuleId>,
}

impl<'a, L: ExpressionLanguage> Assembler<'a, L> {
    pub fn new(language: &'a L, cache: &'a ReferenceCache) -> Self {
        Self {
            language,
            cache,
            linked: HashSet::new(),
        }
    }

    /// Base compilation over `modules` (warming the cache for each) and
    /// `namespaces`.
    pub fn build(&mut self, modules: &[Arc<Module>], namespaces: &[String]) -> L::Compilation {
        let mut references = Vec::with_capacity(modules.len());
        for module in modules {
            if !self.linked.insert(module.id()) {
                continue;
            }
            if let Some(reference) = self.cache.get_or_create(module) {
                references.push(reference);
            }
        }
        debug!(
            language = self.language.name(),
            references = references.len(),
            namespaces = namespaces.len(),
            "base compilation built"
        );
        self.language.create_compilation(references, namespaces)
    }

    /// Link every module reachable from `ty` that this compilation does not
    /// have yet, in a single addition.
    pub fn extend_for_return_type(&mut self, compilation: &mut L::Compilation, ty: &TypeDescriptor) {
        let mut references = Vec::new();
        for reachable in ty.reachable() {
            let module = reachable.module();
            if !self.linked.insert(module.id()) {
                continue;
            }
            if let Some(reference) = self.cache.get_or_create(module) {
                trace!(module = module.name(), for_type = %ty, "linking module");
                references.push(reference);
            }
        }
        if !references.is_empty() {
            compilation.add_references(references);
        }
    }

    /// Parse the whole batch once and append it to the compilation.
    pub fn append_source(
        &self,
        compilation: &mut L::Compilation,
        source: &str,
    ) -> Result<(), ValidatorError> {
        let tree = self.language.parse_batch(source)?;
        compilation.add_syntax_tree(tree);
        Ok(())
    }

    #[cfg(test)]
    fn is_linked(&self, id: ModuleId) -> bool {
        self.linked.contains(&id)
    }
}
