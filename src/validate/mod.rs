//! Validation orchestrator.
//!
//! Idle → Collecting → Compiling → Diagnosing → Done, once per call. Only the
//! reference cache and the required-module set outlive a call.

use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use crate::assemble::Assembler;
use crate::codegen::{CodeGenerator, SourceWriter};
use crate::config::ValidatorConfig;
use crate::diagnostics::{DiagnosticCurator, DiagnosticMapper, KeepAll};
use crate::error::ValidatorError;
use crate::flow::FlowLanguage;
use crate::language::{Compilation, ExpressionLanguage};
use crate::model::{
    Activity, Module, ModuleDeclaration, ModuleLoader, ModuleRegistry, ValidationError,
    ValidationScope,
};
use crate::references::{ExportTableProvider, ReferenceCache, ReferenceProvider, RequiredModuleSet};

pub struct Validator<L: ExpressionLanguage> {
    language: L,
    config: ValidatorConfig,
    cache: ReferenceCache,
    required: RequiredModuleSet,
    loader: Arc<dyn ModuleLoader>,
    curator: Box<dyn DiagnosticCurator>,
}

impl Validator<FlowLanguage> {
    /// Flow validator with the core module required and export-table references.
    pub fn flow() -> Self {
        let language = FlowLanguage::new();
        let core = language.core_module().clone();
        let validator = Validator::new(language, Arc::new(ExportTableProvider));
        validator.add_required_module(core);
        validator
    }
}

impl<L: ExpressionLanguage> Validator<L> {
    pub fn new(language: L, provider: Arc<dyn ReferenceProvider>) -> Self {
        Validator {
            language,
            config: ValidatorConfig::default(),
            cache: ReferenceCache::new(provider),
            required: RequiredModuleSet::new(),
            loader: Arc::new(ModuleRegistry::new()),
            curator: Box::new(KeepAll),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_curator(mut self, curator: impl DiagnosticCurator + 'static) -> Self {
        self.curator = Box::new(curator);
        self
    }

    /// Require `module` in every future validation. Idempotent.
    pub fn add_required_module(&self, module: Arc<Module>) -> bool {
        self.required.add(module)
    }

    pub fn language(&self) -> &L {
        &self.language
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    pub fn required_modules(&self) -> &RequiredModuleSet {
        &self.required
    }

    /// Validate every expression in `scope` as one batch.
    ///
    /// An absent scope yields no errors. On success the scope is cleared and
    /// must be repopulated before it is validated again.
    pub fn validate(
        &self,
        root: &Activity,
        scope: Option<&mut ValidationScope>,
    ) -> Result<Vec<ValidationError>, ValidatorError> {
        let Some(scope) = scope else {
            return Ok(Vec::new());
        };
        let span = debug_span!("validate", root = %root.id, language = self.language.name());
        let _entered = span.enter();

        // 1. Collect modules and namespaces
        let modules = self.collect_modules(scope);
        let namespaces = self.config.namespaces_with(scope.namespaces());
        debug!(
            modules = modules.len(),
            namespaces = namespaces.len(),
            expressions = scope.len(),
            "collected"
        );

        // 2. Build the compilation and generate one line per expression
        let mut assembler = Assembler::new(&self.language, &self.cache);
        let mut compilation = assembler.build(&modules, &namespaces);
        let generator = CodeGenerator::new(&self.language);
        let mut source = SourceWriter::new();
        for (index, unit) in scope.expressions().iter().enumerate() {
            assembler.extend_for_return_type(&mut compilation, &unit.result_type);
            debug_assert_eq!(source.line_count(), index);
            source.line(&generator.generate(unit, index)?);
        }
        let source = source.finish();

        // 3. Compile the batch once
        assembler.append_source(&mut compilation, &source)?;
        let diagnostics = compilation.diagnostics()?;
        debug!(diagnostics = diagnostics.len(), "compiled");

        // 4. Map back to activities
        let errors = DiagnosticMapper::new(self.language.marker(), self.curator.as_ref())
            .map(&diagnostics, &source, scope);
        scope.clear();
        Ok(errors)
    }

    /// Required modules plus the scope's local declarations, each once.
    fn collect_modules(&self, scope: &ValidationScope) -> Vec<Arc<Module>> {
        let mut modules: Vec<Arc<Module>> = self.required.snapshot().iter().cloned().collect();
        for declaration in scope.modules() {
            let module = match declaration {
                ModuleDeclaration::Loaded(module) => module.clone(),
                ModuleDeclaration::Named(name) => match self.loader.load(name) {
                    Some(module) => module,
                    None => {
                        warn!(module = %name, "declared module could not be loaded");
                        continue;
                    }
                },
            };
            if !modules.iter().any(|m| m.id() == module.id()) {
                modules.push(module);
            }
        }
        modules
    }
}
