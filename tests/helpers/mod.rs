#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use expr_validator::error::ValidatorError;
use expr_validator::flow::{ExpressionTokens, FlowCompilation, FlowLanguage, SourceFile};
use expr_validator::language::{Compilation, ExpressionLanguage, MarkerPattern, Parameter};
use expr_validator::model::*;
use expr_validator::references::{ExportTableProvider, ReferenceProvider};
use expr_validator::validate::Validator;

// =============================================================================
// Providers
// =============================================================================

/// Export-table provider that counts how often each module was produced.
#[derive(Default)]
pub struct CountingProvider {
    calls: Mutex<HashMap<ModuleId, usize>>,
}

impl CountingProvider {
    pub fn calls(&self, id: ModuleId) -> usize {
        self.calls.lock().get(&id).copied().unwrap_or(0)
    }
}

impl ReferenceProvider for CountingProvider {
    fn from_metadata(&self, module: &Module) -> Result<ModuleReference, ValidatorError> {
        *self.calls.lock().entry(module.id()).or_insert(0) += 1;
        ExportTableProvider.from_metadata(module)
    }

    fn from_file(&self, module: &Module) -> Result<ModuleReference, ValidatorError> {
        ExportTableProvider.from_file(module)
    }
}

/// Flow validator with the core module required, backed by a counting
/// provider.
pub fn counting_validator() -> (Validator<FlowLanguage>, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::default());
    let language = FlowLanguage::new();
    let core = language.core_module().clone();
    let validator = Validator::new(language, provider.clone());
    validator.add_required_module(core);
    (validator, provider)
}

// =============================================================================
// Languages
// =============================================================================

/// Where `FailingFlow` gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Expression,
    Batch,
    Diagnostics,
}

/// Flow, except that one stage returns a fatal error.
pub struct FailingFlow {
    flow: FlowLanguage,
    stage: FailAt,
}

impl FailingFlow {
    pub fn new(stage: FailAt) -> Self {
        FailingFlow {
            flow: FlowLanguage::new(),
            stage,
        }
    }

    pub fn core_module(&self) -> &Arc<Module> {
        self.flow.core_module()
    }
}

pub struct FailingCompilation {
    inner: FlowCompilation,
    fail: bool,
}

impl Compilation for FailingCompilation {
    type SyntaxTree = SourceFile;

    fn add_references(&mut self, references: Vec<Arc<ModuleReference>>) {
        self.inner.add_references(references);
    }

    fn add_syntax_tree(&mut self, tree: SourceFile) {
        self.inner.add_syntax_tree(tree);
    }

    fn diagnostics(&self) -> Result<Vec<Diagnostic>, ValidatorError> {
        if self.fail {
            return Err(ValidatorError::compiler("Failing", "backend unavailable"));
        }
        self.inner.diagnostics()
    }
}

impl ExpressionLanguage for FailingFlow {
    type Expression = ExpressionTokens;
    type Compilation = FailingCompilation;

    fn name(&self) -> &str {
        "Failing"
    }

    fn marker(&self) -> &MarkerPattern {
        self.flow.marker()
    }

    fn type_name(&self, ty: &TypeDescriptor) -> String {
        self.flow.type_name(ty)
    }

    fn value_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String {
        self.flow
            .value_fragment(marker, index, parameters, return_type, expression)
    }

    fn reference_fragment(
        &self,
        marker: &str,
        index: usize,
        parameters: &[Parameter],
        return_type: &str,
        expression: &str,
    ) -> String {
        self.flow
            .reference_fragment(marker, index, parameters, return_type, expression)
    }

    fn create_compilation(
        &self,
        references: Vec<Arc<ModuleReference>>,
        namespaces: &[String],
    ) -> FailingCompilation {
        FailingCompilation {
            inner: self.flow.create_compilation(references, namespaces),
            fail: self.stage == FailAt::Diagnostics,
        }
    }

    fn parse_expression(&self, text: &str) -> Result<ExpressionTokens, ValidatorError> {
        if self.stage == FailAt::Expression {
            return Err(ValidatorError::syntax("Failing", "expression parser unavailable"));
        }
        self.flow.parse_expression(text)
    }

    fn parse_batch(&self, source: &str) -> Result<SourceFile, ValidatorError> {
        if self.stage == FailAt::Batch {
            return Err(ValidatorError::syntax("Failing", "batch parser unavailable"));
        }
        self.flow.parse_batch(source)
    }
}

/// Validator over `FailingFlow` with its core module required.
pub fn failing_validator(stage: FailAt) -> Validator<FailingFlow> {
    let language = FailingFlow::new(stage);
    let core = language.core_module().clone();
    let validator = Validator::new(language, Arc::new(ExportTableProvider));
    validator.add_required_module(core);
    validator
}

// =============================================================================
// Modules and types
// =============================================================================

pub fn orders_module(kind: ModuleKind) -> Arc<Module> {
    Arc::new(
        Module::new("Orders", kind).with_exports(vec![
            TypeExport::new("Orders.Order")
                .extends("Core.Object")
                .field("total", "Core.Float")
                .field("customer", "Core.String"),
        ]),
    )
}

pub fn core_type(validator: &Validator<FlowLanguage>, name: &str) -> TypeDescriptor {
    TypeDescriptor::new(name, validator.language().core_module().clone())
}

// =============================================================================
// Scopes
// =============================================================================

pub fn activity(id: &str) -> ActivityRef {
    Arc::new(Activity::new(id, format!("Activity {}", id)))
}

pub fn value(id: &str, text: &str, ty: TypeDescriptor, env: &Arc<Environment>, owner: &ActivityRef) -> ExpressionUnit {
    ExpressionUnit::value(id, text, ty, env.clone(), owner.clone())
}

pub fn reference(id: &str, text: &str, ty: TypeDescriptor, env: &Arc<Environment>, owner: &ActivityRef) -> ExpressionUnit {
    ExpressionUnit::reference(id, text, ty, env.clone(), owner.clone())
}

pub fn scope_of(units: Vec<ExpressionUnit>) -> ValidationScope {
    let mut scope = ValidationScope::new();
    for unit in units {
        scope.add_expression(unit);
    }
    scope
}

pub fn root() -> Activity {
    Activity::new("root", "Workflow")
}
