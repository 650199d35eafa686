//! Parse phase: workflow document JSON → modules, environments and
//! expression units ready to be put into a `ValidationScope`.

pub mod graph;
pub mod registry;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

pub use graph::ActivityGraph;
pub use registry::TypeRegistry;
pub use types::*;

use crate::error::ValidatorError;
use crate::model::{
    Activity, Environment, ExpressionUnit, Module, ModuleDeclaration, ModuleRegistry,
    ValidationScope,
};
use crate::references::{ExportTableProvider, ReferenceProvider};

/// Deserialize a workflow document.
pub fn parse(json: &str) -> Result<WorkflowDocument, Vec<ValidatorError>> {
    serde_json::from_str::<WorkflowDocument>(json).map_err(|e| {
        vec![ValidatorError::document(
            "P001",
            format!("Failed to parse workflow JSON: {}", e),
            None,
        )]
    })
}

/// A document whose modules, containment and types all resolved.
#[derive(Debug)]
pub struct LoadedWorkflow {
    document: WorkflowDocument,
    root: Activity,
    modules: Arc<ModuleRegistry>,
    units: Vec<ExpressionUnit>,
}

impl LoadedWorkflow {
    pub fn document(&self) -> &WorkflowDocument {
        &self.document
    }

    /// The workflow itself, as the root passed to `Validator::validate`.
    pub fn root(&self) -> &Activity {
        &self.root
    }

    /// The document's modules, for resolving named imports.
    pub fn loader(&self) -> Arc<ModuleRegistry> {
        self.modules.clone()
    }

    /// Expression units in validation order.
    pub fn units(&self) -> &[ExpressionUnit] {
        &self.units
    }

    /// A fresh single-use scope holding every expression of the document.
    pub fn scope(&self) -> ValidationScope {
        let mut scope = ValidationScope::new();
        for namespace in &self.document.imports.namespaces {
            scope.import_namespace(namespace.clone());
        }
        for name in &self.document.imports.modules {
            scope.declare_module(ModuleDeclaration::Named(name.clone()));
        }
        for unit in &self.units {
            scope.add_expression(unit.clone());
        }
        scope
    }
}

/// Parse `json` and resolve it against its own modules plus `core`.
pub fn load(json: &str, core: &Arc<Module>) -> Result<LoadedWorkflow, Vec<ValidatorError>> {
    // 1. Parse
    let document = parse(json)?;

    // 2. Modules and types
    let (modules, registry) = build_modules(&document, core)?;

    // 3. Containment
    let graph = ActivityGraph::build(&document)?;

    // 4. Environments and expression units
    let units = build_units(&document, &graph, &registry)?;
    debug!(
        workflow = %document.id,
        activities = document.activities.len(),
        expressions = units.len(),
        types = registry.len(),
        "workflow loaded"
    );

    let root = Activity::new(
        document.id.clone(),
        document.name.clone().unwrap_or_else(|| document.id.clone()),
    );
    Ok(LoadedWorkflow {
        document,
        root,
        modules: Arc::new(modules),
        units,
    })
}

fn build_modules(
    document: &WorkflowDocument,
    core: &Arc<Module>,
) -> Result<(ModuleRegistry, TypeRegistry), Vec<ValidatorError>> {
    let mut modules = ModuleRegistry::new();
    let mut registry = TypeRegistry::new();
    let mut errors = Vec::new();

    registry.add_module(core);
    for namespace in &document.imports.namespaces {
        registry.import_namespace(namespace.clone());
    }

    let mut names = HashSet::new();
    for entry in &document.modules {
        if !names.insert(entry.name.as_str()) {
            errors.push(ValidatorError::document(
                "P005",
                format!("Duplicate module name '{}'", entry.name),
                None,
            ));
            continue;
        }

        let mut module = Module::new(entry.name.clone(), entry.kind);
        if let Some(exports) = &entry.exports {
            module = module.with_exports(exports.clone());
        }
        if let Some(location) = &entry.location {
            module = module.with_location(location.clone());
        }
        let module = Arc::new(module);

        match (&entry.exports, &entry.location) {
            (Some(_), _) => registry.add_module(&module),
            (None, Some(_)) => match ExportTableProvider.from_file(&module) {
                Ok(reference) => registry.add_exports(&module, &reference.exports),
                Err(e) => {
                    errors.push(ValidatorError::document(
                        "P006",
                        format!("Module '{}' could not be read: {}", entry.name, e),
                        None,
                    ));
                    continue;
                }
            },
            (None, None) => {
                errors.push(ValidatorError::document(
                    "P006",
                    format!("Module '{}' has neither exports nor a location", entry.name),
                    None,
                ));
                continue;
            }
        }
        modules.register(module);
    }

    for name in &document.imports.modules {
        if !names.contains(name.as_str()) {
            errors.push(ValidatorError::document(
                "P006",
                format!("Import references unknown module '{}'", name),
                None,
            ));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok((modules, registry))
}

fn build_units(
    document: &WorkflowDocument,
    graph: &ActivityGraph,
    registry: &TypeRegistry,
) -> Result<Vec<ExpressionUnit>, Vec<ValidatorError>> {
    let mut environments: HashMap<usize, Arc<Environment>> = HashMap::new();
    let mut expression_ids = HashSet::new();
    let mut units = Vec::new();
    let mut errors = Vec::new();

    for index in graph.order() {
        let entry = &document.activities[index];

        // A child sees every variable of its ancestors.
        let mut environment = match graph.parent(index).and_then(|p| environments.get(&p)) {
            Some(parent) => Environment::child(parent.clone()),
            None => Environment::new(),
        };
        for variable in &entry.variables {
            match registry.resolve(&variable.type_name) {
                Ok(ty) => environment.declare(variable.name.clone(), ty),
                Err(message) => errors.push(ValidatorError::document(
                    "P004",
                    format!("Variable '{}': {}", variable.name, message),
                    Some(entry.id.clone()),
                )),
            }
        }
        let environment = Arc::new(environment);
        environments.insert(index, environment.clone());

        let activity = Arc::new(Activity::new(entry.id.clone(), entry.display_name()));
        for expression in &entry.expressions {
            if !expression_ids.insert(expression.id.as_str()) {
                errors.push(ValidatorError::document(
                    "P005",
                    format!("Duplicate expression id '{}'", expression.id),
                    Some(entry.id.clone()),
                ));
                continue;
            }
            let result_type = match registry.resolve(&expression.result_type) {
                Ok(ty) => ty,
                Err(message) => {
                    errors.push(ValidatorError::document(
                        "P004",
                        format!("Expression '{}': {}", expression.id, message),
                        Some(entry.id.clone()),
                    ));
                    continue;
                }
            };
            units.push(ExpressionUnit {
                id: expression.id.clone(),
                text: expression.text.clone(),
                result_type,
                environment: environment.clone(),
                kind: expression.kind,
                activity: activity.clone(),
            });
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(units)
}
