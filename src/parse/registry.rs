//! Type-system adapter: canonical type strings → `TypeDescriptor`s.

use std::collections::HashMap;
use std::sync::Arc;

use crate::flow::parser::parse_type;
use crate::flow::syntax::TypeExpr;
use crate::model::{Module, TypeDescriptor, TypeExport};

/// Bound on base-chain depth, in case exports describe a cycle.
const MAX_BASE_DEPTH: usize = 32;

/// Every exported type of a set of modules, keyed by full name. The first
/// module to export a name owns it.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, (Arc<Module>, TypeExport)>,
    namespaces: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module`'s inline exports. Modules without an in-memory
    /// export table contribute nothing.
    pub fn add_module(&mut self, module: &Arc<Module>) {
        self.add_exports(module, module.exports().unwrap_or_default());
    }

    /// Register exports owned by `module` that were read from elsewhere,
    /// e.g. its backing file.
    pub fn add_exports(&mut self, module: &Arc<Module>, exports: &[TypeExport]) {
        for export in exports {
            self.types
                .entry(export.name.clone())
                .or_insert_with(|| (module.clone(), export.clone()));
        }
    }

    /// Allow short names through `namespace`.
    pub fn import_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve e.g. `Core.List<Orders.Order>`, including the base chain.
    pub fn resolve(&self, text: &str) -> Result<TypeDescriptor, String> {
        let ty = parse_type(text).ok_or_else(|| format!("'{}' is not a valid type name", text))?;
        self.resolve_expr(&ty, 0)
    }

    fn lookup(&self, path: &str) -> Option<&(Arc<Module>, TypeExport)> {
        self.types.get(path).or_else(|| {
            self.namespaces
                .iter()
                .find_map(|ns| self.types.get(&format!("{}.{}", ns, path)))
        })
    }

    fn resolve_expr(&self, ty: &TypeExpr, depth: usize) -> Result<TypeDescriptor, String> {
        let (module, export) = self
            .lookup(&ty.path)
            .ok_or_else(|| format!("Unknown type '{}'", ty.path))?;
        if export.arity != ty.args.len() {
            return Err(format!(
                "Type '{}' takes {} type argument(s), got {}",
                export.name,
                export.arity,
                ty.args.len()
            ));
        }
        let args = ty
            .args
            .iter()
            .map(|arg| self.resolve_expr(arg, depth))
            .collect::<Result<Vec<_>, _>>()?;

        // An unresolvable base only loses the link to the base's module.
        let base = match &export.base {
            Some(base) if depth < MAX_BASE_DEPTH => parse_type(base)
                .and_then(|base| self.resolve_expr(&base, depth + 1).ok()),
            _ => None,
        };

        Ok(TypeDescriptor::new(&export.name, module.clone())
            .with_args(args)
            .with_base(base))
    }
}
