//! Type descriptors supplied by the host's type system.

use std::collections::HashSet;
use std::sync::Arc;

use super::module::Module;

/// A type handle plus its base type and generic arguments.
///
/// The core never inspects a type beyond this shape; it only needs to know
/// which modules a type drags into a compilation.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    namespace: String,
    name: String,
    module: Arc<Module>,
    base: Option<Box<TypeDescriptor>>,
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// `full_name` is split at its last `.` into namespace and simple name.
    pub fn new(full_name: &str, module: Arc<Module>) -> Self {
        let (namespace, name) = match full_name.rsplit_once('.') {
            Some((ns, name)) => (ns.to_string(), name.to_string()),
            None => (String::new(), full_name.to_string()),
        };
        TypeDescriptor {
            namespace,
            name,
            module,
            base: None,
            args: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: Option<TypeDescriptor>) -> Self {
        self.base = base.map(Box::new);
        self
    }

    pub fn with_args(mut self, args: Vec<TypeDescriptor>) -> Self {
        self.args = args;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn base(&self) -> Option<&TypeDescriptor> {
        self.base.as_deref()
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// The type itself, its transitive base types and transitive generic
    /// arguments, each distinct type once, in discovery order.
    pub fn reachable(&self) -> Vec<&TypeDescriptor> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(ty) = stack.pop() {
            if !seen.insert((ty.module.id(), ty.to_string())) {
                continue;
            }
            out.push(ty);
            for arg in ty.args.iter().rev() {
                stack.push(arg);
            }
            if let Some(base) = ty.base() {
                stack.push(base);
            }
        }
        out
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module::ModuleKind;

    fn module(name: &str) -> Arc<Module> {
        Arc::new(Module::new(name, ModuleKind::Static))
    }

    #[test]
    fn splits_full_name() {
        let ty = TypeDescriptor::new("Orders.Model.Order", module("Orders"));
        assert_eq!(ty.namespace(), "Orders.Model");
        assert_eq!(ty.name(), "Order");
        assert_eq!(ty.full_name(), "Orders.Model.Order");
    }

    #[test]
    fn display_includes_type_arguments() {
        let core = module("Core");
        let int = TypeDescriptor::new("Core.Int", core.clone());
        let list = TypeDescriptor::new("Core.List", core).with_args(vec![int]);
        assert_eq!(list.to_string(), "Core.List<Core.Int>");
    }

    #[test]
    fn reachable_walks_bases_and_arguments() {
        let core = module("Core");
        let orders = module("Orders");
        let billing = module("Billing");

        let object = TypeDescriptor::new("Core.Object", core.clone());
        let entity = TypeDescriptor::new("Billing.Entity", billing.clone()).with_base(Some(object));
        let order = TypeDescriptor::new("Orders.Order", orders.clone()).with_base(Some(entity));
        let list = TypeDescriptor::new("Core.List", core.clone()).with_args(vec![order]);

        let names: Vec<String> = list.reachable().iter().map(|t| t.full_name()).collect();
        assert_eq!(
            names,
            vec!["Core.List", "Orders.Order", "Billing.Entity", "Core.Object"]
        );
    }

    #[test]
    fn reachable_deduplicates_repeated_arguments() {
        let core = module("Core");
        let int = TypeDescriptor::new("Core.Int", core.clone());
        let pair = TypeDescriptor::new("Core.Pair", core).with_args(vec![int.clone(), int]);
        assert_eq!(pair.reachable().len(), 2);
    }
}
