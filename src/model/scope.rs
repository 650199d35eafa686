//! Expression units and the single-use validation scope that carries them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::module::Module;
use super::types::TypeDescriptor;

/// A node of the workflow graph that owns expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub display_name: String,
}

impl Activity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Activity {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

pub type ActivityRef = Arc<Activity>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionKind {
    /// Produces a value (r-value).
    #[default]
    Value,
    /// Must denote an assignable location (l-value).
    Reference,
}

/// Free-variable lookup for one expression.
pub trait BindingEnvironment: Send + Sync {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor>;
}

/// Lexically nested variable scope.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, TypeDescriptor>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(parent: Arc<Environment>) -> Self {
        Environment {
            variables: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Declare a variable, shadowing any outer one with the same name.
    pub fn declare(&mut self, name: impl Into<String>, ty: TypeDescriptor) {
        self.variables.insert(name.into(), ty);
    }
}

impl BindingEnvironment for Environment {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        match self.variables.get(name) {
            Some(ty) => Some(ty.clone()),
            None => self.parent.as_ref().and_then(|p| p.resolve(name)),
        }
    }
}

/// One expression to validate.
#[derive(Clone)]
pub struct ExpressionUnit {
    pub id: String,
    pub text: String,
    pub result_type: TypeDescriptor,
    pub environment: Arc<dyn BindingEnvironment>,
    pub kind: ExpressionKind,
    pub activity: ActivityRef,
}

impl ExpressionUnit {
    pub fn value(
        id: impl Into<String>,
        text: impl Into<String>,
        result_type: TypeDescriptor,
        environment: Arc<dyn BindingEnvironment>,
        activity: ActivityRef,
    ) -> Self {
        ExpressionUnit {
            id: id.into(),
            text: text.into(),
            result_type,
            environment,
            kind: ExpressionKind::Value,
            activity,
        }
    }

    pub fn reference(
        id: impl Into<String>,
        text: impl Into<String>,
        result_type: TypeDescriptor,
        environment: Arc<dyn BindingEnvironment>,
        activity: ActivityRef,
    ) -> Self {
        ExpressionUnit {
            kind: ExpressionKind::Reference,
            ..Self::value(id, text, result_type, environment, activity)
        }
    }
}

impl std::fmt::Debug for ExpressionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionUnit")
            .field("id", &self.id)
            .field("text", &self.text)
            .field("result_type", &self.result_type.to_string())
            .field("kind", &self.kind)
            .field("activity", &self.activity.id)
            .finish()
    }
}

/// A module the scope wants linked, either already loaded or by name.
#[derive(Debug, Clone)]
pub enum ModuleDeclaration {
    Loaded(Arc<Module>),
    Named(String),
}

/// Every expression of one validation batch plus local imports.
///
/// Single use: a successful validation clears it.
#[derive(Debug, Default)]
pub struct ValidationScope {
    expressions: Vec<ExpressionUnit>,
    namespaces: Vec<String>,
    modules: Vec<ModuleDeclaration>,
}

impl ValidationScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expression(&mut self, unit: ExpressionUnit) {
        self.expressions.push(unit);
    }

    pub fn import_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
    }

    pub fn declare_module(&mut self, declaration: ModuleDeclaration) {
        self.modules.push(declaration);
    }

    /// Expressions in insertion order, which is the batch order.
    pub fn expressions(&self) -> &[ExpressionUnit] {
        &self.expressions
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn modules(&self) -> &[ModuleDeclaration] {
        &self.modules
    }

    pub fn find(&self, id: &str) -> Option<&ExpressionUnit> {
        self.expressions.iter().find(|u| u.id == id)
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn clear(&mut self) {
        self.expressions.clear();
        self.namespaces.clear();
        self.modules.clear();
    }
}
