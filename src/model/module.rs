//! Modules, their export tables, and the link-time references built from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique module identity. Two modules with the same name are still
/// different modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleKind {
    #[default]
    Static,
    /// Generated at runtime; its content may change.
    Dynamic,
    /// May be unloaded; its identity may vanish.
    Collectible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExport {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One type exported by a module, named by its full (namespace-qualified) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeExport {
    pub name: String,
    #[serde(default)]
    pub arity: usize,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldExport>,
}

impl TypeExport {
    pub fn new(name: impl Into<String>) -> Self {
        TypeExport {
            name: name.into(),
            arity: 0,
            base: None,
            fields: Vec::new(),
        }
    }

    pub fn generic(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldExport {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn namespace(&self) -> &str {
        self.name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }
}

/// A loadable unit of compiled code.
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    name: String,
    kind: ModuleKind,
    exports: Option<Vec<TypeExport>>,
    location: Option<PathBuf>,
}

impl Module {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Module {
            id: ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            kind,
            exports: None,
            location: None,
        }
    }

    /// Attach the in-memory export table (the fast metadata path).
    pub fn with_exports(mut self, exports: Vec<TypeExport>) -> Self {
        self.exports = Some(exports);
        self
    }

    /// Attach the backing file the module was loaded from.
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn exports(&self) -> Option<&[TypeExport]> {
        self.exports.as_deref()
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Dynamic and collectible modules must never be cached.
    pub fn is_cacheable(&self) -> bool {
        self.kind == ModuleKind::Static
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Module {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Metadata,
    File,
}

/// Link-time artifact for one module: enough for a compiler to resolve the
/// types the module exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub module: ModuleId,
    pub name: String,
    pub exports: Vec<TypeExport>,
    pub source: ReferenceSource,
}

/// Loads modules named by a scope's local declarations.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, name: &str) -> Option<Arc<Module>>;
}

/// Name-keyed loader over modules the host already holds.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its name. A later module with the same name
    /// replaces the earlier one.
    pub fn register(&mut self, module: Arc<Module>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.get(name).cloned()
    }
}
