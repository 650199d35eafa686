//! Modules every validation run links against.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::model::{Module, ModuleId};

type Snapshot = Arc<Vec<Arc<Module>>>;

/// Copy-on-write module set.
///
/// Readers load the current snapshot without taking a lock. Writers
/// serialize on `write_lock`, re-check membership, then swap in a new
/// snapshot holding the prior members plus the addition.
#[derive(Debug)]
pub struct RequiredModuleSet {
    current: ArcSwap<Vec<Arc<Module>>>,
    write_lock: Mutex<()>,
}

impl Default for RequiredModuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RequiredModuleSet {
    pub fn new() -> Self {
        RequiredModuleSet {
            current: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_modules(modules: impl IntoIterator<Item = Arc<Module>>) -> Self {
        let set = Self::new();
        for module in modules {
            set.add(module);
        }
        set
    }

    /// Add `module` unless already present. Returns whether it was added.
    pub fn add(&self, module: Arc<Module>) -> bool {
        if self.contains(module.id()) {
            return false;
        }

        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        if current.iter().any(|m| m.id() == module.id()) {
            return false;
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(module);
        self.current.store(Arc::new(next));
        true
    }

    /// Current members in insertion order.
    pub fn snapshot(&self) -> Snapshot {
        self.current.load_full()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.current.load().iter().any(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}
