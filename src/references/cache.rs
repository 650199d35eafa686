//! Cross-call cache of module references.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::provider::ReferenceProvider;
use crate::model::{Module, ModuleId, ModuleReference};

/// Maps module identity to its reference. Lives as long as the validator.
///
/// Racing callers may both produce a reference for the same module; the first
/// insert wins and both get an equivalent reference back.
pub struct ReferenceCache {
    entries: DashMap<ModuleId, Arc<ModuleReference>>,
    provider: Arc<dyn ReferenceProvider>,
}

impl ReferenceCache {
    pub fn new(provider: Arc<dyn ReferenceProvider>) -> Self {
        ReferenceCache {
            entries: DashMap::new(),
            provider,
        }
    }

    /// Cached reference for `module`, producing one on a miss.
    ///
    /// Returns `None` when no strategy can produce a reference; the module's
    /// types are then simply absent from the compilation.
    pub fn get_or_create(&self, module: &Module) -> Option<Arc<ModuleReference>> {
        if let Some(hit) = self.entries.get(&module.id()) {
            trace!(module = module.name(), "reference cache hit");
            return Some(hit.value().clone());
        }

        let reference = Arc::new(self.produce(module)?);
        if !module.is_cacheable() {
            debug!(module = module.name(), kind = ?module.kind(), "reference not cached");
            return Some(reference);
        }

        let entry = self.entries.entry(module.id()).or_insert(reference);
        Some(entry.value().clone())
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn produce(&self, module: &Module) -> Option<ModuleReference> {
        let primary = match self.provider.from_metadata(module) {
            Ok(reference) => return Some(reference),
            Err(e) => e,
        };
        match self.provider.from_file(module) {
            Ok(reference) => {
                debug!(module = module.name(), %primary, "reference loaded from file");
                Some(reference)
            }
            Err(fallback) => {
                warn!(
                    module = module.name(),
                    %primary,
                    %fallback,
                    "no reference could be produced; module types unavailable"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ReferenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
