//! Strategies for producing a `ModuleReference` from a `Module`.

use serde::Deserialize;

use crate::error::ValidatorError;
use crate::model::{Module, ModuleReference, ReferenceSource, TypeExport};

/// Produces link-time references. `from_metadata` is the fast path,
/// `from_file` the fallback.
pub trait ReferenceProvider: Send + Sync {
    fn from_metadata(&self, module: &Module) -> Result<ModuleReference, ValidatorError>;
    fn from_file(&self, module: &Module) -> Result<ModuleReference, ValidatorError>;
}

/// On-disk shape of a module's export table.
#[derive(Debug, Deserialize)]
struct ModuleFile {
    exports: Vec<TypeExport>,
}

/// Reads the module's in-memory export table, or its backing JSON file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportTableProvider;

impl ReferenceProvider for ExportTableProvider {
    fn from_metadata(&self, module: &Module) -> Result<ModuleReference, ValidatorError> {
        let exports = module.exports().ok_or_else(|| ValidatorError::NoReferenceSource {
            module: module.name().to_string(),
            strategy: "export metadata",
        })?;
        Ok(ModuleReference {
            module: module.id(),
            name: module.name().to_string(),
            exports: exports.to_vec(),
            source: ReferenceSource::Metadata,
        })
    }

    fn from_file(&self, module: &Module) -> Result<ModuleReference, ValidatorError> {
        let path = module.location().ok_or_else(|| ValidatorError::NoReferenceSource {
            module: module.name().to_string(),
            strategy: "backing file",
        })?;
        let file_error = |message: String| ValidatorError::ModuleFile {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let file: ModuleFile = serde_json::from_str(&text).map_err(|e| file_error(e.to_string()))?;
        Ok(ModuleReference {
            module: module.id(),
            name: module.name().to_string(),
            exports: file.exports,
            source: ReferenceSource::File,
        })
    }
}
