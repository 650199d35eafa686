//! Module references: the cross-call cache and the required-module set.

pub mod cache;
pub mod provider;
pub mod required;

pub use cache::ReferenceCache;
pub use provider::{ExportTableProvider, ReferenceProvider};
pub use required::RequiredModuleSet;
