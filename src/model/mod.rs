//! Data model shared by every component.

pub mod diagnostic;
pub mod module;
pub mod scope;
pub mod types;

pub use diagnostic::*;
pub use module::*;
pub use scope::*;
pub use types::*;
