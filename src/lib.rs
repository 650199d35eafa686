pub mod assemble;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod flow;
pub mod language;
pub mod model;
pub mod parse;
pub mod references;
pub mod validate;
pub mod wasm;
