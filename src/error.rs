//! Fatal error type shared by every phase.
//!
//! Expression problems never surface here: those become `ValidationError`s.
//! A `ValidatorError` means the validation call itself could not complete.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// The workflow document could not be turned into a validation scope.
    #[error("[{code}] {message}{}", node_suffix(.node_id))]
    Document {
        code: &'static str,
        message: String,
        node_id: Option<String>,
    },

    /// The language's parser could not produce a syntax tree at all.
    #[error("{language} parser failed: {message}")]
    Syntax { language: String, message: String },

    /// The compilation could not produce diagnostics.
    #[error("{language} compilation failed: {message}")]
    Compiler { language: String, message: String },

    /// A module's backing file could not be read or decoded.
    #[error("module file '{path}': {message}")]
    ModuleFile { path: String, message: String },

    /// A module offered no way to build a reference from.
    #[error("module '{module}' has no {strategy}")]
    NoReferenceSource {
        module: String,
        strategy: &'static str,
    },

    #[error("invalid validator config: {0}")]
    Config(String),
}

fn node_suffix(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!(" (node '{}')", id),
        None => String::new(),
    }
}

impl ValidatorError {
    pub fn document(code: &'static str, message: impl Into<String>, node_id: Option<String>) -> Self {
        ValidatorError::Document {
            code,
            message: message.into(),
            node_id,
        }
    }

    pub fn syntax(language: &str, message: impl Into<String>) -> Self {
        ValidatorError::Syntax {
            language: language.into(),
            message: message.into(),
        }
    }

    pub fn compiler(language: &str, message: impl Into<String>) -> Self {
        ValidatorError::Compiler {
            language: language.into(),
            message: message.into(),
        }
    }

    /// Error code for document errors, `None` for everything else.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ValidatorError::Document { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            ValidatorError::Document { node_id, .. } => node_id.as_deref(),
            _ => None,
        }
    }
}
