//! Validator configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Namespaces imported into every compilation, ahead of a scope's own.
    pub default_namespaces: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            default_namespaces: vec!["Core".into(), "Core.Functional".into()],
        }
    }
}

impl ValidatorConfig {
    pub fn from_json(json: &str) -> Result<Self, ValidatorError> {
        serde_json::from_str(json).map_err(|e| ValidatorError::Config(e.to_string()))
    }

    /// Default namespaces followed by `local`, without duplicates.
    pub fn namespaces_with(&self, local: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.default_namespaces.len() + local.len());
        for ns in self.default_namespaces.iter().chain(local) {
            if !out.contains(ns) {
                out.push(ns.clone());
            }
        }
        out
    }
}
