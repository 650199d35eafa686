//! Serde target for the workflow document JSON.

use serde::{Deserialize, Serialize};

use crate::model::{ExpressionKind, ModuleKind, TypeExport};

// =============================================================================
// TOP-LEVEL DOCUMENT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub imports: Imports,
    #[serde(default)]
    pub activities: Vec<ActivitySpec>,
    #[serde(default)]
    pub edges: Vec<ContainmentEdge>,
}

// =============================================================================
// MODULES
// =============================================================================

/// A module the workflow's types come from. Its export table is given
/// inline, read from `location`, or both (inline wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ModuleKind,
    #[serde(default)]
    pub exports: Option<Vec<TypeExport>>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Workflow-level imports, applied to every validation of the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imports {
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Names of entries in `modules`.
    #[serde(default)]
    pub modules: Vec<String>,
}

// =============================================================================
// ACTIVITIES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySpec {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Variables visible to this activity and everything it contains.
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub expressions: Vec<ExpressionSpec>,
}

impl ActivitySpec {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionSpec {
    pub id: String,
    pub text: String,
    pub result_type: String,
    #[serde(default)]
    pub kind: ExpressionKind,
}

/// `parent` contains `child`; the child sees the parent's variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentEdge {
    pub parent: String,
    pub child: String,
}
