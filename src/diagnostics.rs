//! Compiler diagnostics → validation errors attributed to activities.

use tracing::{debug, trace};

use crate::language::MarkerPattern;
use crate::model::{Diagnostic, ValidationError, ValidationScope};

/// Post-processing hook over the raw `(error, diagnostic)` pairs.
///
/// Override to rewrite or drop messages without touching the mapping itself.
pub trait DiagnosticCurator: Send + Sync {
    fn curate(&self, errors: Vec<(ValidationError, Diagnostic)>) -> Vec<ValidationError> {
        errors.into_iter().map(|(error, _)| error).collect()
    }
}

/// Keeps every mapped error as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAll;

impl DiagnosticCurator for KeepAll {}

pub struct DiagnosticMapper<'a> {
    marker: &'a MarkerPattern,
    curator: &'a dyn DiagnosticCurator,
}

impl<'a> DiagnosticMapper<'a> {
    pub fn new(marker: &'a MarkerPattern, curator: &'a dyn DiagnosticCurator) -> Self {
        Self { marker, curator }
    }

    /// Map error-severity diagnostics of the batch `source`. Everything else
    /// is ignored.
    pub fn map(
        &self,
        diagnostics: &[Diagnostic],
        source: &str,
        scope: &ValidationScope,
    ) -> Vec<ValidationError> {
        let mut pairs = Vec::new();
        for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
            let error = self.map_one(diagnostic, source, scope);
            pairs.push((error, diagnostic.clone()));
        }
        debug!(
            diagnostics = diagnostics.len(),
            errors = pairs.len(),
            "diagnostics mapped"
        );
        self.curator.curate(pairs)
    }

    fn map_one(&self, diagnostic: &Diagnostic, source: &str, scope: &ValidationScope) -> ValidationError {
        let rendered = diagnostic.rendered();
        let attributed = message_text(&rendered).and_then(|message| {
            let line = source.lines().nth(diagnostic.location?.line)?;
            let marker = self.marker.find(line)?;
            let unit = scope
                .expressions()
                .get(marker.index)
                .filter(|u| u.id == marker.expression_id)
                .or_else(|| scope.find(&marker.expression_id))?;
            Some(ValidationError::attributed(
                message,
                unit.activity.clone(),
                unit.id.clone(),
            ))
        });

        match attributed {
            Some(error) => error,
            None => {
                trace!(%rendered, "diagnostic not attributable to an expression");
                ValidationError::new(rendered)
            }
        }
    }
}

/// Message part of a rendered error: `(l,c): error CODE: message` → `message`.
fn message_text(rendered: &str) -> Option<&str> {
    let rest = match rendered.strip_prefix('(') {
        Some(after) => {
            let close = after.find("): ")?;
            &after[close + 3..]
        }
        None => rendered,
    };
    let rest = rest.strip_prefix("error ")?;
    let (code, message) = rest.split_once(": ")?;
    if code.is_empty() || code.contains(char::is_whitespace) {
        return None;
    }
    Some(message)
}
