//! Raw compiler diagnostics and the validation errors derived from them.

use super::scope::ActivityRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Hidden,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Hidden => write!(f, "hidden"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Zero-based position in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn warning(code: &str, message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Self::error(code, message, location)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Compiler-style text: `(line,col): error CODE: message`, one-based.
    pub fn rendered(&self) -> String {
        match self.location {
            Some(loc) => format!(
                "({},{}): {} {}: {}",
                loc.line + 1,
                loc.column + 1,
                self.severity,
                self.code,
                self.message
            ),
            None => format!("{} {}: {}", self.severity, self.code, self.message),
        }
    }
}

/// A problem reported to the caller, optionally attributed to an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub is_warning: bool,
    pub source: Option<ActivityRef>,
    pub expression_id: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            is_warning: false,
            source: None,
            expression_id: None,
        }
    }

    pub fn attributed(
        message: impl Into<String>,
        source: ActivityRef,
        expression_id: impl Into<String>,
    ) -> Self {
        ValidationError {
            source: Some(source),
            expression_id: Some(expression_id.into()),
            ..Self::new(message)
        }
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.source.as_ref().map(|a| a.id.as_str())
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(activity) => write!(f, "{} (activity '{}')", self.message, activity.id),
            None => write!(f, "{}", self.message),
        }
    }
}
