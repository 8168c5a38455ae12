use crate::span::Pos;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub pos: Option<Pos>,
    pub suggestions: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, message)
    }

    fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Diagnostic {
            level,
            message: message.into(),
            pos: None,
            suggestions: Vec::new(),
            code: None,
        }
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        };
        write!(f, "{}: {}", level, self.message)?;
        if let Some(pos) = &self.pos {
            write!(f, " at {}", pos)?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, " (hints: {})", self.suggestions.join("; "))?;
        }
        Ok(())
    }
}

/// Per-file diagnostic sink. Lives in the compilation context; no global
/// manager, so concurrent per-file compilations stay isolated.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_with_pos_and_hints() {
        let diag = Diagnostic::warning("type checker gave up")
            .with_pos(Pos::new(3, 7))
            .with_suggestion("add an explicit type annotation");
        assert_eq!(
            diag.to_string(),
            "warning: type checker gave up at 3:7 (hints: add an explicit type annotation)"
        );
    }

    #[test]
    fn sink_tracks_error_level() {
        let mut sink = Diagnostics::new();
        sink.push(Diagnostic::info("noted"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error("boom"));
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }
}
