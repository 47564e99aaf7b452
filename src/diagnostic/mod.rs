pub mod ansi;
pub mod json;

use crate::ast::Span;

/// Where a diagnostic points. The lexer knows byte offsets; parse and runtime errors only
/// know the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Offset(Span),
    Line(usize),
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    pub location: Option<Location>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.location = Some(Location::Offset(span));
        self
    }

    /// Line 0 means "no particular instruction" and leaves the location unset.
    pub fn with_line(mut self, line: usize) -> Self {
        if line > 0 {
            self.location = Some(Location::Line(line));
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span { start: e.position, end: e.position + e.snippet.len().max(1) };
        let mut d = Diagnostic::error(format!("unexpected input '{}'", e.snippet))
            .with_code("ASM-L001")
            .with_span(span);
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_line(e.line)
    }
}

impl From<&crate::interpreter::RuntimeError> for Diagnostic {
    fn from(e: &crate::interpreter::RuntimeError) -> Self {
        Diagnostic::error(e.fault.to_string()).with_line(e.line)
    }
}

impl From<&crate::config::ConfigError> for Diagnostic {
    fn from(e: &crate::config::ConfigError) -> Self {
        Diagnostic::error(e.to_string()).with_note("while loading the cost table")
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Io { .. } | crate::Error::Json(_) => Diagnostic::error(e.to_string()),
            crate::Error::Lex(e) => e.into(),
            crate::Error::Parse(e) => e.into(),
            crate::Error::Runtime(e) => e.into(),
            crate::Error::Config(e) => e.into(),
        }
    }
}
