use std::fmt;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    DuplicateDeclaration,
    UnresolvedType,
    UnresolvedAutomaton,
    UnresolvedFunction,
    UnresolvedVariable,
    UnresolvedAnnotation,
    AmbiguousOverload,
    UnknownState,
    UnknownField,
    InvalidShift,
    MissingOwner,
    ConflictingOwner,
    InvalidType,
    InvalidAccess,
    InvalidAnnotation,
    InvalidOldValue,
    InvalidConstructorCall,
    SignatureMismatch,
    MalformedTree,
}

impl DiagnosticKind {
    pub fn describe(self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateDeclaration => "duplicate declaration",
            DiagnosticKind::UnresolvedType => "unresolved type",
            DiagnosticKind::UnresolvedAutomaton => "unresolved automaton",
            DiagnosticKind::UnresolvedFunction => "unresolved function",
            DiagnosticKind::UnresolvedVariable => "unresolved variable",
            DiagnosticKind::UnresolvedAnnotation => "unresolved annotation",
            DiagnosticKind::AmbiguousOverload => "ambiguous overload",
            DiagnosticKind::UnknownState => "unknown state",
            DiagnosticKind::UnknownField => "unknown field",
            DiagnosticKind::InvalidShift => "invalid shift",
            DiagnosticKind::MissingOwner => "missing automaton",
            DiagnosticKind::ConflictingOwner => "conflicting automaton",
            DiagnosticKind::InvalidType => "invalid type",
            DiagnosticKind::InvalidAccess => "invalid access",
            DiagnosticKind::InvalidAnnotation => "invalid annotation",
            DiagnosticKind::InvalidOldValue => "invalid old value",
            DiagnosticKind::InvalidConstructorCall => "invalid constructor call",
            DiagnosticKind::SignatureMismatch => "signature mismatch",
            DiagnosticKind::MalformedTree => "malformed syntax tree",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    pub fn error<S: Into<String>>(
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            level: DiagnosticLevel::Error,
            span,
        }
    }

    pub fn warning<S: Into<String>>(
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            level: DiagnosticLevel::Warning,
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        match self.span {
            Some(span) => write!(
                f,
                "{level}[{}] {}:{}: {}",
                self.kind.describe(),
                span.line,
                span.column,
                self.message
            ),
            None => write!(f, "{level}[{}]: {}", self.kind.describe(), self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn push_error<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.push(Diagnostic::error(kind, message, span));
    }

    pub fn push_warning<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.push(Diagnostic::warning(kind, message, span));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(move |diagnostic| diagnostic.kind == kind)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
