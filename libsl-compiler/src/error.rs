use std::fmt;

use thiserror::Error;

use crate::ast::SourceSpan;

/// The syntax tree violates a shape the grammar guarantees. The enclosing
/// declaration is abandoned and the run fails once every declaration has
/// been processed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed syntax tree at {}:{}: {message}", span.line, span.column)]
pub struct StructuralError {
    pub message: String,
    pub span: SourceSpan,
}

impl StructuralError {
    pub fn new<S: Into<String>>(message: S, span: SourceSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Type,
    Automaton,
    Function,
    Annotation,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReferenceKind::Type => "type",
            ReferenceKind::Automaton => "automaton",
            ReferenceKind::Function => "function",
            ReferenceKind::Annotation => "annotation",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unresolved {kind} reference '{name}'")]
    Unresolved { kind: ReferenceKind, name: String },
    #[error(
        "ambiguous reference to function '{name}' in automaton '{automaton}': {candidates} overloads match"
    )]
    Ambiguous {
        name: String,
        automaton: String,
        candidates: usize,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("duplicate declaration of {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("unknown automaton '{name}'")]
    UnknownAutomaton { name: String },
    #[error("variable '{name}' cannot be registered in {scope} scope")]
    InvalidScope { name: String, scope: &'static str },
    #[error("definition of '{name}' returns '{defined}' but its declaration returns '{declared}'")]
    SignatureMismatch {
        name: String,
        declared: String,
        defined: String,
    },
}

/// Why a builder step gave up on the current declaration.
#[derive(Debug)]
pub(crate) enum Abort {
    /// A diagnostic has been recorded; skip the declaration and continue.
    Reported,
    Structural(StructuralError),
}

impl From<StructuralError> for Abort {
    fn from(error: StructuralError) -> Self {
        Abort::Structural(error)
    }
}

pub(crate) type BuildResult<T> = Result<T, Abort>;

/// Turns a recoverable abort into `None`, propagating structural errors.
pub(crate) fn recover<T>(result: BuildResult<T>) -> Result<Option<T>, StructuralError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Abort::Reported) => Ok(None),
        Err(Abort::Structural(error)) => Err(error),
    }
}
