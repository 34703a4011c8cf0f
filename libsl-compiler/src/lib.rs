mod access;
mod asg;
mod ast;
mod automaton;
mod builder;
mod compiler;
mod context;
mod diagnostics;
mod error;
mod expression;
mod function;
mod reference;
mod types;

pub use crate::asg::{
    Annotation, AnnotationParameter, AnnotationUsage, AssignmentValue, Automaton, AutomatonId,
    BinaryOperator, ConstructorArgument, ConstructorCall, Contract, Expression, Function,
    FunctionArgument, FunctionId, Library, LibraryMetadata, QualifiedAccess, Shift,
    ShiftEndpoint, State, Statement, UnaryOperator, Variable, VariableScope, ANY_STATE,
    RESULT_VARIABLE, SELF_STATE, TARGET_ANNOTATION,
};
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::context::{FunctionLookup, FunctionRegistration, SymbolContext};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics};
pub use crate::error::{ReferenceKind, RegistrationError, ResolveError, StructuralError};
pub use crate::reference::{
    AnnotationReference, AutomatonReference, FunctionReference, TypeReference,
};
pub use crate::types::{AliasError, Type, TypeRegistry};

/// The syntax tree handed over by a parser.
pub mod syntax {
    pub use crate::ast::*;
}
