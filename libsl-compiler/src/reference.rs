//! Name handles resolved against the [`SymbolContext`] on demand.
//!
//! A reference can be created before its target is registered; resolving it
//! is only meaningful once the signature pass has finished. Resolution never
//! caches, so it can be repeated any number of times with the same result.

use crate::asg::{Annotation, Automaton, AutomatonId, FunctionId};
use crate::context::{FunctionLookup, SymbolContext};
use crate::error::{ReferenceKind, ResolveError};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    name: String,
}

impl TypeReference {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve<'c>(&self, context: &'c SymbolContext) -> Result<&'c Type, ResolveError> {
        context
            .resolve_type(&self.name)
            .ok_or_else(|| unresolved(ReferenceKind::Type, &self.name))
    }

    pub fn resolve_or_panic<'c>(&self, context: &'c SymbolContext) -> &'c Type {
        self.resolve(context).unwrap_or_else(|err| panic!("{err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutomatonReference {
    name: String,
}

impl AutomatonReference {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve_id(&self, context: &SymbolContext) -> Result<AutomatonId, ResolveError> {
        context
            .resolve_automaton(&self.name)
            .ok_or_else(|| unresolved(ReferenceKind::Automaton, &self.name))
    }

    pub fn resolve<'c>(&self, context: &'c SymbolContext) -> Result<&'c Automaton, ResolveError> {
        self.resolve_id(context).map(|id| context.automaton(id))
    }

    pub fn resolve_or_panic<'c>(&self, context: &'c SymbolContext) -> &'c Automaton {
        self.resolve(context).unwrap_or_else(|err| panic!("{err}"))
    }
}

/// A function named by (name, owning automaton) and, when the call site
/// spells them out, the argument types that pick one overload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionReference {
    name: String,
    automaton: String,
    argument_types: Option<Vec<TypeReference>>,
}

impl FunctionReference {
    pub fn new<N: Into<String>, A: Into<String>>(
        name: N,
        automaton: A,
        argument_types: Option<Vec<TypeReference>>,
    ) -> Self {
        Self {
            name: name.into(),
            automaton: automaton.into(),
            argument_types,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn automaton(&self) -> &str {
        &self.automaton
    }

    pub fn argument_types(&self) -> Option<&[TypeReference]> {
        self.argument_types.as_deref()
    }

    pub fn resolve(&self, context: &SymbolContext) -> Result<FunctionId, ResolveError> {
        match context.resolve_function(&self.name, &self.automaton, self.argument_types()) {
            FunctionLookup::Found(id) => Ok(id),
            FunctionLookup::NotFound => Err(unresolved(
                ReferenceKind::Function,
                &format!("{}.{}", self.automaton, self.name),
            )),
            FunctionLookup::Ambiguous(candidates) => Err(ResolveError::Ambiguous {
                name: self.name.clone(),
                automaton: self.automaton.clone(),
                candidates: candidates.len(),
            }),
        }
    }

    pub fn resolve_or_panic(&self, context: &SymbolContext) -> FunctionId {
        self.resolve(context).unwrap_or_else(|err| panic!("{err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationReference {
    name: String,
}

impl AnnotationReference {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve<'c>(&self, context: &'c SymbolContext) -> Result<&'c Annotation, ResolveError> {
        context
            .resolve_annotation(&self.name)
            .ok_or_else(|| unresolved(ReferenceKind::Annotation, &self.name))
    }

    pub fn resolve_or_panic<'c>(&self, context: &'c SymbolContext) -> &'c Annotation {
        self.resolve(context).unwrap_or_else(|err| panic!("{err}"))
    }
}

fn unresolved(kind: ReferenceKind, name: &str) -> ResolveError {
    ResolveError::Unresolved {
        kind,
        name: name.to_string(),
    }
}
