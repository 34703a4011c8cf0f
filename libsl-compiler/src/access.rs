//! Resolution of dotted access chains such as `p.items[i].x` or `A(arg).state`.
//!
//! The head is a variable found by scope lookup, or an automaton getter. Every
//! following segment is resolved against the type of the link before it.

use crate::ast::{self, Identifier, SourceSpan};
use crate::asg::{AutomatonId, QualifiedAccess, VariableScope, RESULT_VARIABLE};
use crate::builder::{AsgBuilder, Scope};
use crate::diagnostics::DiagnosticKind;
use crate::error::{BuildResult, StructuralError};
use crate::reference::TypeReference;
use crate::types::Type;

/// Alias chains longer than this are treated as cyclic.
const MAX_ALIAS_DEPTH: usize = 32;

impl AsgBuilder<'_> {
    pub(crate) fn resolve_access(
        &mut self,
        chain: &ast::AccessChain,
        scope: Scope,
    ) -> BuildResult<QualifiedAccess> {
        let Some((head, rest)) = chain.segments.split_first() else {
            return Err(StructuralError::new("empty access chain", chain.span).into());
        };
        match head {
            ast::AccessSegment::Name(name) => self.variable_head(name, rest, scope),
            ast::AccessSegment::AutomatonGetter { automaton, argument } => {
                self.getter_head(automaton, argument, rest, scope)
            }
            ast::AccessSegment::Index(index) => Err(StructuralError::new(
                "an access chain cannot start with an index",
                index.span,
            )
            .into()),
        }
    }

    /// Arguments, then locals, then variables of the owning and target
    /// automata, then globals.
    fn lookup_variable(&self, name: &str, scope: Scope) -> Option<(VariableScope, TypeReference)> {
        if let Some(id) = scope.function {
            let function = self.context.function(id);
            if let Some(argument) = function.argument(name) {
                return Some((VariableScope::FunctionArgument(id), argument.ty.clone()));
            }
            if let Some(local) = function.locals.get(name) {
                return Some((local.scope, local.ty.clone()));
            }
        }
        for automaton in scope.automata() {
            if let Some(variable) = self.context.automaton(automaton).variable(name) {
                return Some((variable.scope, variable.ty.clone()));
            }
        }
        self.context
            .resolve_variable(name)
            .map(|variable| (variable.scope, variable.ty.clone()))
    }

    fn variable_head(
        &mut self,
        name: &Identifier,
        rest: &[ast::AccessSegment],
        scope: Scope,
    ) -> BuildResult<QualifiedAccess> {
        let Some((variable, ty)) = self.lookup_variable(&name.name, scope) else {
            return Err(self.report(
                DiagnosticKind::UnresolvedVariable,
                format!("unresolved variable '{}'", name.name),
                name.span,
            ));
        };
        if matches!(variable, VariableScope::Result(_)) && !scope.allows_result() {
            return Err(self.report(
                DiagnosticKind::InvalidAccess,
                format!("'{RESULT_VARIABLE}' can only be read in ensures contracts and bodies"),
                name.span,
            ));
        }
        let child = self.continuation(&ty, rest, scope)?;
        Ok(QualifiedAccess::Variable {
            name: name.name.clone(),
            ty,
            variable: Some(variable),
            child,
        })
    }

    fn getter_head(
        &mut self,
        automaton: &Identifier,
        argument: &Identifier,
        rest: &[ast::AccessSegment],
        scope: Scope,
    ) -> BuildResult<QualifiedAccess> {
        let Some(id) = self.context.resolve_automaton(&automaton.name) else {
            return Err(self.report(
                DiagnosticKind::UnresolvedAutomaton,
                format!("unresolved automaton '{}'", automaton.name),
                automaton.span,
            ));
        };
        if self.lookup_variable(&argument.name, scope).is_none() {
            return Err(self.report(
                DiagnosticKind::UnresolvedVariable,
                format!("unresolved variable '{}'", argument.name),
                argument.span,
            ));
        }
        let ty = self.context.automaton(id).ty.clone();

        let child = match rest.split_first() {
            Some((ast::AccessSegment::Name(name), rest)) => {
                Some(Box::new(self.automaton_variable(id, name, rest, scope)?))
            }
            _ => self.continuation(&ty, rest, scope)?,
        };
        Ok(QualifiedAccess::AutomatonGetter {
            automaton: id,
            argument: argument.name.clone(),
            ty,
            child,
        })
    }

    /// A name after a getter refers to a variable of that automaton.
    fn automaton_variable(
        &mut self,
        automaton: AutomatonId,
        name: &Identifier,
        rest: &[ast::AccessSegment],
        scope: Scope,
    ) -> BuildResult<QualifiedAccess> {
        let owner = self.context.automaton(automaton);
        let Some(variable) = owner.variable(&name.name) else {
            let message = format!("automaton '{}' has no variable '{}'", owner.name, name.name);
            return Err(self.report(DiagnosticKind::UnknownField, message, name.span));
        };
        let (variable, ty) = (variable.scope, variable.ty.clone());
        let child = self.continuation(&ty, rest, scope)?;
        Ok(QualifiedAccess::Variable {
            name: name.name.clone(),
            ty,
            variable: Some(variable),
            child,
        })
    }

    fn continuation(
        &mut self,
        current: &TypeReference,
        rest: &[ast::AccessSegment],
        scope: Scope,
    ) -> BuildResult<Option<Box<QualifiedAccess>>> {
        let Some((segment, rest)) = rest.split_first() else {
            return Ok(None);
        };
        let link = match segment {
            ast::AccessSegment::Name(field) => {
                let ty = self.field_type(current, field)?;
                let child = self.continuation(&ty, rest, scope)?;
                QualifiedAccess::Variable {
                    name: field.name.clone(),
                    ty,
                    variable: None,
                    child,
                }
            }
            ast::AccessSegment::Index(index) => {
                let element_type = self.element_type(current, index.span)?;
                let index = self.build_expression(index, scope)?;
                let child = self.continuation(&element_type, rest, scope)?;
                QualifiedAccess::Array {
                    index: Box::new(index),
                    element_type,
                    child,
                }
            }
            ast::AccessSegment::AutomatonGetter { automaton, .. } => {
                return Err(StructuralError::new(
                    "an automaton getter can only start an access chain",
                    automaton.span,
                )
                .into())
            }
        };
        Ok(Some(Box::new(link)))
    }

    fn lookup_type(&mut self, reference: &TypeReference, span: SourceSpan) -> BuildResult<Type> {
        let resolved = reference.resolve(self.context).map(Type::clone);
        resolved.map_err(|err| self.report(DiagnosticKind::UnresolvedType, err.to_string(), span))
    }

    fn field_type(&mut self, current: &TypeReference, field: &Identifier) -> BuildResult<TypeReference> {
        let ty = self.lookup_type(current, field.span)?;
        self.field_of(&ty, current, field, 0)
    }

    /// `surface` is the type as written on the previous link; aliases are
    /// looked through without changing it.
    fn field_of(
        &mut self,
        ty: &Type,
        surface: &TypeReference,
        field: &Identifier,
        depth: usize,
    ) -> BuildResult<TypeReference> {
        match ty {
            Type::Structured { fields, .. } => match fields.get(&field.name) {
                Some(field_type) => Ok(field_type.clone()),
                None => Err(self.report(
                    DiagnosticKind::UnknownField,
                    format!(
                        "no such field '{}' in type '{}'",
                        field.name,
                        surface.name()
                    ),
                    field.span,
                )),
            },
            Type::Enum { name, values } => {
                if values.contains_key(&field.name) {
                    Ok(TypeReference::new(name))
                } else {
                    Err(self.report(
                        DiagnosticKind::UnknownField,
                        format!("enum '{}' has no member '{}'", surface.name(), field.name),
                        field.span,
                    ))
                }
            }
            Type::EnumLikeSemantic {
                underlying,
                backing,
                ..
            } => {
                let underlying = self.lookup_type(underlying, field.span)?;
                match underlying {
                    Type::Enum { values, .. } if values.contains_key(&field.name) => Ok(backing.clone()),
                    _ => Err(self.report(
                        DiagnosticKind::UnknownField,
                        format!("type '{}' has no member '{}'", surface.name(), field.name),
                        field.span,
                    )),
                }
            }
            Type::Alias { name, original } => {
                if depth >= MAX_ALIAS_DEPTH {
                    return Err(self.report(
                        DiagnosticKind::InvalidType,
                        format!("type alias '{name}' is cyclic"),
                        field.span,
                    ));
                }
                let original = self.lookup_type(original, field.span)?;
                self.field_of(&original, surface, field, depth + 1)
            }
            // Opaque: whatever is behind them is not described here.
            Type::Real { .. } | Type::Array { .. } => Ok(surface.clone()),
            Type::Simple { name } => Err(self.report(
                DiagnosticKind::InvalidAccess,
                format!(
                    "simple type '{name}' cannot have fields (accessing '{}')",
                    field.name
                ),
                field.span,
            )),
        }
    }

    fn element_type(&mut self, current: &TypeReference, span: SourceSpan) -> BuildResult<TypeReference> {
        let ty = self.lookup_type(current, span)?;
        self.element_of(&ty, current, span, 0)
    }

    fn element_of(
        &mut self,
        ty: &Type,
        surface: &TypeReference,
        span: SourceSpan,
        depth: usize,
    ) -> BuildResult<TypeReference> {
        match ty {
            Type::Array { element } => Ok(element.clone()),
            Type::Real { .. } => Ok(surface.clone()),
            Type::Alias { name, original } => {
                if depth >= MAX_ALIAS_DEPTH {
                    return Err(self.report(
                        DiagnosticKind::InvalidType,
                        format!("type alias '{name}' is cyclic"),
                        span,
                    ));
                }
                let original = self.lookup_type(original, span)?;
                self.element_of(&original, surface, span, depth + 1)
            }
            Type::Simple { .. }
            | Type::Enum { .. }
            | Type::EnumLikeSemantic { .. }
            | Type::Structured { .. } => Err(self.report(
                DiagnosticKind::InvalidAccess,
                format!("{} cannot be indexed", ty.describe()),
                span,
            )),
        }
    }
}
