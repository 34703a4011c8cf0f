use std::collections::HashSet;

use crate::ast::{self, Identifier};
use crate::asg::{AutomatonId, FunctionId, Shift, ShiftEndpoint, State, ANY_STATE, SELF_STATE};
use crate::builder::AsgBuilder;
use crate::diagnostics::DiagnosticKind;
use crate::error::{recover, BuildResult, ResolveError, StructuralError};
use crate::reference::FunctionReference;

impl AsgBuilder<'_> {
    pub(crate) fn register_states(&mut self, automaton: AutomatonId, declaration: &ast::AutomatonDeclaration) {
        let mut seen = HashSet::new();
        for state in &declaration.states {
            if !seen.insert(state.name.name.as_str()) {
                self.report(
                    DiagnosticKind::DuplicateDeclaration,
                    format!(
                        "duplicate state '{}' in automaton '{}'",
                        state.name.name, declaration.name.name
                    ),
                    state.name.span,
                );
                continue;
            }
            self.context.automaton_mut(automaton).states.insert(
                state.name.name.clone(),
                State {
                    name: state.name.name.clone(),
                    kind: state.kind,
                    span: state.name.span,
                },
            );
        }
    }

    /// Expands `a, b -> c (f)` into one shift per source.
    ///
    /// Problems with the target or the function list drop the whole
    /// declaration; a bad source only drops the shift it would produce.
    pub(crate) fn elaborate_shift(
        &mut self,
        automaton: AutomatonId,
        declaration: &ast::ShiftDeclaration,
    ) -> Result<(), StructuralError> {
        let Some(target) = &declaration.target else {
            return Err(StructuralError::new(
                "shift declaration has no target state",
                declaration.span,
            ));
        };
        if declaration.sources.is_empty() {
            return Err(StructuralError::new(
                "shift declaration has no source state",
                declaration.span,
            ));
        }

        let Some(to) = recover(self.shift_target(automaton, target))? else {
            return Ok(());
        };
        let Some(functions) = recover(self.shift_functions(automaton, declaration))? else {
            return Ok(());
        };

        for source in &declaration.sources {
            let Some(from) = recover(self.shift_source(automaton, source))? else {
                continue;
            };
            tracing::trace!(from = from.describe(), to = to.describe(), "shift added");
            self.context.automaton_mut(automaton).shifts.push(Shift {
                from,
                to: to.clone(),
                functions: functions.clone(),
                span: declaration.span,
            });
        }
        Ok(())
    }

    fn shift_source(&mut self, automaton: AutomatonId, source: &Identifier) -> BuildResult<ShiftEndpoint> {
        match source.name.as_str() {
            ANY_STATE => Ok(ShiftEndpoint::Any),
            SELF_STATE => Err(self.report(
                DiagnosticKind::InvalidShift,
                "'self' cannot be the source of a shift",
                source.span,
            )),
            _ => self.declared_state(automaton, source).map(ShiftEndpoint::State),
        }
    }

    fn shift_target(&mut self, automaton: AutomatonId, target: &Identifier) -> BuildResult<ShiftEndpoint> {
        match target.name.as_str() {
            SELF_STATE => Ok(ShiftEndpoint::SelfLoop),
            ANY_STATE => Err(self.report(
                DiagnosticKind::InvalidShift,
                "'any' cannot be the target of a shift",
                target.span,
            )),
            _ => self.declared_state(automaton, target).map(ShiftEndpoint::State),
        }
    }

    pub(crate) fn declared_state(&mut self, automaton: AutomatonId, state: &Identifier) -> BuildResult<String> {
        let owner = self.context.automaton(automaton);
        if owner.state(&state.name).is_some() {
            return Ok(state.name.clone());
        }
        let message = format!("unknown state '{}' in automaton '{}'", state.name, owner.name);
        Err(self.report(DiagnosticKind::UnknownState, message, state.span))
    }

    fn shift_functions(
        &mut self,
        automaton: AutomatonId,
        declaration: &ast::ShiftDeclaration,
    ) -> BuildResult<Vec<FunctionId>> {
        let automaton_name = self.context.automaton(automaton).name.clone();
        if declaration.functions.is_empty() {
            return Err(self.report(
                DiagnosticKind::InvalidShift,
                format!("shift in automaton '{automaton_name}' names no functions"),
                declaration.span,
            ));
        }

        let mut resolved = Vec::with_capacity(declaration.functions.len());
        for function in &declaration.functions {
            let argument_types = match &function.argument_types {
                Some(types) => Some(
                    types
                        .iter()
                        .map(|ty| self.resolve_type_expression(ty))
                        .collect::<BuildResult<Vec<_>>>()?,
                ),
                None => None,
            };
            let reference = FunctionReference::new(
                &function.name.name,
                &automaton_name,
                argument_types,
            );
            match reference.resolve(self.context) {
                Ok(id) => resolved.push(id),
                Err(ResolveError::Ambiguous { candidates, .. }) => {
                    return Err(self.report(
                        DiagnosticKind::AmbiguousOverload,
                        format!(
                            "function '{}' of automaton '{automaton_name}' has {candidates} overloads; \
                             list the argument types to pick one",
                            function.name.name
                        ),
                        function.name.span,
                    ));
                }
                Err(ResolveError::Unresolved { .. }) => {
                    let signature = match reference.argument_types() {
                        Some(types) => format!(
                            "({})",
                            types
                                .iter()
                                .map(|ty| ty.name())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                        None => String::new(),
                    };
                    return Err(self.report(
                        DiagnosticKind::UnresolvedFunction,
                        format!(
                            "unresolved function '{}{signature}' in automaton '{automaton_name}'",
                            function.name.name
                        ),
                        function.name.span,
                    ));
                }
            }
        }
        Ok(resolved)
    }
}
