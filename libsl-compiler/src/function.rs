use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{self, ContractKind, Identifier};
use crate::asg::{
    AnnotationUsage, AssignmentValue, AutomatonId, ConstructorArgument, ConstructorCall, Contract,
    Expression, Function, FunctionArgument, FunctionId, Statement, Variable, VariableScope,
    RESULT_VARIABLE, TARGET_ANNOTATION,
};
use crate::builder::{AsgBuilder, Scope};
use crate::context::FunctionRegistration;
use crate::diagnostics::DiagnosticKind;
use crate::error::{recover, BuildResult, StructuralError};
use crate::reference::{AnnotationReference, AutomatonReference};

/// Keyword of a constructor call that selects the initial state.
const STATE_ARGUMENT: &str = "state";

fn describe_function(declaration: &ast::FunctionDeclaration) -> String {
    match &declaration.name {
        Some(name) => format!("{} '{}'", declaration.kind.describe(), name.name),
        None => declaration.kind.describe().to_string(),
    }
}

impl AsgBuilder<'_> {
    /// Registers the signature of `declaration`; contracts and statements are
    /// elaborated once every signature is known.
    pub(crate) fn register_signature(
        &mut self,
        declaration: &ast::FunctionDeclaration,
        enclosing: Option<AutomatonId>,
    ) -> BuildResult<FunctionRegistration> {
        let owner = self.function_owner(declaration, enclosing)?;
        let owner_name = self.context.automaton(owner).name.clone();
        let scope = Scope::automaton(owner);

        let annotations = self.annotation_usages(&declaration.annotations, scope)?;
        let mut arguments = Vec::with_capacity(declaration.parameters.len());
        let mut target = None;
        let mut seen = HashSet::new();
        for (index, parameter) in declaration.parameters.iter().enumerate() {
            if !seen.insert(parameter.name.name.as_str()) {
                return Err(self.report(
                    DiagnosticKind::DuplicateDeclaration,
                    format!(
                        "duplicate argument '{}' in {}",
                        parameter.name.name,
                        describe_function(declaration)
                    ),
                    parameter.name.span,
                ));
            }
            let annotations = self.annotation_usages(&parameter.annotations, scope)?;
            let retargets = annotations
                .iter()
                .any(|usage| usage.annotation.name() == TARGET_ANNOTATION);
            let ty = if retargets {
                let automaton = self.target_automaton(parameter)?;
                if target.is_none() {
                    target = Some(automaton);
                }
                self.context.automaton(automaton).ty.clone()
            } else {
                self.resolve_type_expression(&parameter.ty)?
            };
            arguments.push(FunctionArgument {
                name: parameter.name.name.clone(),
                ty,
                index,
                annotations,
                span: parameter.name.span,
            });
        }
        let return_type = declaration
            .return_type
            .as_ref()
            .map(|ty| self.resolve_type_expression(ty))
            .transpose()?;

        let target_name = match target {
            Some(id) => self.context.automaton(id).name.clone(),
            None => owner_name.clone(),
        };
        let function = Function {
            // assigned on registration
            id: FunctionId(usize::MAX),
            kind: declaration.kind,
            name: declaration.name.as_ref().map(|name| name.name.clone()),
            automaton: AutomatonReference::new(owner_name),
            target_automaton: AutomatonReference::new(target_name),
            arguments,
            return_type,
            annotations,
            contracts: Vec::new(),
            statements: Vec::new(),
            locals: IndexMap::new(),
            has_body: declaration.body.is_some(),
            span: declaration.span,
        };

        let registration = match self.context.register_function(function) {
            Ok(registration) => registration,
            Err(err) => return Err(self.report_registration(err, declaration.span)),
        };
        self.register_result(registration.id(), declaration.span)?;
        Ok(registration)
    }

    /// Declares `result` for a function with a return type. A definition
    /// can add the return type its forward declaration lacked.
    fn register_result(&mut self, id: FunctionId, span: ast::SourceSpan) -> BuildResult<()> {
        let function = self.context.function(id);
        let Some(ty) = function.return_type.clone() else {
            return Ok(());
        };
        if function.locals.contains_key(RESULT_VARIABLE) {
            return Ok(());
        }
        let result = Variable {
            name: RESULT_VARIABLE.to_string(),
            ty,
            scope: VariableScope::Result(id),
            initial_value: None,
            span,
        };
        self.context
            .register_variable(result)
            .map_err(|err| self.report_registration(err, span))
    }

    fn function_owner(
        &mut self,
        declaration: &ast::FunctionDeclaration,
        enclosing: Option<AutomatonId>,
    ) -> BuildResult<AutomatonId> {
        match (&declaration.automaton, enclosing) {
            (Some(qualifier), Some(enclosing)) => {
                let enclosing_name = self.context.automaton(enclosing).name.clone();
                if !self.options.strict_ownership && qualifier.name == enclosing_name {
                    self.warn(
                        DiagnosticKind::ConflictingOwner,
                        format!(
                            "{} is nested in automaton '{enclosing_name}' and needs no qualifier",
                            describe_function(declaration)
                        ),
                        qualifier.span,
                    );
                    return Ok(enclosing);
                }
                Err(self.report(
                    DiagnosticKind::ConflictingOwner,
                    format!(
                        "{} is nested in automaton '{enclosing_name}' and also qualified with '{}'",
                        describe_function(declaration),
                        qualifier.name
                    ),
                    qualifier.span,
                ))
            }
            (Some(qualifier), None) => match self.context.resolve_automaton(&qualifier.name) {
                Some(id) => Ok(id),
                None => Err(self.report(
                    DiagnosticKind::UnresolvedAutomaton,
                    format!("unresolved automaton '{}'", qualifier.name),
                    qualifier.span,
                )),
            },
            (None, Some(enclosing)) => Ok(enclosing),
            (None, None) => Err(self.report(
                DiagnosticKind::MissingOwner,
                format!(
                    "{} must be declared inside an automaton or qualified with one",
                    describe_function(declaration)
                ),
                declaration.span,
            )),
        }
    }

    /// The declared type of a `target` argument names an automaton.
    fn target_automaton(&mut self, parameter: &ast::ParameterDeclaration) -> BuildResult<AutomatonId> {
        let ast::TypeExpression::Named(name) = &parameter.ty else {
            return Err(self.report(
                DiagnosticKind::InvalidAnnotation,
                format!(
                    "argument '{}' is marked '{TARGET_ANNOTATION}' but its type is not an automaton",
                    parameter.name.name
                ),
                parameter.ty.span(),
            ));
        };
        match self.context.resolve_automaton(&name.name) {
            Some(id) => Ok(id),
            None => Err(self.report(
                DiagnosticKind::UnresolvedAutomaton,
                format!("unresolved automaton '{}'", name.name),
                name.span,
            )),
        }
    }

    fn annotation_usages(
        &mut self,
        usages: &[ast::AnnotationUsage],
        scope: Scope,
    ) -> BuildResult<Vec<AnnotationUsage>> {
        let mut resolved = Vec::with_capacity(usages.len());
        for usage in usages {
            let name = &usage.name.name;
            let Some(expected) = self
                .context
                .resolve_annotation(name)
                .map(|annotation| annotation.parameters.len())
            else {
                return Err(self.report(
                    DiagnosticKind::UnresolvedAnnotation,
                    format!("unresolved annotation '{name}'"),
                    usage.name.span,
                ));
            };
            if expected != usage.arguments.len() {
                return Err(self.report(
                    DiagnosticKind::InvalidAnnotation,
                    format!(
                        "annotation '{name}' expects {expected} argument(s), found {}",
                        usage.arguments.len()
                    ),
                    usage.name.span,
                ));
            }
            let arguments = usage
                .arguments
                .iter()
                .map(|argument| self.build_expression(argument, scope))
                .collect::<BuildResult<Vec<_>>>()?;
            resolved.push(AnnotationUsage {
                annotation: AnnotationReference::new(name),
                arguments,
            });
        }
        Ok(resolved)
    }

    pub(crate) fn elaborate_function(
        &mut self,
        id: FunctionId,
        declaration: &ast::FunctionDeclaration,
    ) -> Result<(), StructuralError> {
        let function = self.context.function(id);
        let owner = function.automaton.resolve_id(self.context).ok();
        let target = function.target_automaton.resolve_id(self.context).ok();
        let scope = Scope::function(owner, target, id);
        tracing::trace!(function = %function.display_name(), "elaborating function");

        for contract in &declaration.contracts {
            if let Some(contract) = recover(self.build_contract(contract, scope))? {
                self.context.function_mut(id).contracts.push(contract);
            }
        }

        for statement in declaration.body.iter().flatten() {
            if let Some(statement) = recover(self.build_statement(id, statement, scope))? {
                self.context.function_mut(id).statements.push(statement);
            }
        }
        Ok(())
    }

    fn build_contract(
        &mut self,
        declaration: &ast::ContractDeclaration,
        scope: Scope,
    ) -> BuildResult<Contract> {
        let scope = scope.in_contract(declaration.kind);
        let expression = self.build_expression(&declaration.expression, scope)?;
        if declaration.kind == ContractKind::Assigns && !matches!(expression, Expression::Access(_)) {
            return Err(self.report(
                DiagnosticKind::InvalidAccess,
                "an assigns contract must name the location it modifies",
                declaration.expression.span,
            ));
        }
        Ok(Contract {
            name: declaration.name.as_ref().map(|name| name.name.clone()),
            kind: declaration.kind,
            expression,
            span: declaration.span,
        })
    }

    fn build_statement(
        &mut self,
        function: FunctionId,
        statement: &ast::Statement,
        scope: Scope,
    ) -> BuildResult<Statement> {
        match statement {
            ast::Statement::Assignment(assignment) => match (&assignment.value, &assignment.constructor) {
                (Some(value), None) => {
                    let target = self.resolve_access(&assignment.target, scope)?;
                    let value = self.build_expression(value, scope)?;
                    Ok(Statement::Assignment {
                        target,
                        value: AssignmentValue::Expression(value),
                        span: assignment.span,
                    })
                }
                (None, Some(call)) => {
                    let target = self.resolve_access(&assignment.target, scope)?;
                    let call = self.build_constructor_call(call, scope)?;
                    Ok(Statement::Assignment {
                        target,
                        value: AssignmentValue::Constructor(call),
                        span: assignment.span,
                    })
                }
                _ => Err(StructuralError::new(
                    "assignment needs exactly one of a value or a constructor call",
                    assignment.span,
                )
                .into()),
            },
            ast::Statement::Action(action) => {
                let arguments = action
                    .arguments
                    .iter()
                    .map(|argument| self.build_expression(argument, scope))
                    .collect::<BuildResult<Vec<_>>>()?;
                Ok(Statement::Action {
                    name: action.name.name.clone(),
                    arguments,
                    span: action.span,
                })
            }
            ast::Statement::Variable(declaration) => self.declare_local(function, declaration, scope),
        }
    }

    fn declare_local(
        &mut self,
        function: FunctionId,
        declaration: &ast::VariableDeclaration,
        scope: Scope,
    ) -> BuildResult<Statement> {
        let name = &declaration.name.name;
        if self.context.function(function).argument(name).is_some() {
            let owner = self.context.function(function).display_name();
            return Err(self.report(
                DiagnosticKind::DuplicateDeclaration,
                format!("local variable '{name}' shadows an argument of '{owner}'"),
                declaration.name.span,
            ));
        }
        let ty = self.resolve_type_expression(&declaration.ty)?;
        let initial_value = declaration
            .initializer
            .as_ref()
            .map(|value| self.build_expression(value, scope))
            .transpose()?;
        let variable = Variable {
            name: name.clone(),
            ty,
            scope: VariableScope::FunctionLocal(function),
            initial_value,
            span: declaration.name.span,
        };
        if let Err(err) = self.context.register_variable(variable.clone()) {
            return Err(self.report_registration(err, declaration.name.span));
        }
        Ok(Statement::Declaration(variable))
    }

    fn build_constructor_call(
        &mut self,
        call: &ast::ConstructorCall,
        scope: Scope,
    ) -> BuildResult<ConstructorCall> {
        let Some(automaton) = self.context.resolve_automaton(&call.automaton.name) else {
            return Err(self.report(
                DiagnosticKind::UnresolvedAutomaton,
                format!("unresolved automaton '{}'", call.automaton.name),
                call.automaton.span,
            ));
        };
        let automaton_name = call.automaton.name.as_str();

        let mut state = None;
        let mut arguments: Vec<ConstructorArgument> = Vec::new();
        for argument in &call.arguments {
            let keyword = &argument.name;
            if keyword.name == STATE_ARGUMENT {
                if state.is_some() {
                    return Err(self.report(
                        DiagnosticKind::InvalidConstructorCall,
                        format!("constructor call of '{automaton_name}' sets '{STATE_ARGUMENT}' twice"),
                        keyword.span,
                    ));
                }
                state = Some(self.constructor_state(automaton, &argument.value)?);
                continue;
            }

            let known = self
                .context
                .automaton(automaton)
                .constructor_variables
                .contains_key(&keyword.name);
            if !known {
                return Err(self.report(
                    DiagnosticKind::InvalidConstructorCall,
                    format!(
                        "automaton '{automaton_name}' has no constructor variable '{}'",
                        keyword.name
                    ),
                    keyword.span,
                ));
            }
            if arguments.iter().any(|bound| bound.variable == keyword.name) {
                return Err(self.report(
                    DiagnosticKind::InvalidConstructorCall,
                    format!(
                        "constructor variable '{}' of '{automaton_name}' is bound twice",
                        keyword.name
                    ),
                    keyword.span,
                ));
            }
            let value = self.build_expression(&argument.value, scope)?;
            arguments.push(ConstructorArgument {
                variable: keyword.name.clone(),
                value,
            });
        }

        let Some(state) = state else {
            return Err(self.report(
                DiagnosticKind::InvalidConstructorCall,
                format!("constructor call of '{automaton_name}' must set '{STATE_ARGUMENT}'"),
                call.span,
            ));
        };
        Ok(ConstructorCall {
            automaton,
            state,
            arguments,
        })
    }

    /// The `state` keyword takes a bare state name of the called automaton.
    fn constructor_state(&mut self, automaton: AutomatonId, value: &ast::Expression) -> BuildResult<String> {
        let state: Option<&Identifier> = match &value.kind {
            ast::ExpressionKind::Access(chain) => match chain.segments.as_slice() {
                [ast::AccessSegment::Name(name)] => Some(name),
                _ => None,
            },
            _ => None,
        };
        match state {
            Some(state) => self.declared_state(automaton, state),
            None => Err(self.report(
                DiagnosticKind::InvalidConstructorCall,
                format!("'{STATE_ARGUMENT}' must name a state"),
                value.span,
            )),
        }
    }
}
