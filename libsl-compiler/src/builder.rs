use std::collections::HashSet;

use crate::ast::{self, ContractKind, SourceSpan};
use crate::asg::{Annotation, AnnotationParameter, AutomatonId, FunctionId, Variable, VariableScope};
use crate::compiler::CompileOptions;
use crate::context::{FunctionRegistration, SymbolContext};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{recover, Abort, BuildResult, RegistrationError, StructuralError};
use crate::reference::TypeReference;
use crate::types::{AliasError, Type};

/// Where names are looked up while an expression is built.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Scope {
    pub(crate) automaton: Option<AutomatonId>,
    pub(crate) target: Option<AutomatonId>,
    pub(crate) function: Option<FunctionId>,
    pub(crate) contract: Option<ContractKind>,
}

impl Scope {
    pub(crate) fn global() -> Self {
        Self::default()
    }

    pub(crate) fn automaton(id: AutomatonId) -> Self {
        Self {
            automaton: Some(id),
            ..Self::default()
        }
    }

    pub(crate) fn function(
        owner: Option<AutomatonId>,
        target: Option<AutomatonId>,
        function: FunctionId,
    ) -> Self {
        Self {
            automaton: owner,
            target,
            function: Some(function),
            contract: None,
        }
    }

    pub(crate) fn in_contract(self, kind: ContractKind) -> Self {
        Self {
            contract: Some(kind),
            ..self
        }
    }

    pub(crate) fn allows_old_values(&self) -> bool {
        self.contract == Some(ContractKind::Ensures)
    }

    pub(crate) fn allows_result(&self) -> bool {
        matches!(self.contract, None | Some(ContractKind::Ensures))
    }

    /// Owner first, then the dispatch target when it differs.
    pub(crate) fn automata(&self) -> impl Iterator<Item = AutomatonId> {
        let owner = self.automaton;
        self.automaton
            .into_iter()
            .chain(self.target.filter(move |target| Some(*target) != owner))
    }
}

struct RegisteredAutomaton<'d> {
    id: AutomatonId,
    declaration: &'d ast::AutomatonDeclaration,
    initializers: Vec<(&'d ast::VariableDeclaration, VariableScope)>,
}

/// Turns a library syntax tree into the semantic graph stored in `context`.
///
/// Phases run in a fixed order: types, annotations and globals, automaton
/// skeletons, function signatures, then elaboration of everything that can
/// mention other declarations.
pub(crate) struct AsgBuilder<'a> {
    pub(crate) context: &'a mut SymbolContext,
    pub(crate) diagnostics: &'a mut Diagnostics,
    pub(crate) options: &'a CompileOptions,
    /// First malformed node seen; reported after every declaration was tried.
    structural: Option<StructuralError>,
}

impl<'a> AsgBuilder<'a> {
    pub(crate) fn new(
        context: &'a mut SymbolContext,
        diagnostics: &'a mut Diagnostics,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            context,
            diagnostics,
            options,
            structural: None,
        }
    }

    pub(crate) fn build(&mut self, library: &ast::LibraryDeclaration) -> Result<(), StructuralError> {
        let _span = tracing::debug_span!("build", library = %library.name.name).entered();
        let declarations = &library.declarations;

        self.register_types(declarations);
        self.register_annotations(declarations);
        let globals = self.register_globals(declarations);
        let automata = self.register_automata(declarations);
        let signatures = self.register_signatures(declarations, &automata);
        tracing::debug!(
            automata = automata.len(),
            functions = signatures.len(),
            "signature pass finished"
        );

        for declaration in globals {
            let result = self.elaborate_global(declaration);
            self.settle(result);
        }
        for automaton in &automata {
            self.elaborate_automaton(automaton);
        }
        for (id, declaration) in &signatures {
            let result = self.elaborate_function(*id, declaration);
            self.settle(result);
        }
        tracing::debug!(
            errors = self.diagnostics.error_count(),
            "elaboration pass finished"
        );
        match self.structural.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Records a malformed node and moves on to the next declaration.
    fn settle<T>(&mut self, result: Result<T, StructuralError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(error = %error, "declaration abandoned");
                self.diagnostics.push_error(
                    DiagnosticKind::MalformedTree,
                    error.message.clone(),
                    Some(error.span),
                );
                self.structural.get_or_insert(error);
                None
            }
        }
    }

    pub(crate) fn report<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        span: SourceSpan,
    ) -> Abort {
        self.diagnostics.push_error(kind, message, Some(span));
        Abort::Reported
    }

    pub(crate) fn warn<S: Into<String>>(&mut self, kind: DiagnosticKind, message: S, span: SourceSpan) {
        self.diagnostics.push_warning(kind, message, Some(span));
    }

    pub(crate) fn report_registration(&mut self, error: RegistrationError, span: SourceSpan) -> Abort {
        let kind = match error {
            RegistrationError::Duplicate { .. } | RegistrationError::InvalidScope { .. } => {
                DiagnosticKind::DuplicateDeclaration
            }
            RegistrationError::UnknownAutomaton { .. } => DiagnosticKind::UnresolvedAutomaton,
            RegistrationError::SignatureMismatch { .. } => DiagnosticKind::SignatureMismatch,
        };
        self.report(kind, error.to_string(), span)
    }

    pub(crate) fn resolve_type_expression(
        &mut self,
        expression: &ast::TypeExpression,
    ) -> BuildResult<TypeReference> {
        match expression {
            ast::TypeExpression::Named(identifier) => {
                if self.context.resolve_type(&identifier.name).is_some() {
                    Ok(TypeReference::new(&identifier.name))
                } else {
                    Err(self.report(
                        DiagnosticKind::UnresolvedType,
                        format!("unresolved type '{}'", identifier.name),
                        identifier.span,
                    ))
                }
            }
            ast::TypeExpression::Array(element) => {
                let element = self.resolve_type_expression(element)?;
                Ok(self.context.intern_array(element))
            }
        }
    }

    /// Reference by spelling only; used while types may still be undeclared.
    fn type_reference(&mut self, expression: &ast::TypeExpression) -> TypeReference {
        match expression {
            ast::TypeExpression::Named(identifier) => TypeReference::new(&identifier.name),
            ast::TypeExpression::Array(element) => {
                let element = self.type_reference(element);
                self.context.intern_array(element)
            }
        }
    }

    fn register_types(&mut self, declarations: &[ast::Declaration]) {
        let mut registered = Vec::new();
        for declaration in declarations {
            let ast::Declaration::Type(declaration) = declaration else {
                continue;
            };
            let ty = self.declared_type(declaration);
            match self.context.register_type(ty) {
                Ok(_) => registered.push(declaration),
                Err(err) => {
                    self.report_registration(err, declaration.name.span);
                }
            }
        }

        for declaration in registered {
            self.validate_type(declaration);
        }
        tracing::debug!(count = self.context.types().len(), "types registered");
    }

    fn declared_type(&mut self, declaration: &ast::TypeDeclaration) -> Type {
        let name = declaration.name.name.clone();
        match &declaration.kind {
            ast::TypeDeclarationKind::Simple => Type::Simple { name },
            ast::TypeDeclarationKind::Real => Type::Real { name },
            ast::TypeDeclarationKind::Alias { original } => Type::Alias {
                name,
                original: self.type_reference(original),
            },
            ast::TypeDeclarationKind::Structured { fields } => Type::Structured {
                name,
                fields: fields
                    .iter()
                    .map(|field| (field.name.name.clone(), self.type_reference(&field.ty)))
                    .collect(),
            },
            ast::TypeDeclarationKind::Enum { values } => Type::Enum {
                name,
                values: values
                    .iter()
                    .map(|value| (value.name.name.clone(), value.value))
                    .collect(),
            },
            ast::TypeDeclarationKind::EnumLikeSemantic {
                underlying,
                backing,
            } => Type::EnumLikeSemantic {
                name,
                underlying: TypeReference::new(&underlying.name),
                backing: self.type_reference(backing),
            },
        }
    }

    fn validate_type(&mut self, declaration: &ast::TypeDeclaration) {
        let name = &declaration.name.name;
        match &declaration.kind {
            ast::TypeDeclarationKind::Simple | ast::TypeDeclarationKind::Real => {}
            ast::TypeDeclarationKind::Alias { original } => {
                if self.resolve_type_expression(original).is_err() {
                    return;
                }
                let cycle = match self.context.resolve_type(name) {
                    Some(ty) => matches!(self.context.types().unaliased(ty), Err(AliasError::Cycle(_))),
                    None => false,
                };
                if cycle {
                    self.report(
                        DiagnosticKind::InvalidType,
                        format!("type alias '{name}' is cyclic"),
                        declaration.name.span,
                    );
                }
            }
            ast::TypeDeclarationKind::Structured { fields } => {
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name.name.as_str()) {
                        self.report(
                            DiagnosticKind::DuplicateDeclaration,
                            format!("duplicate field '{}' in type '{name}'", field.name.name),
                            field.name.span,
                        );
                    }
                    let _ = self.resolve_type_expression(&field.ty);
                }
            }
            ast::TypeDeclarationKind::Enum { values } => {
                let mut seen = HashSet::new();
                for value in values {
                    if !seen.insert(value.name.name.as_str()) {
                        self.report(
                            DiagnosticKind::DuplicateDeclaration,
                            format!("duplicate member '{}' in enum '{name}'", value.name.name),
                            value.name.span,
                        );
                    }
                }
            }
            ast::TypeDeclarationKind::EnumLikeSemantic {
                underlying,
                backing,
            } => {
                let is_enum = matches!(
                    self.context.resolve_type(&underlying.name),
                    Some(Type::Enum { .. })
                );
                if !is_enum {
                    self.report(
                        DiagnosticKind::InvalidType,
                        format!(
                            "type '{name}' is based on '{}', which is not an enum",
                            underlying.name
                        ),
                        underlying.span,
                    );
                }
                let _ = self.resolve_type_expression(backing);
            }
        }
    }

    fn register_annotations(&mut self, declarations: &[ast::Declaration]) {
        for declaration in declarations {
            let ast::Declaration::Annotation(declaration) = declaration else {
                continue;
            };
            let parameters: BuildResult<Vec<_>> = declaration
                .parameters
                .iter()
                .map(|parameter| {
                    Ok(AnnotationParameter {
                        name: parameter.name.name.clone(),
                        ty: self.resolve_type_expression(&parameter.ty)?,
                    })
                })
                .collect();
            let Ok(parameters) = parameters else {
                continue;
            };
            let annotation = Annotation {
                name: declaration.name.name.clone(),
                parameters,
            };
            if let Err(err) = self.context.register_annotation(annotation) {
                self.report_registration(err, declaration.name.span);
            }
        }
    }

    fn register_globals<'d>(
        &mut self,
        declarations: &'d [ast::Declaration],
    ) -> Vec<&'d ast::VariableDeclaration> {
        let mut registered = Vec::new();
        for declaration in declarations {
            let ast::Declaration::Variable(declaration) = declaration else {
                continue;
            };
            if self.register_variable(declaration, VariableScope::Global) {
                registered.push(declaration);
            }
        }
        registered
    }

    /// Registers a variable without its initializer, which is elaborated later.
    fn register_variable(
        &mut self,
        declaration: &ast::VariableDeclaration,
        scope: VariableScope,
    ) -> bool {
        let Ok(ty) = self.resolve_type_expression(&declaration.ty) else {
            return false;
        };
        let variable = Variable {
            name: declaration.name.name.clone(),
            ty,
            scope,
            initial_value: None,
            span: declaration.name.span,
        };
        match self.context.register_variable(variable) {
            Ok(()) => true,
            Err(err) => {
                self.report_registration(err, declaration.name.span);
                false
            }
        }
    }

    fn register_automata<'d>(
        &mut self,
        declarations: &'d [ast::Declaration],
    ) -> Vec<RegisteredAutomaton<'d>> {
        let mut registered = Vec::new();
        for declaration in declarations {
            let ast::Declaration::Automaton(declaration) = declaration else {
                continue;
            };
            // Keep the skeleton even when its type is unknown so that other
            // declarations can still refer to the automaton by name.
            let ty = match self.resolve_type_expression(&declaration.ty) {
                Ok(ty) => ty,
                Err(_) => TypeReference::new(declaration.ty.canonical_name()),
            };
            let id = match self.context.register_automaton(
                &declaration.name.name,
                ty,
                declaration.span,
            ) {
                Ok(id) => id,
                Err(err) => {
                    self.report_registration(err, declaration.name.span);
                    continue;
                }
            };
            self.register_states(id, declaration);

            let mut initializers = Vec::new();
            let members = declaration
                .constructor_variables
                .iter()
                .map(|variable| (variable, VariableScope::ConstructorParameter(id)))
                .chain(
                    declaration
                        .variables
                        .iter()
                        .map(|variable| (variable, VariableScope::AutomatonInstance(id))),
                );
            for (variable, scope) in members {
                if self.register_variable(variable, scope) && variable.initializer.is_some() {
                    initializers.push((variable, scope));
                }
            }

            registered.push(RegisteredAutomaton {
                id,
                declaration,
                initializers,
            });
        }
        registered
    }

    /// One entry per registered function. When a definition completes a
    /// forward declaration, the definition replaces the declaration's entry.
    fn register_signatures<'d>(
        &mut self,
        declarations: &'d [ast::Declaration],
        automata: &[RegisteredAutomaton<'d>],
    ) -> Vec<(FunctionId, &'d ast::FunctionDeclaration)> {
        let nested = automata.iter().flat_map(|automaton| {
            automaton
                .declaration
                .functions
                .iter()
                .map(move |function| (function, Some(automaton.id)))
        });
        let top_level = declarations.iter().filter_map(|declaration| match declaration {
            ast::Declaration::Function(function) => Some((function, None)),
            _ => None,
        });

        let mut signatures: Vec<(FunctionId, &'d ast::FunctionDeclaration)> = Vec::new();
        for (function, enclosing) in nested.chain(top_level) {
            let result = recover(self.register_signature(function, enclosing));
            let Some(registration) = self.settle(result).flatten() else {
                continue;
            };
            match registration {
                FunctionRegistration::New(id) => signatures.push((id, function)),
                FunctionRegistration::Completed(id) => {
                    match signatures.iter_mut().find(|(existing, _)| *existing == id) {
                        Some(entry) => entry.1 = function,
                        None => signatures.push((id, function)),
                    }
                }
            }
        }
        signatures
    }

    fn elaborate_global(&mut self, declaration: &ast::VariableDeclaration) -> Result<(), StructuralError> {
        let Some(initializer) = &declaration.initializer else {
            return Ok(());
        };
        if let Some(value) = recover(self.build_expression(initializer, Scope::global()))? {
            if let Some(variable) = self.context.global_mut(&declaration.name.name) {
                variable.initial_value = Some(value);
            }
        }
        Ok(())
    }

    /// Variable initializers and shifts are separate declarations: a
    /// malformed one does not stop the others.
    fn elaborate_automaton(&mut self, automaton: &RegisteredAutomaton<'_>) {
        let scope = Scope::automaton(automaton.id);
        for (declaration, variable_scope) in &automaton.initializers {
            let Some(initializer) = &declaration.initializer else {
                continue;
            };
            let result = recover(self.build_expression(initializer, scope));
            let Some(value) = self.settle(result).flatten() else {
                continue;
            };
            let owner = self.context.automaton_mut(automaton.id);
            let slot = match variable_scope {
                VariableScope::ConstructorParameter(_) => &mut owner.constructor_variables,
                _ => &mut owner.variables,
            };
            if let Some(variable) = slot.get_mut(&declaration.name.name) {
                variable.initial_value = Some(value);
            }
        }

        for shift in &automaton.declaration.shifts {
            let result = self.elaborate_shift(automaton.id, shift);
            self.settle(result);
        }
    }
}
