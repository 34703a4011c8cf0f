use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::SourceSpan;
use crate::asg::{
    Annotation, Automaton, AutomatonId, Function, FunctionId, Variable, VariableScope,
    TARGET_ANNOTATION,
};
use crate::error::RegistrationError;
use crate::reference::TypeReference;
use crate::types::{Type, TypeRegistry};

/// Outcome of looking a function up by name, owner and argument types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionLookup {
    Found(FunctionId),
    NotFound,
    Ambiguous(Vec<FunctionId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRegistration {
    New(FunctionId),
    /// A body-less forward declaration was completed by a definition.
    Completed(FunctionId),
}

impl FunctionRegistration {
    pub fn id(self) -> FunctionId {
        match self {
            FunctionRegistration::New(id) | FunctionRegistration::Completed(id) => id,
        }
    }
}

/// Every named entity of one analysis run.
///
/// Automata and functions are owned here; the rest of the graph refers to
/// them through [`AutomatonId`]/[`FunctionId`] or by name.
#[derive(Debug)]
pub struct SymbolContext {
    types: TypeRegistry,
    automata: Vec<Automaton>,
    automaton_names: IndexMap<String, AutomatonId>,
    functions: Vec<Function>,
    function_names: HashMap<(String, String), Vec<FunctionId>>,
    globals: IndexMap<String, Variable>,
    annotations: IndexMap<String, Annotation>,
}

impl Default for SymbolContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolContext {
    pub fn new() -> Self {
        let mut context = Self {
            types: TypeRegistry::new(),
            automata: Vec::new(),
            automaton_names: IndexMap::new(),
            functions: Vec::new(),
            function_names: HashMap::new(),
            globals: IndexMap::new(),
            annotations: IndexMap::new(),
        };
        context.register_builtin_annotations();
        context
    }

    fn register_builtin_annotations(&mut self) {
        self.annotations.insert(
            TARGET_ANNOTATION.to_string(),
            Annotation {
                name: TARGET_ANNOTATION.to_string(),
                parameters: Vec::new(),
            },
        );
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type(&mut self, ty: Type) -> Result<TypeReference, RegistrationError> {
        let reference = ty.reference();
        if !self.types.insert(ty) {
            return Err(RegistrationError::Duplicate {
                kind: "type",
                name: reference.name().to_string(),
            });
        }
        tracing::trace!(ty = %reference.name(), "type registered");
        Ok(reference)
    }

    pub fn resolve_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn intern_array(&mut self, element: TypeReference) -> TypeReference {
        self.types.intern_array(element)
    }

    pub fn register_automaton(
        &mut self,
        name: &str,
        ty: TypeReference,
        span: SourceSpan,
    ) -> Result<AutomatonId, RegistrationError> {
        if self.automaton_names.contains_key(name) {
            return Err(RegistrationError::Duplicate {
                kind: "automaton",
                name: name.to_string(),
            });
        }
        let id = AutomatonId(self.automata.len());
        self.automata
            .push(Automaton::skeleton(id, name.to_string(), ty, span));
        self.automaton_names.insert(name.to_string(), id);
        tracing::trace!(automaton = %name, "automaton skeleton registered");
        Ok(id)
    }

    pub fn resolve_automaton(&self, name: &str) -> Option<AutomatonId> {
        self.automaton_names.get(name).copied()
    }

    pub fn automaton(&self, id: AutomatonId) -> &Automaton {
        &self.automata[id.0]
    }

    pub fn automaton_mut(&mut self, id: AutomatonId) -> &mut Automaton {
        &mut self.automata[id.0]
    }

    pub fn automata(&self) -> impl Iterator<Item = &Automaton> {
        self.automata.iter()
    }

    /// Registers `function` under its owning automaton.
    ///
    /// The overload key is (kind, name, owner, argument type names). A second
    /// declaration with the same key is only accepted when it supplies the
    /// body the first one lacked; the existing entry is then completed.
    pub fn register_function(
        &mut self,
        mut function: Function,
    ) -> Result<FunctionRegistration, RegistrationError> {
        let owner = function.automaton.name().to_string();
        let owner_id = self
            .resolve_automaton(&owner)
            .ok_or_else(|| RegistrationError::UnknownAutomaton {
                name: owner.clone(),
            })?;
        let argument_types = function.argument_types();

        let existing = self
            .automaton(owner_id)
            .operations(function.kind)
            .iter()
            .copied()
            .find(|id| {
                let candidate = self.function(*id);
                candidate.name == function.name && candidate.argument_types() == argument_types
            });

        if let Some(existing_id) = existing {
            let candidate = &mut self.functions[existing_id.0];
            if !candidate.has_body && function.has_body {
                let adopt_return_type = match (&candidate.return_type, &function.return_type) {
                    (Some(declared), Some(defined)) if declared != defined => {
                        return Err(RegistrationError::SignatureMismatch {
                            name: candidate.display_name(),
                            declared: declared.name().to_string(),
                            defined: defined.name().to_string(),
                        });
                    }
                    (None, Some(_)) => true,
                    _ => false,
                };
                if adopt_return_type {
                    candidate.return_type = function.return_type.take();
                }
                if function.is_retargeted() {
                    candidate.target_automaton = function.target_automaton.clone();
                }
                // The definition's argument names are the ones its body uses.
                candidate.arguments = std::mem::take(&mut function.arguments);
                candidate.has_body = true;
                candidate.span = function.span;
                candidate.annotations.append(&mut function.annotations);
                tracing::trace!(function = %candidate.display_name(), "forward declaration completed");
                return Ok(FunctionRegistration::Completed(existing_id));
            }
            return Err(RegistrationError::Duplicate {
                kind: function.kind.describe(),
                name: candidate.display_name(),
            });
        }

        let id = FunctionId(self.functions.len());
        function.id = id;
        if let Some(name) = &function.name {
            self.function_names
                .entry((owner.clone(), name.clone()))
                .or_default()
                .push(id);
        }
        self.automaton_mut(owner_id)
            .operations_mut(function.kind)
            .push(id);
        tracing::trace!(function = %function.display_name(), "function registered");
        self.functions.push(function);
        Ok(FunctionRegistration::New(id))
    }

    /// Exact argument-type match when `argument_types` is given; otherwise the
    /// only function with that name in `automaton`.
    pub fn resolve_function(
        &self,
        name: &str,
        automaton: &str,
        argument_types: Option<&[TypeReference]>,
    ) -> FunctionLookup {
        let Some(candidates) = self
            .function_names
            .get(&(automaton.to_string(), name.to_string()))
        else {
            return FunctionLookup::NotFound;
        };

        match argument_types {
            Some(expected) => candidates
                .iter()
                .copied()
                .find(|id| self.function(*id).argument_types() == expected)
                .map_or(FunctionLookup::NotFound, FunctionLookup::Found),
            None => match candidates.as_slice() {
                [] => FunctionLookup::NotFound,
                [only] => FunctionLookup::Found(*only),
                many => FunctionLookup::Ambiguous(many.to_vec()),
            },
        }
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Stores `variable` in the collection its scope tag names. Arguments are
    /// part of their function's signature and cannot be added this way.
    pub fn register_variable(&mut self, variable: Variable) -> Result<(), RegistrationError> {
        let name = variable.name.clone();
        let scope = variable.scope;
        let slot = match scope {
            VariableScope::Global => &mut self.globals,
            VariableScope::AutomatonInstance(id) => &mut self.automata[id.0].variables,
            VariableScope::ConstructorParameter(id) => {
                &mut self.automata[id.0].constructor_variables
            }
            VariableScope::FunctionLocal(id) | VariableScope::Result(id) => {
                &mut self.functions[id.0].locals
            }
            VariableScope::FunctionArgument(_) => {
                return Err(RegistrationError::InvalidScope {
                    name,
                    scope: scope.describe(),
                })
            }
        };
        if slot.contains_key(&name) {
            return Err(RegistrationError::Duplicate {
                kind: "variable",
                name,
            });
        }
        slot.insert(name, variable);
        Ok(())
    }

    pub fn resolve_variable(&self, name: &str) -> Option<&Variable> {
        self.globals.get(name)
    }

    pub fn global_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.globals.get_mut(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = &Variable> {
        self.globals.values()
    }

    pub fn register_annotation(&mut self, annotation: Annotation) -> Result<(), RegistrationError> {
        if self.annotations.contains_key(&annotation.name) {
            return Err(RegistrationError::Duplicate {
                kind: "annotation",
                name: annotation.name,
            });
        }
        self.annotations.insert(annotation.name.clone(), annotation);
        Ok(())
    }

    pub fn resolve_annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.get(name)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FunctionKind;
    use crate::reference::AutomatonReference;

    fn context_with_automaton() -> (SymbolContext, AutomatonId) {
        let mut context = SymbolContext::new();
        context
            .register_type(Type::Simple {
                name: "Int".to_string(),
            })
            .unwrap();
        let id = context
            .register_automaton("A", TypeReference::new("Int"), SourceSpan::default())
            .unwrap();
        (context, id)
    }

    fn function(name: &str, arguments: &[&str], has_body: bool) -> Function {
        Function {
            id: FunctionId(usize::MAX),
            kind: FunctionKind::Function,
            name: Some(name.to_string()),
            automaton: AutomatonReference::new("A"),
            target_automaton: AutomatonReference::new("A"),
            arguments: arguments
                .iter()
                .enumerate()
                .map(|(index, ty)| crate::asg::FunctionArgument {
                    name: format!("arg{index}"),
                    ty: TypeReference::new(*ty),
                    index,
                    annotations: Vec::new(),
                    span: SourceSpan::default(),
                })
                .collect(),
            return_type: None,
            annotations: Vec::new(),
            contracts: Vec::new(),
            statements: Vec::new(),
            locals: IndexMap::new(),
            has_body,
            span: SourceSpan::default(),
        }
    }

    #[test]
    fn target_annotation_is_builtin() {
        let context = SymbolContext::new();
        assert!(context.resolve_annotation(TARGET_ANNOTATION).is_some());
    }

    #[test]
    fn duplicate_automaton_is_rejected() {
        let (mut context, _) = context_with_automaton();
        let err = context
            .register_automaton("A", TypeReference::new("Int"), SourceSpan::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate declaration of automaton 'A'");
    }

    #[test]
    fn forward_declaration_is_completed_in_place() {
        let (mut context, automaton) = context_with_automaton();
        let declared = context
            .register_function(function("f", &["Int"], false))
            .unwrap();
        let defined = context
            .register_function(function("f", &["Int"], true))
            .unwrap();
        assert_eq!(declared, FunctionRegistration::New(declared.id()));
        assert_eq!(defined, FunctionRegistration::Completed(declared.id()));
        assert!(context.function(declared.id()).has_body);
        assert_eq!(context.automaton(automaton).functions.len(), 1);

        let err = context
            .register_function(function("f", &["Int"], true))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate declaration of function 'A.f'"));
    }

    #[test]
    fn name_only_lookup_reports_ambiguity() {
        let (mut context, _) = context_with_automaton();
        let one = context
            .register_function(function("f", &["Int"], true))
            .unwrap()
            .id();
        let two = context
            .register_function(function("f", &["Int", "Int"], true))
            .unwrap()
            .id();

        assert_eq!(
            context.resolve_function("f", "A", None),
            FunctionLookup::Ambiguous(vec![one, two])
        );
        let ints = [TypeReference::new("Int"), TypeReference::new("Int")];
        assert_eq!(
            context.resolve_function("f", "A", Some(&ints)),
            FunctionLookup::Found(two)
        );
        assert_eq!(
            context.resolve_function("g", "A", None),
            FunctionLookup::NotFound
        );
    }

    #[test]
    fn arguments_cannot_be_registered_as_variables() {
        let (mut context, _) = context_with_automaton();
        let id = context
            .register_function(function("f", &[], true))
            .unwrap()
            .id();
        let err = context
            .register_variable(Variable {
                name: "x".to_string(),
                ty: TypeReference::new("Int"),
                scope: VariableScope::FunctionArgument(id),
                initial_value: None,
                span: SourceSpan::default(),
            })
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidScope { .. }));
    }
}
