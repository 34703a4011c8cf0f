//! The resolved semantic graph.
//!
//! Automata and functions live in the [`SymbolContext`] arenas and are
//! referred to by id everywhere else, so an automaton that is still being
//! filled in can already be pointed at by its functions and shifts.

use indexmap::IndexMap;

use crate::ast::{ContractKind, FunctionKind, Literal, SourceSpan, StateKind};
use crate::context::SymbolContext;
use crate::reference::{AnnotationReference, AutomatonReference, TypeReference};

/// Reserved name of the variable holding a function's return value.
pub const RESULT_VARIABLE: &str = "result";

/// Built-in parameter annotation that retargets a function to another automaton.
pub const TARGET_ANNOTATION: &str = "target";

pub const ANY_STATE: &str = "any";
pub const SELF_STATE: &str = "self";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutomatonId(pub(crate) usize);

impl AutomatonId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryMetadata {
    pub name: String,
    pub lsl_version: Option<String>,
    pub library_version: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug)]
pub struct Library {
    pub metadata: LibraryMetadata,
    pub imports: Vec<String>,
    pub includes: Vec<String>,
    pub context: SymbolContext,
}

impl Library {
    pub fn automaton(&self, name: &str) -> Option<&Automaton> {
        self.context
            .resolve_automaton(name)
            .map(|id| self.context.automaton(id))
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        self.context.function(id)
    }

    /// Every function of `automaton` named `name`, in registration order.
    pub fn functions_named<'a>(
        &'a self,
        automaton: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Function> + 'a {
        self.context.functions().filter(move |function| {
            function.automaton.name() == automaton && function.name.as_deref() == Some(name)
        })
    }
}

#[derive(Debug)]
pub struct Automaton {
    pub id: AutomatonId,
    pub name: String,
    pub ty: TypeReference,
    pub span: SourceSpan,
    pub states: IndexMap<String, State>,
    pub shifts: Vec<Shift>,
    pub functions: Vec<FunctionId>,
    pub constructors: Vec<FunctionId>,
    pub destructors: Vec<FunctionId>,
    pub procedures: Vec<FunctionId>,
    pub variables: IndexMap<String, Variable>,
    pub constructor_variables: IndexMap<String, Variable>,
}

impl Automaton {
    pub(crate) fn skeleton(
        id: AutomatonId,
        name: String,
        ty: TypeReference,
        span: SourceSpan,
    ) -> Self {
        Self {
            id,
            name,
            ty,
            span,
            states: IndexMap::new(),
            shifts: Vec::new(),
            functions: Vec::new(),
            constructors: Vec::new(),
            destructors: Vec::new(),
            procedures: Vec::new(),
            variables: IndexMap::new(),
            constructor_variables: IndexMap::new(),
        }
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// Instance variables shadow constructor variables of the same name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables
            .get(name)
            .or_else(|| self.constructor_variables.get(name))
    }

    pub fn operations(&self, kind: FunctionKind) -> &[FunctionId] {
        match kind {
            FunctionKind::Function => &self.functions,
            FunctionKind::Constructor => &self.constructors,
            FunctionKind::Destructor => &self.destructors,
            FunctionKind::Procedure => &self.procedures,
        }
    }

    pub(crate) fn operations_mut(&mut self, kind: FunctionKind) -> &mut Vec<FunctionId> {
        match kind {
            FunctionKind::Function => &mut self.functions,
            FunctionKind::Constructor => &mut self.constructors,
            FunctionKind::Destructor => &mut self.destructors,
            FunctionKind::Procedure => &mut self.procedures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    pub kind: StateKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShiftEndpoint {
    /// Source wildcard matching every declared state.
    Any,
    /// Target meaning "stay in the current state".
    SelfLoop,
    State(String),
}

impl ShiftEndpoint {
    pub fn describe(&self) -> &str {
        match self {
            ShiftEndpoint::Any => ANY_STATE,
            ShiftEndpoint::SelfLoop => SELF_STATE,
            ShiftEndpoint::State(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub from: ShiftEndpoint,
    pub to: ShiftEndpoint,
    pub functions: Vec<FunctionId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub kind: FunctionKind,
    pub name: Option<String>,
    pub automaton: AutomatonReference,
    /// Automaton the function dispatches on; differs from `automaton` when an
    /// argument carries the `target` annotation.
    pub target_automaton: AutomatonReference,
    pub arguments: Vec<FunctionArgument>,
    pub return_type: Option<TypeReference>,
    pub annotations: Vec<AnnotationUsage>,
    pub contracts: Vec<Contract>,
    pub statements: Vec<Statement>,
    pub locals: IndexMap<String, Variable>,
    pub has_body: bool,
    pub span: SourceSpan,
}

impl Function {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{}.{}", self.automaton.name(), name),
            None => format!("{}.<{}>", self.automaton.name(), self.kind.describe()),
        }
    }

    pub fn argument_types(&self) -> Vec<TypeReference> {
        self.arguments
            .iter()
            .map(|argument| argument.ty.clone())
            .collect()
    }

    pub fn argument(&self, name: &str) -> Option<&FunctionArgument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub fn result_variable(&self) -> Option<&Variable> {
        self.locals
            .get(RESULT_VARIABLE)
            .filter(|variable| matches!(variable.scope, VariableScope::Result(_)))
    }

    pub fn is_retargeted(&self) -> bool {
        self.automaton != self.target_automaton
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArgument {
    pub name: String,
    pub ty: TypeReference,
    pub index: usize,
    pub annotations: Vec<AnnotationUsage>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub parameters: Vec<AnnotationParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationParameter {
    pub name: String,
    pub ty: TypeReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUsage {
    pub annotation: AnnotationReference,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableScope {
    Global,
    AutomatonInstance(AutomatonId),
    ConstructorParameter(AutomatonId),
    FunctionArgument(FunctionId),
    FunctionLocal(FunctionId),
    Result(FunctionId),
}

impl VariableScope {
    pub fn describe(self) -> &'static str {
        match self {
            VariableScope::Global => "global",
            VariableScope::AutomatonInstance(_) => "automaton",
            VariableScope::ConstructorParameter(_) => "constructor parameter",
            VariableScope::FunctionArgument(_) => "function argument",
            VariableScope::FunctionLocal(_) => "function local",
            VariableScope::Result(_) => "result",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: TypeReference,
    pub scope: VariableScope,
    pub initial_value: Option<Expression>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: Option<String>,
    pub kind: ContractKind,
    pub expression: Expression,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Invert,
}

impl UnaryOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "-" => Some(UnaryOperator::Negate),
            "!" => Some(UnaryOperator::Invert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

const BINARY_OPERATORS: &[(&str, BinaryOperator)] = &[
    ("+", BinaryOperator::Add),
    ("-", BinaryOperator::Subtract),
    ("*", BinaryOperator::Multiply),
    ("/", BinaryOperator::Divide),
    ("%", BinaryOperator::Modulo),
    ("==", BinaryOperator::Equal),
    ("!=", BinaryOperator::NotEqual),
    ("<", BinaryOperator::Less),
    ("<=", BinaryOperator::LessEqual),
    (">", BinaryOperator::Greater),
    (">=", BinaryOperator::GreaterEqual),
    ("&&", BinaryOperator::And),
    ("||", BinaryOperator::Or),
];

impl BinaryOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        BINARY_OPERATORS
            .iter()
            .find(|(text, _)| *text == token)
            .map(|(_, operator)| *operator)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Access(QualifiedAccess),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Value of the access at operation entry; only built inside `ensures`.
    OldValue(QualifiedAccess),
}

/// One link of a resolved access chain. Links own their successor.
#[derive(Debug, Clone, PartialEq)]
pub enum QualifiedAccess {
    Variable {
        name: String,
        ty: TypeReference,
        /// Set on the head of a chain; field links have no variable.
        variable: Option<VariableScope>,
        child: Option<Box<QualifiedAccess>>,
    },
    Array {
        index: Box<Expression>,
        element_type: TypeReference,
        child: Option<Box<QualifiedAccess>>,
    },
    AutomatonGetter {
        automaton: AutomatonId,
        argument: String,
        ty: TypeReference,
        child: Option<Box<QualifiedAccess>>,
    },
}

impl QualifiedAccess {
    pub fn ty(&self) -> &TypeReference {
        match self {
            QualifiedAccess::Variable { ty, .. } => ty,
            QualifiedAccess::Array { element_type, .. } => element_type,
            QualifiedAccess::AutomatonGetter { ty, .. } => ty,
        }
    }

    pub fn child(&self) -> Option<&QualifiedAccess> {
        match self {
            QualifiedAccess::Variable { child, .. }
            | QualifiedAccess::Array { child, .. }
            | QualifiedAccess::AutomatonGetter { child, .. } => child.as_deref(),
        }
    }

    pub fn terminal(&self) -> &QualifiedAccess {
        let mut current = self;
        while let Some(next) = current.child() {
            current = next;
        }
        current
    }

    pub fn depth(&self) -> usize {
        1 + self.child().map_or(0, QualifiedAccess::depth)
    }

    /// Dotted rendering such as `p.items[].x`; index expressions are elided and
    /// a getter head renders as `(argument)`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        let mut current = Some(self);
        while let Some(link) = current {
            match link {
                QualifiedAccess::Variable { name, .. } => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(name);
                }
                QualifiedAccess::Array { .. } => path.push_str("[]"),
                QualifiedAccess::AutomatonGetter { argument, .. } => {
                    path.push_str(&format!("({argument})"));
                }
            }
            current = link.child();
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment {
        target: QualifiedAccess,
        value: AssignmentValue,
        span: SourceSpan,
    },
    Action {
        name: String,
        arguments: Vec<Expression>,
        span: SourceSpan,
    },
    Declaration(Variable),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentValue {
    Expression(Expression),
    Constructor(ConstructorCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorCall {
    pub automaton: AutomatonId,
    pub state: String,
    pub arguments: Vec<ConstructorArgument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgument {
    pub variable: String,
    pub value: Expression,
}
