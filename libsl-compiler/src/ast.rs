//! Syntax tree handed over by the parser.
//!
//! Every node carries enough position information to anchor a diagnostic.
//! The tree is plain data: it is never mutated by the semantic pass.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub span: SourceSpan,
}

impl Identifier {
    pub fn new<S: Into<String>>(name: S, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDeclaration {
    pub name: Identifier,
    #[serde(default)]
    pub lsl_version: Option<String>,
    #[serde(default)]
    pub library_version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Declaration {
    Type(TypeDeclaration),
    Annotation(AnnotationDeclaration),
    Variable(VariableDeclaration),
    Automaton(AutomatonDeclaration),
    Function(FunctionDeclaration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpression {
    Named(Identifier),
    Array(Box<TypeExpression>),
}

impl TypeExpression {
    pub fn span(&self) -> SourceSpan {
        match self {
            TypeExpression::Named(identifier) => identifier.span,
            TypeExpression::Array(element) => element.span(),
        }
    }

    /// Name under which the type is (or will be) stored in the registry.
    pub fn canonical_name(&self) -> String {
        match self {
            TypeExpression::Named(identifier) => identifier.name.clone(),
            TypeExpression::Array(element) => format!("{}[]", element.canonical_name()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: Identifier,
    pub kind: TypeDeclarationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDeclarationKind {
    Simple,
    Real,
    Alias {
        original: TypeExpression,
    },
    Structured {
        fields: Vec<FieldDeclaration>,
    },
    Enum {
        values: Vec<EnumValueDeclaration>,
    },
    EnumLikeSemantic {
        underlying: Identifier,
        backing: TypeExpression,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: Identifier,
    pub ty: TypeExpression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumValueDeclaration {
    pub name: Identifier,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationDeclaration {
    pub name: Identifier,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationUsage {
    pub name: Identifier,
    #[serde(default)]
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: Identifier,
    pub ty: TypeExpression,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: Identifier,
    pub ty: TypeExpression,
    #[serde(default)]
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    Initial,
    Simple,
    Finish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDeclaration {
    pub name: Identifier,
    pub kind: StateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomatonDeclaration {
    pub name: Identifier,
    pub ty: TypeExpression,
    #[serde(default)]
    pub constructor_variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub states: Vec<StateDeclaration>,
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub shifts: Vec<ShiftDeclaration>,
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
    #[serde(default)]
    pub span: SourceSpan,
}

/// `a, b -> c (f, g(Int))`. The target is optional only because the parser
/// may hand over an incomplete node; the semantic pass rejects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftDeclaration {
    pub sources: Vec<Identifier>,
    #[serde(default)]
    pub target: Option<Identifier>,
    #[serde(default)]
    pub functions: Vec<ShiftFunction>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftFunction {
    pub name: Identifier,
    #[serde(default)]
    pub argument_types: Option<Vec<TypeExpression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Constructor,
    Destructor,
    Procedure,
}

impl FunctionKind {
    pub fn describe(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Constructor => "constructor",
            FunctionKind::Destructor => "destructor",
            FunctionKind::Procedure => "procedure",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub kind: FunctionKind,
    #[serde(default)]
    pub automaton: Option<Identifier>,
    #[serde(default)]
    pub name: Option<Identifier>,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default)]
    pub return_type: Option<TypeExpression>,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
    #[serde(default)]
    pub contracts: Vec<ContractDeclaration>,
    #[serde(default)]
    pub body: Option<Vec<Statement>>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    Requires,
    Ensures,
    Assigns,
}

impl ContractKind {
    pub fn describe(self) -> &'static str {
        match self {
            ContractKind::Requires => "requires",
            ContractKind::Ensures => "ensures",
            ContractKind::Assigns => "assigns",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDeclaration {
    #[serde(default)]
    pub name: Option<Identifier>,
    pub kind: ContractKind,
    pub expression: Expression,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Assignment(AssignmentStatement),
    Action(ActionStatement),
    Variable(VariableDeclaration),
}

/// Exactly one of `value` and `constructor` is expected to be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentStatement {
    pub target: AccessChain,
    #[serde(default)]
    pub value: Option<Expression>,
    #[serde(default)]
    pub constructor: Option<ConstructorCall>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorCall {
    pub automaton: Identifier,
    #[serde(default)]
    pub arguments: Vec<NamedArgument>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedArgument {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStatement {
    pub name: Identifier,
    #[serde(default)]
    pub arguments: Vec<Expression>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    #[serde(default)]
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

impl Expression {
    pub fn new(span: SourceSpan, kind: ExpressionKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),
    Access(AccessChain),
    /// `'a.b`, the value of the access when the operation was entered.
    OldValue(AccessChain),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Grouping(Box<Expression>),
}

/// Operators are kept as token text; the semantic pass maps them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub operator: String,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operator: String,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessChain {
    pub segments: Vec<AccessSegment>,
    #[serde(default)]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccessSegment {
    Name(Identifier),
    Index(Expression),
    /// `Automaton(argument)`; only valid as the first segment.
    AutomatonGetter {
        automaton: Identifier,
        argument: Identifier,
    },
}
