#![allow(dead_code)]

use libsl_compiler::syntax::{
    AccessChain, AccessSegment, AssignmentStatement, AutomatonDeclaration, BinaryExpression,
    ConstructorCall, ContractDeclaration, ContractKind, Declaration, EnumValueDeclaration,
    Expression, ExpressionKind, FieldDeclaration, FunctionDeclaration, FunctionKind, Identifier,
    LibraryDeclaration, Literal, NamedArgument, ParameterDeclaration, ShiftDeclaration,
    ShiftFunction, SourceSpan, StateDeclaration, StateKind, Statement, TypeDeclaration,
    TypeDeclarationKind, TypeExpression, VariableDeclaration,
};
use libsl_compiler::{
    CompileOptions, Compiler, Diagnostic, DiagnosticKind, DiagnosticLevel, Library,
};

pub fn ident(name: &str) -> Identifier {
    Identifier::new(name, SourceSpan::default())
}

pub fn ident_at(name: &str, line: usize) -> Identifier {
    Identifier::new(name, SourceSpan::single_point(line, 1))
}

pub fn named(ty: &str) -> TypeExpression {
    TypeExpression::Named(ident(ty))
}

pub fn array_of(ty: TypeExpression) -> TypeExpression {
    TypeExpression::Array(Box::new(ty))
}

pub fn library(declarations: Vec<Declaration>) -> LibraryDeclaration {
    LibraryDeclaration {
        name: ident("test"),
        lsl_version: Some("1.0.0".to_string()),
        library_version: Some("1.0".to_string()),
        language: Some("java".to_string()),
        url: None,
        imports: Vec::new(),
        includes: Vec::new(),
        declarations,
    }
}

/// `Int` and `Bool` as simple types; nothing is built in.
pub fn base_types() -> Vec<Declaration> {
    vec![simple_type("Int"), simple_type("Bool")]
}

pub fn simple_type(name: &str) -> Declaration {
    type_declaration(name, TypeDeclarationKind::Simple)
}

pub fn real_type(name: &str) -> Declaration {
    type_declaration(name, TypeDeclarationKind::Real)
}

pub fn alias(name: &str, original: TypeExpression) -> Declaration {
    type_declaration(name, TypeDeclarationKind::Alias { original })
}

pub fn structured(name: &str, fields: &[(&str, &str)]) -> Declaration {
    let fields = fields
        .iter()
        .map(|(field, ty)| FieldDeclaration {
            name: ident(field),
            ty: named(ty),
        })
        .collect();
    type_declaration(name, TypeDeclarationKind::Structured { fields })
}

pub fn enumeration(name: &str, members: &[&str]) -> Declaration {
    let values = members
        .iter()
        .enumerate()
        .map(|(index, member)| EnumValueDeclaration {
            name: ident(member),
            value: Some(index as i64),
        })
        .collect();
    type_declaration(name, TypeDeclarationKind::Enum { values })
}

pub fn enum_like(name: &str, underlying: &str, backing: &str) -> Declaration {
    type_declaration(
        name,
        TypeDeclarationKind::EnumLikeSemantic {
            underlying: ident(underlying),
            backing: named(backing),
        },
    )
}

fn type_declaration(name: &str, kind: TypeDeclarationKind) -> Declaration {
    Declaration::Type(TypeDeclaration {
        name: ident(name),
        kind,
    })
}

pub fn variable(name: &str, ty: TypeExpression) -> VariableDeclaration {
    VariableDeclaration {
        name: ident(name),
        ty,
        initializer: None,
    }
}

pub fn global(name: &str, ty: &str) -> Declaration {
    Declaration::Variable(variable(name, named(ty)))
}

pub fn automaton(name: &str, ty: &str, states: &[&str]) -> AutomatonDeclaration {
    AutomatonDeclaration {
        name: ident(name),
        ty: named(ty),
        constructor_variables: Vec::new(),
        states: states
            .iter()
            .enumerate()
            .map(|(index, state)| StateDeclaration {
                name: ident(state),
                kind: if index == 0 {
                    StateKind::Initial
                } else {
                    StateKind::Simple
                },
            })
            .collect(),
        variables: Vec::new(),
        shifts: Vec::new(),
        functions: Vec::new(),
        span: SourceSpan::default(),
    }
}

pub fn shift(sources: &[&str], target: &str, functions: &[&str]) -> ShiftDeclaration {
    ShiftDeclaration {
        sources: sources.iter().map(|source| ident(source)).collect(),
        target: Some(ident(target)),
        functions: functions
            .iter()
            .map(|function| ShiftFunction {
                name: ident(function),
                argument_types: None,
            })
            .collect(),
        span: SourceSpan::default(),
    }
}

pub fn typed_shift_function(name: &str, argument_types: &[&str]) -> ShiftFunction {
    ShiftFunction {
        name: ident(name),
        argument_types: Some(argument_types.iter().map(|ty| named(ty)).collect()),
    }
}

pub fn parameter(name: &str, ty: &str) -> ParameterDeclaration {
    ParameterDeclaration {
        name: ident(name),
        ty: named(ty),
        annotations: Vec::new(),
    }
}

pub fn annotated(mut parameter: ParameterDeclaration, annotation: &str) -> ParameterDeclaration {
    parameter
        .annotations
        .push(libsl_compiler::syntax::AnnotationUsage {
            name: ident(annotation),
            arguments: Vec::new(),
        });
    parameter
}

/// A function with an empty body and no owner qualifier.
pub fn function(name: &str, parameters: Vec<ParameterDeclaration>) -> FunctionDeclaration {
    FunctionDeclaration {
        kind: FunctionKind::Function,
        automaton: None,
        name: Some(ident(name)),
        parameters,
        return_type: None,
        annotations: Vec::new(),
        contracts: Vec::new(),
        body: Some(Vec::new()),
        span: SourceSpan::default(),
    }
}

pub fn returning(mut function: FunctionDeclaration, ty: &str) -> FunctionDeclaration {
    function.return_type = Some(named(ty));
    function
}

pub fn qualified(mut function: FunctionDeclaration, automaton: &str) -> FunctionDeclaration {
    function.automaton = Some(ident(automaton));
    function
}

pub fn expression(kind: ExpressionKind) -> Expression {
    Expression::new(SourceSpan::default(), kind)
}

pub fn int(value: i64) -> Expression {
    expression(ExpressionKind::Literal(Literal::Integer(value)))
}

pub fn boolean(value: bool) -> Expression {
    expression(ExpressionKind::Literal(Literal::Boolean(value)))
}

pub fn chain(path: &[&str]) -> AccessChain {
    AccessChain {
        segments: path
            .iter()
            .map(|segment| AccessSegment::Name(ident(segment)))
            .collect(),
        span: SourceSpan::default(),
    }
}

pub fn access(path: &[&str]) -> Expression {
    expression(ExpressionKind::Access(chain(path)))
}

pub fn old(path: &[&str]) -> Expression {
    expression(ExpressionKind::OldValue(chain(path)))
}

pub fn binary(operator: &str, left: Expression, right: Expression) -> Expression {
    expression(ExpressionKind::Binary(BinaryExpression {
        operator: operator.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }))
}

pub fn contract(kind: ContractKind, expression: Expression) -> ContractDeclaration {
    ContractDeclaration {
        name: None,
        kind,
        expression,
        span: SourceSpan::default(),
    }
}

pub fn assign(path: &[&str], value: Expression) -> Statement {
    Statement::Assignment(AssignmentStatement {
        target: chain(path),
        value: Some(value),
        constructor: None,
        span: SourceSpan::default(),
    })
}

pub fn construct(path: &[&str], automaton: &str, arguments: Vec<(&str, Expression)>) -> Statement {
    Statement::Assignment(AssignmentStatement {
        target: chain(path),
        value: None,
        constructor: Some(ConstructorCall {
            automaton: ident(automaton),
            arguments: arguments
                .into_iter()
                .map(|(name, value)| NamedArgument {
                    name: ident(name),
                    value,
                })
                .collect(),
            span: SourceSpan::default(),
        }),
        span: SourceSpan::default(),
    })
}

pub struct Analysis {
    pub library: Library,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .collect()
    }

    pub fn errors_of(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.errors()
            .into_iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .collect()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message.as_str())
            .collect()
    }
}

pub fn analyze(declaration: &LibraryDeclaration) -> Analysis {
    analyze_with(declaration, CompileOptions::default())
}

pub fn analyze_with(declaration: &LibraryDeclaration, options: CompileOptions) -> Analysis {
    let mut compiler = Compiler::new(options);
    let library = compiler
        .analyze(declaration)
        .expect("syntax tree should be well formed");
    Analysis {
        library,
        diagnostics: compiler.diagnostics().entries().to_vec(),
    }
}
