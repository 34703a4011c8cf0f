mod common;

use common::*;
use libsl_compiler::syntax::{ContractKind, Declaration, FunctionKind, LibraryDeclaration, StateKind};
use libsl_compiler::{
    AssignmentValue, BinaryOperator, CompileOptions, Compiler, Expression, ShiftEndpoint,
    Statement, VariableScope,
};

/// Door with a constructor that starts `Closed`, an `open()` that flips it,
/// and a `reopen()` elsewhere that builds an open door and opens it again.
fn door_library() -> LibraryDeclaration {
    let mut declarations = base_types();
    declarations.push(simple_type("DoorHandle"));

    let mut door = automaton("Door", "DoorHandle", &["Closed", "Open"]);
    door.states[1].kind = StateKind::Finish;

    let mut constructor = function("init", Vec::new());
    constructor.kind = FunctionKind::Constructor;
    door.functions.push(constructor);

    let mut open = returning(function("open", Vec::new()), "Bool");
    open.contracts.push(contract(
        ContractKind::Ensures,
        binary("==", access(&["result"]), boolean(true)),
    ));
    open.body = Some(vec![assign(&["result"], boolean(true))]);
    door.functions.push(open);
    door.shifts.push(shift(&["Closed"], "Open", &["open"]));

    let mut keeper = automaton("Keeper", "Int", &["Idle"]);
    keeper.variables.push(variable("door", named("DoorHandle")));
    let mut reopen = function("reopen", Vec::new());
    reopen.body = Some(vec![
        construct(&["door"], "Door", vec![("state", access(&["Closed"]))]),
        construct(&["door"], "Door", vec![("state", access(&["Open"]))]),
        libsl_compiler::syntax::Statement::Action(libsl_compiler::syntax::ActionStatement {
            name: ident("OPEN"),
            arguments: vec![access(&["door"])],
            span: Default::default(),
        }),
    ]);
    keeper.functions.push(reopen);

    // Keeper comes first so that every mention of Door is a forward one.
    declarations.push(Declaration::Automaton(keeper));
    declarations.push(Declaration::Automaton(door));
    library(declarations)
}

#[test]
fn door_library_resolves_completely() {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler
        .compile(&door_library())
        .expect("door library should compile");
    assert!(compiler.diagnostics().is_empty());

    let library = &compilation.library;
    assert_eq!(library.metadata.name, "test");
    assert_eq!(library.metadata.library_version.as_deref(), Some("1.0"));

    let door = library.automaton("Door").expect("Door");
    assert_eq!(door.ty.name(), "DoorHandle");
    assert_eq!(door.states.len(), 2);
    assert_eq!(door.state("Open").map(|state| state.kind), Some(StateKind::Finish));
    assert_eq!(door.constructors.len(), 1);
    assert_eq!(door.functions.len(), 1);
    assert_eq!(door.shifts.len(), 1);

    let shift = &door.shifts[0];
    assert_eq!(shift.from, ShiftEndpoint::State("Closed".to_string()));
    assert_eq!(shift.to, ShiftEndpoint::State("Open".to_string()));
    assert_eq!(shift.functions, door.functions);

    let open = library.function(door.functions[0]);
    let result = open.result_variable().expect("open has a result");
    assert_eq!(result.ty.name(), "Bool");
    assert_eq!(open.contracts.len(), 1);
    assert_eq!(open.contracts[0].kind, ContractKind::Ensures);
    let Expression::Binary { operator, left, .. } = &open.contracts[0].expression else {
        panic!("expected a comparison");
    };
    assert_eq!(*operator, BinaryOperator::Equal);
    let Expression::Access(access) = left.as_ref() else {
        panic!("expected the result variable on the left");
    };
    assert!(matches!(
        access,
        libsl_compiler::QualifiedAccess::Variable {
            variable: Some(VariableScope::Result(id)),
            ..
        } if *id == open.id
    ));
    assert_eq!(access.ty(), &result.ty);
}

#[test]
fn constructor_calls_pick_their_initial_state() {
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler.compile(&door_library()).expect("compiles");
    let reopen = compilation
        .library
        .functions_named("Keeper", "reopen")
        .next()
        .expect("reopen");

    let states: Vec<&str> = reopen
        .statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::Assignment {
                value: AssignmentValue::Constructor(call),
                ..
            } => Some(call.state.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec!["Closed", "Open"]);
    assert!(matches!(
        reopen.statements.last(),
        Some(Statement::Action { name, arguments, .. }) if name == "OPEN" && arguments.len() == 1
    ));
}

#[test]
fn compile_fails_when_errors_were_reported() {
    let mut declaration = door_library();
    declaration.declarations.push(global("broken", "Missing"));

    let mut compiler = Compiler::new(CompileOptions::default());
    let err = compiler.compile(&declaration).expect_err("unresolved type");
    assert_eq!(err.to_string(), "Semantic analysis failed");
    assert_eq!(compiler.diagnostics().error_count(), 1);

    // analyze still hands back the graph for tooling
    let mut compiler = Compiler::new(CompileOptions::default());
    let library = compiler.analyze(&declaration).expect("no structural errors");
    assert!(library.automaton("Door").is_some());
    assert!(compiler.diagnostics().has_errors());
}

#[test]
fn independent_problems_are_all_reported_in_one_run() {
    let mut declaration = door_library();
    declaration.declarations.push(global("broken", "Missing"));
    let mut stray = automaton("Stray", "Nope", &["A"]);
    stray.shifts.push(shift(&["B"], "A", &["nothing"]));
    declaration.declarations.push(Declaration::Automaton(stray));
    declaration
        .declarations
        .push(Declaration::Function(function("orphan", Vec::new())));

    let analysis = analyze(&declaration);
    // two unresolved types, the unresolved shift function and the missing owner
    assert_eq!(analysis.errors().len(), 4, "{:?}", analysis.messages());
    assert!(analysis.library.automaton("Stray").is_some());
}

#[test]
fn syntax_tree_round_trips_through_json() {
    let declaration = door_library();
    let json = serde_json::to_string(&declaration).expect("serialize");
    let parsed: LibraryDeclaration = serde_json::from_str(&json).expect("deserialize");

    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler.compile(&parsed).expect("compiles after round trip");
    assert_eq!(compilation.library.context.automata().count(), 2);
}

#[test]
fn minimal_json_fills_in_defaults() {
    let json = r#"{
        "name": { "name": "tiny" },
        "declarations": [
            { "Type": { "name": { "name": "Int" }, "kind": "Simple" } },
            { "Automaton": {
                "name": { "name": "Counter" },
                "ty": { "Named": { "name": "Int" } },
                "states": [ { "name": { "name": "Zero" }, "kind": "Initial" } ]
            } }
        ]
    }"#;
    let parsed: LibraryDeclaration = serde_json::from_str(json).expect("deserialize");
    let mut compiler = Compiler::new(CompileOptions::default());
    let compilation = compiler.compile(&parsed).expect("compiles");
    let counter = compilation.library.automaton("Counter").expect("Counter");
    assert_eq!(counter.states.len(), 1);
    assert!(compilation.library.imports.is_empty());
}
