mod common;

use common::*;
use libsl_compiler::syntax::Declaration;
use libsl_compiler::{
    AnnotationReference, AutomatonReference, DiagnosticKind, FunctionReference, ReferenceKind,
    ResolveError, Type, TypeReference, TARGET_ANNOTATION,
};

#[test]
fn shift_may_name_a_function_declared_later_in_the_file() {
    let mut declarations = base_types();
    let mut door = automaton("Door", "Int", &["Closed", "Open"]);
    door.shifts.push(shift(&["Closed"], "Open", &["open"]));
    declarations.push(Declaration::Automaton(door));
    declarations.push(Declaration::Function(qualified(function("open", Vec::new()), "Door")));

    let analysis = analyze(&library(declarations));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.messages());
    let door = analysis.library.automaton("Door").expect("Door");
    assert_eq!(door.shifts.len(), 1);
    assert_eq!(door.shifts[0].functions, door.functions);
}

#[test]
fn types_may_be_used_before_their_declaration() {
    let mut declarations = vec![structured("Pair", &[("left", "Int"), ("right", "Int")])];
    let mut a = automaton("A", "Pair", &["S"]);
    a.variables.push(variable("pair", named("Pair")));
    declarations.push(Declaration::Automaton(a));
    declarations.push(simple_type("Int"));

    let analysis = analyze(&library(declarations));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.messages());
}

#[test]
fn deferred_references_resolve_after_analysis() {
    let mut declarations = base_types();
    let mut a = automaton("A", "Int", &["S"]);
    a.functions.push(function("f", vec![parameter("x", "Int")]));
    declarations.push(Declaration::Automaton(a));
    let analysis = analyze(&library(declarations));
    let context = &analysis.library.context;

    let int = TypeReference::new("Int");
    assert!(matches!(int.resolve(context), Ok(Type::Simple { name }) if name == "Int"));
    assert_eq!(AutomatonReference::new("A").resolve_or_panic(context).name, "A");
    let f = FunctionReference::new("f", "A", Some(vec![int.clone()]));
    let id = f.resolve(context).expect("f(Int) exists");
    assert_eq!(context.function(id).display_name(), "A.f");
    assert_eq!(f.resolve_or_panic(context), id);
    assert_eq!(
        AnnotationReference::new(TARGET_ANNOTATION)
            .resolve(context)
            .map(|annotation| annotation.name.as_str()),
        Ok(TARGET_ANNOTATION)
    );
}

#[test]
fn missing_targets_report_what_was_looked_up() {
    let analysis = analyze(&library(base_types()));
    let context = &analysis.library.context;

    let err = TypeReference::new("Missing").resolve(context).unwrap_err();
    assert_eq!(
        err,
        ResolveError::Unresolved {
            kind: ReferenceKind::Type,
            name: "Missing".to_string(),
        }
    );
    assert_eq!(err.to_string(), "unresolved type reference 'Missing'");

    let err = FunctionReference::new("g", "Nope", None)
        .resolve(context)
        .unwrap_err();
    assert_eq!(err.to_string(), "unresolved function reference 'Nope.g'");
    assert!(AutomatonReference::new("Nope").resolve_id(context).is_err());
}

#[test]
#[should_panic(expected = "unresolved automaton reference 'Ghost'")]
fn resolve_or_panic_panics_on_missing_targets() {
    let analysis = analyze(&library(base_types()));
    AutomatonReference::new("Ghost").resolve_or_panic(&analysis.library.context);
}

#[test]
fn duplicate_top_level_names_are_reported() {
    let mut declarations = base_types();
    declarations.push(simple_type("Int"));
    declarations.push(global("limit", "Int"));
    declarations.push(global("limit", "Bool"));
    declarations.push(Declaration::Automaton(automaton("A", "Int", &["S"])));
    declarations.push(Declaration::Automaton(automaton("A", "Bool", &["T"])));

    let analysis = analyze(&library(declarations));
    let duplicates = analysis.errors_of(DiagnosticKind::DuplicateDeclaration);
    assert_eq!(duplicates.len(), 3, "{:?}", analysis.messages());
    assert_eq!(
        analysis.library.context.resolve_variable("limit").map(|v| v.ty.name()),
        Some("Int")
    );
    assert!(analysis.library.automaton("A").expect("A").state("S").is_some());
}

#[test]
fn automaton_with_unknown_type_is_still_registered() {
    let mut declarations = base_types();
    declarations.push(Declaration::Automaton(automaton("A", "Ghost", &["S"])));
    let mut b = automaton("B", "Int", &["S"]);
    b.functions
        .push(function("link", vec![annotated(parameter("a", "A"), "target")]));
    declarations.push(Declaration::Automaton(b));

    let analysis = analyze(&library(declarations));
    assert_eq!(analysis.errors_of(DiagnosticKind::UnresolvedType).len(), 1);
    assert_eq!(analysis.errors().len(), 1, "{:?}", analysis.messages());
    let link = analysis.library.functions_named("B", "link").next().expect("link");
    assert_eq!(link.target_automaton.name(), "A");
}
