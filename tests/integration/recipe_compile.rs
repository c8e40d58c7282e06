//! Recipe compilation through the configured search paths.

use super::test_utils::Workspace;
use orac::error::RecipeError;
use orac::recipe::{ActionRegistry, CompiledRecipe, RecipeCompiler, StatusCheck, Step};
use orac::report::RunReporter;
use std::fs;
use std::sync::Arc;

fn compile(ws: &Workspace, recipe: &str) -> Result<Arc<CompiledRecipe>, RecipeError> {
    let config = ws.config();
    let mut compiler = RecipeCompiler::new(
        config.paths.recipe_search("GENERIC"),
        config.paths.primitive_search("GENERIC"),
        Arc::new(ActionRegistry::with_builtins()),
    );
    compiler.compile(recipe, &RunReporter::with_run_id("test"))
}

#[test]
fn engine_calls_get_checks_unless_status_is_explicit() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "_FLAT_\n")
        .primitive(
            "_FLAT_",
            "kappa.invoke(\"div\", \"in=$file\")\n$status = kappa.invoke(\"stats\", \"in=$file\")\n",
        );
    let compiled = compile(&ws, "REDUCE").unwrap();
    let checks: Vec<usize> = compiled
        .steps
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, Step::Check(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(checks.len(), 1);
    assert!(matches!(
        &compiled.steps[checks[0] - 1],
        Step::EngineCall { operation, record: false, .. } if operation == "div"
    ));
    assert!(matches!(
        &compiled.steps[checks[0]],
        Step::Check(StatusCheck::Engine { operation, .. }) if operation == "div"
    ));
}

#[test]
fn recorded_actions_get_last_status_checks() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "$status = require EXPTIME > 0\nprint done\n");
    let compiled = compile(&ws, "REDUCE").unwrap();
    assert!(matches!(
        compiled.steps[1],
        Step::Check(StatusCheck::LastStatus { .. })
    ));
    assert_eq!(compiled.steps.len(), 3);
}

#[test]
fn override_directories_win() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "_STEP_\n")
        .primitive("_STEP_", "print builtin\n");
    let override_dir = ws.path("mine");
    fs::create_dir_all(&override_dir).unwrap();
    fs::write(override_dir.join("_STEP_"), "print override\n").unwrap();

    let mut config = ws.config();
    config.paths.primitive_dirs = vec![override_dir.clone()];
    let mut compiler = RecipeCompiler::new(
        config.paths.recipe_search("GENERIC"),
        config.paths.primitive_search("GENERIC"),
        Arc::new(ActionRegistry::with_builtins()),
    );
    let compiled = compiler.compile("REDUCE", &RunReporter::new()).unwrap();
    assert!(compiled.render().contains("print override"));
    assert_eq!(compiled.sources[1], override_dir.join("_STEP_"));
}

#[test]
fn deep_cycles_are_reported() {
    let ws = Workspace::new();
    ws.recipe("LOOP", "_A_\n")
        .primitive("_A_", "_B_\n")
        .primitive("_B_", "_C_\n")
        .primitive("_C_", "_A_\n");
    match compile(&ws, "LOOP") {
        Err(RecipeError::Cycle { path }) => assert_eq!(path, "LOOP -> _A_ -> _B_ -> _C_ -> _A_"),
        other => panic!("expected cycle, got {:?}", other),
    }
}

#[test]
fn missing_recipe_names_search_path() {
    let ws = Workspace::new();
    let err = compile(&ws, "NOT_THERE").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("NOT_THERE"));
    assert!(message.contains("recipes"));
}

#[test]
fn fresh_compilers_agree() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "_A_ x=1\n_B_\n")
        .primitive("_A_", "kappa.invoke(\"op\", \"x=$x\")\n_B_ y=$x\n")
        .primitive("_B_", "print b\n");
    let first = compile(&ws, "REDUCE").unwrap();
    let second = compile(&ws, "REDUCE").unwrap();
    assert_eq!(first.render(), second.render());
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.steps, second.steps);
}
