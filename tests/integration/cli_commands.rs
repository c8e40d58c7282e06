//! CLI commands routed through `RunContext`.

use super::test_utils::{Workspace, ENV_MUTEX};
use clap::Parser;
use orac::cli::{Cli, RunContext};
use orac::config::OracConfig;
use orac::header::HeaderValue;
use std::fs;

fn execute(ws: &Workspace, args: &[&str]) -> orac::cli::CommandOutput {
    let mut argv = vec!["orac"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    RunContext::from_config(ws.root.clone(), ws.config())
        .execute(&cli.command)
        .unwrap()
}

fn raw(ws: &Workspace, obsnum: u32, recipe: &str) {
    ws.raw(
        obsnum,
        &[
            ("GRPNUM", HeaderValue::Int(1)),
            ("RECIPE", recipe.into()),
            ("MJD-OBS", HeaderValue::Float(60314.5)),
        ],
    );
}

#[test]
fn run_renders_json_summary() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "print reducing $obsnum\n")
        .recipe("BROKEN", "die no good\n");
    raw(&ws, 1, "REDUCE");
    raw(&ws, 2, "BROKEN");

    let output = execute(
        &ws,
        &["run", "--from", "1", "--to", "2", "--ut", "20240105", "--format", "json"],
    );
    assert_eq!(output.exit_code, 1);
    let json: serde_json::Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(json["stats"]["ok"], 1);
    assert_eq!(json["stats"]["error"], 1);
    assert_eq!(json["stopped"]["reason"], "completed");
    assert_eq!(json["loop_kind"], "list");
    assert_eq!(json["errors"][0]["obsnum"], 2);
    assert_eq!(json["errors"][0]["message"], "no good");
}

#[test]
fn run_text_summary_lists_groups() {
    let ws = Workspace::new();
    ws.recipe("REDUCE", "print ok\n");
    raw(&ws, 1, "REDUCE");
    raw(&ws, 2, "REDUCE");

    let output = execute(&ws, &["run", "--list", "1,2", "--ut", "20240105"]);
    assert_eq!(output.exit_code, 0);
    assert!(output.text.contains("20240105:GRPNUM=1"));
    assert!(output.text.contains("OK"));
}

#[test]
fn calib_recorded_by_run_shows_in_index() {
    let ws = Workspace::new();
    ws.recipe("REDUCE_DARK", "calib dark dark_$obsnum\n");
    raw(&ws, 4, "REDUCE_DARK");
    execute(&ws, &["run", "--list", "4", "--ut", "20240105"]);

    let text = execute(&ws, &["index", "dark"]).text;
    assert!(text.contains("dark_4"));

    let json: serde_json::Value =
        serde_json::from_str(&execute(&ws, &["index", "dark", "--format", "json"]).text).unwrap();
    assert_eq!(json["role"], "dark");
    assert_eq!(json["entries"][0]["payload"], "dark_4");
}

#[test]
fn compile_with_syntax_fault_exits_nonzero() {
    let ws = Workspace::new();
    ws.recipe("BAD", "print fine\nkappa.invoke(oops)\n");
    let output = execute(&ws, &["compile", "BAD"]);
    assert_eq!(output.exit_code, 1);
    assert!(output.text.contains("line 2"));
}

#[test]
fn config_output_loads_back_as_workspace_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let ws = Workspace::new();
    let text = execute(&ws, &["config"]).text;
    fs::create_dir_all(ws.path("config")).unwrap();
    fs::write(ws.path("config/config.toml"), &text).unwrap();

    let ctx = RunContext::new(ws.root.clone(), None).unwrap();
    let expected: OracConfig = ws.config();
    assert_eq!(ctx.config().paths.input_dir, expected.paths.input_dir);
    assert_eq!(ctx.config().instrument.prefix, "f");
    assert_eq!(ctx.config().arrival.poll_interval_ms, 20);
}
