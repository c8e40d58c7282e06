//! One frame through a compiled recipe, with calibrations and stub engines.

use super::test_utils::{utdate, StubEngines, Workspace};
use orac::abort::AbortFlag;
use orac::calibration::Calibration;
use orac::display::LogDisplay;
use orac::engine::EngineSet;
use orac::frame::Frame;
use orac::group::{BadObsFilter, Group};
use orac::header::HeaderValue;
use orac::instrument::Instrument;
use orac::recipe::{ActionRegistry, ExecContext, RecipeCompiler, RecipeExecutor};
use orac::report::RunReporter;
use orac::status::Status;
use parking_lot::RwLock;
use std::fs;
use std::sync::Arc;

struct Scenario {
    ws: Workspace,
    engines: StubEngines,
}

impl Scenario {
    fn new() -> Self {
        let ws = Workspace::new();
        ws.recipe("REDUCE_DARK", "_DARK_SUBTRACT_ method=median\nprint reduced $obsnum\n")
            .primitive(
                "_DARK_SUBTRACT_",
                "kappa.invoke(\"darksub\", \"in=$file dark=${cal:dark} method=$method\")\n",
            )
            .rules("dark", "READMODE\n");
        fs::write(
            ws.path("cal/index.dark"),
            "#payload\tORACTIME\tREADMODE\ndark_early\t60314.1\tCDS\ndark_late\t60314.4\tCDS\n",
        )
        .unwrap();
        ws.raw(
            7,
            &[
                ("MJD-OBS", HeaderValue::Float(60314.35)),
                ("READMODE", "CDS".into()),
                ("GRPNUM", HeaderValue::Int(7)),
            ],
        );
        Self {
            ws,
            engines: StubEngines::new(),
        }
    }

    fn run(&self) -> (Status, Group, Calibration, LogDisplay) {
        self.run_recipe("REDUCE_DARK")
    }

    fn run_recipe(&self, name: &str) -> (Status, Group, Calibration, LogDisplay) {
        let config = self.ws.config();
        let instrument = Instrument::from_config(&config.instrument, &config.paths);
        let mut frame = Frame::new(
            self.ws.path("raw/f20240105_00007.fits"),
            utdate(),
            7,
        );
        frame.configure(&instrument, Some(name)).unwrap();
        let mut group = Group::new(frame.group_key().to_string(), Arc::new(RwLock::new(BadObsFilter::new())));
        let index = group.push(frame);

        let mut calibration = Calibration::open(&instrument, &config.paths.calibration_dir()).unwrap();
        let mut engines = EngineSet::new(self.engines.launcher());
        let mut display = LogDisplay::new();
        let reporter = RunReporter::with_run_id("scenario");
        let actions = Arc::new(ActionRegistry::with_builtins());
        let mut compiler = RecipeCompiler::new(
            config.paths.recipe_search(&instrument.name),
            config.paths.primitive_search(&instrument.name),
            Arc::clone(&actions),
        );
        let recipe = compiler.compile(name, &reporter).unwrap();

        let status = {
            let mut ctx = ExecContext::new(
                &mut group,
                index,
                &mut calibration,
                &mut engines,
                &mut display,
                &reporter,
                config.paths.output_dir.clone(),
            )
            .unwrap();
            RecipeExecutor::new(actions, AbortFlag::new())
                .execute(&recipe, &mut ctx)
                .unwrap()
        };
        (status, group, calibration, display)
    }
}

#[test]
fn dark_subtract_passes_interpolated_arguments() {
    let scenario = Scenario::new();
    let (status, group, calibration, _) = scenario.run();

    assert_eq!(status, Status::Ok);
    let calls = scenario.engines.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].engine, "kappa");
    assert_eq!(calls[0].operation, "darksub");
    let linked = scenario.ws.path("out/f20240105_00007.fits");
    assert_eq!(
        calls[0].args,
        format!("in={} dark=dark_late method=median", linked.display())
    );

    assert!(group.all_members()[0].is_good());
    assert_eq!(group.num_members(), 1);
    assert_eq!(calibration.binding("dark").map(|b| b.value()), Some("dark_late"));
}

#[test]
fn raw_link_is_removed_and_file_restored() {
    let scenario = Scenario::new();
    let (_, group, _, _) = scenario.run();

    assert!(!scenario.ws.path("out/f20240105_00007.fits").exists());
    assert_eq!(
        group.all_members()[0].file(),
        scenario.ws.path("raw/f20240105_00007.fits").as_path()
    );
}

#[test]
fn calib_from_linked_frame_records_the_raw_file() {
    let scenario = Scenario::new();
    scenario
        .ws
        .recipe("FILE_DARK", "calib dark\ncalib dark $file\n");
    let (status, _, calibration, _) = scenario.run_recipe("FILE_DARK");
    assert_eq!(status, Status::Ok);

    let raw = scenario.ws.path("raw/f20240105_00007.fits");
    assert!(!scenario.ws.path("out/f20240105_00007.fits").exists());
    assert_eq!(
        calibration.binding("dark").map(|b| b.value()),
        Some(raw.display().to_string().as_str())
    );
    let index = fs::read_to_string(scenario.ws.path("cal/index.dark")).unwrap();
    let recorded: Vec<&str> = index
        .lines()
        .skip(3)
        .map(|row| row.split('\t').next().unwrap())
        .collect();
    assert_eq!(recorded.len(), 2);
    for payload in recorded {
        assert!(std::path::Path::new(payload).is_file(), "{}", payload);
        assert_eq!(payload, raw.display().to_string());
    }
}

#[test]
fn engine_failure_marks_frame_bad() {
    let scenario = Scenario::new();
    scenario.engines.fail_operation("darksub", 3);
    let (status, group, _, _) = scenario.run();

    assert_eq!(status, Status::Error);
    assert!(!group.all_members()[0].is_good());
    assert_eq!(group.num_members(), 0);
    assert_eq!(group.all_members().len(), 1);
}

#[test]
fn unreachable_engine_is_bad_engine() {
    let scenario = Scenario::new();
    scenario.engines.unreachable("kappa");
    let (status, group, _, _) = scenario.run();

    assert_eq!(status, Status::BadEngine);
    assert!(!group.all_members()[0].is_good());
}

#[test]
fn missing_calibration_is_a_recipe_error() {
    let scenario = Scenario::new();
    fs::write(
        scenario.ws.path("cal/index.dark"),
        "#payload\tORACTIME\tREADMODE\ndark_ndr\t60314.1\tNDR\n",
    )
    .unwrap();
    let (status, group, _, _) = scenario.run();

    assert_eq!(status, Status::Error);
    assert!(scenario.engines.calls().is_empty());
    assert!(!group.all_members()[0].is_good());
}

#[test]
fn display_requests_reach_the_sink() {
    let scenario = Scenario::new();
    scenario
        .ws
        .recipe("REDUCE_DARK", "setfile f20240105_00007_dk.fits\ndisplay\n");
    let (status, _, _, display) = scenario.run();

    assert_eq!(status, Status::Ok);
    assert_eq!(
        display.requests(),
        &[(7, scenario.ws.path("out/f20240105_00007_dk.fits"))]
    );
}
