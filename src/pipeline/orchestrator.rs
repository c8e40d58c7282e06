//! Pipeline Orchestrator
//!
//! Drives one run: frames come from the arrival loop, are assigned to groups and
//! have their recipe compiled and executed. Streaming mode executes each frame as
//! it arrives; batch mode reads everything first and then walks the groups in
//! creation order so recipes can see complete groups.

use super::params::RunParams;
use super::stats::{GroupSummary, RunStats, RunSummary, StopReason};
use crate::abort::AbortFlag;
use crate::arrival::{self, ArrivalStrategy, Cursor, DataSource};
use crate::calibration::Calibration;
use crate::config::OracConfig;
use crate::display::{DisplaySink, LogDisplay};
use crate::engine::{CommandLauncher, EngineLauncher, EngineSet};
use crate::error::{Interrupt, LoopError, PipelineError};
use crate::frame::{Frame, UtDate};
use crate::group::registry::FrameSlot;
use crate::group::{BadObsFilter, GroupSet};
use crate::instrument::Instrument;
use crate::recipe::{ActionRegistry, ExecContext, RecipeCompiler, RecipeExecutor};
use crate::report::RunReporter;
use crate::status::Status;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Pipeline {
    config: OracConfig,
    instrument: Instrument,
    launcher: Arc<dyn EngineLauncher>,
    actions: Arc<ActionRegistry>,
    display: Box<dyn DisplaySink>,
    reporter: RunReporter,
    abort: AbortFlag,
}

impl Pipeline {
    /// Pipeline with the built-in actions, command-line engines and a logging display.
    pub fn new(config: OracConfig) -> Self {
        let instrument = Instrument::from_config(&config.instrument, &config.paths);
        let launcher = CommandLauncher::new(config.engines.clone()).with_workdir(&config.paths.output_dir);
        Self {
            instrument,
            launcher: Arc::new(launcher),
            actions: Arc::new(ActionRegistry::with_builtins()),
            display: Box::new(LogDisplay::new()),
            reporter: RunReporter::new(),
            abort: AbortFlag::new(),
            config,
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn EngineLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = Arc::new(actions);
        self
    }

    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = display;
        self
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = instrument;
        self
    }

    pub fn with_reporter(mut self, reporter: RunReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    pub fn config(&self) -> &OracConfig {
        &self.config
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn reporter(&self) -> &RunReporter {
        &self.reporter
    }

    /// Handle for requesting an abort from elsewhere.
    pub fn abort_flag(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Process frames until the arrival loop runs out of work.
    ///
    /// A user abort ends the run early but still yields a summary. Fatal
    /// conditions and compile failures are returned as errors. Engines are
    /// closed either way.
    pub fn run(&mut self, params: &RunParams) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let cursor = params.cursor()?;
        let loop_kind = params.loop_kind();
        let paths = &self.config.paths;

        let output_dir = paths.output_dir.clone();
        fs::create_dir_all(&output_dir).map_err(|e| {
            Interrupt::Fatal(format!(
                "Cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let filter = match &self.config.pipeline.badobs_file {
            Some(path) => BadObsFilter::load(path).map_err(PipelineError::BadObs)?,
            None => BadObsFilter::new(),
        };

        let mut calibration = Calibration::open(&self.instrument, &paths.calibration_dir())?;
        for (role, value) in &params.calib {
            calibration.pin(role, value.clone())?;
            info!(role = %role, value = %value, "Calibration pinned");
        }

        let mut engines = EngineSet::new(Arc::clone(&self.launcher));
        engines.prestart(
            self.config
                .engines
                .iter()
                .filter(|(_, engine)| engine.prestart)
                .map(|(name, _)| name.as_str()),
        )?;

        let compiler = RecipeCompiler::new(
            paths.recipe_search(&self.instrument.name),
            paths.primitive_search(&self.instrument.name),
            Arc::clone(&self.actions),
        )
        .with_cache(self.config.pipeline.cache_recipes);

        let source = DataSource::new(&paths.input_dir, self.instrument.clone())
            .with_forced_recipe(params.recipe.clone());

        let mut run = Run {
            reporter: &self.reporter,
            display: self.display.as_mut(),
            abort: &self.abort,
            strategy: arrival::strategy(loop_kind, &self.config.arrival, self.abort.clone()),
            source,
            cursor,
            utdate: params.utdate(),
            skip: params.skip,
            groups: GroupSet::new(Arc::new(RwLock::new(filter)), &output_dir),
            calibration,
            engines,
            compiler,
            executor: RecipeExecutor::new(Arc::clone(&self.actions), self.abort.clone()),
            output_dir,
            stats: RunStats::default(),
        };

        info!(
            run = %self.reporter.run_id(),
            instrument = %self.instrument.name,
            loop_kind = %loop_kind,
            batch = params.batch,
            utdate = %run.utdate,
            "Pipeline run starting"
        );

        let outcome = if params.batch {
            run.batch()
        } else {
            run.streaming()
        };
        run.engines.close_all();

        let stopped = match outcome {
            Ok(reason) => reason,
            Err(e) if e.is_user_abort() => {
                warn!("Run aborted by user");
                StopReason::UserAbort
            }
            Err(e) => {
                error!(error = %e, "Pipeline run failed");
                return Err(e);
            }
        };

        let summary = RunSummary {
            run_id: self.reporter.run_id().to_string(),
            loop_kind: loop_kind.to_string(),
            batch: params.batch,
            stats: run.stats,
            stopped,
            groups: run.groups.iter().map(summarize_group).collect(),
            errors: self.reporter.reports(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            ok = summary.stats.ok,
            terminated = summary.stats.terminated,
            bad_engine = summary.stats.bad_engine,
            error = summary.stats.error,
            "Pipeline run finished"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("instrument", &self.instrument)
            .field("run_id", &self.reporter.run_id())
            .finish_non_exhaustive()
    }
}

fn summarize_group(group: &crate::group::Group) -> GroupSummary {
    GroupSummary {
        key: group.key().to_string(),
        file: group.file().to_path_buf(),
        members: group.members().map(Frame::obsnum).collect(),
        all_members: group.all_members().len(),
    }
}

enum Arrival {
    Frame(Frame),
    /// The observation could not be read; counted and passed over
    Unreadable,
    Stop(StopReason),
}

/// State that lives for one run.
struct Run<'p> {
    reporter: &'p RunReporter,
    display: &'p mut dyn DisplaySink,
    abort: &'p AbortFlag,
    strategy: Box<dyn ArrivalStrategy>,
    source: DataSource,
    cursor: Cursor,
    utdate: UtDate,
    skip: bool,
    groups: GroupSet,
    calibration: Calibration,
    engines: EngineSet,
    compiler: RecipeCompiler,
    executor: RecipeExecutor,
    output_dir: PathBuf,
    stats: RunStats,
}

impl Run<'_> {
    fn streaming(&mut self) -> Result<StopReason, PipelineError> {
        loop {
            match self.next_frame()? {
                Arrival::Frame(frame) => {
                    let slot = self.groups.assign(frame);
                    self.process(slot)?;
                }
                Arrival::Unreadable => continue,
                Arrival::Stop(reason) => return Ok(reason),
            }
        }
    }

    fn batch(&mut self) -> Result<StopReason, PipelineError> {
        let reason = loop {
            match self.next_frame()? {
                Arrival::Frame(frame) => {
                    self.groups.assign(frame);
                }
                Arrival::Unreadable => {}
                Arrival::Stop(reason) => break reason,
            }
        };
        info!(groups = self.groups.len(), "All frames read, processing groups");

        for group in 0..self.groups.len() {
            let members = self
                .groups
                .get(group)
                .map(|g| g.member_indices().to_vec())
                .unwrap_or_default();
            for frame in members {
                self.abort.check()?;
                self.process(FrameSlot { group, frame })?;
            }
        }
        Ok(reason)
    }

    fn next_frame(&mut self) -> Result<Arrival, PipelineError> {
        self.abort.check()?;
        match self
            .strategy
            .next(&self.source, self.utdate, &mut self.cursor, self.skip)
        {
            Ok(Some(frame)) => {
                info!(
                    obsnum = frame.obsnum(),
                    recipe = frame.recipe(),
                    group = frame.group_key(),
                    "Frame arrived"
                );
                Ok(Arrival::Frame(frame))
            }
            Ok(None) => Ok(Arrival::Stop(StopReason::Completed)),
            Err(LoopError::Missing { obsnum, path }) => {
                info!(obsnum, path = %path.display(), "Observation not found, ending run");
                Ok(Arrival::Stop(StopReason::EndOfData { obsnum }))
            }
            Err(err @ LoopError::Timeout { .. }) => {
                warn!(error = %err, "Gave up waiting for data");
                Ok(Arrival::Stop(StopReason::Timeout {
                    obsnum: self.cursor.current(),
                    message: err.to_string(),
                }))
            }
            Err(LoopError::UserAbort) => Err(Interrupt::UserAbort.into()),
            Err(LoopError::Frame(e)) => {
                error!(error = %e, "Could not read observation");
                self.stats.record(Status::Error);
                Ok(Arrival::Unreadable)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn process(&mut self, slot: FrameSlot) -> Result<(), PipelineError> {
        let Some(group) = self.groups.get_mut(slot.group) else {
            return Ok(());
        };
        let Some(frame) = group.frame(slot.frame) else {
            return Ok(());
        };
        let recipe_name = frame.recipe().to_string();
        let obsnum = frame.obsnum();

        let recipe = self.compiler.compile(&recipe_name, self.reporter)?;
        debug!(recipe = %recipe_name, fingerprint = %recipe.fingerprint(), "Recipe ready");

        let Some(mut ctx) = ExecContext::new(
            group,
            slot.frame,
            &mut self.calibration,
            &mut self.engines,
            &mut *self.display,
            self.reporter,
            self.output_dir.clone(),
        ) else {
            return Ok(());
        };
        let status = self.executor.execute(&recipe, &mut ctx)?;
        self.stats.record(status);
        info!(obsnum, recipe = %recipe_name, status = %status, "Recipe finished");
        Ok(())
    }
}
