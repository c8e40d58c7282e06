//! Recipe Executor
//!
//! Interprets a [`CompiledRecipe`] against one frame of a group. Every failure
//! inside the recipe becomes a [`Status`]; only [`Interrupt`]s escape.

use super::actions::{ActionError, ActionRegistry};
use super::interpolate::interpolate;
use super::link::RawLink;
use super::step::{CompiledRecipe, StatusCheck, Step};
use crate::abort::AbortFlag;
use crate::calibration::Calibration;
use crate::display::DisplaySink;
use crate::engine::EngineSet;
use crate::error::Interrupt;
use crate::frame::Frame;
use crate::group::Group;
use crate::report::RunReporter;
use crate::status::{EngineStatus, Status};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a recipe can touch while it runs.
pub struct ExecContext<'a> {
    group: &'a mut Group,
    frame: usize,
    pub calibration: &'a mut Calibration,
    pub engines: &'a mut EngineSet,
    pub display: &'a mut dyn DisplaySink,
    pub reporter: &'a RunReporter,
    pub output_dir: PathBuf,
    /// Variables set with the `set` action
    pub vars: BTreeMap<String, String>,
    /// Temporary link standing in for the raw file while the recipe runs
    raw_link: Option<PathBuf>,
}

impl<'a> ExecContext<'a> {
    /// Context for frame `frame` of `group`; `None` if there is no such frame.
    pub fn new(
        group: &'a mut Group,
        frame: usize,
        calibration: &'a mut Calibration,
        engines: &'a mut EngineSet,
        display: &'a mut dyn DisplaySink,
        reporter: &'a RunReporter,
        output_dir: impl Into<PathBuf>,
    ) -> Option<Self> {
        group.frame(frame)?;
        Some(Self {
            group,
            frame,
            calibration,
            engines,
            display,
            reporter,
            output_dir: output_dir.into(),
            vars: BTreeMap::new(),
            raw_link: None,
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.group[self.frame]
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.group[self.frame]
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn group(&self) -> &Group {
        &*self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut *self.group
    }

    /// `path` as it should be stored beyond this recipe: the temporary raw link
    /// is replaced by the raw file it points at.
    pub fn persistent_path(&self, path: &Path) -> PathBuf {
        match &self.raw_link {
            Some(link) if link == path => self.frame().raw().to_path_buf(),
            _ => path.to_path_buf(),
        }
    }

    /// Resolve a recipe-supplied path against the output directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

/// Status of the most recent status-producing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastStatus {
    Engine(EngineStatus),
    Step(Status),
}

impl LastStatus {
    fn is_ok(self) -> bool {
        match self {
            LastStatus::Engine(code) => code.is_ok(),
            LastStatus::Step(status) => status.is_ok(),
        }
    }

    fn render(self) -> String {
        match self {
            LastStatus::Engine(code) => code.to_string(),
            LastStatus::Step(status) => status.to_string(),
        }
    }
}

#[derive(Debug)]
struct Scope {
    primitive: String,
    args: BTreeMap<String, String>,
}

#[derive(Debug)]
struct ExecState {
    scopes: Vec<Scope>,
    last: LastStatus,
}

/// How a step ended other than by continuing.
enum Flow {
    Return(Status),
    Unwind(Interrupt),
}

impl From<Interrupt> for Flow {
    fn from(interrupt: Interrupt) -> Self {
        Flow::Unwind(interrupt)
    }
}

pub struct RecipeExecutor {
    actions: Arc<ActionRegistry>,
    abort: AbortFlag,
}

impl RecipeExecutor {
    pub fn new(actions: Arc<ActionRegistry>, abort: AbortFlag) -> Self {
        Self { actions, abort }
    }

    /// Run `recipe` for the context's frame.
    ///
    /// ERROR and BAD_ENGINE outcomes mark the frame bad. A raw file living outside
    /// the output directory is linked into it for the duration of the run.
    pub fn execute(
        &self,
        recipe: &CompiledRecipe,
        ctx: &mut ExecContext<'_>,
    ) -> Result<Status, Interrupt> {
        let reporter = ctx.reporter;
        reporter.begin_recipe(&recipe.name, Some(ctx.frame().obsnum()));

        if !recipe.is_runnable() {
            for fault in &recipe.faults {
                reporter.error(
                    Status::Error,
                    format!(
                        "Syntax error in {} line {}: {}",
                        fault.source, fault.line, fault.message
                    ),
                    fault.window.clone(),
                );
            }
            return Ok(self.finish(Status::Error, ctx));
        }

        let raw = ctx.frame().raw().to_path_buf();
        let link = if ctx.frame().file() == raw.as_path() {
            match RawLink::create(&raw, &ctx.output_dir) {
                Ok(link) => link,
                Err(e) => {
                    reporter.warn(&format!("Could not link {} into output directory: {}", raw.display(), e));
                    None
                }
            }
        } else {
            None
        };
        if let Some(link) = &link {
            ctx.frame_mut().set_file(link.path());
            ctx.raw_link = Some(link.path().to_path_buf());
        }

        let outcome = self.run_steps(recipe, ctx);

        if let Some(link) = &link {
            if ctx.frame().file() == link.path() {
                ctx.frame_mut().set_file(raw);
            }
        }
        ctx.raw_link = None;
        drop(link);

        match outcome {
            Ok(()) => Ok(self.finish(Status::Ok, ctx)),
            Err(Flow::Return(status)) => Ok(self.finish(status, ctx)),
            Err(Flow::Unwind(interrupt)) => {
                reporter.warn(&format!("Recipe {} interrupted: {}", recipe.name, interrupt));
                reporter.end_recipe(Status::Error);
                Err(interrupt)
            }
        }
    }

    fn finish(&self, status: Status, ctx: &mut ExecContext<'_>) -> Status {
        if status.is_failure() {
            let index = ctx.frame_index();
            ctx.group_mut().mark_bad(index);
        }
        ctx.reporter.end_recipe(status);
        status
    }

    fn run_steps(&self, recipe: &CompiledRecipe, ctx: &mut ExecContext<'_>) -> Result<(), Flow> {
        let mut state = ExecState {
            scopes: Vec::new(),
            last: LastStatus::Step(Status::Ok),
        };
        for step in &recipe.steps {
            self.abort.check()?;
            self.run_step(step, &mut state, ctx)?;
        }
        Ok(())
    }

    fn run_step(
        &self,
        step: &Step,
        state: &mut ExecState,
        ctx: &mut ExecContext<'_>,
    ) -> Result<(), Flow> {
        let reporter = ctx.reporter;
        match step {
            Step::ScopeEnter { primitive } => {
                state.scopes.push(Scope {
                    primitive: primitive.clone(),
                    args: BTreeMap::new(),
                });
                reporter.enter_scope(primitive);
            }
            Step::ScopeExit { .. } => {
                state.scopes.pop();
                reporter.exit_scope();
            }
            Step::ArgBind { scope, args } => {
                // Values are evaluated in the caller's scope.
                let depth = state.scopes.len().saturating_sub(1);
                let mut bound = BTreeMap::new();
                for (key, value) in args {
                    let value = expand(value, &state.scopes[..depth], state.last, ctx)?;
                    bound.insert(key.clone(), value);
                }
                match state.scopes.last_mut() {
                    Some(top) if top.primitive == *scope => top.args = bound,
                    _ => {
                        return Err(fail(
                            reporter,
                            Status::Error,
                            format!("arguments for {} bound outside its scope", scope),
                        ))
                    }
                }
            }
            Step::EngineCall {
                engine,
                operation,
                args,
                ..
            } => {
                let args = expand(args, &state.scopes, state.last, ctx)?;
                match ctx.engines.invoke(engine, operation, &args) {
                    Ok(code) => state.last = LastStatus::Engine(code),
                    Err(e) => return Err(fail(reporter, Status::BadEngine, e.to_string())),
                }
            }
            Step::Check(check) => {
                if state.last.is_ok() {
                    return Ok(());
                }
                if state.last == LastStatus::Step(Status::Terminated) {
                    return Err(Flow::Return(Status::Terminated));
                }
                let message = match check {
                    StatusCheck::Engine {
                        engine,
                        operation,
                        args,
                    } => format!(
                        "{}: {}({}) returned status {}",
                        engine,
                        operation,
                        args,
                        state.last.render()
                    ),
                    StatusCheck::LastStatus { action } => {
                        format!("{} returned status {}", action, state.last.render())
                    }
                };
                return Err(fail(reporter, Status::Error, message));
            }
            Step::Raw {
                action,
                text,
                record,
                origin,
            } => {
                let Some(handler) = self.actions.get(action) else {
                    return Err(fail(
                        reporter,
                        Status::Error,
                        format!("unknown action {:?} at {} line {}", action, origin.source, origin.line),
                    ));
                };
                let text = expand(text, &state.scopes, state.last, ctx)?;
                match handler(ctx, &text) {
                    Ok(status) if *record => state.last = LastStatus::Step(status),
                    Ok(Status::Ok) => {}
                    Ok(Status::Terminated) => {
                        reporter.print(&format!("Recipe terminated by {}", action));
                        return Err(Flow::Return(Status::Terminated));
                    }
                    Ok(status) => {
                        return Err(fail(reporter, status, format!("{} returned {}", action, status)))
                    }
                    Err(ActionError::Failed(message)) => {
                        return Err(fail(reporter, Status::Error, message))
                    }
                    Err(ActionError::Interrupted(interrupt)) => return Err(Flow::Unwind(interrupt)),
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RecipeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeExecutor").finish_non_exhaustive()
    }
}

fn fail(reporter: &RunReporter, status: Status, message: String) -> Flow {
    reporter.error(status, message, Vec::new());
    Flow::Return(status)
}

/// Interpolate `template` in the given scopes.
fn expand(
    template: &str,
    scopes: &[Scope],
    last: LastStatus,
    ctx: &mut ExecContext<'_>,
) -> Result<String, Flow> {
    let reporter = ctx.reporter;
    interpolate(template, |name| resolve(name, scopes, last, ctx))
        .map_err(|message| fail(reporter, Status::Error, message))
}

fn resolve(
    name: &str,
    scopes: &[Scope],
    last: LastStatus,
    ctx: &mut ExecContext<'_>,
) -> Result<String, String> {
    if let Some((kind, key)) = name.split_once(':') {
        let frame = ctx.frame();
        return match kind {
            "hdr" => frame.hdr.get(key).map(|v| v.to_string()),
            "uhdr" => frame.uhdr.get(key).map(|v| v.to_string()),
            "out" => Some(frame.inout(key).1.display().to_string()),
            "cal" => {
                let context = frame.context();
                return ctx
                    .calibration
                    .select(key, &context)
                    .map_err(|e| e.to_string());
            }
            _ => return Err(format!("unknown variable namespace {:?}", kind)),
        }
        .ok_or_else(|| format!("header {} not set", key));
    }

    let frame = ctx.frame();
    let builtin = match name {
        "file" => Some(frame.file().display().to_string()),
        "raw" => Some(frame.raw().display().to_string()),
        "group" => Some(ctx.group().file().display().to_string()),
        "obsnum" => Some(frame.obsnum().to_string()),
        "utdate" => Some(frame.utdate().to_string()),
        "recipe" => Some(frame.recipe().to_string()),
        "status" => Some(last.render()),
        _ => None,
    };
    if let Some(value) = builtin {
        return Ok(value);
    }
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.args.get(name))
        .or_else(|| ctx.vars.get(name))
        .cloned()
        .ok_or_else(|| format!("undefined variable ${}", name))
}
