//! Run reporter: the per-run logging context.
//!
//! One `RunReporter` exists per pipeline run. The compiler, executor and
//! orchestrator receive it explicitly and report through it; it tags every event
//! with the run id, the recipe being executed and the active primitive scope, and
//! keeps the errors it saw for the final summary.

use crate::status::Status;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// One caught error, with enough context to locate it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obsnum: Option<u32>,
    pub recipe: String,
    /// Primitive scope path, outermost first (`_A_ > _B_`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub status: Status,
    pub message: String,
    /// Source lines around a syntax fault
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub window: Vec<String>,
}

#[derive(Debug, Default)]
struct RecipeScope {
    recipe: String,
    obsnum: Option<u32>,
    primitives: Vec<String>,
}

#[derive(Debug)]
pub struct RunReporter {
    run_id: String,
    current: Mutex<RecipeScope>,
    reports: Mutex<Vec<ErrorReport>>,
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReporter {
    pub fn new() -> Self {
        Self::with_run_id(Utc::now().format("%Y%m%dT%H%M%S").to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            current: Mutex::new(RecipeScope::default()),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Mark the start of a recipe execution for `obsnum`.
    pub fn begin_recipe(&self, recipe: &str, obsnum: Option<u32>) {
        let mut current = self.current.lock();
        *current = RecipeScope {
            recipe: recipe.to_string(),
            obsnum,
            primitives: Vec::new(),
        };
        info!(run = %self.run_id, recipe, obsnum, "Recipe started");
    }

    pub fn end_recipe(&self, status: Status) {
        let mut current = self.current.lock();
        info!(
            run = %self.run_id,
            recipe = %current.recipe,
            obsnum = current.obsnum,
            status = %status,
            "Recipe finished"
        );
        *current = RecipeScope::default();
    }

    pub fn enter_scope(&self, primitive: &str) {
        let mut current = self.current.lock();
        current.primitives.push(primitive.to_string());
        debug!(run = %self.run_id, recipe = %current.recipe, primitive, "Entering primitive");
    }

    pub fn exit_scope(&self) {
        let mut current = self.current.lock();
        if let Some(primitive) = current.primitives.pop() {
            debug!(run = %self.run_id, recipe = %current.recipe, primitive = %primitive, "Leaving primitive");
        }
    }

    /// Active primitive path, outermost first.
    pub fn scope_path(&self) -> Option<String> {
        let current = self.current.lock();
        if current.primitives.is_empty() {
            None
        } else {
            Some(current.primitives.join(" > "))
        }
    }

    /// Recipe output line (the `print` action).
    pub fn print(&self, message: &str) {
        let current = self.current.lock();
        info!(
            run = %self.run_id,
            recipe = %current.recipe,
            primitive = current.primitives.last().map(String::as_str).unwrap_or(""),
            "{}",
            message
        );
    }

    pub fn warn(&self, message: &str) {
        let current = self.current.lock();
        warn!(
            run = %self.run_id,
            recipe = %current.recipe,
            primitive = current.primitives.last().map(String::as_str).unwrap_or(""),
            "{}",
            message
        );
    }

    /// Record an error against the current recipe and scope.
    pub fn error(&self, status: Status, message: impl Into<String>, window: Vec<String>) {
        let report = {
            let current = self.current.lock();
            ErrorReport {
                obsnum: current.obsnum,
                recipe: current.recipe.clone(),
                scope: if current.primitives.is_empty() {
                    None
                } else {
                    Some(current.primitives.join(" > "))
                },
                status,
                message: message.into(),
                window,
            }
        };
        error!(
            run = %self.run_id,
            recipe = %report.recipe,
            obsnum = report.obsnum,
            scope = report.scope.as_deref().unwrap_or(""),
            status = %report.status,
            "{}",
            report.message
        );
        for line in &report.window {
            error!(run = %self.run_id, "  {}", line);
        }
        self.reports.lock().push(report);
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }
}
