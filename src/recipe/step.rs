//! Compiled step sequence.

use std::fmt::Write as _;
use std::path::PathBuf;

/// Where a step came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Recipe or primitive name
    pub source: String,
    /// 1-based line number
    pub line: usize,
}

/// Generated check following a status-producing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    /// After an engine call: report the call and return ERROR unless it returned OK.
    Engine {
        engine: String,
        operation: String,
        args: String,
    },
    /// After a `$status = ACTION` line: return ERROR unless the action returned OK.
    LastStatus { action: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Enter the lexical scope of a primitive.
    ScopeEnter { primitive: String },
    /// Bind the invocation's arguments in the innermost scope.
    ArgBind {
        scope: String,
        args: Vec<(String, String)>,
    },
    EngineCall {
        engine: String,
        operation: String,
        /// Uninterpolated argument template
        args: String,
        /// Store the status instead of relying on an injected check
        record: bool,
        origin: Origin,
    },
    /// Call to a registered action.
    Raw {
        action: String,
        /// Uninterpolated action text
        text: String,
        record: bool,
        origin: Origin,
    },
    Check(StatusCheck),
    ScopeExit { primitive: String },
}

/// A line that did not parse, with its neighbourhood for the error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFault {
    pub source: String,
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
    pub window: Vec<String>,
}

/// Fully expanded recipe, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRecipe {
    pub name: String,
    pub steps: Vec<Step>,
    pub faults: Vec<SyntaxFault>,
    /// Every file read while compiling, recipe first
    pub sources: Vec<PathBuf>,
}

impl CompiledRecipe {
    pub fn is_runnable(&self) -> bool {
        self.faults.is_empty()
    }

    /// Canonical text form, one step per line, indented by scope depth.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for step in &self.steps {
            if matches!(step, Step::ScopeExit { .. }) {
                depth = depth.saturating_sub(1);
            }
            let indent = "  ".repeat(depth);
            let _ = match step {
                Step::ScopeEnter { primitive } => writeln!(out, "{}scope {} {{", indent, primitive),
                Step::ArgBind { scope, args } => {
                    let pairs: Vec<String> =
                        args.iter().map(|(k, v)| format!("{}={:?}", k, v)).collect();
                    writeln!(out, "{}args {} {}", indent, scope, pairs.join(" "))
                }
                Step::EngineCall {
                    engine,
                    operation,
                    args,
                    record,
                    ..
                } => writeln!(
                    out,
                    "{}{}{}.invoke({:?}, {:?})",
                    indent,
                    if *record { "$status = " } else { "" },
                    engine,
                    operation,
                    args
                ),
                Step::Raw {
                    action,
                    text,
                    record,
                    ..
                } => writeln!(
                    out,
                    "{}{}{} {}",
                    indent,
                    if *record { "$status = " } else { "" },
                    action,
                    text
                ),
                Step::Check(StatusCheck::Engine {
                    engine,
                    operation,
                    args,
                }) => writeln!(
                    out,
                    "{}unless ok($status) {{ report {}.{}({:?}); return ERROR }}",
                    indent, engine, operation, args
                ),
                Step::Check(StatusCheck::LastStatus { action }) => writeln!(
                    out,
                    "{}unless ok($status) {{ report {}; return ERROR }}",
                    indent, action
                ),
                Step::ScopeExit { primitive } => writeln!(out, "{}}} # {}", indent, primitive),
            };
            if matches!(step, Step::ScopeEnter { .. }) {
                depth += 1;
            }
        }
        out
    }

    /// BLAKE3 digest of [`CompiledRecipe::render`], hex encoded.
    pub fn fingerprint(&self) -> String {
        hex::encode(blake3::hash(self.render().as_bytes()).as_bytes())
    }
}
