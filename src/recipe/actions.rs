//! Actions: the statements a recipe line can run besides engine calls.
//!
//! An action receives the execution context and its interpolated text and
//! returns a status. Hosts add their own with [`ActionRegistry::register`].

use super::executor::ExecContext;
use crate::error::Interrupt;
use crate::header::HeaderValue;
use crate::status::Status;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Failure raised by an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Ends the recipe with ERROR
    Failed(String),
    /// Unwinds the run
    Interrupted(Interrupt),
}

pub type ActionFn =
    Arc<dyn Fn(&mut ExecContext<'_>, &str) -> Result<Status, ActionError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionFn>,
}

impl ActionRegistry {
    /// Registry with no actions at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in actions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("print", print);
        registry.register("set", set);
        registry.register("setfile", setfile);
        registry.register("uhdr", uhdr);
        registry.register("guhdr", guhdr);
        registry.register("groupfile", groupfile);
        registry.register("calib", calib);
        registry.register("display", display);
        registry.register("require", require);
        registry.register("last_member_only", last_member_only);
        registry.register("terminate", terminate);
        registry.register("die", die);
        registry.register("fatal", fatal);
        registry
    }

    /// Add or replace an action.
    pub fn register<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&mut ExecContext<'_>, &str) -> Result<Status, ActionError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.actions.keys()).finish()
    }
}

fn key_and_value<'t>(action: &str, text: &'t str) -> Result<(&'t str, &'t str), ActionError> {
    let (key, value) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    if key.is_empty() {
        return Err(ActionError::Failed(format!("{}: missing name", action)));
    }
    Ok((key, value.trim()))
}

fn print(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    ctx.reporter.print(text);
    Ok(Status::Ok)
}

fn set(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let (name, value) = key_and_value("set", text)?;
    ctx.vars.insert(name.to_string(), value.to_string());
    Ok(Status::Ok)
}

fn setfile(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    if text.is_empty() {
        return Err(ActionError::Failed("setfile: missing path".into()));
    }
    let path = ctx.resolve_path(text);
    ctx.frame_mut().set_file(path);
    Ok(Status::Ok)
}

fn uhdr(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let (key, value) = key_and_value("uhdr", text)?;
    ctx.frame_mut()
        .uhdr
        .insert(key.to_string(), HeaderValue::parse(value));
    Ok(Status::Ok)
}

fn guhdr(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let (key, value) = key_and_value("guhdr", text)?;
    ctx.group_mut()
        .uhdr
        .insert(key.to_string(), HeaderValue::parse(value));
    Ok(Status::Ok)
}

fn groupfile(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    if text.is_empty() {
        return Err(ActionError::Failed("groupfile: missing path".into()));
    }
    let path = ctx.resolve_path(text);
    ctx.group_mut().set_file(path);
    Ok(Status::Ok)
}

/// `calib ROLE [PAYLOAD]`: file the current frame (or PAYLOAD) as a calibration.
fn calib(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let (role, payload) = key_and_value("calib", text)?;
    let payload = if payload.is_empty() {
        ctx.persistent_path(ctx.frame().file())
    } else {
        ctx.persistent_path(Path::new(payload))
    }
    .display()
    .to_string();
    let context = ctx.frame().context();
    ctx.calibration
        .record(role, payload, &context)
        .map_err(|e| ActionError::Failed(e.to_string()))?;
    Ok(Status::Ok)
}

fn display(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let file = if text.is_empty() {
        ctx.frame().file().to_path_buf()
    } else {
        ctx.resolve_path(text)
    };
    let obsnum = ctx.frame().obsnum();
    ctx.display.display(obsnum, &file);
    Ok(Status::Ok)
}

/// `require KEY OP VALUE` with OP one of `== != < <= > >=`.
fn require(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    let mut parts = text.splitn(3, char::is_whitespace);
    let (Some(key), Some(op), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ActionError::Failed(format!(
            "require: expected KEY OP VALUE, got {:?}",
            text
        )));
    };
    let expected = HeaderValue::parse(expected.trim().trim_matches('"'));
    let Some(actual) = ctx.frame().header(key).cloned() else {
        return Err(ActionError::Failed(format!("require: header {} not set", key)));
    };
    let holds = match op {
        "==" => actual.loosely_equals(&expected),
        "!=" => !actual.loosely_equals(&expected),
        "<" | "<=" | ">" | ">=" => {
            let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) else {
                return Err(ActionError::Failed(format!(
                    "require: {} {} {} is not a numeric comparison",
                    key, op, expected
                )));
            };
            match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                _ => a >= b,
            }
        }
        other => {
            return Err(ActionError::Failed(format!(
                "require: unknown operator {:?}",
                other
            )))
        }
    };
    if holds {
        Ok(Status::Ok)
    } else {
        ctx.reporter.warn(&format!(
            "Requirement {} {} {} not met ({} = {})",
            key, op, expected, key, actual
        ));
        Ok(Status::Error)
    }
}

/// TERMINATED unless the frame is the last current member of its group.
fn last_member_only(ctx: &mut ExecContext<'_>, _text: &str) -> Result<Status, ActionError> {
    if ctx.group().is_last_member(ctx.frame_index()) {
        Ok(Status::Ok)
    } else {
        Ok(Status::Terminated)
    }
}

fn terminate(ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    if !text.is_empty() {
        ctx.reporter.print(text);
    }
    Ok(Status::Terminated)
}

fn die(_ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    Err(ActionError::Failed(if text.is_empty() {
        "recipe died".to_string()
    } else {
        text.to_string()
    }))
}

fn fatal(_ctx: &mut ExecContext<'_>, text: &str) -> Result<Status, ActionError> {
    Err(ActionError::Interrupted(Interrupt::Fatal(text.to_string())))
}
