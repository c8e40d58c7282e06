//! Calibration selection per role.

use super::index::{CalibrationIndex, IndexEntry};
use super::rules::CalibrationRules;
use crate::error::CalibrationError;
use crate::header::Headers;
use crate::instrument::Instrument;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Current value for a role.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Operator override; never validated or replaced
    Pinned(String),
    /// Chosen from the index; revalidated on every read
    Dynamic(IndexEntry),
}

impl Binding {
    pub fn value(&self) -> &str {
        match self {
            Binding::Pinned(value) => value,
            Binding::Dynamic(entry) => &entry.payload,
        }
    }
}

#[derive(Debug, Clone)]
struct RoleState {
    rules: CalibrationRules,
    index: CalibrationIndex,
    binding: Option<Binding>,
}

/// Calibration bindings and indices for every role of an instrument.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    roles: BTreeMap<String, RoleState>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules and index files for every role the instrument declares.
    pub fn open(instrument: &Instrument, calibration_dir: &Path) -> Result<Self, CalibrationError> {
        let mut calibration = Self::new();
        for role in &instrument.calibration_roles {
            let rules = CalibrationRules::load(&instrument.rules.rules_path(role))?;
            let index = CalibrationIndex::open(
                role.clone(),
                calibration_dir.join(format!("index.{}", role)),
                rules.field_names(),
            )?;
            debug!(role = %role, entries = index.len(), "Calibration index loaded");
            calibration.add_role(rules, index);
        }
        Ok(calibration)
    }

    /// Register a role backed by the given rules and index.
    pub fn add_role(&mut self, rules: CalibrationRules, index: CalibrationIndex) {
        self.roles.insert(
            index.role().to_string(),
            RoleState {
                rules,
                index,
                binding: None,
            },
        );
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    fn role(&self, role: &str) -> Result<&RoleState, CalibrationError> {
        self.roles
            .get(role)
            .ok_or_else(|| CalibrationError::UnknownRole(role.to_string()))
    }

    fn role_mut(&mut self, role: &str) -> Result<&mut RoleState, CalibrationError> {
        self.roles
            .get_mut(role)
            .ok_or_else(|| CalibrationError::UnknownRole(role.to_string()))
    }

    /// Pin a role to an operator-supplied value.
    pub fn pin(&mut self, role: &str, value: impl Into<String>) -> Result<(), CalibrationError> {
        self.role_mut(role)?.binding = Some(Binding::Pinned(value.into()));
        Ok(())
    }

    pub fn is_pinned(&self, role: &str) -> bool {
        matches!(
            self.roles.get(role).and_then(|r| r.binding.as_ref()),
            Some(Binding::Pinned(_))
        )
    }

    /// Current binding without validation.
    pub fn binding(&self, role: &str) -> Option<&Binding> {
        self.roles.get(role).and_then(|r| r.binding.as_ref())
    }

    pub fn index(&self, role: &str) -> Result<&CalibrationIndex, CalibrationError> {
        Ok(&self.role(role)?.index)
    }

    pub fn rules(&self, role: &str) -> Result<&CalibrationRules, CalibrationError> {
        Ok(&self.role(role)?.rules)
    }

    /// Value for `role` in the given frame/group context.
    ///
    /// Pinned values come back untouched. A dynamic binding is kept while it is
    /// still compatible with `context`; otherwise the index is searched for the
    /// compatible entry nearest in time and that becomes the new binding.
    pub fn select(&mut self, role: &str, context: &Headers) -> Result<String, CalibrationError> {
        let state = self.role_mut(role)?;
        match &state.binding {
            Some(Binding::Pinned(value)) => return Ok(value.clone()),
            Some(Binding::Dynamic(entry)) => match state.rules.check(&entry.fields, context) {
                Ok(()) => return Ok(entry.payload.clone()),
                Err(reason) => {
                    debug!(role, payload = %entry.payload, %reason, "Calibration binding no longer valid");
                }
            },
            None => {}
        }
        let entry = state.index.nearest(&state.rules, context)?.clone();
        debug!(role, payload = %entry.payload, oractime = ?entry.oractime, "Calibration selected");
        let payload = entry.payload.clone();
        state.binding = Some(Binding::Dynamic(entry));
        Ok(payload)
    }

    /// File a new calibration produced by a frame with the given context.
    ///
    /// The entry is appended to the role's index and becomes the current binding
    /// unless the role is pinned.
    pub fn record(
        &mut self,
        role: &str,
        payload: impl Into<String>,
        context: &Headers,
    ) -> Result<(), CalibrationError> {
        let state = self.role_mut(role)?;
        let entry = IndexEntry::from_context(payload, state.index.columns(), context);
        state.index.append(entry.clone())?;
        if !matches!(state.binding, Some(Binding::Pinned(_))) {
            state.binding = Some(Binding::Dynamic(entry));
        }
        Ok(())
    }
}
