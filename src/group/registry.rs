//! Ordered set of groups for one run.

use super::{Group, SharedFilter};
use crate::frame::Frame;
use std::collections::HashMap;
use std::path::PathBuf;

/// Position of a frame inside the group set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub group: usize,
    pub frame: usize,
}

/// Groups in creation order, looked up by key.
#[derive(Debug)]
pub struct GroupSet {
    groups: Vec<Group>,
    by_key: HashMap<String, usize>,
    filter: SharedFilter,
    output_dir: PathBuf,
}

impl GroupSet {
    pub fn new(filter: SharedFilter, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            groups: Vec::new(),
            by_key: HashMap::new(),
            filter,
            output_dir: output_dir.into(),
        }
    }

    /// Push a frame into its group, creating the group on first use.
    pub fn assign(&mut self, frame: Frame) -> FrameSlot {
        let group = match self.by_key.get(frame.group_key()) {
            Some(&index) => index,
            None => {
                let mut group = Group::new(frame.group_key(), self.filter.clone());
                let mut name = format!("g{}", frame.raw_stem());
                if let Some(ext) = frame.raw().extension() {
                    name.push('.');
                    name.push_str(&ext.to_string_lossy());
                }
                group.set_file(self.output_dir.join(name));
                self.groups.push(group);
                let index = self.groups.len() - 1;
                self.by_key.insert(frame.group_key().to_string(), index);
                index
            }
        };
        let frame = self.groups[group].push(frame);
        FrameSlot { group, frame }
    }

    pub fn get(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    pub fn by_key(&self, key: &str) -> Option<&Group> {
        self.by_key.get(key).map(|&i| &self.groups[i])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Recompute membership everywhere after the filter rules changed.
    pub fn recheck_all(&mut self) {
        for group in &mut self.groups {
            group.check_membership();
        }
    }

    pub fn filter(&self) -> &SharedFilter {
        &self.filter
    }

    /// Drop every group.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.by_key.clear();
    }
}
