//! Groups
//!
//! An ordered collection of frames sharing a group key. `all_members` holds every
//! frame ever pushed; `members` is the order-preserving subsequence that is still
//! good and not excluded by the bad-observation filter. It is recomputed every
//! time `all_members` or a frame's good flag changes.

pub mod badobs;
pub mod registry;

pub use badobs::BadObsFilter;
pub use registry::GroupSet;

use crate::frame::Frame;
use crate::header::Headers;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filter shared by every group in a run.
pub type SharedFilter = Arc<RwLock<BadObsFilter>>;

#[derive(Debug)]
pub struct Group {
    key: String,
    all: Vec<Frame>,
    members: Vec<usize>,
    filter: SharedFilter,
    /// Group-level header values
    pub hdr: Headers,
    /// Group-level derived values
    pub uhdr: Headers,
    file: PathBuf,
}

impl Group {
    pub fn new(key: impl Into<String>, filter: SharedFilter) -> Self {
        Self {
            key: key.into(),
            all: Vec::new(),
            members: Vec::new(),
            filter,
            hdr: Headers::new(),
            uhdr: Headers::new(),
            file: PathBuf::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Output filename for the group's coadded product.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.file = file.into();
    }

    /// Append a frame and recompute membership. Returns its index in `all_members`.
    pub fn push(&mut self, frame: Frame) -> usize {
        self.all.push(frame);
        self.check_membership();
        self.all.len() - 1
    }

    /// Replace every frame and recompute membership.
    pub fn replace_all(&mut self, frames: Vec<Frame>) {
        self.all = frames;
        self.check_membership();
    }

    /// Recompute `members` from `all_members`.
    pub fn check_membership(&mut self) {
        let filter = self.filter.read();
        self.members = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, frame)| frame.is_good() && !filter.matches(frame))
            .map(|(index, _)| index)
            .collect();
    }

    pub fn all_members(&self) -> &[Frame] {
        &self.all
    }

    pub fn members(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.members.iter().map(move |&i| &self.all[i])
    }

    /// Indices into `all_members` of the current members.
    pub fn member_indices(&self) -> &[usize] {
        &self.members
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.all.get(index)
    }

    /// Mutable access for working-file and header updates.
    ///
    /// Good-flag changes go through [`Group::mark_bad`] so membership stays current.
    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.all.get_mut(index)
    }

    pub fn mark_bad(&mut self, index: usize) {
        if let Some(frame) = self.all.get_mut(index) {
            frame.mark_bad();
            self.check_membership();
        }
    }

    pub fn is_member(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    /// True when the frame at `index` is the last current member.
    pub fn is_last_member(&self, index: usize) -> bool {
        self.members.last() == Some(&index)
    }
}

impl std::ops::Index<usize> for Group {
    type Output = Frame;

    fn index(&self, index: usize) -> &Frame {
        &self.all[index]
    }
}

impl std::ops::IndexMut<usize> for Group {
    fn index_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.all[index]
    }
}
