//! Modal grouping of modules
//!
//! A mode collapses a group of modules behind an always visible summary. Its
//! members stay visible; its details only show while the mode is expanded. At
//! most one mode is expanded at a time, and the expanded mode's details can be
//! cycled.

use crate::aggregator::SlotId;
use crate::segment::Output;
use log::debug;
use serde::{Deserialize, Serialize};

/// Handle to a registered mode. Only the bar builder hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(usize);

impl ModeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Place of a module inside a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Always visible next to the summary.
    #[default]
    Member,
    /// Visible only while the mode is expanded.
    Detail,
}

/// How an expanded mode shows its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailView {
    /// Every detail at once, in declaration order.
    All,
    /// Only the detail at the current index; cycling rotates through them.
    #[default]
    One,
}

#[derive(Debug, Clone)]
pub enum Summary {
    Static(Output),
    Module(SlotId),
}

#[derive(Debug, Clone)]
pub struct Mode {
    name: String,
    summary: Summary,
    entries: Vec<(SlotId, Role)>,
    view: DetailView,
}

impl Mode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Members and details in declaration order.
    pub fn entries(&self) -> &[(SlotId, Role)] {
        &self.entries
    }

    pub fn view(&self) -> DetailView {
        self.view
    }

    pub fn details(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.entries
            .iter()
            .filter(|(_, role)| *role == Role::Detail)
            .map(|(slot, _)| *slot)
    }

    pub fn detail_count(&self) -> usize {
        self.details().count()
    }
}

/// Current expansion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Collapsed,
    Expanded(ModeId),
}

/// Owner of every mode and the only writer of the expansion state.
#[derive(Debug, Default)]
pub struct ModalController {
    modes: Vec<Mode>,
    expanded: Option<ModeId>,
    detail_index: Vec<usize>,
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_mode(&mut self, name: &str, view: DetailView) -> ModeId {
        let id = ModeId(self.modes.len());
        self.modes.push(Mode {
            name: name.to_string(),
            summary: Summary::Static(Output::empty()),
            entries: Vec::new(),
            view,
        });
        self.detail_index.push(0);
        id
    }

    pub(crate) fn set_summary(&mut self, id: ModeId, summary: Summary) {
        self.modes[id.0].summary = summary;
    }

    pub(crate) fn add_entry(&mut self, id: ModeId, slot: SlotId, role: Role) {
        self.modes[id.0].entries.push((slot, role));
    }

    pub fn mode(&self, id: ModeId) -> &Mode {
        &self.modes[id.0]
    }

    pub fn modes(&self) -> impl Iterator<Item = (ModeId, &Mode)> {
        self.modes.iter().enumerate().map(|(i, m)| (ModeId(i), m))
    }

    pub fn find(&self, name: &str) -> Option<ModeId> {
        self.modes.iter().position(|m| m.name == name).map(ModeId)
    }

    pub fn state(&self) -> ModalState {
        match self.expanded {
            Some(id) => ModalState::Expanded(id),
            None => ModalState::Collapsed,
        }
    }

    pub fn is_expanded(&self, id: ModeId) -> bool {
        self.expanded == Some(id)
    }

    pub fn detail_index(&self, id: ModeId) -> usize {
        self.detail_index[id.0]
    }

    /// Expand `id`, or collapse it when it is already the expanded mode.
    pub fn toggle(&mut self, id: ModeId) -> ModalState {
        if self.expanded == Some(id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id);
            self.detail_index[id.0] = 0;
        }
        debug!("Mode `{}` toggled, now {:?}", self.modes[id.0].name, self.state());
        self.state()
    }

    /// Advance the detail index of the expanded mode. Returns whether the
    /// visible details changed, so `All` modes never report a change.
    pub fn cycle_detail(&mut self, id: ModeId) -> bool {
        if self.expanded != Some(id) {
            return false;
        }
        let mode = &self.modes[id.0];
        let count = mode.detail_count();
        if count < 2 || mode.view == DetailView::All {
            return false;
        }
        let index = &mut self.detail_index[id.0];
        *index = (*index + 1) % count;
        true
    }

    /// Collapse whatever is expanded. Returns whether anything changed.
    pub fn collapse(&mut self) -> bool {
        self.expanded.take().is_some()
    }

    /// Whether `slot`, a detail of `id`, is shown right now.
    pub fn detail_visible(&self, id: ModeId, slot: SlotId) -> bool {
        if self.expanded != Some(id) {
            return false;
        }
        let mode = &self.modes[id.0];
        match mode.view {
            DetailView::All => mode.details().any(|d| d == slot),
            DetailView::One => mode.details().nth(self.detail_index[id.0]) == Some(slot),
        }
    }
}
