//! Slot table and line composition

use crate::error::{BarError, Result};
use crate::modal::{ModalController, ModeId, Role, Summary};
use crate::segment::{Block, Output};
use log::trace;
use std::collections::HashMap;
use tokio::time::Instant;

/// Handle to a module slot. Only the aggregator hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Latest output of one module.
#[derive(Debug, Clone)]
pub struct ModuleSlot {
    id: String,
    latest: Output,
    last_updated: Option<Instant>,
    seq: u64,
}

impl ModuleSlot {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn latest(&self) -> &Output {
        &self.latest
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Where a segment of the composed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Module,
    Summary(ModeId),
    Member(ModeId),
    Detail(ModeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Module(SlotId),
    Mode(ModeId),
}

/// Owns every slot and the layout order.
#[derive(Debug, Default)]
pub struct Aggregator {
    slots: Vec<ModuleSlot>,
    names: HashMap<String, SlotId>,
    layout: Vec<Entry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a standalone slot, rendered at the current end of the layout.
    pub fn register(&mut self, id: &str) -> Result<SlotId> {
        let slot = self.register_slot(id)?;
        self.layout.push(Entry::Module(slot));
        Ok(slot)
    }

    /// Create a slot owned by a mode; the mode decides where it renders.
    pub(crate) fn register_slot(&mut self, id: &str) -> Result<SlotId> {
        if self.names.contains_key(id) {
            return Err(BarError::DuplicateModule { id: id.to_string() });
        }
        let slot = SlotId(self.slots.len());
        self.slots.push(ModuleSlot {
            id: id.to_string(),
            latest: Output::empty(),
            last_updated: None,
            seq: 0,
        });
        self.names.insert(id.to_string(), slot);
        Ok(slot)
    }

    pub(crate) fn place_mode(&mut self, mode: ModeId) {
        self.layout.push(Entry::Mode(mode));
    }

    /// Store `output` unless a newer push already landed. Returns whether the
    /// slot changed.
    pub fn push(&mut self, slot: SlotId, seq: u64, output: Output) -> bool {
        let entry = &mut self.slots[slot.0];
        if seq <= entry.seq {
            trace!("Dropping stale push #{} for `{}` (have #{})", seq, entry.id, entry.seq);
            return false;
        }
        entry.seq = seq;
        entry.last_updated = Some(Instant::now());
        if entry.latest == output {
            return false;
        }
        entry.latest = output;
        true
    }

    pub fn slot(&self, slot: SlotId) -> &ModuleSlot {
        &self.slots[slot.0]
    }

    pub fn find(&self, id: &str) -> Option<SlotId> {
        self.names.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Build the full line from the current slots and expansion state.
    pub fn compose(&self, modal: &ModalController) -> Vec<Block> {
        let mut line = Vec::new();
        for entry in &self.layout {
            match *entry {
                Entry::Module(slot) => self.emit_slot(&mut line, slot, Origin::Module),
                Entry::Mode(id) => {
                    let mode = modal.mode(id);
                    match mode.summary() {
                        Summary::Static(output) => {
                            emit(&mut line, mode.name(), output, Origin::Summary(id))
                        }
                        Summary::Module(slot) => {
                            self.emit_slot(&mut line, *slot, Origin::Summary(id))
                        }
                    }
                    for (slot, role) in mode.entries() {
                        match role {
                            Role::Member => self.emit_slot(&mut line, *slot, Origin::Member(id)),
                            Role::Detail if modal.detail_visible(id, *slot) => {
                                self.emit_slot(&mut line, *slot, Origin::Detail(id))
                            }
                            Role::Detail => {}
                        }
                    }
                }
            }
        }
        line
    }

    fn emit_slot(&self, line: &mut Vec<Block>, slot: SlotId, origin: Origin) {
        let entry = &self.slots[slot.0];
        emit(line, &entry.id, &entry.latest, origin);
    }
}

fn emit(line: &mut Vec<Block>, name: &str, output: &Output, origin: Origin) {
    for (instance, segment) in output.iter().enumerate() {
        line.push(Block {
            name: name.to_string(),
            instance,
            origin,
            segment: segment.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::DetailView;
    use crate::segment::Segment;

    fn texts(line: &[Block]) -> Vec<String> {
        line.iter().map(|b| b.segment.get_text().to_string()).collect()
    }

    #[test]
    fn renders_in_registration_order_regardless_of_push_order() {
        let mut agg = Aggregator::new();
        let modal = ModalController::new();
        let a = agg.register("a").unwrap();
        let b = agg.register("b").unwrap();
        let c = agg.register("c").unwrap();

        agg.push(c, 1, Segment::text("C").into());
        agg.push(a, 1, Segment::text("A").into());
        agg.push(b, 1, Segment::text("B").into());

        assert_eq!(texts(&agg.compose(&modal)), vec!["A", "B", "C"]);
    }

    #[test]
    fn keeps_segment_order_within_a_module() {
        let mut agg = Aggregator::new();
        let modal = ModalController::new();
        let a = agg.register("a").unwrap();
        agg.push(
            a,
            1,
            Output::from(vec![Segment::text("1"), Segment::text("2"), Segment::text("3")]),
        );
        let line = agg.compose(&modal);
        assert_eq!(texts(&line), vec!["1", "2", "3"]);
        assert_eq!(line[2].instance, 2);
        assert_eq!(line[2].name, "a");
    }

    #[test]
    fn last_write_wins_by_sequence() {
        let mut agg = Aggregator::new();
        let a = agg.register("a").unwrap();
        assert!(agg.push(a, 2, Segment::text("new").into()));
        assert!(!agg.push(a, 1, Segment::text("old").into()));
        assert_eq!(agg.slot(a).latest().plain_text(), "new");
        assert_eq!(agg.slot(a).seq(), 2);
    }

    #[test]
    fn identical_push_is_not_a_change() {
        let mut agg = Aggregator::new();
        let a = agg.register("a").unwrap();
        assert!(agg.push(a, 1, Segment::text("x").into()));
        assert!(!agg.push(a, 2, Segment::text("x").into()));
        assert_eq!(agg.slot(a).seq(), 2);
    }

    #[test]
    fn empty_output_renders_nothing() {
        let mut agg = Aggregator::new();
        let modal = ModalController::new();
        let a = agg.register("a").unwrap();
        let b = agg.register("b").unwrap();
        agg.push(a, 1, Output::empty());
        agg.push(b, 1, Segment::text("B").into());
        assert_eq!(texts(&agg.compose(&modal)), vec!["B"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut agg = Aggregator::new();
        agg.register("a").unwrap();
        assert!(matches!(
            agg.register("a"),
            Err(BarError::DuplicateModule { .. })
        ));
        assert!(agg.register_slot("a").is_err());
    }

    #[test]
    fn mode_hides_details_until_expanded() {
        let mut agg = Aggregator::new();
        let mut modal = ModalController::new();

        let clock = agg.register("clock").unwrap();
        let mode = modal.add_mode("sys", DetailView::All);
        agg.place_mode(mode);
        modal.set_summary(mode, Summary::Static(Segment::text("S").into()));
        let load = agg.register_slot("load").unwrap();
        let uptime = agg.register_slot("uptime").unwrap();
        let mem = agg.register_slot("mem").unwrap();
        modal.add_entry(mode, load, Role::Member);
        modal.add_entry(mode, uptime, Role::Detail);
        modal.add_entry(mode, mem, Role::Member);

        agg.push(clock, 1, Segment::text("12:00").into());
        agg.push(load, 1, Segment::text("0.5").into());
        agg.push(uptime, 1, Segment::text("3:10").into());
        agg.push(mem, 1, Segment::text("4G").into());

        assert_eq!(texts(&agg.compose(&modal)), vec!["12:00", "S", "0.5", "4G"]);

        modal.toggle(mode);
        let line = agg.compose(&modal);
        assert_eq!(texts(&line), vec!["12:00", "S", "0.5", "3:10", "4G"]);
        assert_eq!(line[1].origin, Origin::Summary(mode));
        assert_eq!(line[1].name, "sys");
        assert_eq!(line[3].origin, Origin::Detail(mode));
    }

    #[test]
    fn module_driven_summary() {
        let mut agg = Aggregator::new();
        let mut modal = ModalController::new();
        let mode = modal.add_mode("media", DetailView::One);
        agg.place_mode(mode);
        let icon = agg.register_slot("media-icon").unwrap();
        modal.set_summary(mode, Summary::Module(icon));
        agg.push(icon, 1, Segment::text("♫").into());

        let line = agg.compose(&modal);
        assert_eq!(texts(&line), vec!["♫"]);
        assert_eq!(line[0].origin, Origin::Summary(mode));
        assert_eq!(line[0].name, "media-icon");
    }
}
