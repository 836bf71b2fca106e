//! Bar actor: the single owner of slots and modal state
//!
//! Modules run as independent tasks and push into a bounded channel. Modal
//! commands and clicks arrive on a second, unbounded channel. The actor applies
//! whatever is queued, composes the line once and hands it to the render sink.

use crate::aggregator::{Aggregator, Origin, SlotId};
use crate::config::{ColorScheme, RuntimeConfig};
use crate::error::{BarError, Result};
use crate::modal::{DetailView, ModalController, ModeId, Role, Summary};
use crate::module::{Module, Sink, SplitModule, Update};
use crate::segment::{Block, Button, ClickEvent, Output};
use crate::stats::RenderStats;
use log::{debug, error, info, warn};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Receives every composed line.
pub trait RenderSink: Send {
    fn render(&mut self, line: &[Block], scheme: &ColorScheme) -> Result<()>;
}

#[derive(Debug)]
enum Command {
    Toggle(ModeId),
    Cycle(ModeId),
    Collapse,
    Click(ClickEvent),
}

/// Cloneable handle for changing the expanded mode from anywhere, including
/// click handlers running on the actor itself.
#[derive(Debug, Clone)]
pub struct ModalHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ModalHandle {
    pub fn toggle(&self, mode: ModeId) {
        self.send(Command::Toggle(mode));
    }

    pub fn cycle(&self, mode: ModeId) {
        self.send(Command::Cycle(mode));
    }

    pub fn collapse(&self) {
        self.send(Command::Collapse);
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.tx.send(command) {
            debug!("Bar gone, dropping {:?}", e.0);
        }
    }
}

/// Entry point for click events reported by the bar host.
#[derive(Debug, Clone)]
pub struct ClickDispatcher {
    tx: mpsc::UnboundedSender<Command>,
}

impl ClickDispatcher {
    pub fn dispatch(&self, event: ClickEvent) -> Result<()> {
        self.tx
            .send(Command::Click(event))
            .map_err(|_| BarError::ChannelClosed)
    }
}

/// Collects modules and modes, then produces a [`Bar`].
pub struct BarBuilder {
    aggregator: Aggregator,
    modal: ModalController,
    modules: Vec<(SlotId, String, Box<dyn Module>)>,
    scheme: ColorScheme,
    coalesce: bool,
    push_tx: mpsc::Sender<Update>,
    push_rx: mpsc::Receiver<Update>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl BarBuilder {
    pub fn new(runtime: &RuntimeConfig, scheme: ColorScheme) -> Self {
        let (push_tx, push_rx) = mpsc::channel(runtime.channel_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Self {
            aggregator: Aggregator::new(),
            modal: ModalController::new(),
            modules: Vec::new(),
            scheme,
            coalesce: runtime.coalesce,
            push_tx,
            push_rx,
            cmd_tx,
            cmd_rx,
        }
    }

    pub fn modal(&self) -> ModalHandle {
        ModalHandle {
            tx: self.cmd_tx.clone(),
        }
    }

    pub fn clicks(&self) -> ClickDispatcher {
        ClickDispatcher {
            tx: self.cmd_tx.clone(),
        }
    }

    /// Add a standalone module, rendered after everything added before it.
    pub fn add<M: Module>(&mut self, id: &str, module: M) -> Result<SlotId> {
        self.ensure_not_mode(id)?;
        let slot = self.aggregator.register(id)?;
        self.queue(slot, id, module);
        Ok(slot)
    }

    /// Add a mode. It renders at this point of the layout.
    pub fn add_mode(&mut self, name: &str, view: DetailView) -> Result<ModeId> {
        if self.modal.find(name).is_some() || self.aggregator.find(name).is_some() {
            return Err(BarError::DuplicateMode {
                name: name.to_string(),
            });
        }
        let mode = self.modal.add_mode(name, view);
        self.aggregator.place_mode(mode);
        info!("Registered mode `{}` ({:?})", name, view);
        Ok(mode)
    }

    pub fn set_summary<O: Into<Output>>(&mut self, mode: ModeId, output: O) {
        self.modal.set_summary(mode, Summary::Static(output.into()));
    }

    /// Let a module drive the summary of `mode`.
    pub fn set_summary_module<M: Module>(
        &mut self,
        mode: ModeId,
        id: &str,
        module: M,
    ) -> Result<SlotId> {
        self.ensure_not_mode(id)?;
        let slot = self.aggregator.register_slot(id)?;
        self.modal.set_summary(mode, Summary::Module(slot));
        self.queue(slot, id, module);
        Ok(slot)
    }

    pub fn add_member<M: Module>(&mut self, mode: ModeId, id: &str, module: M) -> Result<SlotId> {
        self.add_to_mode(mode, id, module, Role::Member)
    }

    pub fn add_detail<M: Module>(&mut self, mode: ModeId, id: &str, module: M) -> Result<SlotId> {
        self.add_to_mode(mode, id, module, Role::Detail)
    }

    pub fn add_to_mode<M: Module>(
        &mut self,
        mode: ModeId,
        id: &str,
        module: M,
        role: Role,
    ) -> Result<SlotId> {
        self.ensure_not_mode(id)?;
        let slot = self.aggregator.register_slot(id)?;
        self.modal.add_entry(mode, slot, role);
        self.queue(slot, id, module);
        Ok(slot)
    }

    /// Split one module over a mode: the first `at` segments of every output
    /// render as a member named `id`, the rest as a detail named `id.detail`.
    pub fn add_split<M: Module>(
        &mut self,
        mode: ModeId,
        id: &str,
        module: M,
        at: usize,
    ) -> Result<(SlotId, SlotId)> {
        let detail_id = format!("{}.detail", id);
        for name in [id, detail_id.as_str()] {
            self.ensure_not_mode(name)?;
            if self.aggregator.find(name).is_some() {
                return Err(BarError::DuplicateModule {
                    id: name.to_string(),
                });
            }
        }
        let member = self.aggregator.register_slot(id)?;
        let detail = self.aggregator.register_slot(&detail_id)?;
        self.modal.add_entry(mode, member, Role::Member);
        self.modal.add_entry(mode, detail, Role::Detail);
        let tail = Sink::new(detail, &detail_id, self.push_tx.clone());
        self.queue(member, id, SplitModule::new(Box::new(module), at, tail));
        Ok((member, detail))
    }

    pub fn find_mode(&self, name: &str) -> Option<ModeId> {
        self.modal.find(name)
    }

    pub fn build(self) -> Bar {
        let (line_tx, _) = watch::channel(Vec::new());
        Bar {
            aggregator: self.aggregator,
            modal: self.modal,
            modules: self.modules,
            scheme: self.scheme,
            coalesce: self.coalesce,
            push_tx: Some(self.push_tx),
            push_rx: self.push_rx,
            cmd_tx: self.cmd_tx,
            cmd_rx: self.cmd_rx,
            line: Vec::new(),
            line_tx,
            stats: RenderStats::new(),
        }
    }

    fn ensure_not_mode(&self, id: &str) -> Result<()> {
        if self.modal.find(id).is_some() {
            return Err(BarError::DuplicateModule { id: id.to_string() });
        }
        Ok(())
    }

    fn queue<M: Module>(&mut self, slot: SlotId, id: &str, module: M) {
        info!("Registered module `{}`", id);
        let module: Box<dyn Module> = Box::new(module);
        self.modules.push((slot, id.to_string(), module));
    }
}

/// Aborts the module tasks when the actor stops.
struct ModuleTasks(Vec<JoinHandle<()>>);

impl Drop for ModuleTasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

/// The running bar. Built by [`BarBuilder`], consumed by [`Bar::run`].
pub struct Bar {
    aggregator: Aggregator,
    modal: ModalController,
    modules: Vec<(SlotId, String, Box<dyn Module>)>,
    scheme: ColorScheme,
    coalesce: bool,
    push_tx: Option<mpsc::Sender<Update>>,
    push_rx: mpsc::Receiver<Update>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    line: Vec<Block>,
    line_tx: watch::Sender<Vec<Block>>,
    stats: RenderStats,
}

impl Bar {
    pub fn modal(&self) -> ModalHandle {
        ModalHandle {
            tx: self.cmd_tx.clone(),
        }
    }

    pub fn clicks(&self) -> ClickDispatcher {
        ClickDispatcher {
            tx: self.cmd_tx.clone(),
        }
    }

    /// Follow every rendered line.
    pub fn watch(&self) -> watch::Receiver<Vec<Block>> {
        self.line_tx.subscribe()
    }

    /// Spawn every module and render until the sink fails.
    pub async fn run<S: RenderSink>(mut self, mut sink: S) -> Result<()> {
        let Some(push_tx) = self.push_tx.take() else {
            return Err(BarError::config("bar is already running"));
        };
        let modules = std::mem::take(&mut self.modules);
        info!("Starting bar with {} module(s)", modules.len());
        let _tasks = ModuleTasks(
            modules
                .into_iter()
                .map(|(slot, id, module)| tokio::spawn(module.stream(Sink::new(slot, &id, push_tx.clone()))))
                .collect(),
        );
        drop(push_tx);

        self.render(&mut sink)?;

        let mut pushes_open = true;
        loop {
            let mut changed = tokio::select! {
                update = self.push_rx.recv(), if pushes_open => match update {
                    Some(update) => self.apply_update(update),
                    None => {
                        warn!("Every module has stopped");
                        pushes_open = false;
                        continue;
                    }
                },
                Some(command) = self.cmd_rx.recv() => self.apply_command(command),
                else => {
                    info!("Nothing left to render, bar stops");
                    return Ok(());
                }
            };
            let mut applied = 1;

            if self.coalesce {
                while let Ok(update) = self.push_rx.try_recv() {
                    changed |= self.apply_update(update);
                    applied += 1;
                }
                while let Ok(command) = self.cmd_rx.try_recv() {
                    changed |= self.apply_command(command);
                    applied += 1;
                }
            }
            self.stats.record_batch(applied);

            if changed {
                self.render(&mut sink)?;
            }
        }
    }

    fn apply_update(&mut self, update: Update) -> bool {
        let changed = self.aggregator.push(update.slot, update.seq, update.output);
        if !changed {
            self.stats.record_unchanged();
        }
        changed
    }

    fn apply_command(&mut self, command: Command) -> bool {
        match command {
            Command::Toggle(mode) => {
                self.modal.toggle(mode);
                true
            }
            Command::Cycle(mode) => self.modal.cycle_detail(mode),
            Command::Collapse => self.modal.collapse(),
            Command::Click(event) => self.route_click(event),
        }
    }

    /// Route a click against the line the user is looking at.
    fn route_click(&mut self, event: ClickEvent) -> bool {
        let Some(block) = self
            .line
            .iter()
            .find(|b| b.name == event.name && b.instance == event.instance)
        else {
            debug!("Click on unknown block {}#{}", event.name, event.instance);
            return false;
        };
        let origin = block.origin;

        if let Some(handler) = block.segment.handler().cloned() {
            handler(&event);
            return false;
        }
        match (origin, event.button) {
            (Origin::Summary(mode), Button::Left) => {
                self.modal.toggle(mode);
                true
            }
            (Origin::Summary(_), Button::Right) => self.modal.collapse(),
            // 当前详情为空时没有可点的块，所以摘要也能切换
            (
                Origin::Summary(mode),
                Button::Middle | Button::ScrollUp | Button::ScrollDown,
            )
            | (Origin::Detail(mode), Button::Left | Button::ScrollUp | Button::ScrollDown) => {
                self.modal.cycle_detail(mode)
            }
            _ => false,
        }
    }

    fn render<S: RenderSink>(&mut self, sink: &mut S) -> Result<()> {
        let started = Instant::now();
        let line = self.aggregator.compose(&self.modal);
        if let Err(e) = sink.render(&line, &self.scheme) {
            error!("Render failed: {}", e);
            return Err(e);
        }
        self.stats.record_render(started.elapsed());
        debug!(
            "Rendered {} block(s), render #{} ({} coalesced, mean {:?}, slowest {:?})",
            line.len(),
            self.stats.renders(),
            self.stats.coalesced(),
            self.stats.render_times().mean(),
            self.stats.render_times().slowest()
        );
        self.line_tx.send_replace(line.clone());
        self.line = line;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::StaticModule;
    use crate::segment::Segment;

    fn builder() -> BarBuilder {
        BarBuilder::new(&RuntimeConfig::default(), ColorScheme::default())
    }

    #[test]
    fn modules_and_modes_share_one_namespace() {
        let mut b = builder();
        b.add("clock", StaticModule::new(Segment::text("12:00"))).unwrap();
        assert!(matches!(
            b.add_mode("clock", DetailView::One),
            Err(BarError::DuplicateMode { .. })
        ));

        let sys = b.add_mode("sys", DetailView::All).unwrap();
        assert!(matches!(
            b.add("sys", StaticModule::new(Segment::text("x"))),
            Err(BarError::DuplicateModule { .. })
        ));
        assert!(matches!(
            b.add_member(sys, "clock", StaticModule::new(Segment::text("x"))),
            Err(BarError::DuplicateModule { .. })
        ));
        assert!(matches!(
            b.add_mode("sys", DetailView::All),
            Err(BarError::DuplicateMode { .. })
        ));
        assert_eq!(b.find_mode("sys"), Some(sys));
    }

    #[test]
    fn click_on_summary_toggles_and_detail_cycles() {
        let mut b = builder();
        let sys = b.add_mode("sys", DetailView::One).unwrap();
        b.set_summary(sys, Segment::text("S"));
        let d1 = b.add_detail(sys, "d1", StaticModule::new(Output::empty())).unwrap();
        let d2 = b.add_detail(sys, "d2", StaticModule::new(Output::empty())).unwrap();
        let mut bar = b.build();
        bar.aggregator.push(d1, 1, Segment::text("one").into());
        bar.aggregator.push(d2, 1, Segment::text("two").into());
        bar.line = bar.aggregator.compose(&bar.modal);

        let click = |name: &str, button| ClickEvent {
            name: name.to_string(),
            instance: 0,
            button,
        };
        assert!(bar.route_click(click("sys", Button::Left)));
        assert!(bar.modal.is_expanded(sys));

        bar.line = bar.aggregator.compose(&bar.modal);
        assert!(bar.route_click(click("d1", Button::Left)));
        assert_eq!(bar.modal.detail_index(sys), 1);

        assert!(!bar.route_click(click("d1", Button::Middle)));
        assert!(bar.route_click(click("sys", Button::Right)));
        assert!(!bar.modal.is_expanded(sys));
    }

    fn click(name: &str, button: Button) -> ClickEvent {
        ClickEvent {
            name: name.to_string(),
            instance: 0,
            button,
        }
    }

    fn names(bar: &Bar) -> Vec<&str> {
        bar.line.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn empty_detail_can_be_cycled_past_from_the_summary() {
        let mut b = builder();
        let sys = b.add_mode("sys", DetailView::One).unwrap();
        b.set_summary(sys, Segment::text("S"));
        b.add_detail(sys, "d1", StaticModule::new(Output::empty())).unwrap();
        let d2 = b.add_detail(sys, "d2", StaticModule::new(Output::empty())).unwrap();
        let mut bar = b.build();
        bar.aggregator.push(d2, 1, Segment::text("two").into());

        assert!(bar.route_click(click("sys", Button::Left)));
        bar.line = bar.aggregator.compose(&bar.modal);
        // d1 为空，行里只剩摘要
        assert_eq!(names(&bar), vec!["sys"]);

        assert!(bar.route_click(click("sys", Button::Middle)));
        bar.line = bar.aggregator.compose(&bar.modal);
        assert_eq!(names(&bar), vec!["sys", "d2"]);

        assert!(bar.route_click(click("sys", Button::ScrollDown)));
        assert_eq!(bar.modal.detail_index(sys), 0);
    }

    #[test]
    fn cycling_an_all_view_needs_no_render() {
        let mut b = builder();
        let sys = b.add_mode("sys", DetailView::All).unwrap();
        b.set_summary(sys, Segment::text("S"));
        let d1 = b.add_detail(sys, "d1", StaticModule::new(Output::empty())).unwrap();
        let d2 = b.add_detail(sys, "d2", StaticModule::new(Output::empty())).unwrap();
        let mut bar = b.build();
        bar.aggregator.push(d1, 1, Segment::text("one").into());
        bar.aggregator.push(d2, 1, Segment::text("two").into());
        bar.modal.toggle(sys);
        bar.line = bar.aggregator.compose(&bar.modal);

        assert!(!bar.route_click(click("d1", Button::Left)));
        assert!(!bar.route_click(click("sys", Button::Middle)));
        assert!(!bar.apply_command(Command::Cycle(sys)));
    }

    #[test]
    fn split_registers_member_and_detail() {
        let mut b = builder();
        let media = b.add_mode("media", DetailView::One).unwrap();
        let (member, detail) = b
            .add_split(media, "player", StaticModule::new(Output::empty()), 1)
            .unwrap();
        assert_eq!(b.aggregator.find("player"), Some(member));
        assert_eq!(b.aggregator.find("player.detail"), Some(detail));
        assert_eq!(
            b.modal.mode(media).entries(),
            &[(member, Role::Member), (detail, Role::Detail)]
        );
        assert!(matches!(
            b.add_split(media, "player", StaticModule::new(Output::empty()), 1),
            Err(BarError::DuplicateModule { .. })
        ));
        // 失败的注册不留下半个槽位
        b.add("other", StaticModule::new(Output::empty())).unwrap();
        assert!(matches!(
            b.add_split(media, "other", StaticModule::new(Output::empty()), 1),
            Err(BarError::DuplicateModule { .. })
        ));
        assert_eq!(b.aggregator.find("other.detail"), None);
    }

    #[test]
    fn own_handler_wins_over_mode_rule() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let mut b = builder();
        let sys = b.add_mode("sys", DetailView::All).unwrap();
        b.set_summary(
            sys,
            Segment::text("S").on_click(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let mut bar = b.build();
        bar.line = bar.aggregator.compose(&bar.modal);

        let changed = bar.route_click(ClickEvent {
            name: "sys".to_string(),
            instance: 0,
            button: Button::Left,
        });
        assert!(!changed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!bar.modal.is_expanded(sys));
    }
}
