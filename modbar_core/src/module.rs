//! Module contract and the stock module variants
//!
//! A module is anything that, given a [`Sink`], runs forever producing
//! [`Output`]s. The stock variants compose a trigger (a [`Scheduler`] or an
//! event channel) with a compute function.

use crate::aggregator::SlotId;
use crate::error::{BarError, Result};
use crate::scheduler::Scheduler;
use crate::segment::Output;
use anyhow::anyhow;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One push travelling from a module to the bar actor.
#[derive(Debug)]
pub(crate) struct Update {
    pub slot: SlotId,
    pub seq: u64,
    pub output: Output,
}

/// Write end of a module's slot.
///
/// Every push is stamped with a per-slot logical sequence number so the
/// aggregator can reject a stale value that arrives late.
#[derive(Debug, Clone)]
pub struct Sink {
    slot: SlotId,
    name: Arc<str>,
    seq: Arc<AtomicU64>,
    tx: mpsc::Sender<Update>,
}

impl Sink {
    pub(crate) fn new(slot: SlotId, name: &str, tx: mpsc::Sender<Update>) -> Self {
        Self {
            slot,
            name: Arc::from(name),
            seq: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    /// Replace the module's output. Waits only when the bar is backed up.
    pub async fn push<O: Into<Output>>(&self, output: O) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Push #{} from `{}`", seq, self.name);
        self.tx
            .send(Update {
                slot: self.slot,
                seq,
                output: output.into(),
            })
            .await
            .map_err(|_| BarError::ChannelClosed)
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What a module shows after a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Keep showing the last successful output.
    #[default]
    KeepLast,
    /// Show nothing until the next successful tick.
    Clear,
}

/// A unit that streams outputs into its sink for the life of the process.
pub trait Module: Send + 'static {
    fn stream(self: Box<Self>, sink: Sink) -> BoxFuture<'static, ()>;
}

/// Turns producer results into outputs, absorbing failures.
struct Recovery {
    name: String,
    policy: OnError,
    last: Output,
    failures: u32,
}

impl Recovery {
    fn new(name: &str, policy: OnError) -> Self {
        Self {
            name: name.to_string(),
            policy,
            last: Output::empty(),
            failures: 0,
        }
    }

    fn settle(&mut self, result: anyhow::Result<Output>) -> Output {
        match result {
            Ok(output) => {
                if self.failures > 0 {
                    info!(
                        "Module `{}` recovered after {} failed tick(s)",
                        self.name, self.failures
                    );
                }
                self.failures = 0;
                self.last = output.clone();
                output
            }
            Err(e) => {
                self.failures += 1;
                warn!(
                    "Module `{}` failed ({} in a row): {:#}",
                    self.name, self.failures, e
                );
                match self.policy {
                    OnError::KeepLast => self.last.clone(),
                    OnError::Clear => Output::empty(),
                }
            }
        }
    }
}

type Produce = Box<dyn FnMut() -> BoxFuture<'static, anyhow::Result<Output>> + Send>;

/// Scheduler-driven module: produces once at start, then on every tick.
pub struct TimerModule {
    scheduler: Scheduler,
    produce: Produce,
    on_error: OnError,
}

impl TimerModule {
    pub fn new<F, Fut>(scheduler: Scheduler, mut produce: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Output>> + Send + 'static,
    {
        Self {
            scheduler,
            produce: Box::new(move || produce().boxed()),
            on_error: OnError::default(),
        }
    }

    /// Run a blocking producer (subprocess, sync client) on the blocking pool.
    pub fn blocking<F>(scheduler: Scheduler, produce: F) -> Self
    where
        F: FnMut() -> anyhow::Result<Output> + Send + 'static,
    {
        let produce = Arc::new(Mutex::new(produce));
        Self::new(scheduler, move || {
            let produce = produce.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    // 上一次 panic 只算那一次失败
                    let mut guard = produce.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    (*guard)()
                })
                .await
                .map_err(|e| anyhow!("producer task failed: {}", e))?
            }
        })
    }

    pub fn on_error(mut self, policy: OnError) -> Self {
        self.on_error = policy;
        self
    }
}

impl Module for TimerModule {
    fn stream(self: Box<Self>, sink: Sink) -> BoxFuture<'static, ()> {
        let TimerModule {
            mut scheduler,
            mut produce,
            on_error,
        } = *self;
        async move {
            let mut recovery = Recovery::new(sink.name(), on_error);
            scheduler.arm();
            debug!(
                "Module `{}` running every {:?}",
                sink.name(),
                scheduler.period()
            );
            loop {
                let output = recovery.settle(produce().await);
                if sink.push(output).await.is_err() {
                    debug!("Bar gone, module `{}` stops", sink.name());
                    return;
                }
                scheduler.tick().await;
            }
        }
        .boxed()
    }
}

type Format<T> = Box<dyn FnMut(T) -> anyhow::Result<Output> + Send>;

/// Event-driven module: formats every value received on its trigger channel.
pub struct EventModule<T> {
    events: mpsc::Receiver<T>,
    format: Format<T>,
    initial: Option<Output>,
    on_error: OnError,
}

impl<T: Send + 'static> EventModule<T> {
    pub fn new<F>(events: mpsc::Receiver<T>, format: F) -> Self
    where
        F: FnMut(T) -> anyhow::Result<Output> + Send + 'static,
    {
        Self {
            events,
            format: Box::new(format),
            initial: None,
            on_error: OnError::default(),
        }
    }

    /// Output shown before the first event arrives.
    pub fn initial<O: Into<Output>>(mut self, output: O) -> Self {
        self.initial = Some(output.into());
        self
    }

    pub fn on_error(mut self, policy: OnError) -> Self {
        self.on_error = policy;
        self
    }
}

impl<T: Send + 'static> Module for EventModule<T> {
    fn stream(self: Box<Self>, sink: Sink) -> BoxFuture<'static, ()> {
        let EventModule {
            mut events,
            mut format,
            initial,
            on_error,
        } = *self;
        async move {
            let mut recovery = Recovery::new(sink.name(), on_error);
            if let Some(output) = initial {
                recovery.last = output.clone();
                if sink.push(output).await.is_err() {
                    return;
                }
            }
            while let Some(event) = events.recv().await {
                let output = recovery.settle(format(event));
                if sink.push(output).await.is_err() {
                    debug!("Bar gone, module `{}` stops", sink.name());
                    return;
                }
            }
            warn!("Event source of module `{}` closed", sink.name());
        }
        .boxed()
    }
}

/// Pushes one fixed output and then idles.
pub struct StaticModule(Output);

impl StaticModule {
    pub fn new<O: Into<Output>>(output: O) -> Self {
        Self(output.into())
    }
}

impl Module for StaticModule {
    fn stream(self: Box<Self>, sink: Sink) -> BoxFuture<'static, ()> {
        async move {
            if sink.push(self.0).await.is_ok() {
                futures::future::pending::<()>().await;
            }
        }
        .boxed()
    }
}

/// Module backed by a closure that owns the whole loop.
pub struct FnModule(Box<dyn FnOnce(Sink) -> BoxFuture<'static, ()> + Send>);

/// Build a module from an async closure taking the sink.
pub fn from_fn<F, Fut>(f: F) -> FnModule
where
    F: FnOnce(Sink) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    FnModule(Box::new(move |sink| f(sink).boxed()))
}

impl Module for FnModule {
    fn stream(self: Box<Self>, sink: Sink) -> BoxFuture<'static, ()> {
        (self.0)(sink)
    }
}

/// Runs one module and spreads each of its outputs over two slots: the first
/// `at` segments go to the sink it is streamed into, the rest to `tail`.
pub(crate) struct SplitModule {
    inner: Box<dyn Module>,
    at: usize,
    tail: Sink,
}

impl SplitModule {
    pub(crate) fn new(inner: Box<dyn Module>, at: usize, tail: Sink) -> Self {
        Self { inner, at, tail }
    }
}

impl Module for SplitModule {
    fn stream(self: Box<Self>, head: Sink) -> BoxFuture<'static, ()> {
        let SplitModule { inner, at, tail } = *self;
        async move {
            let (tx, mut rx) = mpsc::channel(1);
            let produce = inner.stream(Sink::new(head.slot(), head.name(), tx));
            // 内部模块结束后转发完剩余输出再退出
            let forward = async move {
                while let Some(update) = rx.recv().await {
                    let (first, rest) = update.output.split_at(at);
                    if head.push(first).await.is_err() || tail.push(rest).await.is_err() {
                        debug!("Bar gone, split `{}` stops", head.name());
                        return;
                    }
                }
            };
            futures::future::join(produce, forward).await;
        }
        .boxed()
    }
}
