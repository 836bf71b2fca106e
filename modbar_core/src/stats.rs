//! Render statistics of the bar actor

use std::collections::VecDeque;
use std::time::Duration;

/// Durations of the most recent renders.
#[derive(Debug, Clone)]
pub struct RenderTimes {
    recent: VecDeque<Duration>,
    keep: usize,
    total: Duration,
    slowest: Duration,
}

impl RenderTimes {
    pub fn new(keep: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(keep.max(1)),
            keep: keep.max(1),
            total: Duration::ZERO,
            slowest: Duration::ZERO,
        }
    }

    pub fn record(&mut self, took: Duration) {
        if self.recent.len() == self.keep {
            if let Some(oldest) = self.recent.pop_front() {
                self.total -= oldest;
            }
        }
        self.recent.push_back(took);
        self.total += took;
        self.slowest = self.slowest.max(took);
    }

    /// Mean over the kept window, zero before the first render.
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.recent.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total / n,
        }
    }

    /// Slowest render since start, not only within the window.
    pub fn slowest(&self) -> Duration {
        self.slowest
    }
}

/// Counters kept by the bar while it runs.
#[derive(Debug, Clone)]
pub struct RenderStats {
    renders: u64,
    updates: u64,
    coalesced: u64,
    stale: u64,
    render_times: RenderTimes,
}

impl RenderStats {
    pub fn new() -> Self {
        Self {
            renders: 0,
            updates: 0,
            coalesced: 0,
            stale: 0,
            render_times: RenderTimes::new(60),
        }
    }

    /// A batch of `applied` messages has been folded into one render.
    pub fn record_batch(&mut self, applied: u64) {
        self.updates += applied;
        self.coalesced += applied.saturating_sub(1);
    }

    /// Pushes that did not change their slot.
    pub fn record_unchanged(&mut self) {
        self.stale += 1;
    }

    pub fn record_render(&mut self, took: Duration) {
        self.renders += 1;
        self.render_times.record(took);
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    pub fn unchanged(&self) -> u64 {
        self.stale
    }

    pub fn render_times(&self) -> &RenderTimes {
        &self.render_times
    }
}

impl Default for RenderStats {
    fn default() -> Self {
        Self::new()
    }
}
