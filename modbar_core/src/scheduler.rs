//! Periodic triggers for timer-driven modules

use crate::error::{BarError, Result};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Parse a human period such as `"5s"`, `"10m"` or `"1h 30m"`.
///
/// Malformed and zero periods are configuration errors.
pub fn parse_period(text: &str) -> Result<Duration> {
    let period = parse_duration(text)?;
    if period.is_zero() {
        return Err(BarError::invalid_period(text, "period must be positive"));
    }
    Ok(period)
}

/// Like [`parse_period`] but zero is allowed, for grace periods and timeouts.
pub fn parse_duration(text: &str) -> Result<Duration> {
    humantime::parse_duration(text.trim()).map_err(|e| BarError::invalid_period(text, e.to_string()))
}

/// A repeating trigger on a fixed cadence.
///
/// Ticks land on `arm + k * period` for `k >= 1`. The grid is measured from the
/// moment the scheduler is armed, not from when the previous tick was handled:
/// a consumer that falls behind skips the ticks it missed and resumes on the
/// grid. The scheduler arms itself on the first call to [`Scheduler::tick`],
/// which keeps construction usable outside a runtime.
#[derive(Debug)]
pub struct Scheduler {
    period: Duration,
    interval: Option<Interval>,
    armed_at: Option<Instant>,
    last_fire: Option<Instant>,
    fired: u64,
}

impl Scheduler {
    pub fn every(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(BarError::invalid_period(
                format!("{:?}", period),
                "period must be positive",
            ));
        }
        Ok(Self {
            period,
            interval: None,
            armed_at: None,
            last_fire: None,
            fired: 0,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::every(parse_period(text)?)
    }

    /// Start the cadence now. Calling it again has no effect.
    pub fn arm(&mut self) {
        self.interval();
    }

    fn interval(&mut self) -> &mut Interval {
        let period = self.period;
        let armed_at = &mut self.armed_at;
        self.interval.get_or_insert_with(|| {
            let now = Instant::now();
            *armed_at = Some(now);
            let mut interval = tokio::time::interval_at(now + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        })
    }

    /// Wait for the next trigger.
    pub async fn tick(&mut self) -> Instant {
        let at = self.interval().tick().await;
        self.fired += 1;
        self.last_fire = Some(at);
        at
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of triggers delivered so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    pub fn armed_at(&self) -> Option<Instant> {
        self.armed_at
    }
}
