//! Load average, memory, swap and uptime
//!
//! 数据来自 sysinfo；每个模块各自持有采样器，互不共享

use anyhow::Context;
use modbar_core::config::SystemConfig;
use modbar_core::format::{format_uptime, ibytes};
use modbar_core::{ClickHandler, Output, Scheduler, Segment, TimerModule, threshold};
use std::time::Duration;
use sysinfo::System;

/// `[1m, 5m, 15m]` load averages.
pub type Loads = [f64; 3];

fn loads() -> Loads {
    let l = System::load_average();
    [l.one, l.five, l.fifteen]
}

fn uptime() -> Duration {
    Duration::from_secs(System::uptime())
}

/// One-minute load, colored once the machine is past its boot grace period.
pub fn load_segment(loads: Loads, uptime: Duration, grace: Duration) -> Segment {
    let segment = Segment::text(format!("{:.2}", loads[0]));
    // 刚开机负载偏高，宽限期内不着色
    if uptime < grace {
        return segment;
    }
    let [one, _, fifteen] = loads;
    threshold(
        segment,
        one > 128.0 || fifteen > 64.0,
        &[
            one > 64.0 || fifteen > 32.0,
            one > 32.0 || fifteen > 16.0,
        ],
    )
}

pub fn load_detail_segment(loads: Loads) -> Segment {
    Segment::text(format!("{:.2} {:.2}", loads[1], loads[2]))
}

pub fn memory_segment(available: u64) -> Segment {
    let gib = available as f64 / (1u64 << 30) as f64;
    threshold(
        Segment::text(ibytes(available)),
        gib < 1.0,
        &[gib < 2.0, gib < 3.0, gib > 12.0],
    )
}

/// Used swap and its share of the total; nothing without swap.
pub fn swap_output(total: u64, free: u64) -> Output {
    if total == 0 {
        return Output::empty();
    }
    let used = total.saturating_sub(free);
    let pct = used as f64 / total as f64 * 100.0;
    Output::from(vec![
        Segment::text(ibytes(used)).separator(false),
        Segment::text(format!("({:2.0}%)", pct)),
    ])
}

pub fn uptime_segment(uptime: Duration) -> Segment {
    Segment::text(format_uptime(uptime))
}

fn attach(segment: Segment, handler: &Option<ClickHandler>) -> Segment {
    match handler {
        Some(handler) => segment.with_handler(handler.clone()),
        None => segment,
    }
}

/// Builds the system modules from one config section.
pub struct SystemModules {
    period: Duration,
    grace: Duration,
}

impl SystemModules {
    pub fn new(config: &SystemConfig) -> anyhow::Result<Self> {
        let period = modbar_core::parse_period(&config.period).context("system period")?;
        let grace = modbar_core::scheduler::parse_duration(&config.boot_grace).context("boot grace")?;
        Ok(Self { period, grace })
    }

    fn scheduler(&self) -> anyhow::Result<Scheduler> {
        Ok(Scheduler::every(self.period)?)
    }

    pub fn load(&self, on_click: Option<ClickHandler>) -> anyhow::Result<TimerModule> {
        let grace = self.grace;
        Ok(TimerModule::blocking(self.scheduler()?, move || {
            Ok(attach(load_segment(loads(), uptime(), grace), &on_click).into())
        }))
    }

    pub fn load_detail(&self) -> anyhow::Result<TimerModule> {
        Ok(TimerModule::blocking(self.scheduler()?, || {
            Ok(load_detail_segment(loads()).into())
        }))
    }

    pub fn memory(&self, on_click: Option<ClickHandler>) -> anyhow::Result<TimerModule> {
        let mut system = System::new();
        Ok(TimerModule::blocking(self.scheduler()?, move || {
            system.refresh_memory();
            Ok(attach(memory_segment(system.available_memory()), &on_click).into())
        }))
    }

    pub fn swap(&self) -> anyhow::Result<TimerModule> {
        let mut system = System::new();
        Ok(TimerModule::blocking(self.scheduler()?, move || {
            system.refresh_memory();
            Ok(swap_output(system.total_swap(), system.free_swap()))
        }))
    }

    pub fn uptime(&self) -> anyhow::Result<TimerModule> {
        Ok(TimerModule::blocking(self.scheduler()?, || {
            Ok(uptime_segment(uptime()).into())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbar_core::{ColorRef, Severity};

    const GRACE: Duration = Duration::from_secs(600);

    fn color(segment: &Segment) -> Option<Severity> {
        match segment.get_color() {
            Some(ColorRef::Semantic(s)) => Some(*s),
            _ => None,
        }
    }

    #[test]
    fn load_is_plain_during_boot_grace() {
        let s = load_segment([200.0, 100.0, 90.0], Duration::from_secs(120), GRACE);
        assert_eq!(s.get_text(), "200.00");
        assert!(!s.is_urgent());
        assert_eq!(color(&s), None);
    }

    #[test]
    fn load_thresholds_after_grace() {
        let up = Duration::from_secs(3600);
        assert!(load_segment([130.0, 0.0, 0.0], up, GRACE).is_urgent());
        assert_eq!(color(&load_segment([70.0, 0.0, 0.0], up, GRACE)), Some(Severity::Bad));
        assert_eq!(
            color(&load_segment([1.0, 0.0, 20.0], up, GRACE)),
            Some(Severity::Degraded)
        );
        assert_eq!(color(&load_segment([0.5, 0.4, 0.3], up, GRACE)), None);
    }

    #[test]
    fn memory_thresholds() {
        let gib = 1u64 << 30;
        assert!(memory_segment(gib / 2).is_urgent());
        assert_eq!(color(&memory_segment(gib + gib / 2)), Some(Severity::Bad));
        assert_eq!(color(&memory_segment(5 * gib / 2)), Some(Severity::Degraded));
        assert_eq!(color(&memory_segment(6 * gib)), None);
        assert_eq!(color(&memory_segment(16 * gib)), Some(Severity::Good));
    }

    #[test]
    fn swap_shows_usage_share() {
        assert!(swap_output(0, 0).is_empty());
        let out = swap_output(4 << 30, 3 << 30);
        assert_eq!(out.len(), 2);
        assert_eq!(out.segments()[0].get_text(), "1 GiB");
        assert_eq!(out.segments()[1].get_text(), "(25%)");
    }

    #[test]
    fn grace_may_be_disabled() {
        let config = SystemConfig {
            boot_grace: "0s".into(),
            ..Default::default()
        };
        assert_eq!(SystemModules::new(&config).unwrap().grace, Duration::ZERO);
        let config = SystemConfig {
            boot_grace: "later".into(),
            ..Default::default()
        };
        assert!(SystemModules::new(&config).is_err());
    }
}
