//! Local clock

use anyhow::{Context, anyhow};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use log::{info, warn};
use modbar_core::config::ClockConfig;
use modbar_core::{Button, ClickHandler, Output, Scheduler, Segment, TimerModule};
use std::fmt::{Display, Write};
use std::sync::Arc;

/// Reject strftime patterns chrono cannot render.
pub fn check_format(format: &str) -> anyhow::Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(anyhow!("invalid clock format `{}`", format));
    }
    Ok(())
}

pub fn render_time<Tz>(now: &DateTime<Tz>, format: &str) -> anyhow::Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut text = String::new();
    write!(text, "{}", now.format(format)).map_err(|_| anyhow!("cannot format time with `{}`", format))?;
    Ok(text)
}

/// Launch `program` through the shell without waiting for it.
pub fn launcher(program: String) -> ClickHandler {
    Arc::new(move |event| {
        if event.button != Button::Left {
            return;
        }
        match tokio::process::Command::new("sh").arg("-c").arg(&program).spawn() {
            Ok(_) => info!("Launched `{}`", program),
            Err(e) => warn!("Failed to launch `{}`: {}", program, e),
        }
    })
}

pub fn clock(config: &ClockConfig) -> anyhow::Result<TimerModule> {
    check_format(&config.format)?;
    let scheduler = Scheduler::parse(&config.period).context("clock period")?;
    let format = config.format.clone();
    let handler = config.on_click.clone().map(launcher);

    Ok(TimerModule::new(scheduler, move || {
        let output = render_time(&Local::now(), &format).map(|text| {
            let segment = Segment::text(text);
            let segment = match &handler {
                Some(handler) => segment.with_handler(handler.clone()),
                None => segment,
            };
            Output::from(segment)
        });
        async move { output }
    }))
}
