//! Module wiring for the status line

pub mod clock;
pub mod command;
pub mod system;

use anyhow::{Context, anyhow};
use log::info;
use modbar_core::config::ModulesConfig;
use modbar_core::{BarBuilder, Button, ClickHandler, ModeId, Segment};
use std::sync::Arc;
use system::SystemModules;

/// Register every configured module, in display order: the sysinfo mode,
/// command modules, then the clock.
pub fn install(builder: &mut BarBuilder, config: &ModulesConfig) -> anyhow::Result<()> {
    if config.system.enabled {
        install_sysinfo(builder, config)?;
    }

    for cmd in &config.command {
        let module = command::command(cmd)?;
        match &cmd.mode {
            Some(name) => {
                let mode = builder
                    .find_mode(name)
                    .ok_or_else(|| anyhow!("command module `{}` names unknown mode `{}`", cmd.name, name))?;
                builder.add_to_mode(mode, &cmd.name, module, cmd.role)?;
            }
            None => {
                builder.add(&cmd.name, module)?;
            }
        }
    }

    if config.clock.enabled {
        builder.add("clock", clock::clock(&config.clock)?)?;
    }
    Ok(())
}

fn toggler(builder: &BarBuilder, mode: ModeId) -> ClickHandler {
    let modal = builder.modal();
    Arc::new(move |event| {
        if event.button == Button::Left {
            modal.toggle(mode);
        }
    })
}

// 与原先的 sysinfo 分组一致：负载和内存常显，其余展开后可见
fn install_sysinfo(builder: &mut BarBuilder, config: &ModulesConfig) -> anyhow::Result<()> {
    let spec = &config.sysinfo_mode;
    let system = SystemModules::new(&config.system)?;
    let mode = builder
        .add_mode(&spec.name, spec.view)
        .with_context(|| format!("mode `{}`", spec.name))?;
    builder.set_summary(mode, Segment::text(spec.icon.as_str()));

    let toggle = toggler(builder, mode);
    builder.add_member(mode, "load", system.load(Some(toggle.clone()))?)?;
    builder.add_detail(mode, "load_detail", system.load_detail()?)?;
    builder.add_detail(mode, "uptime", system.uptime()?)?;
    builder.add_member(mode, "memory", system.memory(Some(toggle))?)?;
    builder.add_detail(mode, "swap", system.swap()?)?;
    info!("Mode `{}` ready", spec.name);
    Ok(())
}
