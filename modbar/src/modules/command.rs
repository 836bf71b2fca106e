//! Shell command polled on a period

use anyhow::{Context, bail};
use modbar_core::config::CommandConfig;
use modbar_core::{Output, Scheduler, Segment, TimerModule};

/// Turn captured stdout into an output. Blank output shows nothing.
pub fn command_output(stdout: &str, label: Option<&str>) -> Output {
    let text = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return Output::empty();
    }
    match label {
        Some(label) => Output::from(vec![
            Segment::text(label).separator(false).padding(6),
            Segment::text(text),
        ]),
        None => Segment::text(text).into(),
    }
}

async fn run(command: &str) -> anyhow::Result<String> {
    let out = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to start `{}`", command))?;
    if !out.status.success() {
        bail!(
            "`{}` exited with {}: {}",
            command,
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

pub fn command(config: &CommandConfig) -> anyhow::Result<TimerModule> {
    let scheduler = Scheduler::parse(&config.period)
        .with_context(|| format!("period of command module `{}`", config.name))?;
    let command = config.command.clone();
    let label = config.label.clone();

    Ok(TimerModule::new(scheduler, move || {
        let command = command.clone();
        let label = label.clone();
        async move {
            let stdout = run(&command).await?;
            Ok(command_output(&stdout, label.as_deref()))
        }
    })
    .on_error(config.on_error))
}
