use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use modbar_core::{BarBuilder, BarConfig};
use std::path::PathBuf;
use tokio::io::BufReader;

mod i3bar;
mod modules;

use i3bar::I3barSink;

#[derive(Parser, Debug)]
#[command(name = "modbar", version, about = "i3bar 状态栏：各模块独立调度，按模式分组")]
struct Cli {
    /// 配置文件路径（默认 $XDG_CONFIG_HOME/modbar/config.toml）
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 打印默认配置并退出
    #[arg(long)]
    print_default_config: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<BarConfig> {
    let config = match &cli.config {
        Some(path) => BarConfig::load_or_create(path),
        None => BarConfig::load(),
    };
    config.context("failed to load configuration")
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = term.recv() => info!("Terminated"),
    }
}

async fn run(config: BarConfig) -> anyhow::Result<()> {
    let mut builder = BarBuilder::new(&config.bar, config.colors.clone());
    modules::install(&mut builder, &config.modules)?;

    let clicks = builder.clicks();
    let bar = builder.build();

    tokio::spawn(async move {
        if let Err(e) = i3bar::read_clicks(BufReader::new(tokio::io::stdin()), clicks).await {
            warn!("Click reader stopped: {:#}", e);
        }
    });

    tokio::select! {
        result = bar.run(I3barSink::new(std::io::stdout())) => result.context("bar stopped")?,
        _ = shutdown_signal() => {}
    }
    info!("modbar exiting");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.print_default_config {
        match BarConfig::default().to_toml() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("modbar: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("modbar: {:#}", e);
            std::process::exit(1);
        }
    };

    let logger = match modbar_core::initialize_logging("modbar", &config.logging) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting modbar {}", env!("CARGO_PKG_VERSION"));
    let code = match run(config).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("modbar: {:#}", e);
            1
        }
    };
    // stdin 读取线程不会自行结束，直接退出进程
    drop(logger);
    std::process::exit(code);
}
