// modbar_core/src/lib.rs
// 状态栏核心库：模块调度、聚合、模式分组、阈值着色、配置与日志

pub mod aggregator;
pub mod bar;
pub mod config;
pub mod error;
pub mod format;
pub mod modal;
pub mod module;
pub mod scheduler;
pub mod segment;
pub mod stats;
pub mod threshold;

pub use aggregator::{Aggregator, ModuleSlot, Origin, SlotId};
pub use bar::{Bar, BarBuilder, ClickDispatcher, ModalHandle, RenderSink};
pub use config::{BarConfig, ColorScheme, LoggingConfig, RuntimeConfig};
pub use error::{BarError, Result};
pub use modal::{DetailView, ModalController, ModalState, Mode, ModeId, Role, Summary};
pub use module::{EventModule, FnModule, Module, OnError, Sink, StaticModule, TimerModule, from_fn};
pub use scheduler::{Scheduler, parse_period};
pub use segment::{Align, Block, Button, ClickEvent, ClickHandler, ColorRef, Output, Segment};
pub use threshold::{Severity, classify, threshold};

use flexi_logger::LoggerHandle;
use log::info;
use std::path::PathBuf;

const DEFAULT_LOG_DIR: &str = "/var/tmp/modbar";

// ================= 日志初始化 =================

/// Start the global logger. Keep the returned handle alive for the whole
/// process, file output stops when it is dropped.
///
/// `RUST_LOG` overrides the configured level. Console output goes to stderr
/// because stdout belongs to the bar protocol.
pub fn initialize_logging(program_name: &str, config: &LoggingConfig) -> anyhow::Result<LoggerHandle> {
    use chrono::Local;
    use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};

    let log_spec = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let logger = Logger::try_with_str(log_spec)?
        .format_for_files(flexi_logger::detailed_format)
        .format_for_stderr(flexi_logger::colored_opt_format);

    if !config.log_to_file {
        let handle = logger.log_to_stderr().start()?;
        info!("Logging to stderr only");
        return Ok(handle);
    }

    let log_dir = [config.log_dir.clone(), Some(PathBuf::from(DEFAULT_LOG_DIR))]
        .into_iter()
        .flatten()
        .find(|p| {
            std::fs::create_dir_all(p).ok();
            std::fs::metadata(p).map(|m| m.is_dir()).unwrap_or(false)
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let timestamp = Local::now().format("%Y-%m-%d_%H_%M_%S").to_string();
    let handle = logger
        .log_to_file(
            FileSpec::default()
                .directory(&log_dir)
                .basename(format!("{}_{}", program_name, timestamp))
                .suffix("log"),
        )
        .duplicate_to_stderr(Duplicate::Info)
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .start()?;

    info!("Log directory: {}", log_dir.display());
    Ok(handle)
}
