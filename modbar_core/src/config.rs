//! Configuration management

use crate::error::{BarError, Result};
use crate::modal::{DetailView, Role};
use crate::module::OnError;
use crate::scheduler::{parse_duration, parse_period};
use crate::threshold::Severity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main bar configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    pub bar: RuntimeConfig,
    pub colors: ColorScheme,
    pub logging: LoggingConfig,
    pub modules: ModulesConfig,
}

/// Runtime knobs of the aggregator actor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the bounded push channel shared by all modules.
    pub channel_capacity: usize,
    /// Drain already-queued updates before rendering.
    pub coalesce: bool,
}

/// Semantic color scheme, built once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub normal: Option<String>,
    pub good: String,
    pub degraded: String,
    pub bad: String,
    pub urgent: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_dir: Option<PathBuf>,
    pub max_file_size: u64,
    pub max_files: usize,
}

/// Which modules the binary wires up, and how often they run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    pub clock: ClockConfig,
    pub system: SystemConfig,
    pub sysinfo_mode: ModeConfig,
    pub command: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub enabled: bool,
    pub period: String,
    pub format: String,
    /// Program launched on left click, if any.
    pub on_click: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub enabled: bool,
    pub period: String,
    /// No load coloring until the machine has been up this long.
    pub boot_grace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub name: String,
    pub icon: String,
    pub view: DetailView,
}

/// A module that shells out to a program on a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    pub command: String,
    pub period: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Mode to place the module in; standalone when absent.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub on_error: OnError,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            coalesce: true,
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            normal: None,
            good: "#4caf50".to_string(),
            degraded: "#ffc107".to_string(),
            bad: "#f44336".to_string(),
            urgent: None,
        }
    }
}

impl ColorScheme {
    pub fn color_for(&self, severity: Severity) -> Option<&str> {
        match severity {
            Severity::Normal => self.normal.as_deref(),
            Severity::Good => Some(&self.good),
            Severity::Degraded => Some(&self.degraded),
            Severity::Bad => Some(&self.bad),
            Severity::Urgent => self.urgent.as_deref(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
            log_dir: None,
            max_file_size: 10_000_000, // 10MB
            max_files: 5,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: "1s".to_string(),
            format: "%a %b %-d, %-I:%M %p".to_string(),
            on_click: None,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: "3s".to_string(),
            boot_grace: "10m".to_string(),
        }
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            name: "sysinfo".to_string(),
            icon: "≡".to_string(),
            view: DetailView::All,
        }
    }
}

impl BarConfig {
    /// Load configuration from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_or_create(&path)
    }

    /// Load configuration from `path`, writing defaults there if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let mut config = Self::load_from(path)?;
            config.validate()?;
            log::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            log::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Parse a configuration file without validating it
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BarError::config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BarError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content)
            .map_err(|e| BarError::config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BarError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BarError::config("Cannot determine config directory"))?;

        Ok(config_dir.join("modbar").join("config.toml"))
    }

    /// Clamp numeric values and reject malformed periods
    pub fn validate(&mut self) -> Result<()> {
        self.bar.channel_capacity = self.bar.channel_capacity.clamp(1, 4096);

        self.logging.max_file_size = self.logging.max_file_size.max(1_000_000); // At least 1MB
        self.logging.max_files = self.logging.max_files.clamp(1, 20);

        parse_period(&self.modules.clock.period)?;
        parse_period(&self.modules.system.period)?;
        parse_duration(&self.modules.system.boot_grace)?;

        if self.modules.sysinfo_mode.name.trim().is_empty() {
            return Err(BarError::config("Mode name must not be empty"));
        }

        for command in &self.modules.command {
            if command.name.trim().is_empty() {
                return Err(BarError::config("Command module without a name"));
            }
            if command.command.trim().is_empty() {
                return Err(BarError::config(format!(
                    "Command module `{}` has no command",
                    command.name
                )));
            }
            parse_period(&command.period)?;
        }

        Ok(())
    }
}
