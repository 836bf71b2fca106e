//! Error handling for the bar engine

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Module `{id}` is registered twice")]
    DuplicateModule { id: String },

    #[error("Mode `{name}` is declared twice")]
    DuplicateMode { name: String },

    #[error("Invalid scheduling period `{input}`: {reason}")]
    InvalidPeriod { input: String, reason: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Update channel closed")]
    ChannelClosed,

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Config parse error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, BarError>;

impl BarError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn invalid_period<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidPeriod {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
