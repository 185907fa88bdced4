//! Bridge configuration, loaded from TOML.
//!
//! ```toml
//! [interpreter]
//! argv = ["embedded"]
//! sys_path = ["scripts"]
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! filter = "pyhost::mem=trace"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Environment variable holding extra filter directives.
pub const LOG_FILTER_ENV: &str = "PYHOST_LOG";
/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "PYHOST_LOG_FORMAT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Settings applied when an [`Interpreter`](crate::Interpreter) starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Replaces `sys.argv` when non-empty.
    #[serde(default)]
    pub argv: Vec<String>,

    /// Appended to `sys.path` unless already present.
    #[serde(default)]
    pub sys_path: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    /// Extra filter directives, e.g. `pyhost::exec=debug`.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Multi-line, human readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl BridgeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::Config(format!("invalid configuration: {err}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Applies `PYHOST_LOG` and `PYHOST_LOG_FORMAT` from the environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        let filter = std::env::var(LOG_FILTER_ENV).ok();
        let format = std::env::var(LOG_FORMAT_ENV).ok();
        self.with_overrides(filter, format.as_deref())
    }

    fn with_overrides(mut self, filter: Option<String>, format: Option<&str>) -> Result<Self> {
        if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
            self.logging.filter = Some(filter);
        }
        if let Some(format) = format {
            self.logging.format = LogFormat::from_str(format.trim())
                .map_err(|_| Error::Config(format!("unknown log format '{format}' in {LOG_FORMAT_ENV}")))?;
        }
        Ok(self)
    }
}
