//! Settings type definitions.
//!
//! All types use camelCase JSON and `#[serde(default)]`, so a partial file
//! only needs the fields it overrides.

mod execution;
mod llm;

pub use execution::*;
pub use llm::*;

use serde::{Deserialize, Serialize};

/// Root settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Application name reported in event metadata and session records.
    pub app_name: String,
    /// Turn execution limits.
    pub execution: ExecutionSettings,
    /// Chat backend connection.
    pub llm: LlmSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            app_name: "relay".into(),
            execution: ExecutionSettings::default(),
            llm: LlmSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
