//! Session configuration
//!
//! Loaded from JSON; every field is optional.
//!
//! ```json
//! {
//!   "log_dir": "C:/Games/Keep",
//!   "mirror_console": true,
//!   "paths": { "door_opener": [1, 0, 2] }
//! }
//! ```

use crate::diagnostics::DEFAULT_ERROR_COOLDOWN_SECS;
use crate::graph::TaskPath;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for one attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the log files
    pub log_dir: PathBuf,
    /// General trace log file name
    pub trace_file: String,
    /// Call-stack log file name
    pub methods_file: String,
    /// Copy every log line to stderr
    pub mirror_console: bool,
    /// Cooldown for repeated host errors
    pub error_cooldown_secs: u64,
    /// Cooldown for out-of-range FSM index reports
    pub fsm_index_cooldown_secs: u64,
    /// Named task paths
    pub paths: BTreeMap<String, TaskPath>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
            trace_file: "Trace.log".to_string(),
            methods_file: "Methods.log".to_string(),
            mirror_console: false,
            error_cooldown_secs: DEFAULT_ERROR_COOLDOWN_SECS,
            fsm_index_cooldown_secs: 30,
            paths: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parse a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        for (label, name) in [("trace_file", &self.trace_file), ("methods_file", &self.methods_file)] {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", label)));
            }
        }
        if self.trace_file == self.methods_file {
            return Err(Error::Config(format!(
                "trace_file and methods_file both name '{}'",
                self.trace_file
            )));
        }
        Ok(())
    }

    /// Full path of the trace log
    pub fn trace_path(&self) -> PathBuf {
        self.log_dir.join(&self.trace_file)
    }

    /// Full path of the call-stack log
    pub fn methods_path(&self) -> PathBuf {
        self.log_dir.join(&self.methods_file)
    }

    /// A named task path
    pub fn path(&self, name: &str) -> Option<&TaskPath> {
        self.paths.get(name)
    }
}
