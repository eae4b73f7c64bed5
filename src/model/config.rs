use serde::{Deserialize, Serialize};

use super::filter::FilterMode;

/// Name of the slot the browser build stores its list under
pub const DEFAULT_SLOT: &str = "glassmorphism-todos";

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the slot file. Absent = XDG data dir.
    #[serde(default)]
    pub dir: Option<String>,
    /// Slot name; the file is `<dir>/<slot>.json`
    #[serde(default = "default_slot")]
    pub slot: String,
    #[serde(default)]
    pub on_corrupt: CorruptPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            dir: None,
            slot: default_slot(),
            on_corrupt: CorruptPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Filter used by `list` when `--filter` is not given
    #[serde(default)]
    pub default_filter: FilterMode,
    /// Task text is truncated to this many terminal cells in list output.
    /// 0 disables truncation.
    #[serde(default = "default_text_width")]
    pub text_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            default_filter: FilterMode::default(),
            text_width: default_text_width(),
        }
    }
}

/// What to do when the stored value cannot be read back as a task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Propagate the error to the caller
    #[default]
    Fail,
    /// Quarantine the value, log it and start from an empty list
    Reset,
}

fn default_slot() -> String {
    DEFAULT_SLOT.to_string()
}

fn default_text_width() -> usize {
    72
}
