//! Configuration management for Fulltext
//!
//! `Settings` arrive with every render payload; `RenderConfig` and
//! `CliConfig` are process-level and read from the environment.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::payload::one_or_many;

/// Per-render widget settings, delivered in the payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Draw a border around the container
    #[serde(rename = "box", default)]
    pub boxed: bool,
    /// Arm selection capture on mouse-up
    #[serde(default)]
    pub dialog: bool,
    /// Title of the capture dialog
    #[serde(rename = "codeSelection", default)]
    pub code_selection: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub crosstalk_key: Vec<String>,
    /// Pub-sub group this component joins
    #[serde(default)]
    pub crosstalk_group: Option<String>,
}

impl Settings {
    /// Title shown by the capture dialog
    pub fn dialog_title(&self) -> &str {
        self.code_selection.as_deref().unwrap_or("Code selection")
    }
}

/// Container chrome applied by the renderer
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub overflow: String,
    pub padding: String,
    /// Border drawn when `Settings::boxed` is set
    pub border: String,
    /// Capacity of each group's event stream on the hub
    pub channel_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            overflow: "scroll".to_string(),
            padding: "5px".to_string(),
            border: "1px solid #ddd".to_string(),
            channel_capacity: 64,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = RenderConfig::default();
        RenderConfig {
            overflow: env::var("FULLTEXT_OVERFLOW").unwrap_or(defaults.overflow),
            padding: env::var("FULLTEXT_PADDING").unwrap_or(defaults.padding),
            border: env::var("FULLTEXT_BORDER").unwrap_or(defaults.border),
            channel_capacity: env::var("FULLTEXT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(defaults.channel_capacity),
        }
    }
}

/// Configuration of the `fulltext-render` binary
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Render payload (JSON) to read
    pub payload: PathBuf,
    /// Where to write the HTML; stdout when unset
    pub output: Option<PathBuf>,
    pub render: RenderConfig,
}

impl CliConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(CliConfig {
            payload: PathBuf::from(env::var("FULLTEXT_PAYLOAD")?),
            output: env::var("FULLTEXT_OUTPUT").ok().map(PathBuf::from),
            render: RenderConfig::from_env(),
        })
    }
}
