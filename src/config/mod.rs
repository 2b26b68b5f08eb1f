//! Configuration management for Sluice.
//!
//! Configuration is read from `~/.config/sluice/config.toml` (or the path
//! given with `--config`). If the file doesn't exist, a default
//! configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::renderer::Locale;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub emergency: EmergencyConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Trailing window of messages to scan, in hours (default: 24)
    pub window_hours: u64,
    /// Channel whose newest message carries the control notice (empty: none)
    pub control_channel: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            control_channel: String::new(),
        }
    }
}

impl ScanConfig {
    /// The scan window, or `None` when `window_hours` is out of range.
    pub fn try_window(&self) -> Option<chrono::Duration> {
        i64::try_from(self.window_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }

    pub fn window(&self) -> chrono::Duration {
        self.try_window().unwrap_or(chrono::Duration::MAX)
    }

    pub fn control_channel(&self) -> Option<&str> {
        non_empty(&self.control_channel)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Subscription URL of the emergency feed (empty: disabled)
    pub url: String,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Source tag shown after the flag on emergency lines
    pub label: String,
    /// Flag used when an entry's name carries none
    pub default_flag: String,
    /// Marker glyphs that drop the feed's first entry (usually an info line)
    pub excluded_glyphs: Vec<String>,
    /// Phrases that drop any entry whose name contains them
    pub excluded_phrases: Vec<String>,
    /// Process the feed before channel scanning so it wins duplicates
    pub process_first: bool,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 10,
            label: "Emergency".to_string(),
            default_flag: "🚨".to_string(),
            excluded_glyphs: vec!["ℹ️".to_string(), "📊".to_string()],
            excluded_phrases: vec!["Expire".to_string()],
            process_first: false,
        }
    }
}

impl EmergencyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Informational lines at the top; `{weekday}`, `{time}`, `{date}`, `{channels}` are filled in
    pub header_lines: Vec<String>,
    /// Display name of regular entries; `{number}`, `{total}`, `{old}`, `{date}`, `{time}`
    pub fragment_template: String,
    pub separator: String,
    /// Wraps each custom header line on both sides
    pub warning_marker: String,
    /// Placeholder endpoint that carries header, custom and separator lines
    pub carrier_uri: String,
    pub locale: Locale,
    /// Civil time offset used for `{time}` and `{date}` (default: +03:30)
    pub utc_offset_minutes: i32,
    /// Announcement lines always added to the custom block
    pub custom_headers: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            header_lines: vec![
                "Sluice Configs".to_string(),
                "🗓 {weekday} ساعت {time}".to_string(),
                "📊 تعداد کانال های اسکن شده: {channels}".to_string(),
                "برای بروزرسانی : سه نقطه گزینه اخر".to_string(),
            ],
            fragment_template: "Config | {number} / {total}".to_string(),
            separator: "━━━━━━━━━━━━━━".to_string(),
            warning_marker: "⚠️".to_string(),
            carrier_uri:
                "vless://00000000-0000-0000-0000-000000000000@127.0.0.1:1080?security=none&type=tcp"
                    .to_string(),
            locale: Locale::Fa,
            utc_offset_minutes: 210,
            custom_headers: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// The display offset, or `None` when it is a day or more from UTC.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("configs.txt"),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.clone(),
            source: e,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: config_path,
            reason,
        })?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), String> {
        let window = self
            .scan
            .try_window()
            .filter(|w| chrono::Utc::now().checked_sub_signed(*w).is_some());
        if window.is_none() {
            return Err(format!(
                "scan.window_hours = {} is out of range",
                self.scan.window_hours
            ));
        }
        if self.render.offset().is_none() {
            return Err(format!(
                "render.utc_offset_minutes = {} must be within one day of UTC",
                self.render.utc_offset_minutes
            ));
        }
        Ok(())
    }

    /// Get the default config file path: `~/.config/sluice/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("sluice").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Sluice Configuration

[scan]
# Only messages newer than this many hours are scanned
window_hours = 24

# Channel (id or title) whose newest message is a JSON control notice.
# Leave empty to disable.
control_channel = ""

[emergency]
# Subscription URL merged into the output. Leave empty to disable.
url = ""
timeout_secs = 10
label = "Emergency"
default_flag = "🚨"

# The feed's first entry is dropped when its name contains one of these
excluded_glyphs = ["ℹ️", "📊"]

# Any entry whose name contains one of these is dropped
excluded_phrases = ["Expire"]

# Give the feed priority over channel configs when both carry the same endpoint
process_first = false

[render]
# Placeholders: {weekday} {time} {date} {channels}
header_lines = [
    "Sluice Configs",
    "🗓 {weekday} ساعت {time}",
    "📊 تعداد کانال های اسکن شده: {channels}",
    "برای بروزرسانی : سه نقطه گزینه اخر",
]

# Placeholders: {number} {total} {old} {date} {time}
fragment_template = "Config | {number} / {total}"

separator = "━━━━━━━━━━━━━━"
warning_marker = "⚠️"

# Non-functional endpoint used for header, announcement and separator lines
carrier_uri = "vless://00000000-0000-0000-0000-000000000000@127.0.0.1:1080?security=none&type=tcp"

# "fa" (Persian digits and weekday names) or "en"
locale = "fa"

# Offset from UTC in minutes for displayed times (210 = +03:30)
utc_offset_minutes = 210

# Announcement lines added to every run
custom_headers = []

[output]
path = "configs.txt"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
