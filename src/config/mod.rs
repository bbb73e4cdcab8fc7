//! Configuration file management
//!
//! Loads TOML configuration files and provides application settings.
//! Default config path: ~/.config/padtype/config.toml

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    self, ABS_HAT0X, ABS_HAT0Y, ABS_RZ, ABS_X, ABS_Y, ABS_Z, BTN_BASE, BTN_BASE2, BTN_BASE3,
    BTN_BASE4, BTN_BASE5, BTN_BASE6, BTN_PINKIE, BTN_THUMB, BTN_THUMB2, BTN_TOP, BTN_TOP2,
    BTN_TRIGGER, CHAR_DELAY_MS, DISCOVERY_INTERVAL_MS, HOLD_THRESHOLD_MS, POLL_INTERVAL_MS,
};

/// Configuration errors that make the controller profile unusable
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown button code name: {0}")]
    UnknownButton(String),

    #[error("unknown axis code name: {0}")]
    UnknownAxis(String),

    #[error("invalid button label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    #[error("duplicate button label: {0}")]
    DuplicateLabel(String),

    #[error("axis {axis:#x} refers to unknown button label {label:?}")]
    UnknownAxisLabel { axis: u16, label: String },

    #[error("axis {0:#x} needs three distinct values for negative, positive and rest")]
    AmbiguousAxisValues(u16),

    #[error("threshold_ms must be positive, got {0}")]
    InvalidThreshold(i64),
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Controller settings
    pub input: InputConfig,
    /// Keystroke / notation output settings
    pub output: OutputConfig,
}

/// Event code given either as a number or as a name like "BTN_TRIGGER"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventCode {
    Number(u16),
    Name(String),
}

impl EventCode {
    /// Resolve as a key/button code
    pub fn button(&self) -> Result<u16, ConfigError> {
        match self {
            EventCode::Number(code) => Ok(*code),
            EventCode::Name(name) => {
                constants::button_code(name).ok_or_else(|| ConfigError::UnknownButton(name.clone()))
            }
        }
    }

    /// Resolve as an absolute axis code
    pub fn axis(&self) -> Result<u16, ConfigError> {
        match self {
            EventCode::Number(code) => Ok(*code),
            EventCode::Name(name) => {
                constants::axis_code(name).ok_or_else(|| ConfigError::UnknownAxis(name.clone()))
            }
        }
    }
}

impl From<&str> for EventCode {
    fn from(name: &str) -> Self {
        EventCode::Name(name.to_string())
    }
}

/// One logical button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Name used in combination notation
    pub label: String,
    /// Hardware code; omitted for buttons driven by an axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<EventCode>,
}

/// A digital axis split into two buttons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub code: EventCode,
    /// Label of the button pressed at `negative_value`
    pub negative: String,
    /// Label of the button pressed at `positive_value`
    pub positive: String,
    pub negative_value: i32,
    pub positive_value: i32,
    pub rest_value: i32,
}

/// Controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Hold threshold in milliseconds (default: 250)
    pub threshold_ms: i64,
    /// Button whose release confirms (Enter). Also used to recognize the controller.
    pub confirm: EventCode,
    /// Button whose release clears the line (Ctrl+U)
    pub clear: EventCode,
    /// Sleep when no events are pending (ms)
    pub poll_interval_ms: u64,
    /// Sleep between device scans while no controller is attached (ms)
    pub discovery_interval_ms: u64,
    /// Logical buttons, in notation order
    pub buttons: Vec<ButtonConfig>,
    /// Digital axes mapped onto pairs of buttons
    pub axes: Vec<AxisConfig>,
}

/// What recognized combinations turn into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Type the combination through a virtual keyboard
    #[default]
    Type,
    /// Print the combination to stdout
    Print,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Pause between typed characters in milliseconds (default: 1)
    pub char_delay_ms: u64,
    /// Name of the virtual keyboard device
    pub device_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Type,
            char_delay_ms: CHAR_DELAY_MS,
            device_name: "padtype virtual keyboard".to_string(),
        }
    }
}

fn button(label: &str, code: u16) -> ButtonConfig {
    ButtonConfig {
        label: label.to_string(),
        code: Some(EventCode::Number(code)),
    }
}

fn pseudo(label: &str) -> ButtonConfig {
    ButtonConfig {
        label: label.to_string(),
        code: None,
    }
}

fn axis(code: u16, negative: &str, positive: &str, values: (i32, i32, i32)) -> AxisConfig {
    AxisConfig {
        code: EventCode::Number(code),
        negative: negative.to_string(),
        positive: positive.to_string(),
        negative_value: values.0,
        positive_value: values.1,
        rest_value: values.2,
    }
}

impl Default for InputConfig {
    /// Generic USB joystick profile: ten buttons, a hat and two sticks
    fn default() -> Self {
        const HAT: (i32, i32, i32) = (-1, 1, 0);
        const STICK: (i32, i32, i32) = (0, 255, 128);
        Self {
            threshold_ms: HOLD_THRESHOLD_MS,
            confirm: EventCode::from("BTN_BASE4"),
            clear: EventCode::from("BTN_BASE3"),
            poll_interval_ms: POLL_INTERVAL_MS,
            discovery_interval_ms: DISCOVERY_INTERVAL_MS,
            buttons: vec![
                button("TRIG", BTN_TRIGGER),
                button("THMB", BTN_THUMB),
                button("THMB2", BTN_THUMB2),
                button("TOP", BTN_TOP),
                button("TOP2", BTN_TOP2),
                button("PINK", BTN_PINKIE),
                button("BASE", BTN_BASE),
                button("BASE2", BTN_BASE2),
                button("BASE5", BTN_BASE5),
                button("BASE6", BTN_BASE6),
                pseudo("D-RI"),
                pseudo("D-LE"),
                pseudo("D-UP"),
                pseudo("D-DO"),
                pseudo("L-RI"),
                pseudo("L-LE"),
                pseudo("L-UP"),
                pseudo("L-DO"),
                pseudo("R-RI"),
                pseudo("R-LE"),
                pseudo("R-UP"),
                pseudo("R-DO"),
            ],
            axes: vec![
                axis(ABS_HAT0X, "D-LE", "D-RI", HAT),
                axis(ABS_HAT0Y, "D-UP", "D-DO", HAT),
                axis(ABS_X, "L-LE", "L-RI", STICK),
                axis(ABS_Y, "L-UP", "L-DO", STICK),
                axis(ABS_Z, "R-LE", "R-RI", STICK),
                axis(ABS_RZ, "R-UP", "R-DO", STICK),
            ],
        }
    }
}

impl InputConfig {
    /// Confirm button code
    pub fn confirm_code(&self) -> Result<u16, ConfigError> {
        self.confirm.button()
    }

    /// Clear button code
    pub fn clear_code(&self) -> Result<u16, ConfigError> {
        self.clear.button()
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/padtype/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. PADTYPE_CONFIG environment variable
        if let Ok(path) = std::env::var("PADTYPE_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/padtype/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/padtype/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. PADTYPE_CONFIG environment variable
    /// 2. ~/.config/padtype/config.toml (user config)
    /// 3. /etc/padtype/config.toml (system config)
    /// 4. Built-in defaults
    ///
    /// A config file that exists but does not parse is an error.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                info!("Loaded config: {}", path.display());
                Ok(config)
            }
            None => {
                info!("Using built-in default config");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.input.threshold_ms <= 0 {
            return Err(ConfigError::InvalidThreshold(config.input.threshold_ms).into());
        }
        Ok(config)
    }

    /// Write a config template with the built-in defaults
    pub fn write_default_config(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let body = toml::to_string_pretty(&Self::default())?;
        let template = format!(
            r#"# padtype configuration file
# Config path: {path}
#
# Buttons are listed in the order they appear in a combination.
# A button without `code` is driven by one of the [[input.axes]].
# Codes are numbers or names (BTN_TRIGGER..BTN_BASE6, BTN_SOUTH.., ABS_X.., ABS_HAT0X..).
# Use evtest to see which codes your controller reports.
#
# [output] mode:
#   "type"   type combinations through a virtual keyboard (default)
#   "print"  print combinations to stdout; confirm ends, clear aborts

{body}"#,
            path = path.display(),
        );
        std::fs::write(path, template)?;
        Ok(())
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("padtype").join("config.toml"))
}
