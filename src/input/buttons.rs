//! Logical buttons and axis bindings
//!
//! The controller profile from the config, resolved into a table the
//! normalizer can index directly: key codes map to button slots through a
//! HashMap, axes hold the slot indices of their two pseudo-buttons.

use log::debug;
use std::collections::HashMap;

use crate::config::{ConfigError, InputConfig};
use crate::constants::{COMBO_SEPARATOR, COMBO_TERMINATOR, MAX_LABEL_LEN};

/// A named button with its current press state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalButton {
    /// Hardware key code, None for axis-driven buttons
    pub code: Option<u16>,
    pub label: String,
    pub pressed: bool,
    /// Milliseconds since process start
    pub press_time: i64,
    /// Milliseconds since process start
    pub release_time: i64,
}

impl LogicalButton {
    pub fn new(label: &str, code: Option<u16>) -> Self {
        Self {
            code,
            label: label.to_string(),
            pressed: false,
            press_time: 0,
            release_time: 0,
        }
    }

    pub fn press(&mut self, now: i64) {
        self.pressed = true;
        self.press_time = now;
    }

    /// Release the button, returning true for a quick release
    /// (shorter than `threshold`)
    pub fn release(&mut self, now: i64, threshold: i64) -> bool {
        self.pressed = false;
        self.release_time = now;
        self.release_time - self.press_time < threshold
    }
}

/// A digital axis reporting three discrete levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub code: u16,
    /// Slot of the button pressed at `negative_value`
    pub negative_button: usize,
    /// Slot of the button pressed at `positive_value`
    pub positive_button: usize,
    pub negative_value: i32,
    pub positive_value: i32,
    pub rest_value: i32,
}

/// What an axis value means for its pseudo-buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLevel {
    Negative,
    Positive,
    Rest,
}

impl AxisBinding {
    /// Classify a reported value; anything outside the three levels is None
    pub fn level(&self, value: i32) -> Option<AxisLevel> {
        if value == self.negative_value {
            Some(AxisLevel::Negative)
        } else if value == self.positive_value {
            Some(AxisLevel::Positive)
        } else if value == self.rest_value {
            Some(AxisLevel::Rest)
        } else {
            None
        }
    }
}

/// All configured buttons and axes
#[derive(Debug, Clone)]
pub struct ButtonTable {
    buttons: Vec<LogicalButton>,
    axes: Vec<AxisBinding>,
    by_code: HashMap<u16, usize>,
}

fn check_label(label: &str) -> Result<(), ConfigError> {
    let reason = if label.is_empty() {
        "empty"
    } else if label.len() > MAX_LABEL_LEN {
        "too long"
    } else if label.contains(COMBO_SEPARATOR) || label.contains(COMBO_TERMINATOR) {
        "contains a notation delimiter"
    } else if label.chars().any(|c| c.is_whitespace() || !c.is_ascii()) {
        "must be printable ASCII without spaces"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidLabel {
        label: label.to_string(),
        reason,
    })
}

impl ButtonTable {
    /// Build and validate the table from the input config
    pub fn from_config(config: &InputConfig) -> Result<Self, ConfigError> {
        let mut buttons = Vec::with_capacity(config.buttons.len());
        let mut by_label: HashMap<&str, usize> = HashMap::new();
        let mut by_code = HashMap::new();

        for (slot, entry) in config.buttons.iter().enumerate() {
            check_label(&entry.label)?;
            if by_label.insert(entry.label.as_str(), slot).is_some() {
                return Err(ConfigError::DuplicateLabel(entry.label.clone()));
            }
            let code = entry.code.as_ref().map(|c| c.button()).transpose()?;
            if let Some(code) = code {
                // First entry wins
                by_code.entry(code).or_insert(slot);
            }
            buttons.push(LogicalButton::new(&entry.label, code));
        }

        let mut axes = Vec::with_capacity(config.axes.len());
        for entry in &config.axes {
            let code = entry.code.axis()?;
            let slot = |label: &String| {
                by_label
                    .get(label.as_str())
                    .copied()
                    .ok_or_else(|| ConfigError::UnknownAxisLabel {
                        axis: code,
                        label: label.clone(),
                    })
            };
            let values = [entry.negative_value, entry.positive_value, entry.rest_value];
            if values[0] == values[1] || values[0] == values[2] || values[1] == values[2] {
                return Err(ConfigError::AmbiguousAxisValues(code));
            }
            axes.push(AxisBinding {
                code,
                negative_button: slot(&entry.negative)?,
                positive_button: slot(&entry.positive)?,
                negative_value: entry.negative_value,
                positive_value: entry.positive_value,
                rest_value: entry.rest_value,
            });
        }

        debug!(
            "{} buttons ({} on keys), {} axes",
            buttons.len(),
            buttons.iter().filter(|b| b.code.is_some()).count(),
            axes.len()
        );
        Ok(Self {
            buttons,
            axes,
            by_code,
        })
    }

    /// Slot of the button with this hardware code
    pub fn slot_for_code(&self, code: u16) -> Option<usize> {
        self.by_code.get(&code).copied()
    }

    /// Axes bound to this hardware code, in config order
    pub fn axes_for_code(&self, code: u16) -> impl Iterator<Item = AxisBinding> + '_ {
        self.axes.iter().copied().filter(move |a| a.code == code)
    }

    pub fn buttons(&self) -> &[LogicalButton] {
        &self.buttons
    }

    pub fn button(&self, slot: usize) -> &LogicalButton {
        &self.buttons[slot]
    }

    pub fn button_mut(&mut self, slot: usize) -> &mut LogicalButton {
        &mut self.buttons[slot]
    }

    /// Index of a button by label
    #[cfg(test)]
    pub fn slot_for_label(&self, label: &str) -> Option<usize> {
        self.buttons.iter().position(|b| b.label == label)
    }
}
