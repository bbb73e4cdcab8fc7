//! Event normalization
//!
//! Turns raw key and absolute-axis events into press/release transitions
//! of logical buttons and asks the recognizer for a combination on every
//! quick release.

use log::{debug, trace};

use super::buttons::{AxisLevel, ButtonTable};
use super::combo::{self, Combination};

/// Event types the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    /// EV_KEY: value 1 = press, 0 = release, 2 = autorepeat
    Key,
    /// EV_ABS
    Abs,
}

/// A hardware event with its timestamp in ms since process start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub code: u16,
    pub value: i32,
    pub time_ms: i64,
}

impl RawEvent {
    pub fn key(code: u16, value: i32, time_ms: i64) -> Self {
        Self {
            kind: RawEventKind::Key,
            code,
            value,
            time_ms,
        }
    }

    pub fn abs(code: u16, value: i32, time_ms: i64) -> Self {
        Self {
            kind: RawEventKind::Abs,
            code,
            value,
            time_ms,
        }
    }

    /// Key release (value 0)
    pub fn is_key_release(&self) -> bool {
        self.kind == RawEventKind::Key && self.value == 0
    }
}

/// Button state machine fed by raw events
pub struct Normalizer {
    table: ButtonTable,
    /// Hold threshold in milliseconds
    threshold: i64,
}

impl Normalizer {
    pub fn new(table: ButtonTable, threshold: i64) -> Self {
        Self { table, threshold }
    }

    #[cfg(test)]
    pub fn buttons(&self) -> &[super::buttons::LogicalButton] {
        self.table.buttons()
    }

    /// Apply one event. Returns the combination if it concluded one.
    pub fn handle(&mut self, event: &RawEvent) -> Option<Combination> {
        match event.kind {
            RawEventKind::Key => self.handle_key(event),
            RawEventKind::Abs => self.handle_axis(event),
        }
    }

    fn handle_key(&mut self, event: &RawEvent) -> Option<Combination> {
        let slot = self.table.slot_for_code(event.code)?;
        match event.value {
            1 => {
                self.table.button_mut(slot).press(event.time_ms);
                None
            }
            0 => self.release(slot, event.time_ms),
            _ => None,
        }
    }

    fn handle_axis(&mut self, event: &RawEvent) -> Option<Combination> {
        let axes: Vec<_> = self.table.axes_for_code(event.code).collect();
        let mut result = None;
        for axis in axes {
            let Some(level) = axis.level(event.value) else {
                trace!("axis {:#x}: ignoring value {}", axis.code, event.value);
                continue;
            };
            match level {
                AxisLevel::Negative => {
                    self.table.button_mut(axis.negative_button).press(event.time_ms)
                }
                AxisLevel::Positive => {
                    self.table.button_mut(axis.positive_button).press(event.time_ms)
                }
                AxisLevel::Rest => {
                    // Both sides go up, negative first; one combination per rest
                    for slot in [axis.negative_button, axis.positive_button] {
                        if !self.table.button(slot).pressed {
                            continue;
                        }
                        if result.is_none() {
                            result = self.release(slot, event.time_ms);
                        } else {
                            self.table.button_mut(slot).release(event.time_ms, self.threshold);
                        }
                    }
                }
            }
        }
        result
    }

    /// Forget every held button (controller went away)
    pub fn release_all(&mut self) {
        for slot in 0..self.table.buttons().len() {
            let button = self.table.button_mut(slot);
            if button.pressed {
                debug!("{} dropped with the controller", button.label);
                button.pressed = false;
            }
        }
    }

    fn release(&mut self, slot: usize, now: i64) -> Option<Combination> {
        let quick = self.table.button_mut(slot).release(now, self.threshold);
        if !quick {
            debug!("{} released after hold, no combination", self.table.button(slot).label);
            return None;
        }
        let combo = combo::recognize(self.table.buttons(), slot, self.threshold);
        debug!("combination: {}", combo);
        Some(combo)
    }
}
