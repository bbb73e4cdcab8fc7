//! Combination recognition
//!
//! When a button is released quickly, every other button that was pressed
//! before it and has been held longer than the threshold joins the
//! combination. Held buttons come first in config order, the released
//! button last.

use std::fmt;

use super::buttons::LogicalButton;
use crate::constants::{COMBO_SEPARATOR, COMBO_TERMINATOR};

/// Labels of one recognized combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    labels: Vec<String>,
}

impl Combination {
    #[cfg(test)]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Renders as "HELD+HELD+TRIGGER;"
impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", COMBO_SEPARATOR)?;
            }
            f.write_str(label)?;
        }
        write!(f, "{}", COMBO_TERMINATOR)
    }
}

/// Build the combination concluded by the quick release of `buttons[released]`
pub fn recognize(buttons: &[LogicalButton], released: usize, threshold: i64) -> Combination {
    let b = &buttons[released];
    let mut labels: Vec<String> = buttons
        .iter()
        .enumerate()
        .filter(|&(slot, h)| {
            slot != released
                && h.pressed
                && b.release_time - h.press_time > threshold
                && h.press_time < b.press_time
        })
        .map(|(_, h)| h.label.clone())
        .collect();
    labels.push(b.label.clone());
    Combination { labels }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(label: &str, pressed: bool, press_time: i64, release_time: i64) -> LogicalButton {
        LogicalButton {
            code: None,
            label: label.to_string(),
            pressed,
            press_time,
            release_time,
        }
    }

    #[test]
    fn test_single_button() {
        let buttons = vec![button("TRIG", false, 0, 100)];
        let combo = recognize(&buttons, 0, 250);
        assert_eq!(combo.to_string(), "TRIG;");
        assert_eq!(combo.labels(), ["TRIG"]);
    }

    #[test]
    fn test_held_button_precedes_trigger() {
        let buttons = vec![
            button("THMB", false, 400, 450),
            button("TRIG", true, 0, 0),
        ];
        let combo = recognize(&buttons, 0, 250);
        assert_eq!(combo.to_string(), "TRIG+THMB;");
        assert_eq!(combo.labels(), ["TRIG", "THMB"]);
    }

    #[test]
    fn test_held_buttons_in_config_order() {
        let buttons = vec![
            button("A", true, 10, 0),
            button("B", false, 500, 600),
            button("C", true, 0, 0),
        ];
        assert_eq!(recognize(&buttons, 1, 250).to_string(), "A+C+B;");
    }

    #[test]
    fn test_short_hold_excluded() {
        // Held only 150ms by the time THMB is released
        let buttons = vec![button("TRIG", true, 0, 0), button("THMB", false, 50, 150)];
        assert_eq!(recognize(&buttons, 1, 250).to_string(), "THMB;");
    }

    #[test]
    fn test_pressed_after_trigger_excluded() {
        let buttons = vec![button("TRIG", true, 310, 0), button("THMB", false, 300, 600)];
        assert_eq!(recognize(&buttons, 1, 250).to_string(), "THMB;");
    }

    #[test]
    fn test_exactly_threshold_not_held() {
        let buttons = vec![button("TRIG", true, 0, 0), button("THMB", false, 100, 250)];
        assert_eq!(recognize(&buttons, 1, 250).to_string(), "THMB;");
    }
}
