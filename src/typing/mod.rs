//! Typing engine
//!
//! Types strings through a key sink using the reverse keymap. Every
//! keystroke is: modifiers down (shift, altgr, ctrl), key down, key up,
//! modifiers up in the same order, with a sync after each transition.

pub mod uinput;

use log::debug;
use std::io;
use std::time::Duration;

use crate::constants::{KEY_ENTER, KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_RIGHTALT, KEY_U};
use crate::keymap::{CharMap, Modifiers};

pub use uinput::UinputKeyboard;

/// Modifier keys in press order
const MODIFIER_KEYS: [(Modifiers, u16); 3] = [
    (Modifiers::SHIFT, KEY_LEFTSHIFT),
    (Modifiers::ALTGR, KEY_RIGHTALT),
    (Modifiers::CTRL, KEY_LEFTCTRL),
];

#[derive(Debug, thiserror::Error)]
pub enum TypingError {
    #[error("Failed to create virtual keyboard: {0}")]
    DeviceCreation(#[source] io::Error),

    #[error("Failed to write key event: {0}")]
    Write(#[source] io::Error),
}

/// Write side of a virtual keyboard
pub trait KeySink {
    /// Key transition (pressed = true for down)
    fn write_key(&mut self, code: u16, pressed: bool) -> Result<(), TypingError>;

    /// Synchronization marker ending the current report
    fn sync(&mut self) -> Result<(), TypingError>;
}

/// Types characters through a [`KeySink`]
pub struct Typist<S: KeySink> {
    sink: S,
    chars: CharMap,
    /// Pause after each character
    char_delay: Duration,
}

impl<S: KeySink> Typist<S> {
    pub fn new(sink: S, chars: CharMap, char_delay: Duration) -> Self {
        Self {
            sink,
            chars,
            char_delay,
        }
    }

    /// Type `text` byte by byte. Characters without a binding are skipped.
    pub fn type_str(&mut self, text: &str) -> Result<(), TypingError> {
        for ch in text.bytes() {
            match self.chars.get(ch) {
                Some(binding) => self.press(binding.modifiers, binding.key)?,
                None => debug!("No key for {:?}, skipped", ch as char),
            }
            if !self.char_delay.is_zero() {
                std::thread::sleep(self.char_delay);
            }
        }
        Ok(())
    }

    /// Bare Enter
    pub fn confirm(&mut self) -> Result<(), TypingError> {
        self.press(Modifiers::empty(), KEY_ENTER)
    }

    /// Ctrl+U (kill line)
    pub fn clear_line(&mut self) -> Result<(), TypingError> {
        self.press(Modifiers::CTRL, KEY_U)
    }

    fn transition(&mut self, code: u16, pressed: bool) -> Result<(), TypingError> {
        self.sink.write_key(code, pressed)?;
        self.sink.sync()
    }

    fn press(&mut self, modifiers: Modifiers, key: u16) -> Result<(), TypingError> {
        let held = MODIFIER_KEYS.iter().filter(|(m, _)| modifiers.contains(*m));
        for &(_, code) in held.clone() {
            self.transition(code, true)?;
        }
        self.transition(key, true)?;
        self.transition(key, false)?;
        for &(_, code) in held {
            self.transition(code, false)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
