//! Reverse keymap
//!
//! Answers "which modifiers and key produce this character?" for the
//! typing engine. Built once at startup from the kernel console keymap
//! (see [`console`]) or from the built-in US layout when no console is
//! reachable.

pub mod console;
mod ioctl_helpers;
pub mod us;

use bitflags::bitflags;
use log::{info, warn};
use std::fmt;

pub use console::Console;
pub use us::UsKeymap;

// Kernel keysym encoding from <linux/keyboard.h>: type in the high byte,
// value in the low byte.
const KT_LATIN: u16 = 0;
const KT_LETTER: u16 = 11;
const KT_SPEC: u16 = 2;

/// K(KT_SPEC, 0): no symbol on this key
pub const K_HOLE: u16 = KT_SPEC << 8;
/// K(KT_SPEC, 1)
pub const K_ENTER: u16 = (KT_SPEC << 8) | 1;

/// Unicode-mode entries carry this prefix
const UNICODE_PREFIX: u16 = 0xf000;

/// Key positions scanned: Escape (1) through Space (57)
pub const KEY_POSITIONS: std::ops::RangeInclusive<u8> = 1..=57;

/// Shift states scanned: plain, shift, altgr
pub const SHIFT_STATES: std::ops::RangeInclusive<u8> = 0..=2;

bitflags! {
    /// Modifiers needed for a character.
    ///
    /// Bit positions match the kernel shift-state index (KG_SHIFT=0,
    /// KG_ALTGR=1, KG_CTRL=2), so a keymap table number is its own mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b001;
        const ALTGR = 0b010;
        const CTRL  = 0b100;
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        let names: Vec<&str> = [
            (Modifiers::SHIFT, "shift"),
            (Modifiers::ALTGR, "altgr"),
            (Modifiers::CTRL, "ctrl"),
        ]
        .iter()
        .filter(|(m, _)| self.contains(*m))
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join("+"))
    }
}

/// Modifiers plus key code producing one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharBinding {
    pub modifiers: Modifiers,
    pub key: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum KeymapError {
    #[error("{name} failed: {source}")]
    Ioctl {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Something that can answer KDGKBENT-style queries
pub trait KeymapSource {
    /// Raw keysym for key position `index` in shift-state table `table`
    fn entry(&mut self, table: u8, index: u8) -> Result<u16, KeymapError>;
}

/// Decode a kernel keysym into the single-byte character it types
pub fn decode_keysym(sym: u16) -> Option<u8> {
    if sym == K_ENTER {
        return Some(b'\n');
    }
    if sym & UNICODE_PREFIX == UNICODE_PREFIX {
        let cp = sym ^ UNICODE_PREFIX;
        return (cp > 0 && cp < 0x80).then_some(cp as u8);
    }
    let (ktyp, kval) = (sym >> 8, (sym & 0xff) as u8);
    if (ktyp == KT_LATIN || ktyp == KT_LETTER) && kval != 0 {
        Some(kval)
    } else {
        None
    }
}

/// Character → (modifiers, key) lookup
#[derive(Clone)]
pub struct CharMap {
    bindings: [Option<CharBinding>; 256],
}

impl CharMap {
    pub fn empty() -> Self {
        Self {
            bindings: [None; 256],
        }
    }

    /// Scan every key position and shift state of `source`.
    /// The first (position, state) producing a character wins.
    pub fn from_source(source: &mut impl KeymapSource) -> Result<Self, KeymapError> {
        let mut map = Self::empty();
        for index in KEY_POSITIONS {
            for table in SHIFT_STATES {
                let sym = source.entry(table, index)?;
                if let Some(ch) = decode_keysym(sym) {
                    map.insert_first(
                        ch,
                        CharBinding {
                            modifiers: Modifiers::from_bits_truncate(table),
                            key: u16::from(index),
                        },
                    );
                }
            }
        }
        Ok(map)
    }

    /// Built-in US layout
    pub fn us() -> Self {
        match Self::from_source(&mut UsKeymap) {
            Ok(map) => map,
            // UsKeymap never fails
            Err(_) => Self::empty(),
        }
    }

    /// Load from the controlling console, falling back to the US layout
    pub fn load() -> Result<Self, KeymapError> {
        match Console::open_controlling() {
            Some(mut console) => {
                info!("Reading kernel keymap from {}", console.path().display());
                let map = Self::from_source(&mut console)?;
                info!("Keymap: {} typeable characters", map.len());
                Ok(map)
            }
            None => {
                warn!("Needs to run on a tty/console or as root to read the kernel keymap. Using default US keymap.");
                Ok(Self::us())
            }
        }
    }

    fn insert_first(&mut self, ch: u8, binding: CharBinding) {
        let slot = &mut self.bindings[usize::from(ch)];
        if slot.is_none() {
            *slot = Some(binding);
        }
    }

    pub fn get(&self, ch: u8) -> Option<CharBinding> {
        self.bindings[usize::from(ch)]
    }

    pub fn len(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_some()).count()
    }

    /// All typeable characters in byte order
    pub fn iter(&self) -> impl Iterator<Item = (u8, CharBinding)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(ch, b)| b.map(|b| (ch as u8, b)))
    }
}

impl fmt::Debug for CharMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(ch, b)| (ch as char, b)))
            .finish()
    }
}
