//! Built-in US keymap
//!
//! Mirrors what the kernel reports for the "us" console layout on key
//! positions 1..=57, so the fallback goes through the same decoding as a
//! real console.

use super::{KeymapError, KeymapSource, K_ENTER, K_HOLE, KT_LATIN, KT_LETTER};

/// Rows of consecutive keys: first key code, plain symbols, shifted symbols
const ROWS: &[(u8, &[u8], &[u8])] = &[
    (2, b"1234567890-=", b"!@#$%^&*()_+"),
    (16, b"qwertyuiop[]", b"QWERTYUIOP{}"),
    (30, b"asdfghjkl;'`", b"ASDFGHJKL:\"~"),
    (43, b"\\zxcvbnm,./", b"|ZXCVBNM<>?"),
];

/// Keys that type the same control character with or without shift
const SINGLES: &[(u8, u8)] = &[(1, 0x1b), (14, 0x7f), (15, b'\t'), (57, b' ')];

const KEY_ENTER: u8 = 28;

/// The default US layout as a keymap source
pub struct UsKeymap;

impl UsKeymap {
    fn symbol(table: u8, index: u8) -> u16 {
        if table > 1 {
            return K_HOLE;
        }
        if index == KEY_ENTER {
            return K_ENTER;
        }
        if let Some(&(_, ch)) = SINGLES.iter().find(|(key, _)| *key == index) {
            return (KT_LATIN << 8) | u16::from(ch);
        }
        for &(first, plain, shifted) in ROWS {
            let Some(offset) = index.checked_sub(first) else {
                continue;
            };
            let row = if table == 0 { plain } else { shifted };
            if let Some(&ch) = row.get(usize::from(offset)) {
                let ktyp = if ch.is_ascii_alphabetic() { KT_LETTER } else { KT_LATIN };
                return (ktyp << 8) | u16::from(ch);
            }
        }
        K_HOLE
    }
}

impl KeymapSource for UsKeymap {
    fn entry(&mut self, table: u8, index: u8) -> Result<u16, KeymapError> {
        Ok(Self::symbol(table, index))
    }
}
