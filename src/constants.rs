//! Global constants for padtype
//!
//! Consolidates timing defaults, notation characters and the Linux input
//! event codes used throughout the codebase.
//! Event codes are from <linux/input-event-codes.h>.

// ============================================================================
// Timing Constants
// ============================================================================

/// Press duration (ms) after which a button counts as held
pub const HOLD_THRESHOLD_MS: i64 = 250;

/// Pause between typed characters in milliseconds
pub const CHAR_DELAY_MS: u64 = 1;

/// Sleep between event reads when the controller has nothing pending
pub const POLL_INTERVAL_MS: u64 = 5;

/// Sleep between device scans while no controller is attached
pub const DISCOVERY_INTERVAL_MS: u64 = 500;

// ============================================================================
// Combination Notation
// ============================================================================

/// Separator between button labels in a combination
pub const COMBO_SEPARATOR: char = '+';

/// Terminator after each combination
pub const COMBO_TERMINATOR: char = ';';

/// Longest accepted button label in bytes
pub const MAX_LABEL_LEN: usize = 8;

// ============================================================================
// Keyboard Keys
// ============================================================================

/// Enter key
pub const KEY_ENTER: u16 = 28;

/// U key (Ctrl+U kills the line)
pub const KEY_U: u16 = 22;

/// Left Shift key
pub const KEY_LEFTSHIFT: u16 = 42;

/// Right Alt key (AltGr)
pub const KEY_RIGHTALT: u16 = 100;

/// Left Control key
pub const KEY_LEFTCTRL: u16 = 29;

/// Highest key code the virtual keyboard advertises (0..=KEYBOARD_KEY_RANGE)
pub const KEYBOARD_KEY_RANGE: u16 = 255;

// ============================================================================
// Joystick Buttons
// ============================================================================

pub const BTN_TRIGGER: u16 = 0x120;
pub const BTN_THUMB: u16 = 0x121;
pub const BTN_THUMB2: u16 = 0x122;
pub const BTN_TOP: u16 = 0x123;
pub const BTN_TOP2: u16 = 0x124;
pub const BTN_PINKIE: u16 = 0x125;
pub const BTN_BASE: u16 = 0x126;
pub const BTN_BASE2: u16 = 0x127;
pub const BTN_BASE3: u16 = 0x128;
pub const BTN_BASE4: u16 = 0x129;
pub const BTN_BASE5: u16 = 0x12a;
pub const BTN_BASE6: u16 = 0x12b;
pub const BTN_DEAD: u16 = 0x12f;

// ============================================================================
// Gamepad Buttons
// ============================================================================

pub const BTN_SOUTH: u16 = 0x130;
pub const BTN_EAST: u16 = 0x131;
pub const BTN_C: u16 = 0x132;
pub const BTN_NORTH: u16 = 0x133;
pub const BTN_WEST: u16 = 0x134;
pub const BTN_Z: u16 = 0x135;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_TL2: u16 = 0x138;
pub const BTN_TR2: u16 = 0x139;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_MODE: u16 = 0x13c;
pub const BTN_THUMBL: u16 = 0x13d;
pub const BTN_THUMBR: u16 = 0x13e;

// ============================================================================
// Absolute Axes
// ============================================================================

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT0Y: u16 = 0x11;
pub const ABS_HAT1X: u16 = 0x12;
pub const ABS_HAT1Y: u16 = 0x13;
pub const ABS_HAT2X: u16 = 0x14;
pub const ABS_HAT2Y: u16 = 0x15;
pub const ABS_HAT3X: u16 = 0x16;
pub const ABS_HAT3Y: u16 = 0x17;

/// Resolve a button name ("BTN_TRIGGER", "BTN_SOUTH", "BTN_A", ...) to its code
pub fn button_code(name: &str) -> Option<u16> {
    let code = match name.to_ascii_uppercase().as_str() {
        "BTN_TRIGGER" | "BTN_JOYSTICK" => BTN_TRIGGER,
        "BTN_THUMB" => BTN_THUMB,
        "BTN_THUMB2" => BTN_THUMB2,
        "BTN_TOP" => BTN_TOP,
        "BTN_TOP2" => BTN_TOP2,
        "BTN_PINKIE" => BTN_PINKIE,
        "BTN_BASE" => BTN_BASE,
        "BTN_BASE2" => BTN_BASE2,
        "BTN_BASE3" => BTN_BASE3,
        "BTN_BASE4" => BTN_BASE4,
        "BTN_BASE5" => BTN_BASE5,
        "BTN_BASE6" => BTN_BASE6,
        "BTN_DEAD" => BTN_DEAD,
        "BTN_SOUTH" | "BTN_A" | "BTN_GAMEPAD" => BTN_SOUTH,
        "BTN_EAST" | "BTN_B" => BTN_EAST,
        "BTN_C" => BTN_C,
        "BTN_NORTH" | "BTN_X" => BTN_NORTH,
        "BTN_WEST" | "BTN_Y" => BTN_WEST,
        "BTN_Z" => BTN_Z,
        "BTN_TL" => BTN_TL,
        "BTN_TR" => BTN_TR,
        "BTN_TL2" => BTN_TL2,
        "BTN_TR2" => BTN_TR2,
        "BTN_SELECT" => BTN_SELECT,
        "BTN_START" => BTN_START,
        "BTN_MODE" => BTN_MODE,
        "BTN_THUMBL" => BTN_THUMBL,
        "BTN_THUMBR" => BTN_THUMBR,
        _ => return None,
    };
    Some(code)
}

/// Resolve an absolute axis name ("ABS_X", "ABS_HAT0Y", ...) to its code
pub fn axis_code(name: &str) -> Option<u16> {
    let code = match name.to_ascii_uppercase().as_str() {
        "ABS_X" => ABS_X,
        "ABS_Y" => ABS_Y,
        "ABS_Z" => ABS_Z,
        "ABS_RX" => ABS_RX,
        "ABS_RY" => ABS_RY,
        "ABS_RZ" => ABS_RZ,
        "ABS_HAT0X" => ABS_HAT0X,
        "ABS_HAT0Y" => ABS_HAT0Y,
        "ABS_HAT1X" => ABS_HAT1X,
        "ABS_HAT1Y" => ABS_HAT1Y,
        "ABS_HAT2X" => ABS_HAT2X,
        "ABS_HAT2Y" => ABS_HAT2Y,
        "ABS_HAT3X" => ABS_HAT3X,
        "ABS_HAT3Y" => ABS_HAT3Y,
        _ => return None,
    };
    Some(code)
}
