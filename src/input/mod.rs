//! Controller input handling
//!
//! - evdev device discovery and non-blocking reads
//! - normalization of key and axis events into logical buttons
//! - recognition of button combinations

pub mod buttons;
pub mod combo;
pub mod device;
pub mod normalizer;

pub use buttons::ButtonTable;
pub use combo::Combination;
pub use device::{DeviceFinder, EvdevFinder, EventStream};
pub use normalizer::{Normalizer, RawEvent};
