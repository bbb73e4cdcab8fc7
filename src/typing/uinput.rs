//! uinput virtual keyboard
//!
//! Key transitions are buffered until `sync`, then posted as one batch;
//! `VirtualDevice::emit` terminates each batch with SYN_REPORT.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use log::info;

use super::{KeySink, TypingError};
use crate::constants::KEYBOARD_KEY_RANGE;

/// A keyboard created through /dev/uinput, advertising key codes 0..=255
pub struct UinputKeyboard {
    device: VirtualDevice,
    name: String,
    pending: Vec<InputEvent>,
}

impl UinputKeyboard {
    pub fn create(name: &str) -> Result<Self, TypingError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 0..=KEYBOARD_KEY_RANGE {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(name).with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(TypingError::DeviceCreation)?;

        info!("Virtual keyboard created: {}", name);
        Ok(Self {
            device,
            name: name.to_string(),
            pending: Vec::with_capacity(4),
        })
    }
}

impl KeySink for UinputKeyboard {
    fn write_key(&mut self, code: u16, pressed: bool) -> Result<(), TypingError> {
        self.pending
            .push(InputEvent::new(EventType::KEY, code, i32::from(pressed)));
        Ok(())
    }

    fn sync(&mut self) -> Result<(), TypingError> {
        let result = self.device.emit(&self.pending).map_err(TypingError::Write);
        self.pending.clear();
        result
    }
}

impl Drop for UinputKeyboard {
    fn drop(&mut self) {
        info!("Virtual keyboard destroyed: {}", self.name);
    }
}
