//! Controller device discovery and event reading
//!
//! Scans /dev/input/event* for a device that reports the confirm button,
//! opens it non-blocking and converts its events to [`RawEvent`]s stamped
//! relative to process start.

use evdev::{Device, EventType, InputEvent, Key};
use log::{debug, info};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::normalizer::RawEvent;

const INPUT_DIR: &str = "/dev/input";

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("controller disconnected: {0}")]
    Lost(#[source] io::Error),
}

/// Source of controller events
pub trait EventStream {
    /// Append all pending events to `out`. Nothing pending is Ok with no events.
    fn poll_events(&mut self, out: &mut Vec<RawEvent>) -> Result<(), DeviceError>;
}

/// Finds a controller to read from
pub trait DeviceFinder {
    type Device: EventStream;

    /// One discovery attempt. Open failures count as "not found yet".
    fn find(&mut self) -> Option<Self::Device>;
}

/// Milliseconds from `start` to `t`, negative if `t` is earlier
pub fn millis_since(start: SystemTime, t: SystemTime) -> i64 {
    match t.duration_since(start) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

/// An opened evdev controller
pub struct Controller {
    device: Device,
    path: PathBuf,
    start: SystemTime,
}

impl Controller {
    /// Open `path` if it reports `required_key`
    fn open(path: &Path, required_key: u16, start: SystemTime) -> Option<Self> {
        let device = match Device::open(path) {
            Ok(device) => device,
            Err(e) => {
                debug!("Cannot open {}: {}", path.display(), e);
                return None;
            }
        };
        let supported = device
            .supported_keys()
            .map(|keys| keys.contains(Key::new(required_key)))
            .unwrap_or(false);
        if !supported {
            debug!("{}: no key {:#x}, skipping", path.display(), required_key);
            return None;
        }
        if let Err(e) = set_nonblocking(&device) {
            debug!("{}: {}", path.display(), e);
            return None;
        }
        info!(
            "Controller found: {} ({})",
            path.display(),
            device.name().unwrap_or("unnamed")
        );
        Some(Self {
            device,
            path: path.to_path_buf(),
            start,
        })
    }

    fn convert(&self, event: &InputEvent) -> Option<RawEvent> {
        let time_ms = millis_since(self.start, event.timestamp());
        match event.event_type() {
            EventType::KEY => Some(RawEvent::key(event.code(), event.value(), time_ms)),
            EventType::ABSOLUTE => Some(RawEvent::abs(event.code(), event.value(), time_ms)),
            _ => None,
        }
    }
}

impl EventStream for Controller {
    fn poll_events(&mut self, out: &mut Vec<RawEvent>) -> Result<(), DeviceError> {
        let events: Vec<InputEvent> = match self.device.fetch_events() {
            Ok(events) => events.collect(),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(DeviceError::Lost(e)),
        };
        out.extend(events.iter().filter_map(|e| self.convert(e)));
        Ok(())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        info!("Controller released: {}", self.path.display());
    }
}

/// Scans /dev/input for a controller with the confirm button
pub struct EvdevFinder {
    required_key: u16,
    start: SystemTime,
}

impl EvdevFinder {
    pub fn new(required_key: u16, start: SystemTime) -> Self {
        Self { required_key, start }
    }
}

impl DeviceFinder for EvdevFinder {
    type Device = Controller;

    fn find(&mut self) -> Option<Controller> {
        candidate_paths(Path::new(INPUT_DIR))
            .iter()
            .find_map(|path| Controller::open(path, self.required_key, self.start))
    }
}

/// event* nodes in `dir`, sorted by name
fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("event"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(io::Error::from)?;
    let mut flags = OFlag::from_bits_truncate(flags);
    flags.insert(OFlag::O_NONBLOCK);
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(io::Error::from)?;
    Ok(())
}
