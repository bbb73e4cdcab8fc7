//! Kernel console keymap access
//!
//! Picks the console to read the keymap from and answers keymap queries
//! with the KDGKBENT ioctl.

use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use super::ioctl_helpers::ioctl_with_mut_arg;
use super::{KeymapError, KeymapSource};

// <linux/kd.h>
const KDGKBTYPE: libc::c_ulong = 0x4B33;
const KDGKBENT: libc::c_ulong = 0x4B46;
const KB_84: u8 = 0x01;
const KB_101: u8 = 0x02;

/// struct kbentry
#[repr(C)]
struct KbEntry {
    kb_table: u8,
    kb_index: u8,
    kb_value: u16,
}

/// Which console node to read the keymap from.
///
/// `tty` is stdin's terminal name, if any.
pub fn choose_console(tty: Option<&str>, is_root: bool) -> Option<PathBuf> {
    match tty {
        None => Some(PathBuf::from("/dev/console")),
        Some(path) if path.starts_with("/dev/tty") => Some(PathBuf::from(path)),
        Some(_) if is_root => Some(PathBuf::from("/dev/tty0")),
        Some(_) => None,
    }
}

/// Terminal name of stdin
fn stdin_tty() -> Option<String> {
    let ptr = unsafe { libc::ttyname(0) };
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { std::ffi::CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

/// An open console that answers keymap queries
pub struct Console {
    file: File,
    path: PathBuf,
}

impl Console {
    /// Open the console for this process, if one is reachable and really
    /// is a console. Failures are logged and yield None.
    pub fn open_controlling() -> Option<Self> {
        let tty = stdin_tty();
        debug!("stdin TTY: {:?}", tty);
        let is_root = nix::unistd::geteuid().is_root();
        let path = choose_console(tty.as_deref(), is_root)?;
        match Self::open(&path) {
            Ok(console) => Some(console),
            Err(e) => {
                warn!("Cannot use {} for the keymap: {}", path.display(), e);
                None
            }
        }
    }

    /// Open `path` and check it with KDGKBTYPE
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let console = Self {
            file,
            path: path.to_path_buf(),
        };
        let mut kb_type: u8 = 0;
        match ioctl_with_mut_arg(console.file.as_raw_fd(), KDGKBTYPE, &mut kb_type, "KDGKBTYPE") {
            Ok(()) if kb_type == KB_84 || kb_type == KB_101 => Ok(console),
            Ok(()) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("unexpected keyboard type {}", kb_type),
            )),
            Err(KeymapError::Ioctl { source, .. }) => Err(source),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeymapSource for Console {
    fn entry(&mut self, table: u8, index: u8) -> Result<u16, KeymapError> {
        let mut entry = KbEntry {
            kb_table: table,
            kb_index: index,
            kb_value: 0,
        };
        ioctl_with_mut_arg(self.file.as_raw_fd(), KDGKBENT, &mut entry, "KDGKBENT")?;
        Ok(entry.kb_value)
    }
}
