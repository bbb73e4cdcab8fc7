//! Safe wrapper for the console keyboard ioctls
//!
//! Keeps the unsafe ioctl call and errno handling in one place.

use std::os::unix::io::RawFd;

use super::KeymapError;

/// Execute an ioctl command with a mutable argument.
///
/// # Safety
/// The caller must ensure:
/// - The fd is valid
/// - The ioctl command is appropriate for the device type
/// - The argument type matches what the ioctl expects
///
/// # Arguments
/// * `fd` - File descriptor
/// * `cmd` - ioctl command number
/// * `arg` - Mutable reference to the argument
/// * `cmd_name` - Human-readable name for error messages
pub fn ioctl_with_mut_arg<T>(
    fd: RawFd,
    cmd: libc::c_ulong,
    arg: &mut T,
    cmd_name: &'static str,
) -> Result<(), KeymapError> {
    let ret = unsafe { libc::ioctl(fd, cmd as _, arg as *mut T) };
    if ret < 0 {
        Err(KeymapError::Ioctl {
            name: cmd_name,
            source: std::io::Error::last_os_error(),
        })
    } else {
        Ok(())
    }
}
