//! Shutdown requests via signalfd
//!
//! SIGINT and SIGTERM are blocked and read synchronously from a
//! non-blocking signalfd, so no handler runs asynchronously. The session
//! polls the token once per iteration.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use nix::sys::signal::{SigSet, SigmaskHow, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

/// Polled once per loop iteration
pub trait ShutdownSignal {
    /// True once shutdown was requested; stays true afterwards
    fn requested(&mut self) -> bool;
}

pub struct SignalShutdown {
    signal_fd: SignalFd,
    /// Signal mask to restore on drop
    old_sigmask: SigSet,
    received: bool,
    /// A read error was already reported
    read_error_logged: bool,
}

impl SignalShutdown {
    /// Block SIGINT/SIGTERM and route them to a signalfd
    pub fn install() -> Result<Self> {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);

        let old_sigmask = mask
            .thread_swap_mask(SigmaskHow::SIG_BLOCK)
            .context("Failed to block signals")?;

        let signal_fd = match SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC) {
            Ok(fd) => fd,
            Err(e) => {
                let _ = old_sigmask.thread_set_mask();
                return Err(e).context("Failed to create signalfd");
            }
        };

        Ok(Self {
            signal_fd,
            old_sigmask,
            received: false,
            read_error_logged: false,
        })
    }

    /// Report a failed read once; returns true if this call logged it
    fn read_failed(&mut self, e: nix::Error) -> bool {
        if self.read_error_logged {
            debug!("signalfd read error: {}", e);
            return false;
        }
        warn!("signalfd read error: {}", e);
        self.read_error_logged = true;
        true
    }
}

impl ShutdownSignal for SignalShutdown {
    fn requested(&mut self) -> bool {
        if self.received {
            return true;
        }
        match self.signal_fd.read_signal() {
            Ok(Some(siginfo)) => {
                let signo = siginfo.ssi_signo as i32;
                let name = Signal::try_from(signo).map(Signal::as_str).unwrap_or("signal");
                info!("{} received, shutting down", name);
                self.received = true;
            }
            Ok(None) => {}
            Err(e) => {
                self.read_failed(e);
            }
        }
        self.received
    }
}

impl Drop for SignalShutdown {
    fn drop(&mut self) {
        if let Err(e) = self.old_sigmask.thread_set_mask() {
            warn!("Failed to restore signal mask: {}", e);
        }
    }
}
