//! Deferred signal handling.
//!
//! The handler only records which signal arrived. External tools share the
//! terminal's process group, so they receive the same signal and exit; the
//! main flow then observes the recorded signal at its next checkpoint and runs
//! the cleanup itself, outside signal context.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::{Error, Result};

static RECEIVED: AtomicI32 = AtomicI32::new(0);

#[cfg(unix)]
const HANDLED: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

#[cfg(unix)]
extern "C" fn record_signal(signum: libc::c_int) {
    RECEIVED.store(signum, Ordering::SeqCst);
}

/// Routes termination signals to the recorder. Must be called before the first
/// stage that modifies the target directory.
#[cfg(unix)]
pub(crate) fn install() -> Result<()> {
    for signum in HANDLED {
        set_handler(signum, record_signal as extern "C" fn(libc::c_int) as libc::sighandler_t)?;
    }
    Ok(())
}

/// Restores default dispositions once nothing needs undoing.
#[cfg(unix)]
pub(crate) fn uninstall() -> Result<()> {
    for signum in HANDLED {
        set_handler(signum, libc::SIG_DFL)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_handler(signum: libc::c_int, handler: libc::sighandler_t) -> Result<()> {
    // No SA_RESTART: a blocking terminal read should return when interrupted.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signum, &action, std::ptr::null_mut())
    };
    if rc != 0 {
        return Err(Error::Io(format!(
            "failed to install handler for signal {}: {}",
            signum,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install() -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn uninstall() -> Result<()> {
    Ok(())
}

pub(crate) fn received() -> Option<i32> {
    match RECEIVED.load(Ordering::SeqCst) {
        0 => None,
        signum => Some(signum),
    }
}

/// Fails with [`Error::Interrupted`] if a signal has arrived since `install`.
pub(crate) fn checkpoint() -> Result<()> {
    match received() {
        Some(signum) => Err(Error::Interrupted(signum)),
        None => Ok(()),
    }
}
