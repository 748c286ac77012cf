// signals.rs -- fatal signal capture
//
// The handler only records the signal number; the frame loop notices it,
// restores the display and then re-raises with the default disposition.

use std::sync::atomic::{AtomicI32, Ordering};

static PENDING: AtomicI32 = AtomicI32::new(0);

const CAUGHT: [libc::c_int; 6] = [libc::SIGHUP, libc::SIGINT, libc::SIGQUIT, libc::SIGTRAP, libc::SIGABRT, libc::SIGTERM];

extern "C" fn on_signal(sig: libc::c_int) {
    // first signal wins
    let _ = PENDING.compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
}

/// Install handlers for hangup, interrupt, quit, trap, abort and terminate.
pub fn install() {
    for sig in CAUGHT {
        // SAFETY: the handler only touches an atomic, which is async-signal-safe.
        let prev = unsafe { libc::signal(sig, on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t) };
        if prev == libc::SIG_ERR {
            tracing::warn!(sig, "failed to install signal handler");
        }
    }
}

/// The caught signal, if any.
pub fn pending() -> Option<i32> {
    match PENDING.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Restore the default disposition and deliver `sig` again.
pub fn reraise(sig: i32) {
    // SAFETY: plain libc calls with a valid signal number.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}
