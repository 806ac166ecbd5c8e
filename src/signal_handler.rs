use nix::sys::signal::{signal, SigHandler, Signal};

/// Keeps keyboard interrupts aimed at the foreground children from killing
/// the interactive shell itself.
pub fn ignore_interrupts() {
    for sig in [Signal::SIGINT, Signal::SIGQUIT] {
        // SAFETY: SIG_IGN installs no handler code.
        if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
            log::warn!("could not ignore {}: {}", sig, e);
        }
    }
}

/// Resets dispositions in a freshly forked child. Ignored signals survive
/// `execvp`, and the Rust runtime ignores `SIGPIPE` at startup, so a writer
/// in a pipeline would otherwise never die when its reader exits.
pub fn restore_defaults() {
    for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGPIPE] {
        // SAFETY: SIG_DFL installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}
