use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide interrupt flag. Set once by the SIGINT handler installed in
/// `main`, read-only everywhere else. `CgEngine`/`TcgEngine` poll it at
/// iteration boundaries only; cancellation is cooperative, never pre-emptive.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Installs a `ctrlc` handler that flips the flag on the first SIGINT and
/// leaves the process to terminate normally on a second one (handled by the
/// engines: the first interrupt switches phase R -> E, the second stops the
/// loop -- see `CgEngine::run`).
pub fn install_handler() {
    let _ = ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
    });
}

pub fn is_set() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

pub fn clear() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_flag() {
        INTERRUPTED.store(true, Ordering::SeqCst);
        assert!(is_set());
        clear();
        assert!(!is_set());
    }
}
