//! Process-wide interrupt flag raised by SIGINT/SIGTERM.
//!
//! The handler only sets a flag. Drivers observe it through
//! [`check_interrupt`] between scheduling decisions; nothing is preempted.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineError;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn install_signal_handler_once() -> Result<(), EngineError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = INIT.get_or_init(|| {
        ctrlc::set_handler(|| {
            INTERRUPTED.store(true, Ordering::SeqCst);
        })
        .map_err(|e| e.to_string())
    });

    result.clone().map_err(EngineError::SignalHandler)
}

/// Clear any earlier interrupt and make sure the handler is installed.
pub(crate) fn setup() -> Result<(), EngineError> {
    INTERRUPTED.store(false, Ordering::SeqCst);
    install_signal_handler_once()
}

/// Fail with [`EngineError::Interrupted`] once a termination request arrived.
pub fn check_interrupt() -> Result<(), EngineError> {
    if interrupted() {
        tracing::info!("interrupt observed");
        return Err(EngineError::Interrupted);
    }
    Ok(())
}

#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Raise the flag as if a signal had arrived.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(interrupts)]
    fn test_flag_round() {
        setup().unwrap();
        check_interrupt().unwrap();

        request_interrupt();
        assert!(matches!(check_interrupt(), Err(EngineError::Interrupted)));

        reset();
        check_interrupt().unwrap();
    }

    #[test]
    #[serial(interrupts)]
    fn test_setup_clears_and_is_repeatable() {
        request_interrupt();
        setup().unwrap();
        assert!(!interrupted());
        setup().unwrap();
    }
}
