//! Debug stream switch.
//!
//! Lines are written through the [`log`] crate at `debug` level with the
//! `pgembed` target, the application decides where they end up by installing
//! a logger.
use parking_lot::Mutex;
use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicI32, Ordering},
};

use crate::sqlca;

static LEVEL: AtomicI32 = AtomicI32::new(0);
static REGRESSION: AtomicBool = AtomicBool::new(false);

/// Serialize writers so the regression sqlca line follows its message.
static STREAM: Mutex<()> = Mutex::new(());
/// Serialize reconfiguration.
static INIT: Mutex<()> = Mutex::new(());

/// Set the debug level.
///
/// Level `0` disables the debug stream. Values above `100` additionally
/// enable regression mode, which replaces the process id with `NO_PID` and
/// dumps the diagnostics area after every line.
pub fn debug(level: i32) {
    let _init = INIT.lock();

    if level > 100 {
        REGRESSION.store(true, Ordering::SeqCst);
        LEVEL.store(level - 100, Ordering::SeqCst);
    } else {
        LEVEL.store(level, Ordering::SeqCst);
    }

    debug_log!("ECPGdebug: set to {}", debug_level());
}

/// Current debug level.
pub fn debug_level() -> i32 {
    LEVEL.load(Ordering::Relaxed)
}

/// Returns `true` if regression mode is enabled.
pub fn regression_mode() -> bool {
    REGRESSION.load(Ordering::Relaxed)
}

pub(crate) fn write_debug(args: fmt::Arguments) {
    let _stream = STREAM.lock();

    if !regression_mode() {
        log::debug!(target: "pgembed", "[{}]: {args}", std::process::id());
        return;
    }

    log::debug!(target: "pgembed", "[NO_PID]: {args}");

    if let Some((code, state)) = sqlca::try_peek(|ca| (ca.sqlcode, ca.sqlstate_str().to_owned())) {
        log::debug!(target: "pgembed", "[NO_PID]: sqlca: code: {code}, state: {state}");
    }
}
