//! Server notices.
//!
//! Every connection gets a receiver at connect time. Notices become warnings
//! in the diagnostics area of the thread running the statement.
use crate::{
    common::debug_log,
    sqlca::{self, code, state},
    transport::{Notice, NoticeReceiver},
};

/// Receiver installed on new connections.
pub(crate) fn receiver() -> NoticeReceiver {
    Box::new(receive)
}

/// Record `notice` as a warning.
///
/// Notices of class `00` are ignored.
pub fn receive(notice: &Notice) {
    let sqlstate = notice.sqlstate.as_deref().unwrap_or(state::INTERNAL_ERROR);
    let message = match notice.message.is_empty() {
        true => "empty message text",
        false => notice.message.as_str(),
    };

    if sqlstate.starts_with("00") {
        return;
    }

    debug_log!("ECPGnoticeReceiver: {message}");

    let sqlcode = match sqlstate {
        state::INVALID_CURSOR_NAME => code::WARNING_UNKNOWN_PORTAL,
        state::ACTIVE_SQL_TRANSACTION => code::WARNING_IN_TRANSACTION,
        state::NO_ACTIVE_SQL_TRANSACTION => code::WARNING_NO_TRANSACTION,
        state::DUPLICATE_CURSOR => code::WARNING_PORTAL_EXISTS,
        _ => code::NO_ERROR,
    };

    sqlca::with(|ca| {
        ca.set_state(sqlstate);
        ca.sqlcode = sqlcode;
        ca.sqlwarn[2] = b'W';
        ca.sqlwarn[0] = b'W';
        ca.set_message(message);
    });

    debug_log!("raising sqlcode {sqlcode}");
}
