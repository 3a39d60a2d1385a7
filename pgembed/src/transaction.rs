//! Autocommit mode and transaction commands.
use crate::{
    Result,
    common::debug_log,
    connection,
    transport::TransactionStatus,
    value::Compat,
};

/// Switch autocommit `on` or `off`.
///
/// Turning autocommit off outside a transaction begins one, turning it on
/// inside a transaction commits it.
pub fn set_commit(line: i32, mode: &str, conn: Option<&str>) -> Result<()> {
    let conn = connection::resolve(line, conn)?;
    let mut inner = conn.lock();

    debug_log!("ECPGsetcommit on line {line}: action \"{mode}\"; connection \"{}\"", inner.name);

    if inner.autocommit && mode.starts_with("off") {
        if inner.transaction_status() == TransactionStatus::Idle {
            inner.exec(line, Compat::Pgsql, "begin transaction")?;
        }
        inner.autocommit = false;
    } else if !inner.autocommit && mode.starts_with("on") {
        if inner.transaction_status() != TransactionStatus::Idle {
            inner.exec(line, Compat::Pgsql, "commit")?;
        }
        inner.autocommit = true;
    }

    Ok(())
}

/// Run a transaction command such as `commit` or `rollback`.
///
/// Without autocommit and outside a transaction, a `begin transaction` is
/// issued first unless `command` starts a transaction or finishes a
/// prepared one.
pub fn trans(line: i32, conn: Option<&str>, command: &str) -> Result<()> {
    let conn = connection::resolve(line, conn)?;
    let mut inner = conn.lock();

    debug_log!("ECPGtrans on line {line}: action \"{command}\"; connection \"{}\"", inner.name);

    if inner.wire.is_none() {
        return Ok(());
    }

    let starts_own = ["begin", "start", "commit prepared", "rollback prepared"]
        .iter()
        .any(|prefix| command.starts_with(prefix));

    if inner.transaction_status() == TransactionStatus::Idle && !inner.autocommit && !starts_own {
        inner.exec(line, Compat::Pgsql, "begin transaction")?;
    }

    inner.exec(line, Compat::Pgsql, command)?;
    Ok(())
}
