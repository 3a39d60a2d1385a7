//! Declared statements.
//!
//! `DECLARE name STATEMENT` binds a statement name to the connection that
//! was current, or named, at that point. Cursors opened over the statement
//! run on that connection.
use parking_lot::Mutex;

use crate::{
    Result,
    common::debug_log,
    connection,
    sqlca,
};

#[derive(Debug)]
struct Declared {
    name: String,
    connection: String,
}

static DECLARED: Mutex<Vec<Declared>> = Mutex::new(Vec::new());

/// Bind statement `name` to a connection.
///
/// Declaring a name again keeps the first binding.
pub fn declare(line: i32, conn: Option<&str>, name: &str) -> Result<()> {
    sqlca::init();

    let conn = connection::get_connection(conn).ok_or_else(|| connection::no_conn(line, conn))?;

    let mut list = DECLARED.lock();
    if list.iter().any(|d| d.name == name) {
        return Ok(());
    }

    debug_log!("ECPGdeclare on line {line}: statement {name} on connection {}", conn.name());
    list.insert(0, Declared { name: name.to_owned(), connection: conn.name().to_owned() });
    Ok(())
}

/// Connection a statement was declared on.
pub fn declared_connection(name: &str) -> Option<String> {
    DECLARED.lock().iter().find(|d| d.name == name).map(|d| d.connection.clone())
}
