//! Prepared statements.
//!
//! Each connection keeps the statements the server has prepared for it,
//! most recent first. Names are unique per connection, preparing a name
//! again deallocates the previous statement.
use crate::{
    Result,
    common::debug_log,
    connection::{self, Inner},
    descriptor,
    sql::replace_variables,
    sqlca::{self, code, state},
    sqlda::Sqlda,
    value::{Compat, HostValue, SqldaSlot, Variable},
};

/// A statement prepared on a connection.
#[derive(Clone, Debug)]
pub(crate) struct Prepared {
    pub(crate) name: String,
    pub(crate) command: String,
    /// The server acknowledged the `PREPARE`.
    pub(crate) prepared: bool,
    pub(crate) line: i32,
}

impl Inner {
    pub(crate) fn find_prepared(&self, name: &str) -> Option<usize> {
        self.prepared.iter().position(|p| p.name == name)
    }

    /// Command text of a prepared statement.
    pub(crate) fn prepared_command(&self, name: &str) -> Option<&str> {
        self.find_prepared(name).map(|i| self.prepared[i].command.as_str())
    }
}

/// Prepare `text` as `name` on a connection.
///
/// Host variable references in `text` are replaced by `$1`, `$2`, and so on.
pub fn prepare(line: i32, conn: Option<&str>, name: &str, text: &str) -> Result<()> {
    let conn = connection::resolve(line, conn)?;
    let mut inner = conn.lock();

    if let Some(idx) = inner.find_prepared(name) {
        deallocate_one(line, Compat::Pgsql, &mut inner, idx)?;
    }

    prepare_common(line, &mut inner, name, text)
}

pub(crate) fn prepare_common(line: i32, inner: &mut Inner, name: &str, text: &str) -> Result<()> {
    let command = replace_variables(text);

    let wire = inner.wire(line)?;
    let result = wire.prepare(name, &command);
    sqlca::check_result(line, result, wire, Compat::Pgsql)?;

    debug_log!("prepare_common on line {line}: name {name}; query: \"{command}\"");

    inner.prepared.insert(0, Prepared { name: name.to_owned(), command, prepared: true, line });
    Ok(())
}

/// Record a statement prepared by a `PREPARE name AS` command.
///
/// The server accepted the name, so a record under the same name is stale
/// and dropped without deallocating.
pub(crate) fn register(line: i32, inner: &mut Inner, name: &str, command: &str) {
    if let Some(idx) = inner.find_prepared(name) {
        inner.prepared.remove(idx);
    }
    debug_log!("ecpg_register_prepared_stmt on line {line}: name {name}");
    inner.prepared.insert(0, Prepared { name: name.to_owned(), command: command.to_owned(), prepared: true, line });
}

/// Deallocate the statement at `idx`, on the server first.
///
/// A failed server deallocation is tolerated in Informix modes.
pub(crate) fn deallocate_one(line: i32, compat: Compat, inner: &mut Inner, idx: usize) -> Result<()> {
    let Some(this) = inner.prepared.get(idx) else {
        return Ok(());
    };
    let (name, prepared) = (this.name.clone(), this.prepared);

    debug_log!("deallocate_one on line {line}: name {name}");

    let mut ok = false;
    if prepared {
        ok = inner.exec(line, compat, &format!("deallocate \"{name}\"")).is_ok();
    }

    if !ok && !compat.is_informix() {
        return Err(sqlca::raise(line, code::INVALID_STMT, state::INVALID_SQL_STATEMENT_NAME, Some(&name)));
    }

    inner.prepared.remove(idx);
    Ok(())
}

/// Deallocate a prepared statement.
pub fn deallocate(line: i32, compat: Compat, conn: Option<&str>, name: &str) -> Result<()> {
    let conn = connection::resolve(line, conn)?;
    let mut inner = conn.lock();

    match inner.find_prepared(name) {
        Some(idx) => deallocate_one(line, compat, &mut inner, idx),
        None if compat.is_informix() => Ok(()),
        None => Err(sqlca::raise(line, code::INVALID_STMT, state::INVALID_SQL_STATEMENT_NAME, Some(name))),
    }
}

/// Deallocate every prepared statement of a connection.
pub fn deallocate_all(line: i32, compat: Compat, conn: Option<&str>) -> Result<()> {
    let conn = connection::resolve(line, conn)?;
    let mut inner = conn.lock();
    deallocate_all_locked(line, compat, &mut inner)
}

pub(crate) fn deallocate_all_locked(line: i32, compat: Compat, inner: &mut Inner) -> Result<()> {
    while !inner.prepared.is_empty() {
        deallocate_one(line, compat, inner, 0)?;
    }
    Ok(())
}

/// Command text of a prepared statement.
pub fn prepared_statement(conn: Option<&str>, name: &str) -> Option<String> {
    let conn = connection::get_connection(conn)?;
    let inner = conn.lock();
    inner.prepared_command(name).map(str::to_owned)
}

/// Describe the result columns of a prepared statement into descriptors or
/// SQLDA variables.
///
/// Describing the input parameters is not supported.
pub fn describe(
    line: i32,
    compat: Compat,
    input: bool,
    conn: Option<&str>,
    name: &str,
    targets: &mut [Variable],
) -> Result<()> {
    sqlca::init();

    if input {
        return Err(sqlca::raise(line, code::UNSUPPORTED, state::INTERNAL_ERROR, Some("DESCRIBE INPUT")));
    }

    let conn = connection::get_connection(conn).ok_or_else(|| connection::no_conn(line, conn))?;
    let mut inner = conn.lock();

    if inner.find_prepared(name).is_none() {
        return Err(sqlca::raise(line, code::INVALID_STMT, state::INVALID_SQL_STATEMENT_NAME, Some(name)));
    }

    for target in targets {
        match &mut target.value {
            HostValue::Descriptor(desc) => {
                descriptor::exists(line, desc)?;
                let wire = inner.wire(line)?;
                let result = wire.describe_prepared(name);
                let result = sqlca::check_result(line, result, wire, compat)?;
                descriptor::set_result(line, desc, result)?;
            }
            HostValue::Sqlda(SqldaSlot::Output(slot)) => {
                let wire = inner.wire(line)?;
                let result = wire.describe_prepared(name);
                let result = sqlca::check_result(line, result, wire, compat)?;
                let sqlda = Sqlda::build(line, &result, None, compat)?;
                **slot = Some(Box::new(sqlda));
            }
            _ => { }
        }
    }

    Ok(())
}
