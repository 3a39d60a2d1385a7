//! Cursor registry.
//!
//! An opened cursor is recorded on the connection it was opened through.
//! Fetching and closing run on that connection whatever the statement
//! names, so a cursor keeps working after the current connection changes.
use crate::{
    Result,
    common::debug_log,
    connection,
    declare,
    query::Query,
    sqlca::{self, code, state},
};

/// A cursor opened on a connection.
#[derive(Clone, Debug)]
pub(crate) struct Cursor {
    pub(crate) name: String,
}

/// Connection owning `cursor`.
fn owner(cursor: &str) -> Option<String> {
    connection::all().into_iter().find_map(|conn| {
        let inner = conn.lock();
        inner.cursors.iter().any(|c| c.name == cursor).then(|| inner.name.clone())
    })
}

/// Open `cursor` by running the `DECLARE ... CURSOR` statement `q`.
///
/// When the cursor is declared over a declared statement `prepared`, it is
/// opened on the connection of that statement.
pub fn open(cursor: &str, prepared: Option<&str>, mut q: Query) -> Result<()> {
    let line = q.line;
    if let Some(conn) = prepared.and_then(declare::declared_connection) {
        q.connection = Some(conn);
    }
    let conn = q.connection.clone();

    q.execute()?;

    let conn = connection::get_connection(conn.as_deref()).ok_or_else(|| connection::no_conn(line, conn.as_deref()))?;
    let mut inner = conn.lock();
    inner.cursors.retain(|c| c.name != cursor);
    inner.cursors.insert(0, Cursor { name: cursor.to_owned() });

    debug_log!("ECPGopen on line {line}: cursor {cursor} opened on connection {}", inner.name);
    Ok(())
}

/// Fetch from `cursor` by running the `FETCH` statement `q`.
pub fn fetch(cursor: &str, mut q: Query) -> Result<()> {
    if let Some(conn) = owner(cursor) {
        q.connection = Some(conn);
    }
    q.execute()
}

/// Close `cursor` by running the `CLOSE` statement `q`.
///
/// The cursor record is dropped once the server closed it.
pub fn close(cursor: &str, mut q: Query) -> Result<()> {
    let line = q.line;

    let conn = match owner(cursor) {
        Some(conn) => conn,
        None => {
            let conn = connection::resolve(line, q.connection.as_deref())?;
            debug_log!("ECPGclose on line {line}: cursor {cursor} is not open on connection {}", conn.name());
            return Err(sqlca::raise(line, code::WARNING_UNKNOWN_PORTAL, state::INVALID_CURSOR_NAME, Some(cursor)));
        }
    };
    q.connection = Some(conn.clone());

    q.execute()?;

    if let Some(conn) = connection::get_connection(Some(&conn)) {
        conn.lock().cursors.retain(|c| c.name != cursor);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        connection::{disconnect, set_connection},
        postgres::{PgResult, ResultStatus, pg_type},
        query::query,
        testing,
        value::{Compat, HostValue, Slot},
    };

    fn has_cursor(conn: &str, cursor: &str) -> bool {
        match connection::get_connection(Some(conn)) {
            Some(conn) => conn.lock().cursors.iter().any(|c| c.name == cursor),
            None => false,
        }
    }

    #[test]
    fn test_fetch_follows_owner() {
        let first = testing::open("cursor_first", Compat::Pgsql, true);
        let second = testing::open("cursor_second", Compat::Pgsql, true);
        first.on("fetch", PgResult::builder(ResultStatus::TuplesOk).field("v", pg_type::INT4).row([Some("7")]).build());

        set_connection(1, Some("cursor_first")).unwrap();
        open("c1", None, query(2, "declare c1 cursor for select 7")).unwrap();
        assert!(has_cursor("cursor_first", "c1"));

        // the current connection no longer owns the cursor
        set_connection(3, Some("cursor_second")).unwrap();
        let mut v = [0i32];
        fetch("c1", query(4, "fetch c1").output(HostValue::Int(Slot::Array(&mut v)))).unwrap();
        assert_eq!(v, [7]);
        assert!(second.executed().iter().all(|c| !c.starts_with("fetch")));

        close("c1", query(5, "close c1")).unwrap();
        assert!(!has_cursor("cursor_first", "c1"));
        assert!(first.executed().contains(&"close c1".to_owned()));

        disconnect(6, "cursor_first").unwrap();
        disconnect(7, "cursor_second").unwrap();
    }

    #[test]
    fn test_close_unknown() {
        let log = testing::open("cursor_unknown", Compat::Pgsql, true);

        let err = close("nope", query(1, "close nope").connection("cursor_unknown")).unwrap_err();
        assert_eq!(err.sqlcode(), code::WARNING_UNKNOWN_PORTAL);
        assert_eq!(sqlca::get().sqlstate_str(), "34000");
        assert!(!log.executed().contains(&"close nope".to_owned()));

        let err = close("nope", query(2, "close nope").connection("cursor_missing")).unwrap_err();
        assert_eq!(err.sqlcode(), code::NO_CONN);

        disconnect(3, "cursor_unknown").unwrap();
    }

    #[test]
    fn test_open_on_declared_connection() {
        let first = testing::open("cursor_declared", Compat::Pgsql, true);
        testing::open("cursor_other", Compat::Pgsql, true);

        declare::declare(1, Some("cursor_declared"), "cursor_stmt").unwrap();
        open("c2", Some("cursor_stmt"), query(2, "declare c2 cursor for select 1")).unwrap();

        assert!(has_cursor("cursor_declared", "c2"));
        assert!(!has_cursor("cursor_other", "c2"));
        assert!(first.executed().contains(&"declare c2 cursor for select 1".to_owned()));

        disconnect(3, "cursor_declared").unwrap();
        disconnect(4, "cursor_other").unwrap();
    }

    #[test]
    fn test_failed_open_not_recorded() {
        let log = testing::open("cursor_fail", Compat::Pgsql, true);
        log.on("declare c3", PgResult::builder(ResultStatus::FatalError).error("42P01", "relation \"t\" does not exist").build());

        let err = open("c3", None, query(1, "declare c3 cursor for select * from t")).unwrap_err();
        assert_eq!(err.sqlcode(), code::PGSQL);
        assert!(!has_cursor("cursor_fail", "c3"));

        disconnect(2, "cursor_fail").unwrap();
    }
}
