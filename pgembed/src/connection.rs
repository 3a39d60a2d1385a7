//! Connection registry.
//!
//! Connections are named and kept in a process wide list, most recent
//! first. Each thread has its own current connection, falling back to the
//! process wide default when unset. Passing no name or `CURRENT` to any
//! entry point selects that connection.
use parking_lot::{Mutex, MutexGuard};
use std::{
    cell::RefCell,
    sync::{Arc, Weak},
};

use crate::{
    Result,
    common::{debug_log, regression_mode, span, verbose},
    cursor::Cursor,
    memory, notice,
    postgres::{PgResult, pg_type::TypeCache},
    sqlca::{self, code, state},
    statement::{self, Prepared},
    transport::{self, ConnStatus, PgWire, TransactionStatus},
    value::Compat,
};

mod config;

pub use config::{Config, DBPATH_ENV, ParseError};

/// Name used when neither a target nor a name is given.
pub const DEFAULT: &str = "DEFAULT";
/// Alias of the current connection.
pub const CURRENT: &str = "CURRENT";
/// Selects every connection in [`disconnect`].
pub const ALL: &str = "ALL";

/// A named database connection.
pub struct Connection {
    name: String,
    inner: Mutex<Inner>,
}

/// State guarded by the connection lock.
pub(crate) struct Inner {
    pub(crate) name: String,
    pub(crate) wire: Option<Box<dyn PgWire>>,
    pub(crate) autocommit: bool,
    pub(crate) types: TypeCache,
    pub(crate) prepared: Vec<Prepared>,
    pub(crate) cursors: Vec<Cursor>,
}

impl Connection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn autocommit(&self) -> bool {
        self.inner.lock().autocommit
    }

    /// Returns `true` until the connection is closed.
    pub fn is_open(&self) -> bool {
        self.inner.lock().wire.is_some()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("name", &self.name).finish()
    }
}

impl Inner {
    /// The wire handle, raising `NOT_CONN` once the connection is closed.
    pub(crate) fn wire(&mut self, line: i32) -> Result<&mut dyn PgWire> {
        match self.wire.as_deref_mut() {
            Some(wire) => Ok(wire),
            None => Err(sqlca::raise(line, code::NOT_CONN, state::INTERNAL_ERROR, Some(&self.name))),
        }
    }

    /// Run a parameterless command and check its result.
    pub(crate) fn exec(&mut self, line: i32, compat: Compat, sql: &str) -> Result<PgResult> {
        let wire = self.wire(line)?;
        let result = wire.exec(sql);
        sqlca::check_result(line, result, wire, compat)
    }

    pub(crate) fn transaction_status(&self) -> TransactionStatus {
        match &self.wire {
            Some(wire) => wire.transaction_status(),
            None => TransactionStatus::Unknown,
        }
    }
}

struct Registry {
    list: Vec<Arc<Connection>>,
    default: Option<Arc<Connection>>,
}

impl Registry {
    fn find(&self, name: &str) -> Option<Arc<Connection>> {
        self.list.iter().find(|c| c.name == name).cloned()
    }

    fn resolve(&self, name: Option<&str>) -> Option<Arc<Connection>> {
        match name {
            None | Some(CURRENT) => current().or_else(|| self.default.clone()),
            Some(name) => self.find(name),
        }
    }
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry { list: Vec::new(), default: None });

thread_local! {
    static CURRENT_CONN: RefCell<Weak<Connection>> = const { RefCell::new(Weak::new()) };
}

fn current() -> Option<Arc<Connection>> {
    CURRENT_CONN.with_borrow(Weak::upgrade)
}

fn set_current(conn: Option<&Arc<Connection>>) {
    CURRENT_CONN.set(conn.map(Arc::downgrade).unwrap_or_default());
}

/// Look up a connection by name, `None` or `CURRENT` select the current one.
pub fn get_connection(name: Option<&str>) -> Option<Arc<Connection>> {
    match name {
        None | Some(CURRENT) => current().or_else(|| REGISTRY.lock().default.clone()),
        Some(name) => REGISTRY.lock().find(name),
    }
}

/// Every open connection, most recent first.
pub(crate) fn all() -> Vec<Arc<Connection>> {
    REGISTRY.lock().list.clone()
}

/// Reset the diagnostics area and resolve `name`, raising `NO_CONN` when it
/// is unknown.
pub(crate) fn resolve(line: i32, name: Option<&str>) -> Result<Arc<Connection>> {
    sqlca::init();
    get_connection(name).ok_or_else(|| no_conn(line, name))
}

pub(crate) fn no_conn(line: i32, name: Option<&str>) -> crate::Error {
    sqlca::raise(line, code::NO_CONN, state::CONNECTION_DOES_NOT_EXIST, Some(name.unwrap_or("NULL")))
}

/// Open a connection.
///
/// `target` is a connection target as described in [`Config`]. Without a
/// `name` the connection is named after the database, or `DEFAULT` when no
/// target is given either. The new connection becomes both the process wide
/// default and the current connection of the calling thread.
pub fn connect(
    line: i32,
    compat: Compat,
    target: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
    name: Option<&str>,
    autocommit: bool,
) -> Result<()> {
    span!("connect", line);
    sqlca::init();
    memory::clear_auto_mem();

    let mut target = target.map(str::to_owned);
    if compat.is_informix() {
        if let Some(path) = Config::from_env() {
            target = Some(path);
        }
    }

    let config = match target.as_deref() {
        Some(target) => match Config::parse(target) {
            Ok(config) => config,
            Err(err) => {
                debug_log!("ECPGconnect: {err:#} on line {line}");
                return Err(sqlca::raise(line, code::CONNECT, state::UNABLE_TO_ESTABLISH_CONNECTION, Some("<DEFAULT>")));
            }
        },
        None => Config::default(),
    };

    let display = config.dbname().unwrap_or("<DEFAULT>").to_owned();
    let name = name
        .or(config.dbname())
        .unwrap_or(DEFAULT)
        .to_owned();

    let mut registry = REGISTRY.lock();

    if registry.find(&name).is_some() {
        debug_log!("ECPGconnect: connection identifier {name} is already in use");
        return Err(sqlca::raise(line, code::CONNECT, state::UNABLE_TO_ESTABLISH_CONNECTION, Some(&display)));
    }

    let port = match (config.port(), regression_mode()) {
        (Some(_), true) => "<REGRESSION_PORT>",
        (port, _) => port.unwrap_or("<DEFAULT>"),
    };
    let options = config.options().iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    debug_log!(
        "ECPGconnect: opening database {display} on {} port {port} {}{} {}{}",
        config.host().unwrap_or("<DEFAULT>"),
        if options.is_empty() { "" } else { "with options " },
        options,
        if user.is_some_and(|u| !u.is_empty()) { "for user " } else { "" },
        user.unwrap_or(""),
    );

    let Some(connector) = transport::connector() else {
        debug_log!("ECPGconnect: no connector installed");
        return Err(sqlca::raise(line, code::CONNECT, state::UNABLE_TO_ESTABLISH_CONNECTION, Some(&display)));
    };

    let mut wire = match connector.connect(&config.params(user, password)) {
        Ok(wire) if wire.status() == ConnStatus::Ok => wire,
        Ok(mut wire) => {
            debug_log!("ECPGconnect: {}", wire.error_message().trim_end());
            wire.finish();
            return Err(sqlca::raise(line, code::CONNECT, state::UNABLE_TO_ESTABLISH_CONNECTION, Some(&display)));
        }
        Err(message) => {
            debug_log!("ECPGconnect: {}", message.trim_end());
            return Err(sqlca::raise(line, code::CONNECT, state::UNABLE_TO_ESTABLISH_CONNECTION, Some(&display)));
        }
    };

    wire.set_notice_receiver(notice::receiver());
    verbose!("connected {name}");

    let conn = Arc::new(Connection {
        name: name.clone(),
        inner: Mutex::new(Inner {
            name,
            wire: Some(wire),
            autocommit,
            types: TypeCache::new(),
            prepared: vec![],
            cursors: vec![],
        }),
    });

    registry.list.insert(0, conn.clone());
    registry.default = Some(conn.clone());
    set_current(Some(&conn));

    Ok(())
}

/// Make `name` the current connection of the calling thread.
pub fn set_connection(line: i32, name: Option<&str>) -> Result<()> {
    let conn = resolve(line, name)?;
    set_current(Some(&conn));
    Ok(())
}

/// Close one connection, the current one with `CURRENT`, or every
/// connection with `ALL`.
pub fn disconnect(line: i32, name: &str) -> Result<()> {
    span!("disconnect", line);
    let mut registry = REGISTRY.lock();

    if name == ALL {
        sqlca::init();
        for conn in registry.list.clone() {
            finish(&mut registry, &conn);
        }
        return Ok(());
    }

    sqlca::init();
    let Some(conn) = registry.resolve(Some(name)) else {
        return Err(no_conn(line, Some(name)));
    };
    finish(&mut registry, &conn);
    Ok(())
}

/// Deallocate prepared statements, close the wire handle and unlink the
/// connection.
fn finish(registry: &mut Registry, conn: &Arc<Connection>) {
    {
        let mut inner = conn.lock();
        if inner.wire.is_some() {
            // failures are already recorded in the diagnostics area
            let _ = statement::deallocate_all_locked(0, Compat::Pgsql, &mut inner);
        }
        if let Some(mut wire) = inner.wire.take() {
            wire.finish();
        }
        inner.prepared.clear();
        inner.cursors.clear();
    }

    registry.list.retain(|c| !Arc::ptr_eq(c, conn));
    let head = registry.list.first().cloned();

    let is_current = CURRENT_CONN.with_borrow(|c| std::ptr::eq(c.as_ptr(), Arc::as_ptr(conn)));
    if is_current {
        set_current(head.as_ref());
    }
    if registry.default.as_ref().is_some_and(|d| Arc::ptr_eq(d, conn)) {
        registry.default = head;
    }

    debug_log!("ecpg_finish: connection {} closed", conn.name);
}

/// Check that `name` is connected.
pub fn status(line: i32, name: Option<&str>) -> Result<()> {
    let conn = resolve(line, name)?;
    conn.lock().wire(line)?;
    Ok(())
}

/// Transaction state of a connection, `Unknown` when it does not exist.
pub fn transaction_status(name: Option<&str>) -> TransactionStatus {
    match get_connection(name) {
        Some(conn) => conn.lock().transaction_status(),
        None => TransactionStatus::Unknown,
    }
}

/// Run `f` with the wire handle of a connection.
pub fn with_wire<R>(name: Option<&str>, f: impl FnOnce(&mut dyn PgWire) -> R) -> Option<R> {
    let conn = get_connection(name)?;
    let mut inner = conn.lock();
    inner.wire.as_deref_mut().map(|wire| f(wire))
}
