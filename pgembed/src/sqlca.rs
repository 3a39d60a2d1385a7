//! The SQL communication area.
//!
//! Every thread owns one [`Sqlca`], it is reset at the start of every entry
//! point and filled by the runtime when a call raises an error or a warning.
use std::cell::RefCell;

use crate::{
    Error, Result,
    common::debug_log,
    error::{BackendError, SqlError},
    memory,
    postgres::{PgResult, ResultStatus},
    transport::{ConnStatus, PgWire},
    value::Compat,
};

/// Numeric error codes stored in `sqlcode`.
pub mod code {
    pub const NO_ERROR: i64 = 0;
    pub const NOT_FOUND: i64 = 100;

    pub const OUT_OF_MEMORY: i64 = -12;

    pub const UNSUPPORTED: i64 = -200;
    pub const TOO_MANY_ARGUMENTS: i64 = -201;
    pub const TOO_FEW_ARGUMENTS: i64 = -202;
    pub const TOO_MANY_MATCHES: i64 = -203;
    pub const INT_FORMAT: i64 = -204;
    pub const UINT_FORMAT: i64 = -205;
    pub const FLOAT_FORMAT: i64 = -206;
    pub const NUMERIC_FORMAT: i64 = -207;
    pub const INTERVAL_FORMAT: i64 = -208;
    pub const DATE_FORMAT: i64 = -209;
    pub const TIMESTAMP_FORMAT: i64 = -210;
    pub const CONVERT_BOOL: i64 = -211;
    pub const EMPTY: i64 = -212;
    pub const MISSING_INDICATOR: i64 = -213;
    pub const NO_ARRAY: i64 = -214;
    pub const DATA_NOT_ARRAY: i64 = -215;
    pub const ARRAY_INSERT: i64 = -216;

    pub const NO_CONN: i64 = -220;
    pub const NOT_CONN: i64 = -221;

    pub const INVALID_STMT: i64 = -230;

    pub const INFORMIX_DUPLICATE_KEY: i64 = -239;

    pub const UNKNOWN_DESCRIPTOR: i64 = -240;
    pub const INVALID_DESCRIPTOR_INDEX: i64 = -241;
    pub const UNKNOWN_DESCRIPTOR_ITEM: i64 = -242;
    pub const VAR_NOT_NUMERIC: i64 = -243;
    pub const VAR_NOT_CHAR: i64 = -244;

    pub const INFORMIX_SUBSELECT_NOT_ONE: i64 = -284;

    pub const PGSQL: i64 = -400;
    pub const TRANS: i64 = -401;
    pub const CONNECT: i64 = -402;
    pub const DUPLICATE_KEY: i64 = -403;
    pub const SUBSELECT_NOT_ONE: i64 = -404;

    pub const WARNING_UNRECOGNIZED: i64 = -600;
    pub const WARNING_QUERY_IGNORED: i64 = -601;
    pub const WARNING_UNKNOWN_PORTAL: i64 = -602;
    pub const WARNING_IN_TRANSACTION: i64 = -603;
    pub const WARNING_NO_TRANSACTION: i64 = -604;
    pub const WARNING_PORTAL_EXISTS: i64 = -605;
}

/// SQLSTATE values set by the runtime.
pub mod state {
    pub const SUCCESS: &str = "00000";
    pub const NO_DATA: &str = "02000";
    pub const USING_CLAUSE_DOES_NOT_MATCH_PARAMETERS: &str = "07001";
    pub const USING_CLAUSE_DOES_NOT_MATCH_TARGETS: &str = "07002";
    pub const RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION: &str = "07006";
    pub const INVALID_DESCRIPTOR_INDEX: &str = "07009";
    pub const UNABLE_TO_ESTABLISH_CONNECTION: &str = "08001";
    pub const CONNECTION_DOES_NOT_EXIST: &str = "08003";
    pub const TRANSACTION_RESOLUTION_UNKNOWN: &str = "08007";
    pub const CARDINALITY_VIOLATION: &str = "21000";
    pub const NULL_VALUE_NO_INDICATOR_PARAMETER: &str = "22002";
    pub const ACTIVE_SQL_TRANSACTION: &str = "25001";
    pub const NO_ACTIVE_SQL_TRANSACTION: &str = "25P01";
    pub const INVALID_SQL_STATEMENT_NAME: &str = "26000";
    pub const INVALID_SQL_DESCRIPTOR_NAME: &str = "33000";
    pub const INVALID_CURSOR_NAME: &str = "34000";
    pub const SYNTAX_ERROR: &str = "42601";
    pub const DATATYPE_MISMATCH: &str = "42804";
    pub const DUPLICATE_CURSOR: &str = "42P03";
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const ADMIN_SHUTDOWN: &str = "57P02";
    pub const INTERNAL_ERROR: &str = "YE000";
    pub const OUT_OF_MEMORY: &str = "YE001";
}

const SQLERRMC_LEN: usize = 150;

/// Error message record of [`Sqlca`].
#[derive(Clone, Copy)]
pub struct Sqlerrm {
    pub sqlerrml: i16,
    pub sqlerrmc: [u8; SQLERRMC_LEN],
}

/// The diagnostics area.
#[derive(Clone, Copy)]
pub struct Sqlca {
    pub sqlcaid: [u8; 8],
    pub sqlabc: i64,
    pub sqlcode: i64,
    pub sqlerrm: Sqlerrm,
    pub sqlerrp: [u8; 8],
    /// `[1]` is the oid of an inserted row, `[2]` the number of processed rows.
    pub sqlerrd: [i64; 6],
    /// `[0]` summary warning flag, `[1]` truncation, `[2]` notice.
    pub sqlwarn: [u8; 8],
    pub sqlstate: [u8; 5],
}

impl Sqlca {
    const INIT: Sqlca = Sqlca {
        sqlcaid: *b"SQLCA   ",
        sqlabc: size_of::<Sqlca>() as i64,
        sqlcode: 0,
        sqlerrm: Sqlerrm { sqlerrml: 0, sqlerrmc: [0; SQLERRMC_LEN] },
        sqlerrp: *b"NOT SET ",
        sqlerrd: [0; 6],
        sqlwarn: [0; 8],
        sqlstate: *b"00000",
    };

    /// The error message, without the terminating nul.
    pub fn message(&self) -> &str {
        let len = self.sqlerrm.sqlerrml.clamp(0, SQLERRMC_LEN as i16) as usize;
        std::str::from_utf8(&self.sqlerrm.sqlerrmc[..len]).unwrap_or_default()
    }

    pub fn sqlstate_str(&self) -> &str {
        std::str::from_utf8(&self.sqlstate).unwrap_or(state::INTERNAL_ERROR)
    }

    /// Returns `true` if the summary warning flag is set.
    pub fn is_warning(&self) -> bool {
        self.sqlwarn[0] == b'W'
    }

    pub(crate) fn set_message(&mut self, message: &str) {
        // always keep room for the nul terminator, and never split a char
        let mut len = message.len().min(SQLERRMC_LEN - 1);
        while !message.is_char_boundary(len) {
            len -= 1;
        }
        self.sqlerrm.sqlerrmc = [0; SQLERRMC_LEN];
        self.sqlerrm.sqlerrmc[..len].copy_from_slice(&message.as_bytes()[..len]);
        self.sqlerrm.sqlerrml = len as i16;
    }

    pub(crate) fn set_state(&mut self, sqlstate: &str) {
        let mut buf = *b"     ";
        let len = sqlstate.len().min(5);
        buf[..len].copy_from_slice(&sqlstate.as_bytes()[..len]);
        self.sqlstate = buf;
    }

    pub(crate) fn set_truncated(&mut self) {
        self.sqlwarn[0] = b'W';
        self.sqlwarn[1] = b'W';
    }
}

impl Default for Sqlca {
    fn default() -> Self {
        Self::INIT
    }
}

impl std::fmt::Debug for Sqlca {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sqlca")
            .field("sqlcode", &self.sqlcode)
            .field("sqlstate", &self.sqlstate_str())
            .field("message", &self.message())
            .field("sqlerrd", &self.sqlerrd)
            .field("sqlwarn", &String::from_utf8_lossy(&self.sqlwarn))
            .finish()
    }
}

thread_local! {
    static SQLCA: RefCell<Sqlca> = const { RefCell::new(Sqlca::INIT) };
}

/// Returns a copy of the current thread diagnostics area.
pub fn get() -> Sqlca {
    SQLCA.with_borrow(|ca| *ca)
}

/// Access the current thread diagnostics area mutably.
pub fn with<R>(f: impl FnOnce(&mut Sqlca) -> R) -> R {
    SQLCA.with_borrow_mut(f)
}

/// Read the diagnostics area unless it is currently borrowed.
pub(crate) fn try_peek<R>(f: impl FnOnce(&Sqlca) -> R) -> Option<R> {
    SQLCA.with(|ca| ca.try_borrow().ok().map(|ca| f(&ca)))
}

/// Reset the current thread diagnostics area.
pub fn init() {
    with(|ca| *ca = Sqlca::INIT);
}

fn message(code: i64, line: i32, param: Option<&str>) -> String {
    let param = param.unwrap_or("");
    match code {
        code::NOT_FOUND => format!("no data found on line {line}"),
        code::OUT_OF_MEMORY => format!("out of memory on line {line}"),
        code::UNSUPPORTED => format!("unsupported type \"{param}\" on line {line}"),
        code::TOO_MANY_ARGUMENTS => format!("too many arguments on line {line}"),
        code::TOO_FEW_ARGUMENTS => format!("too few arguments on line {line}"),
        code::INT_FORMAT => format!("invalid input syntax for type int: \"{param}\", on line {line}"),
        code::UINT_FORMAT => format!("invalid input syntax for type unsigned int: \"{param}\", on line {line}"),
        code::FLOAT_FORMAT => format!("invalid input syntax for floating-point type: \"{param}\", on line {line}"),
        code::NUMERIC_FORMAT => format!("invalid input syntax for type numeric: \"{param}\", on line {line}"),
        code::INTERVAL_FORMAT => format!("invalid input syntax for type interval: \"{param}\", on line {line}"),
        code::DATE_FORMAT => format!("invalid input syntax for type date: \"{param}\", on line {line}"),
        code::TIMESTAMP_FORMAT => format!("invalid input syntax for type timestamp: \"{param}\", on line {line}"),
        code::CONVERT_BOOL if param.is_empty() => {
            format!("could not convert boolean value: size mismatch, on line {line}")
        }
        code::CONVERT_BOOL => format!("invalid input syntax for type boolean: \"{param}\", on line {line}"),
        code::EMPTY => format!("empty query on line {line}"),
        code::MISSING_INDICATOR => format!("null value without indicator on line {line}"),
        code::NO_ARRAY => format!("variable does not have an array type on line {line}"),
        code::DATA_NOT_ARRAY => format!("data read from server is not an array on line {line}"),
        code::ARRAY_INSERT => format!("inserting an array of variables is not supported on line {line}"),
        code::NO_CONN => format!("connection \"{param}\" does not exist on line {line}"),
        code::NOT_CONN => format!("not connected to connection \"{param}\" on line {line}"),
        code::INVALID_STMT => format!("invalid statement name \"{param}\" on line {line}"),
        code::UNKNOWN_DESCRIPTOR => format!("descriptor \"{param}\" not found on line {line}"),
        code::INVALID_DESCRIPTOR_INDEX => format!("descriptor index out of range on line {line}"),
        code::UNKNOWN_DESCRIPTOR_ITEM => format!("unrecognized descriptor item \"{param}\" on line {line}"),
        code::VAR_NOT_NUMERIC => format!("variable does not have a numeric type on line {line}"),
        code::VAR_NOT_CHAR => format!("variable does not have a character type on line {line}"),
        code::TRANS => format!("error in transaction processing on line {line}"),
        code::CONNECT => format!("could not connect to database \"{param}\" on line {line}"),
        code::WARNING_UNKNOWN_PORTAL => format!("cursor \"{param}\" does not exist on line {line}"),
        _ if param.is_empty() => format!("SQL error {code} on line {line}"),
        _ => format!("SQL error {code} ({param}) on line {line}"),
    }
}

/// Raise a runtime error.
///
/// The diagnostics area is filled, the auto memory arena released, and the
/// returned [`Error`] carries the same code and state.
pub(crate) fn raise(line: i32, code: i64, sqlstate: &'static str, param: Option<&str>) -> Error {
    let message = message(code, line, param);

    with(|ca| {
        ca.sqlcode = code;
        ca.set_state(sqlstate);
        ca.set_message(&message);
    });

    debug_log!("raising sqlcode {code} on line {line}: {message}");

    memory::free_auto_mem();

    SqlError::new(code, sqlstate, message).into()
}

/// Raise an error reported by the server or the wire library.
pub(crate) fn raise_backend(
    line: i32,
    result: Option<&PgResult>,
    wire: &dyn PgWire,
    compat: Compat,
) -> Error {
    let (mut sqlstate, mut message) = match result {
        Some(result) => (
            result.sqlstate().unwrap_or(state::INTERNAL_ERROR).to_owned(),
            result.primary_message().unwrap_or_default().to_owned(),
        ),
        None => (state::OUT_OF_MEMORY.to_owned(), wire.error_message()),
    };

    if sqlstate == state::INTERNAL_ERROR && wire.status() == ConnStatus::Bad {
        sqlstate = state::ADMIN_SHUTDOWN.to_owned();
        message = "the connection to the server was lost".to_owned();
    }

    let text = format!("{} on line {line}", message.trim_end());

    let code = match sqlstate.as_str() {
        state::UNIQUE_VIOLATION if compat.is_informix() => code::INFORMIX_DUPLICATE_KEY,
        state::UNIQUE_VIOLATION => code::DUPLICATE_KEY,
        state::CARDINALITY_VIOLATION if compat.is_informix() => code::INFORMIX_SUBSELECT_NOT_ONE,
        state::CARDINALITY_VIOLATION => code::SUBSELECT_NOT_ONE,
        _ => code::PGSQL,
    };

    with(|ca| {
        ca.sqlcode = code;
        ca.set_state(&sqlstate);
        ca.set_message(&text);
    });

    debug_log!("raising sqlstate {sqlstate} (sqlcode {code}): {text}");

    memory::free_auto_mem();

    BackendError::new(code, sqlstate.into(), text).into()
}

/// Check a result returned by the wire library.
///
/// Accepts `TUPLES_OK`, `COMMAND_OK` and `COPY_OUT`. `COPY_IN` is declined by
/// ending the copy with an error.
pub(crate) fn check_result(
    line: i32,
    result: Option<PgResult>,
    wire: &mut dyn PgWire,
    compat: Compat,
) -> Result<PgResult> {
    let Some(result) = result else {
        debug_log!("ecpg_check_PQresult on line {line}: no result - {}", wire.error_message());
        return Err(raise_backend(line, None, wire, compat));
    };

    match result.status() {
        ResultStatus::TuplesOk | ResultStatus::CommandOk | ResultStatus::CopyOut => Ok(result),
        ResultStatus::EmptyQuery => Err(raise(line, code::EMPTY, state::INTERNAL_ERROR, None)),
        ResultStatus::NonfatalError | ResultStatus::FatalError | ResultStatus::BadResponse => {
            debug_log!("ecpg_check_PQresult on line {line}: bad response - {}", result.error_message());
            Err(raise_backend(line, Some(&result), wire, compat))
        }
        ResultStatus::CopyIn => {
            debug_log!("ecpg_check_PQresult on line {line}: COPY IN data transfer in progress");
            wire.end_copy(Some("COPY FROM STDIN is not supported"));
            Err(raise(line, code::UNSUPPORTED, state::INTERNAL_ERROR, Some("COPY FROM STDIN")))
        }
    }
}
