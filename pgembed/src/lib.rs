//! Embedded SQL Runtime for Postgres
//!
//! Runtime support for programs written with embedded SQL. Statements are
//! executed with host variables bound as inputs and outputs, results are
//! scattered into caller owned storage, and every outcome is reported in a
//! per thread diagnostics area, [`Sqlca`].
//!
//! The wire library is pluggable, see [`transport::set_connector`].
//!
//! # Examples
//!
//! ```no_run
//! use pgembed::value::{Chars, Compat, HostValue, Indicator, Slot, Variable};
//!
//! # fn app() -> pgembed::Result<()> {
//! pgembed::connect(1, Compat::Pgsql, Some("tcp:postgresql://localhost:5432/db"), None, None, Some("main"), true)?;
//!
//! let mut ids = [0i32; 3];
//! let mut names = Vec::new();
//! let mut ind = [0i16; 3];
//!
//! pgembed::query(2, "SELECT id, name FROM t ORDER BY id")
//!     .output(HostValue::Int(Slot::Array(&mut ids)))
//!     .output(
//!         Variable::new(HostValue::Char(Chars::pointer(&mut names)))
//!             .with_indicator(Indicator::Short(Slot::Array(&mut ind))),
//!     )
//!     .execute()?;
//!
//! assert_eq!(pgembed::sqlca::get().sqlerrd[2], 3);
//!
//! pgembed::disconnect(3, "main")?;
//! # Ok(())
//! # }
//! ```

pub mod common;

// Diagnostics
pub mod sqlca;
mod error;
pub mod memory;

// Protocol
pub mod postgres;
pub mod transport;

// Encoding
pub mod types;
pub mod value;
pub mod encode;
mod row;

// Component
pub mod sql;
pub mod statement;
pub mod cache;
pub mod descriptor;
pub mod sqlda;

// Operation
mod pipeline;
pub mod query;
pub mod cursor;
pub mod declare;
pub mod transaction;

// Connection
pub mod connection;
mod notice;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use sqlca::Sqlca;
pub use connection::{Connection, Config, connect, disconnect, set_connection};
#[doc(inline)]
pub use query::{Query, StatementType, query};
pub use error::{BackendError, Error, ErrorKind, Result, SqlError};
