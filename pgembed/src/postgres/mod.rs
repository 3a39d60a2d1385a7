//! Values exchanged with the wire library.
pub mod pg_type;
mod result;

pub use pg_type::{ArrayKind, Oid};
pub use result::{Field, Notify, PgResult, PgResultBuilder, ResultStatus};
