//! The [`PgWire`] trait.
//!
//! The runtime never speaks the postgres protocol itself, it drives a client
//! library through [`PgWire`]. Connections are opened by the process wide
//! [`Connector`] installed with [`set_connector`].
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{
    common::ByteStr,
    postgres::{Notify, PgResult},
};

/// Connection health reported by the wire library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnStatus {
    Ok,
    Bad,
}

/// Transaction state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    Active,
    InTrans,
    InError,
    Unknown,
}

/// Notice or warning sent by the server.
#[derive(Clone, Debug)]
pub struct Notice {
    pub severity: ByteStr,
    pub sqlstate: Option<ByteStr>,
    pub message: ByteStr,
}

/// Callback receiving server notices.
pub type NoticeReceiver = Box<dyn FnMut(&Notice) + Send>;

/// A statement parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    /// `None` is `NULL`.
    pub value: Option<Bytes>,
    /// Send the value in binary format.
    pub binary: bool,
}

impl Param {
    pub fn text(value: impl Into<String>) -> Self {
        Self { value: Some(Bytes::from(value.into().into_bytes())), binary: false }
    }

    pub fn null() -> Self {
        Self { value: None, binary: false }
    }

    /// Value length, `0` for `NULL`.
    pub fn len(&self) -> usize {
        self.value.as_ref().map(Bytes::len).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One step of a `COPY OUT` transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyData {
    Row(Bytes),
    Done,
    Failed,
}

/// A synchronous postgres client connection.
///
/// Every command returns `None` when the library could not produce a result
/// at all, e.g. out of memory or a broken connection. The reason is then
/// available through [`error_message`][PgWire::error_message].
pub trait PgWire: Send {
    /// Run a command without parameters.
    fn exec(&mut self, sql: &str) -> Option<PgResult>;

    /// Run a command with parameters.
    fn exec_params(&mut self, sql: &str, params: &[Param]) -> Option<PgResult>;

    /// Run a prepared statement.
    fn exec_prepared(&mut self, name: &str, params: &[Param]) -> Option<PgResult>;

    /// Prepare a named statement.
    fn prepare(&mut self, name: &str, sql: &str) -> Option<PgResult>;

    /// Describe the result columns of a prepared statement.
    fn describe_prepared(&mut self, name: &str) -> Option<PgResult>;

    /// Next pending result, used after a copy transfer.
    fn get_result(&mut self) -> Option<PgResult>;

    fn status(&self) -> ConnStatus;

    fn transaction_status(&self) -> TransactionStatus;

    /// Latest error message of the connection.
    fn error_message(&self) -> String;

    /// Server parameter reported at startup, e.g. `standard_conforming_strings`.
    fn parameter_status(&self, name: &str) -> Option<String>;

    /// Install the notice callback, replacing the previous one.
    fn set_notice_receiver(&mut self, receiver: NoticeReceiver);

    /// Pop a pending asynchronous notification.
    fn notifies(&mut self) -> Option<Notify>;

    /// Receive the next `COPY OUT` row.
    fn get_copy_data(&mut self) -> CopyData;

    /// Terminate a `COPY IN` transfer, with an error message to abort it.
    fn end_copy(&mut self, error: Option<&str>);

    /// Close the connection.
    fn finish(&mut self) { }
}

/// Opens wire library connections.
pub trait Connector: Send + Sync {
    /// Connect with keyword and value pairs, on failure returns the library
    /// error message.
    fn connect(&self, params: &[(&str, &str)]) -> Result<Box<dyn PgWire>, String>;
}

impl<F> Connector for F
where
    F: Fn(&[(&str, &str)]) -> Result<Box<dyn PgWire>, String> + Send + Sync,
{
    fn connect(&self, params: &[(&str, &str)]) -> Result<Box<dyn PgWire>, String> {
        self(params)
    }
}

static CONNECTOR: RwLock<Option<Arc<dyn Connector>>> = RwLock::new(None);

/// Install the process wide connector.
pub fn set_connector(connector: impl Connector + 'static) {
    *CONNECTOR.write() = Some(Arc::new(connector));
}

pub(crate) fn connector() -> Option<Arc<dyn Connector>> {
    CONNECTOR.read().clone()
}
