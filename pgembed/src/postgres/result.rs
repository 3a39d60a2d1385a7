//! Owned query result.
use bytes::Bytes;
use std::fmt;

use super::Oid;
use crate::common::ByteStr;

/// Status of a [`PgResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultStatus {
    EmptyQuery,
    CommandOk,
    TuplesOk,
    CopyOut,
    CopyIn,
    BadResponse,
    NonfatalError,
    FatalError,
}

/// Result column metadata.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: ByteStr,
    pub oid: Oid,
    /// Type modifier, `-1` when unspecified.
    pub fmod: i32,
    /// Storage size, negative for variable length types.
    pub fsize: i32,
    /// `0` for text, `1` for binary.
    pub format: i16,
}

/// An asynchronous notification.
#[derive(Clone, Debug)]
pub struct Notify {
    pub channel: ByteStr,
    pub pid: i32,
    pub payload: ByteStr,
}

/// Result of a command returned by the wire library.
#[derive(Clone)]
pub struct PgResult {
    status: ResultStatus,
    fields: Vec<Field>,
    rows: Vec<Vec<Option<Bytes>>>,
    cmd_status: ByteStr,
    oid_value: Oid,
    sqlstate: Option<ByteStr>,
    primary: Option<ByteStr>,
    error_message: String,
}

impl PgResult {
    /// Synthesize an empty result with given status.
    pub fn empty(status: ResultStatus) -> Self {
        Self {
            status,
            fields: vec![],
            rows: vec![],
            cmd_status: ByteStr::default(),
            oid_value: 0,
            sqlstate: None,
            primary: None,
            error_message: String::new(),
        }
    }

    pub fn builder(status: ResultStatus) -> PgResultBuilder {
        PgResultBuilder { result: Self::empty(status) }
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Number of rows.
    pub fn ntuples(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn nfields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, col: usize) -> Option<&Field> {
        self.fields.get(col)
    }

    pub fn fname(&self, col: usize) -> &str {
        self.fields.get(col).map(|f| f.name.as_str()).unwrap_or_default()
    }

    pub fn ftype(&self, col: usize) -> Oid {
        self.fields.get(col).map(|f| f.oid).unwrap_or_default()
    }

    pub fn fmod(&self, col: usize) -> i32 {
        self.fields.get(col).map(|f| f.fmod).unwrap_or(-1)
    }

    pub fn fsize(&self, col: usize) -> i32 {
        self.fields.get(col).map(|f| f.fsize).unwrap_or_default()
    }

    pub fn fformat(&self, col: usize) -> i16 {
        self.fields.get(col).map(|f| f.format).unwrap_or_default()
    }

    /// Value at given position, empty when `NULL` or out of range.
    pub fn get_value(&self, row: usize, col: usize) -> &[u8] {
        match self.rows.get(row).and_then(|r| r.get(col)) {
            Some(Some(value)) => value,
            _ => &[],
        }
    }

    pub fn get_length(&self, row: usize, col: usize) -> usize {
        self.get_value(row, col).len()
    }

    pub fn get_is_null(&self, row: usize, col: usize) -> bool {
        !matches!(self.rows.get(row).and_then(|r| r.get(col)), Some(Some(_)))
    }

    /// Command tag, e.g. `INSERT 0 1`.
    pub fn cmd_status(&self) -> &str {
        &self.cmd_status
    }

    /// Rows affected by the command, `0` when the tag carries no count.
    pub fn cmd_tuples(&self) -> u64 {
        let mut words = self.cmd_status.split_whitespace();
        let Some(verb) = words.next() else {
            return 0;
        };
        match verb {
            "INSERT" | "SELECT" | "UPDATE" | "DELETE" | "MERGE" | "MOVE" | "FETCH" | "COPY" => {
                words.last().and_then(|n| n.parse().ok()).unwrap_or_default()
            }
            _ => 0,
        }
    }

    /// Oid of the inserted row, `0` if none.
    pub fn oid_value(&self) -> Oid {
        self.oid_value
    }

    /// The `SQLSTATE` error field.
    pub fn sqlstate(&self) -> Option<&str> {
        self.sqlstate.as_deref()
    }

    /// The primary human readable error message field.
    pub fn primary_message(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Take the values of given row, used when building a one row result.
    pub(crate) fn row(&self, row: usize) -> Option<&[Option<Bytes>]> {
        self.rows.get(row).map(Vec::as_slice)
    }
}

impl fmt::Debug for PgResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("PgResult");
        dbg.field("status", &self.status);
        dbg.field("cmd_status", &self.cmd_status);
        dbg.field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>());
        for (i, row) in self.rows.iter().enumerate().take(4) {
            let row = row
                .iter()
                .map(|v| match v {
                    Some(v) => String::from_utf8_lossy(v).into_owned(),
                    None => "NULL".to_owned(),
                })
                .collect::<Vec<_>>();
            dbg.field(itoa::Buffer::new().format(i), &row);
        }
        if let Some(state) = &self.sqlstate {
            dbg.field("sqlstate", state);
        }
        dbg.finish()
    }
}

/// Builder for [`PgResult`].
///
/// Used by wire library adapters and to assemble one row results.
#[derive(Debug)]
pub struct PgResultBuilder {
    result: PgResult,
}

impl PgResultBuilder {
    /// Add a text column with unspecified modifier.
    pub fn field(self, name: &str, oid: Oid) -> Self {
        let fsize = super::pg_type::type_size(oid);
        self.field_with(Field { name: ByteStr::copy_from_str(name), oid, fmod: -1, fsize, format: 0 })
    }

    pub fn field_with(mut self, field: Field) -> Self {
        self.result.fields.push(field);
        self
    }

    /// Add a row of text values, `None` is `NULL`.
    pub fn row<'a>(mut self, values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let row = values.into_iter().map(|v| v.map(|v| Bytes::copy_from_slice(v.as_bytes()))).collect();
        self.result.rows.push(row);
        self
    }

    /// Add a row of raw values.
    pub fn raw_row(mut self, values: Vec<Option<Bytes>>) -> Self {
        self.result.rows.push(values);
        self
    }

    pub fn command(mut self, tag: &str) -> Self {
        self.result.cmd_status = ByteStr::copy_from_str(tag);
        self
    }

    pub fn oid(mut self, oid: Oid) -> Self {
        self.result.oid_value = oid;
        self
    }

    /// Set the error fields.
    pub fn error(mut self, sqlstate: &str, message: &str) -> Self {
        self.result.sqlstate = Some(ByteStr::copy_from_str(sqlstate));
        self.result.primary = Some(ByteStr::copy_from_str(message));
        self.result.error_message = format!("ERROR:  {message}\n");
        self
    }

    pub fn build(self) -> PgResult {
        self.result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accessors() {
        let res = PgResult::builder(ResultStatus::TuplesOk)
            .field("id", 23)
            .field("v", 25)
            .row([Some("1"), Some("a")])
            .row([Some("2"), None])
            .command("SELECT 2")
            .build();

        assert_eq!(res.ntuples(), 2);
        assert_eq!(res.nfields(), 2);
        assert_eq!(res.fname(1), "v");
        assert_eq!(res.ftype(0), 23);
        assert_eq!(res.fsize(0), 4);
        assert_eq!(res.fsize(1), -1);
        assert_eq!(res.get_value(0, 1), b"a");
        assert!(res.get_is_null(1, 1));
        assert_eq!(res.get_value(1, 1), b"");
        assert_eq!(res.get_length(0, 0), 1);
        assert_eq!(res.cmd_tuples(), 2);
    }

    #[test]
    fn test_cmd_tuples() {
        let tag = |t: &str| PgResult::builder(ResultStatus::CommandOk).command(t).build().cmd_tuples();
        assert_eq!(tag("INSERT 0 3"), 3);
        assert_eq!(tag("UPDATE 0"), 0);
        assert_eq!(tag("DELETE 12"), 12);
        assert_eq!(tag("CREATE TABLE"), 0);
        assert_eq!(tag(""), 0);
    }

    #[test]
    fn test_error_fields() {
        let res = PgResult::builder(ResultStatus::FatalError).error("23505", "duplicate key").build();
        assert_eq!(res.sqlstate(), Some("23505"));
        assert_eq!(res.primary_message(), Some("duplicate key"));
        assert!(res.error_message().contains("duplicate key"));
    }
}
