//! SQLDA, a self contained result layout.
//!
//! An [`Sqlda`] describes one result row. Everything it refers to lives in
//! one byte block: the header and the per column headers, the column names,
//! then one value slot per column at its natural alignment. Pointers inside
//! the headers are offsets into that block, `0` for none, so dropping the
//! block drops everything.
//!
//! Two flavors share the shape, [`SqldaKind::Native`] and the Informix
//! compatible [`SqldaKind::Compat`]. The block sizes follow the C layout of
//! a 64 bit target.
use std::fmt;

use crate::{
    Error, Result,
    common::debug_log,
    memory,
    postgres::{ArrayKind, Oid, PgResult, pg_type},
    row::{self, Context},
    sqlca::{self, code, state},
    types::{Date, Decimal, Interval, Numeric, Timestamp, DECSIZE},
    value::{Chars, Compat, HostValue, Indicator, NoIndNull, Slot, Type, Variable},
};

/// Byte sizes of the C structures.
pub mod layout {
    pub const NATIVE_HEADER: usize = 32;
    pub const NATIVE_VAR: usize = 96;
    pub const COMPAT_HEADER: usize = 56;
    pub const COMPAT_VAR: usize = 120;

    pub const SHORT: usize = 2;
    pub const INT: usize = 4;
    pub const LONG: usize = 8;
    pub const POINTER: usize = 8;
    pub const BOOL: usize = 1;
    pub const FLOAT: usize = 4;
    pub const DOUBLE: usize = 8;
    pub const DECIMAL: usize = 52;
    pub const NUMERIC: usize = 40;
    pub const DATE: usize = 8;
    pub const TIMESTAMP: usize = 8;
    pub const INTERVAL: usize = 16;

    /// Values longer than this are flagged as long data in the compat flavor.
    pub const LONG_DATA: usize = 32768;
}

/// Field positions inside the block.
mod field {
    // native header
    pub const SQLDAID: usize = 0;
    pub const SQLDABC: usize = 8;
    pub const SQLN: usize = 16;
    pub const SQLD: usize = 18;
    pub const DESC_NEXT: usize = 24;

    // compat header, `desc_occ` keeps the full block size
    pub const COMPAT_SQLD: usize = 0;
    pub const COMPAT_SQLVAR: usize = 8;
    pub const COMPAT_DESC_OCC: usize = 36;
    pub const COMPAT_DESC_NEXT: usize = 40;

    // column header, relative to its start
    pub const SQLTYPE: usize = 0;
    pub const IND: usize = 2;
    pub const SQLLEN: usize = 4;
    pub const SQLDATA: usize = 8;
    pub const SQLIND: usize = 16;
    pub const SQLNAME: usize = 24;
    pub const SQLNAME_LEN: usize = 32;
    pub const SQLXID: usize = 36;
    pub const SQLTYPELEN: usize = 40;
    pub const LONG_DATA: usize = 44;
}

/// SQLDA flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqldaKind {
    Native,
    Compat,
}

impl SqldaKind {
    /// Informix modes use the compat flavor.
    pub fn for_compat(compat: Compat) -> Self {
        match compat.is_informix() {
            true => Self::Compat,
            false => Self::Native,
        }
    }

    fn header_size(self) -> usize {
        match self {
            Self::Native => layout::NATIVE_HEADER,
            Self::Compat => layout::COMPAT_HEADER,
        }
    }

    fn var_size(self) -> usize {
        match self {
            Self::Native => layout::NATIVE_VAR,
            Self::Compat => layout::COMPAT_VAR,
        }
    }
}

/// One result row with its column descriptions.
pub struct Sqlda {
    kind: SqldaKind,
    /// Row the value slots were sized for.
    row: Option<usize>,
    /// Offset of the first value slot.
    values_at: usize,
    block: Vec<u8>,
    next: Option<Box<Sqlda>>,
}

/// Round `offset` up to `alignment`, returns the slot start and the offset
/// past `size` bytes.
fn align_add(offset: usize, alignment: usize, size: usize) -> (usize, usize) {
    let start = offset.next_multiple_of(alignment);
    (start, start + size)
}

/// Offset of the first value slot.
fn empty_size(kind: SqldaKind, result: &PgResult) -> usize {
    let sqld = result.nfields();
    let mut offset = kind.header_size() + sqld * kind.var_size();
    offset += (0..sqld).map(|i| result.fname(i).len() + 1).sum::<usize>();
    align_add(offset, layout::INT, 0).0
}

/// Slot of a value of type `ty`, the numeric digit buffer excluded.
fn slot(ty: Type, offset: usize, value: &[u8]) -> (usize, usize) {
    match ty {
        Type::Short => align_add(offset, layout::SHORT, layout::SHORT),
        Type::Int => align_add(offset, layout::INT, layout::INT),
        Type::Long | Type::LongLong => align_add(offset, layout::LONG, layout::LONG),
        Type::Bool => align_add(offset, layout::BOOL, layout::BOOL),
        Type::Float => align_add(offset, layout::FLOAT, layout::FLOAT),
        Type::Double => align_add(offset, layout::DOUBLE, layout::DOUBLE),
        Type::Decimal => align_add(offset, layout::INT, layout::DECIMAL),
        Type::Numeric => align_add(offset, layout::POINTER, layout::NUMERIC),
        Type::Date => align_add(offset, layout::DATE, layout::DATE),
        Type::Timestamp => align_add(offset, layout::LONG, layout::TIMESTAMP),
        Type::Interval => align_add(offset, layout::LONG, layout::INTERVAL),
        _ => align_add(offset, layout::INT, c_strlen(value) + 1),
    }
}

/// Length up to the first nul, like the C string view of a text value.
fn c_strlen(value: &[u8]) -> usize {
    value.iter().position(|b| *b == 0).unwrap_or(value.len())
}

/// Size of the block for `row`.
fn total_size(kind: SqldaKind, result: &PgResult, row: Option<usize>, compat: Compat) -> usize {
    let mut offset = empty_size(kind, result);
    let Some(row) = row else {
        return offset;
    };

    for col in 0..result.nfields() {
        let ty = pg_type::sqlda_type(result.ftype(col), compat);
        let value = result.get_value(row, col);
        let (_, mut next) = slot(ty, offset, value);

        if ty == Type::Numeric && !result.get_is_null(row, col) {
            if let Some(num) = std::str::from_utf8(value).ok().and_then(|v| Numeric::from_asc(v).ok()) {
                let (buf, _) = num.raw_parts();
                next = align_add(next, layout::INT, buf.len()).1;
            }
        }

        offset = next;
    }

    offset
}

/// A row or result other than the one the block was laid out for.
fn layout_mismatch(line: i32) -> Error {
    sqlca::raise(line, code::INVALID_DESCRIPTOR_INDEX, state::INVALID_DESCRIPTOR_INDEX, None)
}

impl Sqlda {
    /// Lay out the block for `result`, values are filled by [`Sqlda::set`]
    /// with the same `row`.
    ///
    /// Without a `row` only the column descriptions are laid out.
    pub fn build(line: i32, result: &PgResult, row: Option<usize>, compat: Compat) -> Result<Self> {
        let kind = SqldaKind::for_compat(compat);
        let size = total_size(kind, result, row, compat);
        let block = memory::alloc(size, line)?;
        let sqld = result.nfields();

        let mut sqlda = Self {
            kind,
            row,
            values_at: empty_size(kind, result),
            block,
            next: None,
        };

        match kind {
            SqldaKind::Native => {
                let sqldabc = kind.header_size() + sqld * kind.var_size();
                sqlda.block[field::SQLDAID..field::SQLDAID + 8].copy_from_slice(b"SQLDA  \0");
                sqlda.put(field::SQLDABC, (sqldabc as i64).to_ne_bytes());
                sqlda.put(field::SQLN, (sqld as i16).to_ne_bytes());
                sqlda.put(field::SQLD, (sqld as i16).to_ne_bytes());
                sqlda.put(field::DESC_NEXT, 0u64.to_ne_bytes());
            }
            SqldaKind::Compat => {
                sqlda.put(field::COMPAT_SQLD, (sqld as i16).to_ne_bytes());
                sqlda.put(field::COMPAT_SQLVAR, (layout::COMPAT_HEADER as u64).to_ne_bytes());
                sqlda.put(field::COMPAT_DESC_OCC, (size as i32).to_ne_bytes());
                sqlda.put(field::COMPAT_DESC_NEXT, 0u64.to_ne_bytes());
            }
        }

        let mut name_at = kind.header_size() + sqld * kind.var_size();
        for col in 0..sqld {
            let name = result.fname(col).as_bytes();
            sqlda.block[name_at..name_at + name.len()].copy_from_slice(name);

            let hdr = sqlda.var_at(col);
            let ty = pg_type::sqlda_type(result.ftype(col), compat);
            sqlda.put(hdr + field::SQLTYPE, (ty.code() as i16).to_ne_bytes());
            sqlda.put(hdr + field::SQLIND, ((hdr + field::IND) as u64).to_ne_bytes());
            sqlda.put(hdr + field::SQLNAME, (name_at as u64).to_ne_bytes());
            sqlda.put(hdr + field::SQLNAME_LEN, (name.len() as i16).to_ne_bytes());
            sqlda.put(hdr + field::SQLXID, result.ftype(col).to_ne_bytes());
            sqlda.put(hdr + field::SQLTYPELEN, result.fsize(col).to_ne_bytes());

            name_at += name.len() + 1;
        }

        match kind {
            SqldaKind::Native => debug_log!("ecpg_build_native_sqlda on line {line} sqld = {sqld}"),
            SqldaKind::Compat => debug_log!("ecpg_build_compat_sqlda on line {line} sqld = {sqld}"),
        }

        Ok(sqlda)
    }

    /// Place the values of `row` into the block.
    ///
    /// Every column gets a slot and an indicator, `-1` for null and `0`
    /// otherwise. Null values are stored as the sentinel of their type.
    /// A `row` or `result` the block was not laid out for is rejected.
    pub fn set(&mut self, line: i32, result: &PgResult, row: usize, compat: Compat) -> Result<()> {
        let sqld = self.sqld().max(0) as usize;
        if self.row != Some(row) || result.nfields() != sqld {
            return Err(layout_mismatch(line));
        }

        let ctx = Context { line, compat, force_indicator: false };
        let mut offset = self.values_at;

        for col in 0..sqld {
            let hdr = self.var_at(col);
            let ty = type_at(&self.block, hdr);
            let value = result.get_value(row, col);
            let null = result.get_is_null(row, col);
            let (start, mut next) = slot(ty, offset, value);
            let sqllen = next - start;

            debug_log!(
                "ecpg_set_{}_sqlda on line {line} row {row} col {col} {}",
                if self.kind == SqldaKind::Native { "native" } else { "compat" },
                if null { "IS NULL" } else { "IS NOT NULL" },
            );

            let cell = self.block.get_mut(start..next).ok_or_else(|| layout_mismatch(line))?;

            macro_rules! fetch {
                ($variant:ident, $ty:ty) => {{
                    let mut v: [$ty; 1] = Default::default();
                    if null {
                        v[0].set_noind_null();
                    } else {
                        let mut var = Variable::new(HostValue::$variant(Slot::Array(&mut v)));
                        row::get_data(&ctx, result, row, col, &mut var, 0, ArrayKind::None)?;
                    }
                    let [v] = v;
                    v
                }};
            }

            match ty {
                Type::Short => cell.copy_from_slice(&fetch!(Short, i16).to_ne_bytes()),
                Type::Int => cell.copy_from_slice(&fetch!(Int, i32).to_ne_bytes()),
                Type::Long => cell.copy_from_slice(&fetch!(Long, i64).to_ne_bytes()),
                Type::LongLong => cell.copy_from_slice(&fetch!(LongLong, i64).to_ne_bytes()),
                Type::Bool => cell[0] = fetch!(Bool, bool) as u8,
                Type::Float => cell.copy_from_slice(&fetch!(Float, f32).to_ne_bytes()),
                Type::Double => cell.copy_from_slice(&fetch!(Double, f64).to_ne_bytes()),
                Type::Decimal => put_decimal(cell, &fetch!(Decimal, Decimal)),
                Type::Date => cell.copy_from_slice(&(fetch!(Date, Date).0 as i64).to_ne_bytes()),
                Type::Timestamp => cell.copy_from_slice(&fetch!(Timestamp, Timestamp).0.to_ne_bytes()),
                Type::Interval => {
                    let v = fetch!(Interval, Interval);
                    cell[..8].copy_from_slice(&v.time.to_ne_bytes());
                    cell[8..].copy_from_slice(&(v.month as i64).to_ne_bytes());
                }
                Type::Numeric => {
                    let parsed = match null {
                        true => None,
                        false => std::str::from_utf8(value).ok().and_then(|v| Numeric::from_asc(v).ok()),
                    };
                    match parsed {
                        Some(num) => {
                            let (buf, digits) = num.raw_parts();
                            let (at, end) = align_add(next, layout::INT, buf.len());
                            put_numeric(cell, &num, Some((at, at + digits)));
                            self.block
                                .get_mut(at..end)
                                .ok_or_else(|| layout_mismatch(line))?
                                .copy_from_slice(buf);
                            next = end;
                        }
                        None => {
                            let mut num = Numeric::new();
                            num.set_noind_null();
                            put_numeric(cell, &num, None);
                        }
                    }
                }
                _ => {
                    if !null {
                        let mut var = Variable::new(HostValue::Char(Chars::array(cell, sqllen)));
                        row::get_data(&ctx, result, row, col, &mut var, 0, ArrayKind::None)?;
                    } else if let Some(b) = cell.first_mut() {
                        *b = 0;
                    }
                }
            }

            let long_data = self.kind == SqldaKind::Compat && ty != Type::Numeric && sqllen > layout::LONG_DATA;
            self.put(hdr + field::SQLDATA, (start as u64).to_ne_bytes());
            self.put(hdr + field::SQLLEN, (sqllen as i32).to_ne_bytes());
            self.put(hdr + field::IND, (if null { -1i16 } else { 0 }).to_ne_bytes());
            self.put(hdr + field::LONG_DATA, [long_data as u8]);

            offset = next;
        }

        Ok(())
    }

    fn put<const N: usize>(&mut self, at: usize, bytes: [u8; N]) {
        self.block[at..at + N].copy_from_slice(&bytes);
    }

    /// Offset of the header of column `i`.
    fn var_at(&self, i: usize) -> usize {
        self.kind.header_size() + i * self.kind.var_size()
    }

    pub fn kind(&self) -> SqldaKind {
        self.kind
    }

    /// The `SQLDA  ` marker of the native flavor, zeroed in the compat one.
    pub fn sqldaid(&self) -> &[u8; 8] {
        const NONE: &[u8; 8] = &[0; 8];
        match self.kind {
            SqldaKind::Native => self.block.first_chunk().unwrap_or(NONE),
            SqldaKind::Compat => NONE,
        }
    }

    /// Header size of the native flavor, full block size in the compat one.
    pub fn sqldabc(&self) -> i64 {
        match self.kind {
            SqldaKind::Native => i64::from_ne_bytes(read(&self.block, field::SQLDABC)),
            SqldaKind::Compat => i32::from_ne_bytes(read(&self.block, field::COMPAT_DESC_OCC)) as i64,
        }
    }

    pub fn sqln(&self) -> i16 {
        match self.kind {
            SqldaKind::Native => i16::from_ne_bytes(read(&self.block, field::SQLN)),
            SqldaKind::Compat => self.sqld(),
        }
    }

    /// Number of columns.
    pub fn sqld(&self) -> i16 {
        match self.kind {
            SqldaKind::Native => i16::from_ne_bytes(read(&self.block, field::SQLD)),
            SqldaKind::Compat => i16::from_ne_bytes(read(&self.block, field::COMPAT_SQLD)),
        }
    }

    /// Size of the block.
    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    pub fn var(&self, i: usize) -> Option<SqlVar<'_>> {
        (i < self.sqld().max(0) as usize).then(|| SqlVar { sqlda: self, at: self.var_at(i) })
    }

    pub fn vars(&self) -> impl Iterator<Item = SqlVar<'_>> {
        (0..self.sqld().max(0) as usize).map(|i| SqlVar { sqlda: self, at: self.var_at(i) })
    }

    /// Set the indicator of column `i`, a negative value makes it null on
    /// input.
    pub fn set_indicator(&mut self, i: usize, ind: i16) {
        if let Some(at) = self.var(i).and_then(|v| v.sqlind_at()) {
            self.put(at, ind.to_ne_bytes());
        }
    }

    /// The following row of a chain.
    pub fn next(&self) -> Option<&Sqlda> {
        self.next.as_deref()
    }

    pub(crate) fn set_next(&mut self, next: Option<Box<Sqlda>>) {
        self.next = next;
    }

    /// This row and the ones chained after it.
    pub fn iter(&self) -> impl Iterator<Item = &Sqlda> {
        std::iter::successors(Some(self), |s| s.next())
    }

    /// Marshal column `i` as a statement parameter.
    ///
    /// In Informix modes any nonzero indicator means null.
    pub(crate) fn store_input(&self, line: i32, i: usize, force_indicator: bool) -> Result<Option<String>> {
        let Some(var) = self.var(i) else {
            return Ok(None);
        };

        let ind = match (self.kind, var.sqlind()) {
            (SqldaKind::Compat, ind) if ind != 0 => -1,
            (_, ind) => ind,
        };
        let ind = [ind];
        let indicator = Indicator::Short(Slot::Input(&ind));

        macro_rules! input {
            ($variant:ident, $value:expr) => {{
                let value = [$value];
                let var = Variable::new(HostValue::$variant(Slot::Input(&value))).with_indicator(indicator);
                crate::encode::store_input(line, force_indicator, &var, false)
            }};
        }

        match var.sqltype() {
            Type::Short => input!(Short, var.as_i16().unwrap_or_default()),
            Type::Int => input!(Int, var.as_i32().unwrap_or_default()),
            Type::Long => input!(Long, var.as_i64().unwrap_or_default()),
            Type::LongLong => input!(LongLong, var.as_i64().unwrap_or_default()),
            Type::Bool => input!(Bool, var.as_bool().unwrap_or_default()),
            Type::Float => input!(Float, var.as_f32().unwrap_or_default()),
            Type::Double => input!(Double, var.as_f64().unwrap_or_default()),
            Type::Decimal => input!(Decimal, var.as_decimal().unwrap_or_default()),
            Type::Numeric => input!(Numeric, var.as_numeric().unwrap_or_default()),
            Type::Date => input!(Date, var.as_date().unwrap_or_default()),
            Type::Timestamp => input!(Timestamp, var.as_timestamp().unwrap_or_default()),
            Type::Interval => input!(Interval, var.as_interval().unwrap_or_default()),
            _ => {
                let text = var.as_bytes().unwrap_or_default();
                let var = Variable::new(HostValue::Char(Chars::input(text))).with_indicator(indicator);
                crate::encode::store_input(line, force_indicator, &var, false)
            }
        }
    }
}

/// `N` bytes at `at`, zeroed when out of the buffer.
fn read<const N: usize>(buf: &[u8], at: usize) -> [u8; N] {
    buf.get(at..at + N).and_then(|b| b.try_into().ok()).unwrap_or([0; N])
}

/// Block offset stored at `at`, `None` for the null offset.
fn offset_at(buf: &[u8], at: usize) -> Option<usize> {
    match u64::from_ne_bytes(read(buf, at)) {
        0 => None,
        offset => usize::try_from(offset).ok(),
    }
}

/// Type of the column header at `hdr`.
fn type_at(buf: &[u8], hdr: usize) -> Type {
    let code = i16::from_ne_bytes(read(buf, hdr + field::SQLTYPE));
    Type::from_code(code as i32).unwrap_or(Type::Char)
}

fn put_i32(cell: &mut [u8], at: usize, value: i32) {
    cell[at..at + 4].copy_from_slice(&value.to_ne_bytes());
}

fn get_i32(cell: &[u8], at: usize) -> i32 {
    i32::from_ne_bytes(read(cell, at))
}

fn get_u64(cell: &[u8], at: usize) -> u64 {
    u64::from_ne_bytes(read(cell, at))
}

fn put_decimal(cell: &mut [u8], value: &Decimal) {
    put_i32(cell, 0, value.ndigits);
    put_i32(cell, 4, value.weight);
    put_i32(cell, 8, value.rscale);
    put_i32(cell, 12, value.dscale);
    put_i32(cell, 16, value.sign as i32);
    cell[20..20 + DECSIZE].copy_from_slice(&value.digits);
}

/// The numeric header, its buffer pointers are block offsets.
fn put_numeric(cell: &mut [u8], value: &Numeric, buf: Option<(usize, usize)>) {
    put_i32(cell, 0, value.ndigits);
    put_i32(cell, 4, value.weight);
    put_i32(cell, 8, value.rscale);
    put_i32(cell, 12, value.dscale);
    put_i32(cell, 16, value.sign as i32);
    let (buf, digits) = buf.unwrap_or_default();
    cell[24..32].copy_from_slice(&(buf as u64).to_ne_bytes());
    cell[32..40].copy_from_slice(&(digits as u64).to_ne_bytes());
}

impl fmt::Debug for Sqlda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Sqlda");
        dbg.field("kind", &self.kind);
        dbg.field("sqld", &self.sqld());
        dbg.field("size", &self.block.len());
        dbg.field("vars", &self.vars().collect::<Vec<_>>());
        if self.next.is_some() {
            dbg.field("next", &self.next);
        }
        dbg.finish()
    }
}

/// Column view of an [`Sqlda`].
#[derive(Clone, Copy)]
pub struct SqlVar<'a> {
    sqlda: &'a Sqlda,
    /// Offset of the column header.
    at: usize,
}

impl<'a> SqlVar<'a> {
    fn block(&self) -> &'a [u8] {
        &self.sqlda.block
    }

    fn sqlind_at(&self) -> Option<usize> {
        offset_at(self.block(), self.at + field::SQLIND)
    }

    pub fn name(&self) -> &'a str {
        let block = self.block();
        let len = i16::from_ne_bytes(read(block, self.at + field::SQLNAME_LEN)).max(0) as usize;
        offset_at(block, self.at + field::SQLNAME)
            .and_then(|at| block.get(at..at + len))
            .and_then(|name| std::str::from_utf8(name).ok())
            .unwrap_or_default()
    }

    /// Host type the value was converted to.
    pub fn sqltype(&self) -> Type {
        type_at(self.block(), self.at)
    }

    /// Size of the value slot, `0` before values were set.
    pub fn sqllen(&self) -> i32 {
        i32::from_ne_bytes(read(self.block(), self.at + field::SQLLEN))
    }

    pub fn sqlind(&self) -> i16 {
        match self.sqlind_at() {
            Some(at) => i16::from_ne_bytes(read(self.block(), at)),
            None => 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.sqlind() < 0
    }

    /// Server type oid, kept by the compat flavor.
    pub fn sqlxid(&self) -> Oid {
        Oid::from_ne_bytes(read(self.block(), self.at + field::SQLXID))
    }

    /// Server type size.
    pub fn sqltypelen(&self) -> i32 {
        i32::from_ne_bytes(read(self.block(), self.at + field::SQLTYPELEN))
    }

    /// The value exceeds the long data threshold of the compat flavor.
    pub fn is_long_data(&self) -> bool {
        self.block().get(self.at + field::LONG_DATA).is_some_and(|b| *b != 0)
    }

    /// Offset of the value slot within the block.
    pub fn data_offset(&self) -> Option<usize> {
        offset_at(self.block(), self.at + field::SQLDATA)
    }

    /// Raw bytes of the value slot.
    pub fn data(&self) -> Option<&'a [u8]> {
        let at = self.data_offset()?;
        self.block().get(at..at + self.sqllen().max(0) as usize)
    }

    fn fixed<const N: usize>(&self, ty: &[Type]) -> Option<[u8; N]> {
        if !ty.contains(&self.sqltype()) {
            return None;
        }
        self.data()?.get(..N)?.try_into().ok()
    }

    pub fn as_i16(&self) -> Option<i16> {
        self.fixed(&[Type::Short]).map(i16::from_ne_bytes)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.fixed(&[Type::Int]).map(i32::from_ne_bytes)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.fixed(&[Type::Long, Type::LongLong]).map(i64::from_ne_bytes)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.fixed::<1>(&[Type::Bool]).map(|[b]| b != 0)
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.fixed(&[Type::Float]).map(f32::from_ne_bytes)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.fixed(&[Type::Double]).map(f64::from_ne_bytes)
    }

    pub fn as_date(&self) -> Option<Date> {
        self.fixed(&[Type::Date]).map(|b| Date(i64::from_ne_bytes(b) as i32))
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        self.fixed(&[Type::Timestamp]).map(|b| Timestamp(i64::from_ne_bytes(b)))
    }

    pub fn as_interval(&self) -> Option<Interval> {
        let b = self.fixed::<16>(&[Type::Interval])?;
        let time = i64::from_ne_bytes(b[..8].try_into().ok()?);
        let month = i64::from_ne_bytes(b[8..].try_into().ok()?);
        Some(Interval { time, month: month as i32 })
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        let cell = self.fixed::<{ 20 + DECSIZE }>(&[Type::Decimal])?;
        let mut digits = [0; DECSIZE];
        digits.copy_from_slice(&cell[20..]);
        Some(Decimal {
            ndigits: get_i32(&cell, 0),
            weight: get_i32(&cell, 4),
            rscale: get_i32(&cell, 8),
            dscale: get_i32(&cell, 12),
            sign: get_i32(&cell, 16) as u16,
            digits,
        })
    }

    /// The numeric value, its digits read from the block.
    pub fn as_numeric(&self) -> Option<Numeric> {
        let cell = self.fixed::<{ layout::NUMERIC }>(&[Type::Numeric])?;
        let ndigits = get_i32(&cell, 0);
        let buf_at = get_u64(&cell, 24) as usize;
        let digits_at = get_u64(&cell, 32) as usize;

        let buf = match buf_at {
            0 => vec![],
            at => {
                let end = digits_at + ndigits.max(0) as usize;
                self.block().get(at..end)?.to_vec()
            }
        };

        Some(Numeric::from_raw_parts(
            ndigits,
            get_i32(&cell, 4),
            get_i32(&cell, 8),
            get_i32(&cell, 12),
            get_i32(&cell, 16) as u16,
            buf,
            digits_at.saturating_sub(buf_at),
        ))
    }

    /// Character value up to its nul terminator.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        if !self.sqltype().is_char() {
            return None;
        }
        let data = self.data()?;
        Some(&data[..c_strlen(data)])
    }

    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }
}

impl fmt::Debug for SqlVar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlVar")
            .field("name", &self.name())
            .field("sqltype", &self.sqltype())
            .field("sqllen", &self.sqllen())
            .field("sqlind", &self.sqlind())
            .finish()
    }
}
