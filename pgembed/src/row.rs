//! Result scatter, server text into host variables.
//!
//! - [`store_result`], one result column into one output variable
//! - [`get_data`], one value into one element of an output variable
use crate::{
    Result,
    common::{debug_log, verbose},
    encode::hex_decode,
    memory::{add_mem, alloc_vec, reserve},
    postgres::{ArrayKind, PgResult},
    sqlca::{self, code, raise, state},
    types::{BadDateTime, Date, Decimal, Interval, Numeric, Timestamp},
    value::{
        Chars, Compat, HostValue, Indicator, NoIndNull, Slot, Type, Varchar, Variable, set_noind_null_chars,
    },
};

/// Statement level settings of a scatter.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Context {
    pub line: i32,
    pub compat: Compat,
    pub force_indicator: bool,
}

/// Scatter column `col` of every row into `var`.
///
/// `kind` is the classification of the column type. A scalar column must fit
/// the declared element count, an array column needs an array target.
/// [`Slot::Pointer`] outputs are sized to the row count and registered in the
/// auto memory arena.
pub(crate) fn store_result(
    ctx: &Context,
    result: &PgResult,
    col: usize,
    kind: ArrayKind,
    var: &mut Variable,
) -> Result<()> {
    let ntuples = result.ntuples();
    let arrsize = var.value.arrsize();

    if kind.is_array() {
        if arrsize == 0 {
            return Err(raise(ctx.line, code::NO_ARRAY, state::DATATYPE_MISMATCH, None));
        }
    } else {
        let ind_arrsize = var.indicator.arrsize();
        if (arrsize > 0 && ntuples > arrsize) || (ind_arrsize > 0 && ntuples > ind_arrsize) {
            debug_log!(
                "ecpg_store_result on line {}: incorrect number of matches; {ntuples} don't fit into array of {arrsize}",
                ctx.line,
            );
            let code = match ctx.compat.is_informix() {
                true => code::INFORMIX_SUBSELECT_NOT_ONE,
                false => code::TOO_MANY_MATCHES,
            };
            return Err(raise(ctx.line, code, state::CARDINALITY_VIOLATION, None));
        }
    }

    allocate(ctx.line, result, col, &mut var.value)?;

    if var.indicator.is_pointer() {
        let bytes = var.indicator.resize(ntuples, ctx.line)?;
        add_mem(ctx.line, bytes);
    }

    for row in 0..ntuples {
        get_data(ctx, result, row, col, var, row, kind)?;
    }

    Ok(())
}

/// Size a [`Slot::Pointer`] output for every row of `col`.
fn allocate(line: i32, result: &PgResult, col: usize, value: &mut HostValue) -> Result<()> {
    let ntuples = result.ntuples();

    fn rows<T: Clone + Default>(slot: &mut Slot<T>, ntuples: usize, line: i32) -> Result<()> {
        if let Some(vec) = slot.vec_mut() {
            alloc_vec(vec, ntuples, line)?;
            add_mem(line, ntuples * size_of::<T>());
        }
        Ok(())
    }

    match value {
        HostValue::Short(s) => rows(s, ntuples, line),
        HostValue::UShort(s) => rows(s, ntuples, line),
        HostValue::Int(s) => rows(s, ntuples, line),
        HostValue::UInt(s) => rows(s, ntuples, line),
        HostValue::Long(s) | HostValue::LongLong(s) => rows(s, ntuples, line),
        HostValue::ULong(s) | HostValue::ULongLong(s) => rows(s, ntuples, line),
        HostValue::Bool(s) => rows(s, ntuples, line),
        HostValue::Float(s) => rows(s, ntuples, line),
        HostValue::Double(s) => rows(s, ntuples, line),
        HostValue::Numeric(s) => rows(s, ntuples, line),
        HostValue::Decimal(s) => rows(s, ntuples, line),
        HostValue::Date(s) => rows(s, ntuples, line),
        HostValue::Timestamp(s) => rows(s, ntuples, line),
        HostValue::Interval(s) => rows(s, ntuples, line),
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => {
            // one nul terminated string per row
            if let Slot::Pointer(vec) = &mut c.data {
                let total = (0..ntuples).map(|row| result.get_length(row, col) + 1).sum::<usize>();
                vec.clear();
                reserve(vec, total, line)?;
                add_mem(line, total + (ntuples + 1) * size_of::<usize>());
            }
            Ok(())
        }
        HostValue::Varchar(s) | HostValue::Bytea(s) => {
            if let Some(vec) = s.vec_mut() {
                let width = (0..ntuples).map(|row| result.get_length(row, col)).max().unwrap_or(0) + 1;
                alloc_vec(vec, ntuples, line)?;
                for v in vec.iter_mut() {
                    *v = Varchar::new(width);
                }
                add_mem(line, ntuples * (width + size_of::<i32>()));
            }
            Ok(())
        }
        HostValue::CharVariable(_) | HostValue::Const(_) | HostValue::Descriptor(_) | HostValue::Sqlda(_) => Ok(()),
    }
}

/// Drop the storage of every [`Slot::Pointer`] in `var`.
pub(crate) fn release(var: &mut Variable) {
    fn clear<T>(slot: &mut Slot<T>) {
        if let Some(vec) = slot.vec_mut() {
            vec.clear();
        }
    }

    match &mut var.value {
        HostValue::Short(s) => clear(s),
        HostValue::UShort(s) => clear(s),
        HostValue::Int(s) => clear(s),
        HostValue::UInt(s) => clear(s),
        HostValue::Long(s) | HostValue::LongLong(s) => clear(s),
        HostValue::ULong(s) | HostValue::ULongLong(s) => clear(s),
        HostValue::Bool(s) => clear(s),
        HostValue::Float(s) => clear(s),
        HostValue::Double(s) => clear(s),
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => clear(&mut c.data),
        HostValue::Varchar(s) | HostValue::Bytea(s) => clear(s),
        HostValue::Numeric(s) => clear(s),
        HostValue::Decimal(s) => clear(s),
        HostValue::Date(s) => clear(s),
        HostValue::Timestamp(s) => clear(s),
        HostValue::Interval(s) => clear(s),
        HostValue::CharVariable(_) | HostValue::Const(_) | HostValue::Descriptor(_) | HostValue::Sqlda(_) => { }
    }

    match &mut var.indicator {
        Indicator::None => { }
        Indicator::Short(s) => clear(s),
        Indicator::Int(s) => clear(s),
        Indicator::Long(s) | Indicator::LongLong(s) => clear(s),
    }
}

/// Store the value at (`row`, `col`) into element `index` of `var`.
///
/// Array values fill consecutive elements starting at `index`.
pub(crate) fn get_data(
    ctx: &Context,
    result: &PgResult,
    row: usize,
    col: usize,
    var: &mut Variable,
    index: usize,
    kind: ArrayKind,
) -> Result<()> {
    let value = result.get_value(row, col);
    let size = result.get_length(row, col);
    let binary = result.fformat(col) == 1;
    let null = result.get_is_null(row, col);
    let mut index = index;

    verbose!("get_data line {}: row {row} col {col} {:?}", ctx.line, String::from_utf8_lossy(value));

    if null {
        match var.indicator {
            Indicator::None if ctx.force_indicator => {
                return Err(raise(ctx.line, code::MISSING_INDICATOR, state::NULL_VALUE_NO_INDICATOR_PARAMETER, None));
            }
            Indicator::None => set_null(&mut var.value, index),
            _ => {
                var.indicator.set(index, -1);
                if let Some(vec) = char_pointer(&mut var.value) {
                    vec.push(0);
                }
            }
        }
        return Ok(());
    }

    var.indicator.set(index, 0);

    let mut pval = value;

    if kind == ArrayKind::Array {
        if pval.first() != Some(&b'{') {
            return Err(raise(ctx.line, code::DATA_NOT_ARRAY, state::DATATYPE_MISMATCH, None));
        }
        if !var.ty().is_char() {
            pval = &pval[1..];
        }
    }

    if binary {
        return copy_binary(ctx, var, index, value);
    }

    loop {
        pval = scalar(ctx, var, index, kind, pval, size)?;

        if !kind.is_array() {
            break;
        }

        index += 1;

        let mut string = false;
        let mut i = 0;
        while let Some(&b) = pval.get(i) {
            if !string && (delimiter(kind, b) || boundary(kind, b)) {
                break;
            }
            if b == b'"' {
                string = !string;
            }
            i += 1;
        }
        pval = &pval[i..];
        if pval.first().is_some_and(|b| delimiter(kind, *b)) {
            pval = &pval[1..];
        }

        match pval.first() {
            None => break,
            Some(b) if boundary(kind, *b) => break,
            Some(_) => { }
        }
    }

    Ok(())
}

fn delimiter(kind: ArrayKind, b: u8) -> bool {
    match kind {
        ArrayKind::Array => b == b',',
        ArrayKind::Vector => b == b' ',
        ArrayKind::None => false,
    }
}

fn boundary(kind: ArrayKind, b: u8) -> bool {
    match kind {
        ArrayKind::Array => b == b'}',
        ArrayKind::Vector => b == 0,
        ArrayKind::None => false,
    }
}

/// Check what a number parse left over.
///
/// A scalar may be followed by a space or nothing. Informix modes accept and
/// drop a fractional part. An array element must be followed by a delimiter
/// or the closing boundary. Returns the remainder or `None` for garbage.
fn garbage_left(kind: ArrayKind, rest: &[u8], compat: Compat) -> Option<&[u8]> {
    match kind {
        ArrayKind::None => {
            let mut rest = rest;
            if compat.is_informix() && rest.first() == Some(&b'.') {
                let digits = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
                rest = &rest[1 + digits..];
            }
            match rest.first() {
                None | Some(b' ') => Some(rest),
                Some(_) => None,
            }
        }
        kind => match rest.first() {
            Some(b) if delimiter(kind, *b) || boundary(kind, *b) => Some(rest),
            None if kind == ArrayKind::Vector => Some(rest),
            _ => None,
        },
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn put<T>(slot: &mut Slot<T>, index: usize, value: T) {
    if let Some(target) = slot.get_mut(index) {
        *target = value;
    }
}

fn set_null(value: &mut HostValue, index: usize) {
    fn at<T: NoIndNull>(slot: &mut Slot<T>, index: usize) {
        if let Some(target) = slot.get_mut(index) {
            target.set_noind_null();
        }
    }

    match value {
        HostValue::Short(s) => at(s, index),
        HostValue::UShort(s) => at(s, index),
        HostValue::Int(s) => at(s, index),
        HostValue::UInt(s) => at(s, index),
        HostValue::Long(s) | HostValue::LongLong(s) => at(s, index),
        HostValue::ULong(s) | HostValue::ULongLong(s) => at(s, index),
        HostValue::Bool(s) => at(s, index),
        HostValue::Float(s) => at(s, index),
        HostValue::Double(s) => at(s, index),
        HostValue::Varchar(s) | HostValue::Bytea(s) => at(s, index),
        HostValue::Numeric(s) => at(s, index),
        HostValue::Decimal(s) => at(s, index),
        HostValue::Date(s) => at(s, index),
        HostValue::Timestamp(s) => at(s, index),
        HostValue::Interval(s) => at(s, index),
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => match &mut c.data {
            Slot::Pointer(vec) => vec.push(0),
            _ => set_noind_null_chars(c.record_mut(index)),
        },
        HostValue::CharVariable(_) | HostValue::Const(_) | HostValue::Descriptor(_) | HostValue::Sqlda(_) => { }
    }
}

fn char_pointer<'v>(value: &'v mut HostValue) -> Option<&'v mut Vec<u8>> {
    match value {
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => c.data.vec_mut(),
        _ => None,
    }
}

fn truncated(indicator: &mut Indicator, index: usize, len: usize) {
    indicator.set(index, len as i64);
    sqlca::with(|ca| ca.set_truncated());
}

/// Copy a binary format value as is.
fn copy_binary(ctx: &Context, var: &mut Variable, index: usize, value: &[u8]) -> Result<()> {
    let Variable { value: host, indicator } = var;
    let target = match host {
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => {
            if let Slot::Pointer(vec) = &mut c.data {
                vec.extend_from_slice(value);
                vec.push(0);
                return Ok(());
            }
            c.record_mut(index)
        }
        HostValue::Varchar(s) | HostValue::Bytea(s) => match s.get_mut(index) {
            Some(v) => {
                let n = value.len().min(v.size());
                v.len = n as i32;
                &mut v.arr[..]
            }
            None => return Ok(()),
        },
        other => {
            return Err(raise(ctx.line, code::UNSUPPORTED, state::INTERNAL_ERROR, Some(other.ty().name())));
        }
    };

    let n = value.len().min(target.len());
    target[..n].copy_from_slice(&value[..n]);
    if n < value.len() {
        truncated(indicator, index, value.len());
    }
    Ok(())
}

/// Parse one element at the start of `pval` into element `index`, returns
/// what follows it.
fn scalar<'a>(
    ctx: &Context,
    var: &mut Variable,
    index: usize,
    kind: ArrayKind,
    pval: &'a [u8],
    size: usize,
) -> Result<&'a [u8]> {
    let line = ctx.line;
    let compat = ctx.compat;
    let ty = var.ty();
    let Variable { value, indicator } = var;

    macro_rules! int {
        ($slot:expr, $scan:ident, $code:expr, $ty:ty) => {{
            let (v, n) = $scan(pval);
            let Some(rest) = garbage_left(kind, &pval[n..], compat) else {
                return Err(raise(line, $code, state::DATATYPE_MISMATCH, Some(&lossy(pval))));
            };
            put($slot, index, v as $ty);
            rest
        }};
    }

    let rest = match value {
        HostValue::Short(s) => int!(s, strtol, code::INT_FORMAT, i16),
        HostValue::Int(s) => int!(s, strtol, code::INT_FORMAT, i32),
        HostValue::Long(s) | HostValue::LongLong(s) => int!(s, strtol, code::INT_FORMAT, i64),
        HostValue::UShort(s) => int!(s, strtoul, code::UINT_FORMAT, u16),
        HostValue::UInt(s) => int!(s, strtoul, code::UINT_FORMAT, u32),
        HostValue::ULong(s) | HostValue::ULongLong(s) => int!(s, strtoul, code::UINT_FORMAT, u64),

        HostValue::Float(_) | HostValue::Double(_) => {
            let p = pval.strip_prefix(b"\"").unwrap_or(pval);
            let (v, n) = special_value(p).unwrap_or_else(|| strtod(p));
            let rest = &p[n..];
            let rest = rest.strip_prefix(b"\"").unwrap_or(rest);
            let Some(rest) = garbage_left(kind, rest, compat) else {
                return Err(raise(line, code::FLOAT_FORMAT, state::DATATYPE_MISMATCH, Some(&lossy(pval))));
            };
            match value {
                HostValue::Float(s) => put(s, index, v as f32),
                HostValue::Double(s) => put(s, index, v),
                _ => { }
            }
            rest
        }

        HostValue::Bool(s) => {
            let end = match kind {
                ArrayKind::None => pval.get(1).is_none(),
                kind => pval.get(1).is_none_or(|b| delimiter(kind, *b) || boundary(kind, *b)),
            };
            match pval.first() {
                Some(b'f') if end => put(s, index, false),
                Some(b't') if end => put(s, index, true),
                _ => return Err(raise(line, code::CONVERT_BOOL, state::DATATYPE_MISMATCH, Some(&lossy(pval)))),
            }
            &pval[1..]
        }

        HostValue::Bytea(s) => {
            if let Some(v) = s.get_mut(index) {
                let decoded = hex_decode(pval).unwrap_or_else(|| pval.to_vec());
                let n = decoded.len().min(v.size());
                v.arr[..n].copy_from_slice(&decoded[..n]);
                v.len = n as i32;
                if decoded.len() > n {
                    truncated(indicator, index, decoded.len());
                }
            }
            &pval[pval.len().min(size)..]
        }

        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => {
            chars(ctx, ty, c, indicator, index, pval, size);
            &pval[pval.len().min(size)..]
        }

        HostValue::Varchar(s) => {
            if let Some(v) = s.get_mut(index) {
                let varcharsize = v.size();
                let n = size.min(varcharsize).min(pval.len());
                v.arr[..n].copy_from_slice(&pval[..n]);
                v.arr[n..].fill(0);
                v.len = size as i32;
                if varcharsize > 0 && size > varcharsize {
                    truncated(indicator, index, size);
                    v.len = varcharsize as i32;
                }
            }
            &pval[pval.len().min(size)..]
        }

        HostValue::Numeric(_) | HostValue::Decimal(_) => {
            let end = pval.iter().position(|b| matches!(b, b',' | b'}')).unwrap_or(pval.len());
            let (elem, rest) = pval.split_at(end);
            let parsed = std::str::from_utf8(elem).ok().and_then(|t| Numeric::from_asc(t).ok());
            let numeric = match parsed {
                Some(ok) => {
                    if garbage_left(kind, rest, compat).is_none() {
                        return Err(raise(line, code::NUMERIC_FORMAT, state::DATATYPE_MISMATCH, Some(&lossy(pval))));
                    }
                    ok
                }
                None if compat.is_informix() => {
                    debug_log!("ecpg_get_data on line {line}: RESULT {}; errno 1", lossy(pval));
                    let mut null = Numeric::new();
                    null.set_noind_null();
                    null
                }
                None => return Err(raise(line, code::NUMERIC_FORMAT, state::DATATYPE_MISMATCH, Some(&lossy(pval)))),
            };
            match value {
                HostValue::Numeric(s) => put(s, index, numeric),
                HostValue::Decimal(s) => {
                    let decimal = match numeric.is_noind_null() {
                        true => {
                            let mut null = Decimal::new();
                            null.set_noind_null();
                            null
                        }
                        false => numeric.to_decimal().map_err(|_| {
                            raise(line, code::NUMERIC_FORMAT, state::DATATYPE_MISMATCH, Some(&lossy(pval)))
                        })?,
                    };
                    put(s, index, decimal)
                }
                _ => { }
            }
            rest
        }

        HostValue::Date(s) => {
            let (date, rest) = datetime(ctx, kind, pval, code::DATE_FORMAT, Date::from_asc)?;
            put(s, index, date);
            rest
        }
        HostValue::Timestamp(s) => {
            let (ts, rest) = datetime(ctx, kind, pval, code::TIMESTAMP_FORMAT, Timestamp::from_asc)?;
            put(s, index, ts);
            rest
        }
        HostValue::Interval(s) => {
            let (iv, rest) = datetime(ctx, kind, pval, code::INTERVAL_FORMAT, Interval::from_asc)?;
            put(s, index, iv);
            rest
        }

        other => {
            return Err(raise(line, code::UNSUPPORTED, state::INTERNAL_ERROR, Some(other.ty().name())));
        }
    };

    Ok(rest)
}

/// Character record output.
///
/// A larger record is nul terminated, or blank padded in Oracle mode. A
/// smaller record receives what fits and flags the truncation.
fn chars(
    ctx: &Context,
    ty: Type,
    c: &mut Chars,
    indicator: &mut Indicator,
    index: usize,
    pval: &[u8],
    size: usize,
) {
    let value = &pval[..size.min(pval.len())];
    let size = value.len();
    let oracle = ctx.compat.is_oracle();
    let pad = oracle && matches!(ty, Type::Char | Type::UnsignedChar);

    if let Slot::Pointer(vec) = &mut c.data {
        let value = match ty {
            Type::String => trim_end_spaces(value),
            _ => value,
        };
        vec.extend_from_slice(value);
        vec.push(0);
        return;
    }

    let record = c.record_mut(index);
    let varcharsize = record.len();

    if varcharsize > size {
        if pad {
            record.fill(b' ');
            record[..size].copy_from_slice(value);
            record[varcharsize - 1] = 0;
            // an empty string is reported as null, without warning
            if size == 0 {
                indicator.set(index, -1);
            }
        } else {
            record[..size].copy_from_slice(value);
            record[size] = 0;
        }

        if ty == Type::String {
            let mut last = size;
            while last > 0 && matches!(record[last], b' ' | 0) {
                record[last] = 0;
                last -= 1;
            }
        }
    } else {
        record.copy_from_slice(&value[..varcharsize]);
        if pad && varcharsize > 0 {
            record[varcharsize - 1] = 0;
        }
        if varcharsize < size || oracle {
            truncated(indicator, index, size);
        }
    }
}

fn trim_end_spaces(value: &[u8]) -> &[u8] {
    let end = value.iter().rposition(|b| *b != b' ').map_or(0, |i| i + 1);
    &value[..end]
}

/// Date, timestamp and interval elements, optionally double quoted.
fn datetime<'a, T: NoIndNull + Default>(
    ctx: &Context,
    kind: ArrayKind,
    pval: &'a [u8],
    code: i64,
    parse: impl FnOnce(&str) -> Result<T, BadDateTime>,
) -> Result<(T, &'a [u8])> {
    let p = pval.strip_prefix(b"\"").unwrap_or(pval);
    let end = p.iter().position(|b| matches!(b, b',' | b'"' | b'}')).unwrap_or(p.len());
    let (elem, rest) = p.split_at(end);

    match std::str::from_utf8(elem).ok().map(parse) {
        Some(Ok(value)) => {
            let rest = rest.strip_prefix(b"\"").unwrap_or(rest);
            if kind == ArrayKind::None && garbage_left(kind, rest, ctx.compat).is_none() {
                return Err(raise(ctx.line, code, state::DATATYPE_MISMATCH, Some(&lossy(pval))));
            }
            Ok((value, rest))
        }
        _ if ctx.compat.is_informix() => {
            debug_log!("ecpg_get_data on line {}: RESULT {}; errno 1", ctx.line, lossy(pval));
            let mut value = T::default();
            value.set_noind_null();
            Ok((value, rest))
        }
        _ => Err(raise(ctx.line, code, state::DATATYPE_MISMATCH, Some(&lossy(pval)))),
    }
}

/// Leading whitespace, sign and digits, `None` without digits.
fn scan_int(text: &[u8]) -> Option<(bool, u128, usize)> {
    let mut i = text.iter().take_while(|b| b.is_ascii_whitespace() || **b == 0x0b).count();
    let negative = match text.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    let digits = text[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let magnitude = text[i..i + digits]
        .iter()
        .fold(0u128, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as u128));
    Some((negative, magnitude, i + digits))
}

/// Base 10 signed prefix, saturating like `strtol`.
fn strtol(text: &[u8]) -> (i64, usize) {
    match scan_int(text) {
        None => (0, 0),
        Some((false, m, n)) => (m.min(i64::MAX as u128) as i64, n),
        Some((true, m, n)) if m > i64::MAX as u128 => (i64::MIN, n),
        Some((true, m, n)) => (-(m as i64), n),
    }
}

/// Base 10 unsigned prefix, a minus sign negates modulo 2^64 like `strtoul`.
fn strtoul(text: &[u8]) -> (u64, usize) {
    match scan_int(text) {
        None => (0, 0),
        Some((_, m, n)) if m > u64::MAX as u128 => (u64::MAX, n),
        Some((true, m, n)) => ((m as u64).wrapping_neg(), n),
        Some((false, m, n)) => (m as u64, n),
    }
}

/// Longest decimal floating point prefix.
fn strtod(text: &[u8]) -> (f64, usize) {
    let digits = |from: usize| text.get(from..).map_or(0, |t| t.iter().take_while(|b| b.is_ascii_digit()).count());

    let start = text.iter().take_while(|b| b.is_ascii_whitespace()).count();
    let mut i = start;
    if matches!(text.get(i), Some(b'-' | b'+')) {
        i += 1;
    }

    let int = digits(i);
    i += int;
    let mut frac = 0;
    if text.get(i) == Some(&b'.') {
        frac = digits(i + 1);
        if int + frac > 0 {
            i += 1 + frac;
        }
    }
    if int + frac == 0 {
        return (0.0, 0);
    }

    if matches!(text.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(text.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp = digits(j);
        if exp > 0 {
            i = j + exp;
        }
    }

    let number = std::str::from_utf8(&text[start..i])
        .ok()
        .and_then(|t| t.parse::<f64>().ok())
        .unwrap_or_default();
    (number, i)
}

fn special_value(text: &[u8]) -> Option<(f64, usize)> {
    let starts = |p: &[u8]| text.get(..p.len()).is_some_and(|t| t.eq_ignore_ascii_case(p));
    if starts(b"NaN") {
        Some((f64::NAN, 3))
    } else if starts(b"Infinity") {
        Some((f64::INFINITY, 8))
    } else if starts(b"-Infinity") {
        Some((f64::NEG_INFINITY, 9))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::postgres::{ResultStatus, pg_type};

    const PG: Context = Context { line: 1, compat: Compat::Pgsql, force_indicator: false };

    fn column(oid: u32, values: &[Option<&str>]) -> PgResult {
        let mut builder = PgResult::builder(ResultStatus::TuplesOk).field("c", oid);
        for v in values {
            builder = builder.row([*v]);
        }
        builder.build()
    }

    #[test]
    fn test_int_array_with_char_pointer() {
        let ids = column(pg_type::INT4, &[Some("1"), Some("2"), Some("3")]);
        let vs = column(pg_type::TEXT, &[Some("a"), None, Some("c")]);

        let mut id = [0i32; 3];
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut id)));
        store_result(&PG, &ids, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(id, [1, 2, 3]);

        let mut v = Vec::new();
        let mut ind = [9i16; 3];
        let mut var = Variable::new(HostValue::Char(Chars::pointer(&mut v)))
            .with_indicator(Indicator::Short(Slot::Array(&mut ind)));
        store_result(&PG, &vs, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(ind, [0, -1, 0]);
        let chars = Chars::pointer(&mut v);
        assert_eq!(chars.record(0), b"a");
        assert_eq!(chars.record(2), b"c");
    }

    #[test]
    fn test_truncation() {
        sqlca::init();
        let res = column(pg_type::VARCHAR, &[Some("ABCDEFGHIJ")]);
        let mut buf = [0u8; 5];
        let mut ind = [0i16];
        let mut var = Variable::new(HostValue::Char(Chars::array(&mut buf, 5)))
            .with_indicator(Indicator::Short(Slot::Array(&mut ind)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(&buf, b"ABCDE");
        assert_eq!(ind[0], 10);
        assert_eq!(sqlca::get().sqlwarn[0], b'W');
        assert_eq!(sqlca::get().sqlwarn[1], b'W');
    }

    #[test]
    fn test_informix_numeric_tolerance() {
        let ctx = Context { compat: Compat::Informix, ..PG };
        let res = column(pg_type::TEXT, &[Some("notanumber")]);
        let mut n = [Numeric::new()];
        let mut var = Variable::new(HostValue::Numeric(Slot::Array(&mut n)));
        store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert!(n[0].is_noind_null());

        let mut n = [Numeric::new()];
        let mut var = Variable::new(HostValue::Numeric(Slot::Array(&mut n)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::NUMERIC_FORMAT);
    }

    #[test]
    fn test_informix_int_fraction() {
        let res = column(pg_type::NUMERIC, &[Some("12.75")]);
        let mut v = [0i32];
        let ctx = Context { compat: Compat::Informix, ..PG };
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0], 12);

        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::INT_FORMAT);
        assert_eq!(err.sqlstate(), "42804");
    }

    #[test]
    fn test_informix_float_trailing_fraction() {
        let res = column(pg_type::TEXT, &[Some("2.5.75")]);
        let mut v = [0f64];
        let ctx = Context { compat: Compat::Informix, ..PG };
        let mut var = Variable::new(HostValue::Double(Slot::Array(&mut v)));
        store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0], 2.5);

        let mut var = Variable::new(HostValue::Double(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::FLOAT_FORMAT);
    }

    #[test]
    fn test_null_handling() {
        let res = column(pg_type::INT4, &[None]);
        let mut v = [5i32];
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0], i32::MIN);

        let ctx = Context { force_indicator: true, ..PG };
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        let err = store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::MISSING_INDICATOR);
        assert_eq!(err.sqlstate(), "22002");
    }

    #[test]
    fn test_cardinality() {
        let res = column(pg_type::INT4, &[Some("1"), Some("2")]);
        let mut v = [0i32];
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::TOO_MANY_MATCHES);
        assert_eq!(err.sqlstate(), "21000");

        let ctx = Context { compat: Compat::Informix, ..PG };
        let err = store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::INFORMIX_SUBSELECT_NOT_ONE);

        let mut p = Vec::new();
        let mut var = Variable::new(HostValue::Int(Slot::Pointer(&mut p)));
        let err = store_result(&PG, &res, 0, ArrayKind::Array, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::NO_ARRAY);
    }

    #[test]
    fn test_pointer_allocation() {
        crate::memory::clear_auto_mem();
        let res = column(pg_type::INT8, &[Some("10"), Some("20")]);
        let mut v = Vec::new();
        let mut ind = Vec::new();
        let mut var = Variable::new(HostValue::LongLong(Slot::Pointer(&mut v)))
            .with_indicator(Indicator::Int(Slot::Pointer(&mut ind)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v, [10, 20]);
        assert_eq!(ind, [0, 0]);
        assert_eq!(crate::memory::auto_mem().len(), 2);
        crate::memory::clear_auto_mem();
    }

    #[test]
    fn test_arrays() {
        let res = column(1007, &[Some("{1,2,3}")]);
        let mut v = [0i32; 4];
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::Array, &mut var).unwrap();
        drop(var);
        assert_eq!(v, [1, 2, 3, 0]);

        let res = column(pg_type::INT2VECTOR, &[Some("4 5")]);
        let mut v = [0i16; 2];
        let mut var = Variable::new(HostValue::Short(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::Vector, &mut var).unwrap();
        drop(var);
        assert_eq!(v, [4, 5]);

        let res = column(1000, &[Some("{t,f}")]);
        let mut v = [false, true];
        let mut var = Variable::new(HostValue::Bool(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::Array, &mut var).unwrap();
        drop(var);
        assert_eq!(v, [true, false]);

        let res = column(1007, &[Some("1,2")]);
        let mut v = [0i32; 2];
        let mut var = Variable::new(HostValue::Int(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::Array, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::DATA_NOT_ARRAY);
    }

    #[test]
    fn test_floats_and_bools() {
        let res = column(pg_type::FLOAT8, &[Some("-Infinity"), Some("nan"), Some("1.5e3")]);
        let mut v = [0f64; 3];
        let mut var = Variable::new(HostValue::Double(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0], f64::NEG_INFINITY);
        assert!(v[1].is_nan());
        assert_eq!(v[2], 1500.0);

        let res = column(pg_type::BOOL, &[Some("yes")]);
        let mut v = [false];
        let mut var = Variable::new(HostValue::Bool(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::CONVERT_BOOL);
    }

    #[test]
    fn test_oracle_and_string_trim() {
        let ctx = Context { compat: Compat::Oracle, ..PG };
        let res = column(pg_type::TEXT, &[Some("ab")]);
        let mut buf = [0u8; 5];
        let mut var = Variable::new(HostValue::Char(Chars::array(&mut buf, 5)));
        store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(&buf, b"ab  \0");

        let res = column(pg_type::TEXT, &[Some("")]);
        let mut ind = [0i32];
        let mut var = Variable::new(HostValue::Char(Chars::array(&mut buf, 5)))
            .with_indicator(Indicator::Int(Slot::Array(&mut ind)));
        store_result(&ctx, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(ind[0], -1);

        let res = column(pg_type::BPCHAR, &[Some("ab  ")]);
        let mut buf = [b'x'; 8];
        let mut var = Variable::new(HostValue::String(Chars::array(&mut buf, 8)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(&buf[..3], b"ab\0");
    }

    #[test]
    fn test_varchar_bytea_and_dates() {
        sqlca::init();
        let res = column(pg_type::TEXT, &[Some("hello world")]);
        let mut v = [Varchar::new(5)];
        let mut ind = [0i16];
        let mut var = Variable::new(HostValue::Varchar(Slot::Array(&mut v)))
            .with_indicator(Indicator::Short(Slot::Array(&mut ind)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0].as_str(), "hello");
        assert_eq!(ind[0], 11);

        let res = column(pg_type::BYTEA, &[Some(r"\x00ff10")]);
        let mut v = Vec::new();
        let mut var = Variable::new(HostValue::Bytea(Slot::Pointer(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0].as_bytes(), [0x00, 0xff, 0x10]);

        let res = column(pg_type::DATE, &[Some("2000-01-03")]);
        let mut v = [Date::default()];
        let mut var = Variable::new(HostValue::Date(Slot::Array(&mut v)));
        store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap();
        drop(var);
        assert_eq!(v[0], Date(2));

        let res = column(pg_type::TEXT, &[Some("xyz")]);
        let mut v = [Timestamp::default()];
        let mut var = Variable::new(HostValue::Timestamp(Slot::Array(&mut v)));
        let err = store_result(&PG, &res, 0, ArrayKind::None, &mut var).unwrap_err();
        assert_eq!(err.sqlcode(), code::TIMESTAMP_FORMAT);
    }

    #[test]
    fn test_scanners() {
        assert_eq!(strtol(b" -42x"), (-42, 4));
        assert_eq!(strtol(b"abc"), (0, 0));
        assert_eq!(strtol(b"99999999999999999999"), (i64::MAX, 20));
        assert_eq!(strtoul(b"-1"), (u64::MAX, 2));
        assert_eq!(strtod(b"1.5e3,"), (1500.0, 5));
        assert_eq!(strtod(b".5"), (0.5, 2));
        assert_eq!(strtod(b"e5"), (0.0, 0));
    }
}
