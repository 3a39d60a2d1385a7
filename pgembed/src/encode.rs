//! Input marshaling, host variables to parameter text.
use std::fmt::Write;

use crate::{
    Result,
    common::verbose,
    sqlca::{code, raise, state},
    types::format_g,
    value::{HostValue, NoIndNull, Slot, Variable, is_noind_null_chars},
};

/// Marshal an input variable into its parameter text.
///
/// Returns `None` for a null value: a negative indicator, or a sentinel null
/// in the value when there is no indicator and `force_indicator` is off.
/// Character and date/time values are single quoted when `quote` is set,
/// which is the case when the text is inlined into the command.
pub(crate) fn store_input(
    line: i32,
    force_indicator: bool,
    var: &Variable,
    quote: bool,
) -> Result<Option<String>> {
    if is_null(force_indicator, var) {
        return Ok(None);
    }

    verbose!("store input {:?} on line {line}", var.ty());

    let text = match &var.value {
        HostValue::Short(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::UShort(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::Int(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::UInt(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::Long(s) | HostValue::LongLong(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::ULong(s) | HostValue::ULongLong(s) => list(s, |v| Ok(v.to_string()))?,
        HostValue::Float(s) => list(s, |v| Ok(format_g(*v as f64, 15)))?,
        HostValue::Double(s) => list(s, |v| Ok(format_g(*v, 15)))?,
        HostValue::Bool(s) => list(s, |v| Ok(if *v { "t" } else { "f" }.to_owned()))?,
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => {
            let record = String::from_utf8_lossy(c.record_str(0));
            Some(quote_postgres(&record, quote))
        }
        HostValue::Varchar(s) => s.get(0).map(|v| {
            let bytes = v.as_bytes();
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            quote_postgres(&String::from_utf8_lossy(&bytes[..end]), quote)
        }),
        HostValue::Bytea(s) => s.get(0).map(|v| quote_postgres(&hex_encode(v.as_bytes()), quote)),
        HostValue::Numeric(s) => list(s, |v| Ok(v.to_asc(v.dscale)))?,
        HostValue::Decimal(s) => list(s, |v| {
            let v = crate::types::Numeric::from_decimal(v);
            Ok(v.to_asc(v.dscale))
        })?,
        HostValue::Date(s) => list(s, |v| match v.to_asc() {
            Ok(ok) => Ok(quote_postgres(&ok, quote)),
            Err(_) => Err(raise(line, code::DATE_FORMAT, state::DATATYPE_MISMATCH, Some(&v.0.to_string()))),
        })?,
        HostValue::Timestamp(s) => list(s, |v| match v.to_asc() {
            Ok(ok) => Ok(quote_postgres(&ok, quote)),
            Err(_) => Err(raise(line, code::TIMESTAMP_FORMAT, state::DATATYPE_MISMATCH, Some(&v.0.to_string()))),
        })?,
        HostValue::Interval(s) => list(s, |v| Ok(quote_postgres(&v.to_asc(), quote)))?,
        HostValue::CharVariable(text) | HostValue::Const(text) => Some((*text).to_owned()),
        HostValue::Descriptor(_) | HostValue::Sqlda(_) => Some(String::new()),
    };

    Ok(text)
}

fn is_null(force_indicator: bool, var: &Variable) -> bool {
    if let Some(ind) = var.indicator.get(0) {
        return ind < 0;
    }
    if !var.indicator.is_none() || force_indicator {
        return false;
    }

    fn first<T: NoIndNull>(slot: &Slot<T>) -> bool {
        slot.get(0).is_some_and(NoIndNull::is_noind_null)
    }

    match &var.value {
        HostValue::Short(s) => first(s),
        HostValue::UShort(s) => first(s),
        HostValue::Int(s) => first(s),
        HostValue::UInt(s) => first(s),
        HostValue::Long(s) | HostValue::LongLong(s) => first(s),
        HostValue::ULong(s) | HostValue::ULongLong(s) => first(s),
        HostValue::Bool(s) => first(s),
        HostValue::Float(s) => first(s),
        HostValue::Double(s) => first(s),
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => is_noind_null_chars(c.record(0)),
        HostValue::Varchar(s) | HostValue::Bytea(s) => first(s),
        HostValue::Numeric(s) => first(s),
        HostValue::Decimal(s) => first(s),
        HostValue::Date(s) => first(s),
        HostValue::Timestamp(s) => first(s),
        HostValue::Interval(s) => first(s),
        HostValue::CharVariable(_) | HostValue::Const(_) | HostValue::Descriptor(_) | HostValue::Sqlda(_) => false,
    }
}

/// Format one element, or `{v1,v2,...}` for more than one.
fn list<T>(slot: &Slot<T>, mut format: impl FnMut(&T) -> Result<String>) -> Result<Option<String>> {
    let asize = slot.arrsize().max(1);
    let items = slot.as_slice();
    let items = &items[..asize.min(items.len())];

    match items {
        [] => Ok(None),
        [one] => format(one).map(Some),
        many => {
            let mut out = String::from("{");
            for item in many {
                out.push_str(&format(item)?);
                out.push(',');
            }
            out.pop();
            out.push('}');
            Ok(Some(out))
        }
    }
}

/// Quote `arg` as a string literal.
///
/// Quotes are doubled and backslashes are escaped. When anything was escaped
/// the `E'...'` form is used, since the server setting of
/// `standard_conforming_strings` is unknown here.
pub fn quote_postgres(arg: &str, quote: bool) -> String {
    if !quote {
        return arg.to_owned();
    }

    let mut out = String::with_capacity(arg.len() + 3);
    let mut escaped = false;
    out.push('\'');
    for ch in arg.chars() {
        match ch {
            '\'' => {
                out.push_str("''");
                escaped = true;
            }
            '\\' => {
                out.push_str("\\\\");
                escaped = true;
            }
            ch => out.push(ch),
        }
    }
    out.push('\'');

    if escaped {
        out.insert(0, 'E');
    }
    out
}

/// `bytea` hex format, `\x` followed by two digits per byte.
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Decode `bytea` text output, hex or escape format.
pub fn hex_decode(text: &[u8]) -> Option<Vec<u8>> {
    if let Some(hex) = text.strip_prefix(b"\\x") {
        if hex.len() % 2 != 0 {
            return None;
        }
        return hex
            .chunks(2)
            .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
            .collect();
    }

    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        match &text[i..] {
            [b'\\', b'\\', ..] => {
                out.push(b'\\');
                i += 2;
            }
            [b'\\', a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', ..] => {
                out.push((a - b'0') << 6 | (b - b'0') << 3 | (c - b'0'));
                i += 4;
            }
            [b'\\', ..] => return None,
            [b, ..] => {
                out.push(*b);
                i += 1;
            }
            [] => break,
        }
    }
    Some(out)
}

fn nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
