//! SQL descriptor areas.
//!
//! A descriptor is a named, per thread container. On output it holds the
//! result of the statement that filled it, on input a list of numbered
//! items built with [`set_desc`].
use std::cell::RefCell;

use crate::{
    Result,
    common::debug_log,
    encode,
    memory::{add_mem, alloc_vec},
    postgres::{PgResult, pg_type::{self, TypeCache}},
    row::{self, Context},
    sqlca::{self, code, state},
    value::{Chars, Compat, HostValue, Indicator, Slot, Variable},
};

/// Size of the varlena header included in a type modifier.
const VARHDRSZ: i32 = 4;

/// Descriptor item codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum DescItem {
    Count = 1,
    Data,
    DiCode,
    DiPrecision,
    Indicator,
    KeyMember,
    Length,
    Name,
    Nullable,
    Octet,
    Precision,
    RetLength,
    RetOctet,
    Scale,
    Type,
    Eodt,
    Cardinality,
}

/// One input item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorItem {
    pub num: i32,
    /// Text of the value, `None` is `NULL`.
    pub data: Option<String>,
    pub indicator: i32,
    pub length: i32,
    pub precision: i32,
    pub scale: i32,
    pub ty: i32,
    pub is_binary: bool,
    pub data_len: usize,
}

#[derive(Debug)]
struct Descriptor {
    name: String,
    result: Option<PgResult>,
    count: i32,
    items: Vec<DescriptorItem>,
}

thread_local! {
    static DESCRIPTORS: RefCell<Vec<Descriptor>> = const { RefCell::new(Vec::new()) };
}

fn unknown(line: i32, name: &str) -> crate::Error {
    sqlca::raise(line, code::UNKNOWN_DESCRIPTOR, state::INVALID_SQL_DESCRIPTOR_NAME, Some(name))
}

/// Run `f` on the descriptor `name`.
fn with_desc<R>(line: i32, name: &str, f: impl FnOnce(&mut Descriptor) -> Result<R>) -> Result<R> {
    DESCRIPTORS.with_borrow_mut(|list| match list.iter_mut().find(|d| d.name == name) {
        Some(desc) => f(desc),
        None => Err(unknown(line, name)),
    })
}

/// Create a descriptor.
pub fn allocate_desc(line: i32, name: &str) -> Result<()> {
    sqlca::init();

    let duplicate = DESCRIPTORS.with_borrow(|list| list.iter().any(|d| d.name == name));
    if duplicate {
        return Err(unknown(line, name));
    }

    DESCRIPTORS.with_borrow_mut(|list| {
        list.insert(0, Descriptor { name: name.to_owned(), result: None, count: -1, items: vec![] });
    });

    debug_log!("ECPGallocate_desc on line {line}: {name}");
    Ok(())
}

/// Drop a descriptor and its result.
pub fn deallocate_desc(line: i32, name: &str) -> Result<()> {
    sqlca::init();

    let removed = DESCRIPTORS.with_borrow_mut(|list| {
        let idx = list.iter().position(|d| d.name == name)?;
        Some(list.remove(idx))
    });

    match removed {
        Some(_) => Ok(()),
        None => Err(unknown(line, name)),
    }
}

/// Returns `Ok` if the descriptor exists.
pub(crate) fn exists(line: i32, name: &str) -> Result<()> {
    match DESCRIPTORS.with_borrow(|list| list.iter().any(|d| d.name == name)) {
        true => Ok(()),
        false => Err(unknown(line, name)),
    }
}

/// Replace the result held by a descriptor.
pub(crate) fn set_result(line: i32, name: &str, result: PgResult) -> Result<()> {
    with_desc(line, name, |desc| {
        desc.result = Some(result);
        Ok(())
    })
}

/// Input item count and items, ordered by number.
pub(crate) fn input_items(line: i32, name: &str) -> Result<(i32, Vec<DescriptorItem>)> {
    with_desc(line, name, |desc| {
        let mut items = desc.items.clone();
        items.sort_by_key(|i| i.num);
        Ok((desc.count, items))
    })
}

/// Set the item count of an input descriptor.
pub fn set_desc_header(line: i32, name: &str, count: i32) -> Result<()> {
    with_desc(line, name, |desc| {
        desc.count = count;
        Ok(())
    })
}

/// Column count of the result held by a descriptor.
pub fn get_desc_header(line: i32, name: &str) -> Result<i32> {
    debug_log!("ECPGget_desc_header: name {name}");
    sqlca::init();

    let count = with_desc(line, name, |desc| Ok(desc.result.as_ref().map(PgResult::nfields).unwrap_or(0)))?;

    sqlca::with(|ca| ca.sqlerrd[2] = 1);
    Ok(count as i32)
}

/// Read attributes of column `index`, counted from `1`, into host
/// variables.
///
/// The `Data` and `Indicator` items are stored for every row of the result
/// after all other items.
pub fn get_desc<'a>(
    line: i32,
    name: &str,
    index: i32,
    items: impl IntoIterator<Item = (DescItem, HostValue<'a>)>,
) -> Result<()> {
    debug_log!("ECPGget_desc: reading items for tuple {index}");
    sqlca::init();

    with_desc(line, name, |desc| {
        let empty;
        let result = match &desc.result {
            Some(result) => result,
            None => {
                empty = PgResult::empty(crate::postgres::ResultStatus::TuplesOk);
                &empty
            }
        };

        let ntuples = result.ntuples();
        if index < 1 || index as usize > result.nfields() {
            return Err(sqlca::raise(line, code::INVALID_DESCRIPTOR_INDEX, state::INVALID_DESCRIPTOR_INDEX, None));
        }
        let col = index as usize - 1;

        let no_data = || sqlca::raise(line, code::NOT_FOUND, state::NO_DATA, None);

        let mut data = None;
        let mut indicator = None;

        for (item, mut var) in items {
            match item {
                DescItem::Indicator => {
                    if ntuples < 1 {
                        return Err(no_data());
                    }
                    indicator = Some(var);
                }
                DescItem::Data => {
                    if ntuples < 1 {
                        return Err(no_data());
                    }
                    data = Some(var);
                }
                DescItem::Name => {
                    let fname = result.fname(col);
                    put_char(line, &mut var, fname)?;
                    debug_log!("ECPGget_desc: NAME = {fname}");
                }
                DescItem::Nullable => put_int(line, &mut var, 0, 1)?,
                DescItem::KeyMember => put_int(line, &mut var, 0, 0)?,
                DescItem::Scale => {
                    let scale = (result.fmod(col) - VARHDRSZ) & 0xffff;
                    put_int(line, &mut var, 0, scale as i64)?;
                    debug_log!("ECPGget_desc: SCALE = {scale}");
                }
                DescItem::Precision => {
                    let precision = result.fmod(col) >> 16;
                    put_int(line, &mut var, 0, precision as i64)?;
                    debug_log!("ECPGget_desc: PRECISION = {precision}");
                }
                DescItem::Octet => {
                    put_int(line, &mut var, 0, result.fsize(col) as i64)?;
                    debug_log!("ECPGget_desc: OCTET_LENGTH = {}", result.fsize(col));
                }
                DescItem::Length => {
                    let length = result.fmod(col) - VARHDRSZ;
                    put_int(line, &mut var, 0, length as i64)?;
                    debug_log!("ECPGget_desc: LENGTH = {length}");
                }
                DescItem::Type => {
                    let ty = pg_type::sql3_type(result.ftype(col));
                    put_int(line, &mut var, 0, ty as i64)?;
                    debug_log!("ECPGget_desc: TYPE = {ty}");
                }
                DescItem::DiCode => {
                    let code = pg_type::sql3_datetime_code(result.ftype(col));
                    put_int(line, &mut var, 0, code as i64)?;
                    debug_log!("ECPGget_desc: TYPE = {code}");
                }
                DescItem::Cardinality => {
                    put_int(line, &mut var, 0, ntuples as i64)?;
                    debug_log!("ECPGget_desc: CARDINALITY = {ntuples}");
                }
                DescItem::RetLength | DescItem::RetOctet => {
                    if ntuples < 1 {
                        return Err(no_data());
                    }
                    rows(line, &mut var, ntuples)?;
                    for row in 0..ntuples {
                        let len = result.get_length(row, col);
                        put_int(line, &mut var, row, len as i64)?;
                        debug_log!("ECPGget_desc: RETURNED[{row}] = {len}");
                    }
                }
                other => {
                    return Err(sqlca::raise(
                        line,
                        code::UNKNOWN_DESCRIPTOR_ITEM,
                        state::INTERNAL_ERROR,
                        Some(&(other as i32).to_string()),
                    ));
                }
            }
        }

        match (data, indicator) {
            (Some(data), indicator) => {
                let mut var = Variable::new(data);
                if let Some(ind) = indicator {
                    var.indicator = as_indicator(line, ind)?;
                }
                let ctx = Context { line, compat: Compat::Pgsql, force_indicator: false };
                let kind = pg_type::classify(&mut TypeCache::new(), result.ftype(col), var.ty(), |_| Ok(None))?;
                row::store_result(&ctx, result, col, kind, &mut var)?;
            }
            (None, Some(mut ind)) => {
                rows(line, &mut ind, ntuples)?;
                for row in 0..ntuples {
                    let null = -(result.get_is_null(row, col) as i64);
                    put_int(line, &mut ind, row, null)?;
                    debug_log!("ECPGget_desc: INDICATOR[{row}] = {null}");
                }
            }
            (None, None) => { }
        }

        sqlca::with(|ca| ca.sqlerrd[2] = ntuples as i64);
        Ok(())
    })
}

/// Set attributes of input item `index`, counted from `1`.
///
/// The item is created on first use and the descriptor count grows to
/// include it.
pub fn set_desc<'a>(
    line: i32,
    name: &str,
    index: i32,
    items: impl IntoIterator<Item = (DescItem, HostValue<'a>)>,
) -> Result<()> {
    with_desc(line, name, |desc| {
        let pos = match desc.items.iter().position(|i| i.num == index) {
            Some(pos) => pos,
            None => {
                desc.items.insert(0, DescriptorItem { num: index, ..Default::default() });
                desc.count = desc.count.max(index);
                0
            }
        };
        let item = &mut desc.items[pos];

        for (code, var) in items {
            match code {
                DescItem::Data => {
                    if let HostValue::Bytea(s) = &var {
                        item.is_binary = true;
                        item.data_len = s.get(0).map(|v| v.as_bytes().len()).unwrap_or_default();
                    }
                    item.data = encode::store_input(line, true, &Variable::new(var), false)?;
                }
                DescItem::Indicator => item.indicator = read_int(line, &var)?,
                DescItem::Length => item.length = read_int(line, &var)?,
                DescItem::Precision => item.precision = read_int(line, &var)?,
                DescItem::Scale => item.scale = read_int(line, &var)?,
                DescItem::Type => item.ty = read_int(line, &var)?,
                other => {
                    return Err(sqlca::raise(
                        line,
                        code::UNKNOWN_DESCRIPTOR_ITEM,
                        state::INTERNAL_ERROR,
                        Some(&(other as i32).to_string()),
                    ));
                }
            }
        }

        Ok(())
    })
}

fn not_numeric(line: i32) -> crate::Error {
    sqlca::raise(line, code::VAR_NOT_NUMERIC, state::RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION, None)
}

/// Check the row capacity of a per row output and size a pointer for
/// `ntuples` rows.
fn rows(line: i32, var: &mut HostValue, ntuples: usize) -> Result<()> {
    let arrsize = var.arrsize();
    if arrsize > 0 && ntuples > arrsize {
        debug_log!("ECPGget_desc on line {line}: incorrect number of matches ({ntuples} don't fit into array of {arrsize})");
        return Err(sqlca::raise(line, code::TOO_MANY_MATCHES, state::CARDINALITY_VIOLATION, None));
    }

    fn alloc<T: Clone + Default>(slot: &mut Slot<T>, ntuples: usize, line: i32) -> Result<()> {
        if let Some(vec) = slot.vec_mut() {
            alloc_vec(vec, ntuples, line)?;
            add_mem(line, ntuples * size_of::<T>());
        }
        Ok(())
    }

    match var {
        HostValue::Short(s) => alloc(s, ntuples, line),
        HostValue::UShort(s) => alloc(s, ntuples, line),
        HostValue::Int(s) => alloc(s, ntuples, line),
        HostValue::UInt(s) => alloc(s, ntuples, line),
        HostValue::Long(s) | HostValue::LongLong(s) => alloc(s, ntuples, line),
        HostValue::ULong(s) | HostValue::ULongLong(s) => alloc(s, ntuples, line),
        HostValue::Float(s) => alloc(s, ntuples, line),
        HostValue::Double(s) => alloc(s, ntuples, line),
        _ => Err(not_numeric(line)),
    }
}

/// Store `value` into element `i` of a numeric variable.
fn put_int(line: i32, var: &mut HostValue, i: usize, value: i64) -> Result<()> {
    fn put<T>(slot: &mut Slot<T>, i: usize, value: T) {
        if let Some(v) = slot.get_mut(i) {
            *v = value;
        }
    }

    match var {
        HostValue::Short(s) => put(s, i, value as i16),
        HostValue::UShort(s) => put(s, i, value as u16),
        HostValue::Int(s) => put(s, i, value as i32),
        HostValue::UInt(s) => put(s, i, value as u32),
        HostValue::Long(s) | HostValue::LongLong(s) => put(s, i, value),
        HostValue::ULong(s) | HostValue::ULongLong(s) => put(s, i, value as u64),
        HostValue::Float(s) => put(s, i, value as f32),
        HostValue::Double(s) => put(s, i, value as f64),
        _ => return Err(not_numeric(line)),
    }
    Ok(())
}

/// Read the first element of a numeric variable.
fn read_int(line: i32, var: &HostValue) -> Result<i32> {
    let value = match var {
        HostValue::Short(s) => s.get(0).map(|v| *v as i32),
        HostValue::UShort(s) => s.get(0).map(|v| *v as i32),
        HostValue::Int(s) => s.get(0).copied(),
        HostValue::UInt(s) => s.get(0).map(|v| *v as i32),
        HostValue::Long(s) | HostValue::LongLong(s) => s.get(0).map(|v| *v as i32),
        HostValue::ULong(s) | HostValue::ULongLong(s) => s.get(0).map(|v| *v as i32),
        HostValue::Float(s) => s.get(0).map(|v| *v as i32),
        HostValue::Double(s) => s.get(0).map(|v| *v as i32),
        _ => return Err(not_numeric(line)),
    };
    Ok(value.unwrap_or_default())
}

/// Copy `value` into a character variable, truncated to its size.
fn put_char(line: i32, var: &mut HostValue, value: &str) -> Result<()> {
    match var {
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => put_chars(c, value.as_bytes()),
        HostValue::Varchar(s) => {
            if let Some(v) = s.get_mut(0) {
                let n = value.len().min(v.arr.len());
                v.arr[..n].copy_from_slice(&value.as_bytes()[..n]);
                v.arr[n..].fill(0);
                v.len = n as i32;
            }
        }
        _ => {
            return Err(sqlca::raise(line, code::VAR_NOT_CHAR, state::RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION, None));
        }
    }
    Ok(())
}

fn put_chars(c: &mut Chars, value: &[u8]) {
    if let Some(vec) = c.data.vec_mut() {
        vec.clear();
        vec.extend_from_slice(value);
        vec.push(0);
        return;
    }
    let record = c.record_mut(0);
    let n = value.len().min(record.len());
    record[..n].copy_from_slice(&value[..n]);
    record[n..].fill(0);
}

fn as_indicator<'a>(line: i32, var: HostValue<'a>) -> Result<Indicator<'a>> {
    match var {
        HostValue::Short(s) => Ok(Indicator::Short(s)),
        HostValue::Int(s) => Ok(Indicator::Int(s)),
        HostValue::Long(s) => Ok(Indicator::Long(s)),
        HostValue::LongLong(s) => Ok(Indicator::LongLong(s)),
        _ => Err(not_numeric(line)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        postgres::{Field, ResultStatus, pg_type::*},
        value::Varchar,
    };

    fn result() -> PgResult {
        PgResult::builder(ResultStatus::TuplesOk)
            .field("id", INT4)
            .field_with(Field {
                name: crate::common::ByteStr::from_static("price"),
                oid: NUMERIC,
                fmod: (10 << 16) + 2 + 4,
                fsize: -1,
                format: 0,
            })
            .row([Some("1"), Some("9.50")])
            .row([Some("22"), None])
            .build()
    }

    #[test]
    fn test_allocate_and_deallocate() {
        allocate_desc(1, "desc_alloc").unwrap();

        let err = allocate_desc(2, "desc_alloc").unwrap_err();
        assert_eq!(err.sqlcode(), code::UNKNOWN_DESCRIPTOR);
        assert_eq!(sqlca::get().sqlstate_str(), "33000");

        deallocate_desc(3, "desc_alloc").unwrap();
        let err = deallocate_desc(4, "desc_alloc").unwrap_err();
        assert_eq!(err.sqlcode(), code::UNKNOWN_DESCRIPTOR);
        assert_eq!(sqlca::get().message(), "descriptor \"desc_alloc\" not found on line 4");
    }

    #[test]
    fn test_header_without_result() {
        allocate_desc(1, "desc_empty").unwrap();
        assert_eq!(get_desc_header(2, "desc_empty").unwrap(), 0);

        let mut n = [0i32];
        let err = get_desc(3, "desc_empty", 1, [(DescItem::Type, HostValue::Int(Slot::Array(&mut n)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::INVALID_DESCRIPTOR_INDEX);
        assert_eq!(sqlca::get().sqlstate_str(), "07009");
        deallocate_desc(4, "desc_empty").unwrap();
    }

    #[test]
    fn test_get_desc_attributes() {
        allocate_desc(1, "desc_get").unwrap();
        set_result(1, "desc_get", result()).unwrap();
        assert_eq!(get_desc_header(2, "desc_get").unwrap(), 2);
        assert_eq!(sqlca::get().sqlerrd[2], 1);

        let mut name = [0u8; 16];
        let (mut ty, mut scale, mut precision, mut length, mut card) = ([0i32], [0i32], [0i32], [0i32], [0i64]);
        get_desc(
            3,
            "desc_get",
            2,
            [
                (DescItem::Name, HostValue::Char(Chars::array(&mut name, 16))),
                (DescItem::Type, HostValue::Int(Slot::Array(&mut ty))),
                (DescItem::Scale, HostValue::Int(Slot::Array(&mut scale))),
                (DescItem::Precision, HostValue::Int(Slot::Array(&mut precision))),
                (DescItem::Length, HostValue::Int(Slot::Array(&mut length))),
                (DescItem::Cardinality, HostValue::Long(Slot::Array(&mut card))),
            ],
        )
        .unwrap();

        assert_eq!(&name[..6], b"price\0");
        assert_eq!(ty, [sql3::NUMERIC]);
        assert_eq!(scale, [2]);
        assert_eq!(precision, [10]);
        assert_eq!(length, [(10 << 16) + 2]);
        assert_eq!(card, [2]);
        assert_eq!(sqlca::get().sqlerrd[2], 2);

        deallocate_desc(4, "desc_get").unwrap();
    }

    #[test]
    fn test_get_desc_data() {
        allocate_desc(1, "desc_data").unwrap();
        set_result(1, "desc_data", result()).unwrap();

        let mut ids = vec![];
        let mut lens = [0i32; 2];
        get_desc(
            2,
            "desc_data",
            1,
            [
                (DescItem::Data, HostValue::Int(Slot::Pointer(&mut ids))),
                (DescItem::RetLength, HostValue::Int(Slot::Array(&mut lens))),
            ],
        )
        .unwrap();
        assert_eq!(ids, [1, 22]);
        assert_eq!(lens, [1, 2]);

        // indicator only
        let mut ind = [7i16; 2];
        get_desc(3, "desc_data", 2, [(DescItem::Indicator, HostValue::Short(Slot::Array(&mut ind)))]).unwrap();
        assert_eq!(ind, [0, -1]);

        // data and indicator together
        let mut prices = [Varchar::new(8), Varchar::new(8)];
        let mut ind = [7i16; 2];
        get_desc(
            4,
            "desc_data",
            2,
            [
                (DescItem::Data, HostValue::Varchar(Slot::Array(&mut prices))),
                (DescItem::Indicator, HostValue::Short(Slot::Array(&mut ind))),
            ],
        )
        .unwrap();
        assert_eq!(prices[0].as_str(), "9.50");
        assert_eq!(ind, [0, -1]);

        // two rows do not fit one element
        let mut one = [0i32];
        let err = get_desc(5, "desc_data", 1, [(DescItem::RetLength, HostValue::Int(Slot::Array(&mut one)))])
            .unwrap_err();
        assert_eq!(err.sqlcode(), code::TOO_MANY_MATCHES);

        deallocate_desc(6, "desc_data").unwrap();
    }

    #[test]
    fn test_get_desc_errors() {
        allocate_desc(1, "desc_err").unwrap();
        set_result(1, "desc_err", result()).unwrap();

        let mut n = [0i32];
        let err = get_desc(2, "desc_err", 3, [(DescItem::Type, HostValue::Int(Slot::Array(&mut n)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::INVALID_DESCRIPTOR_INDEX);

        let mut text = [0u8; 4];
        let err = get_desc(3, "desc_err", 1, [(DescItem::Type, HostValue::Char(Chars::array(&mut text, 4)))])
            .unwrap_err();
        assert_eq!(err.sqlcode(), code::VAR_NOT_NUMERIC);
        assert_eq!(sqlca::get().sqlstate_str(), "07006");

        let err = get_desc(4, "desc_err", 1, [(DescItem::Name, HostValue::Int(Slot::Array(&mut n)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::VAR_NOT_CHAR);

        let err = get_desc(5, "desc_err", 1, [(DescItem::Eodt, HostValue::Int(Slot::Array(&mut n)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::UNKNOWN_DESCRIPTOR_ITEM);
        assert_eq!(sqlca::get().message(), "unrecognized descriptor item \"16\" on line 5");

        // no rows
        set_result(6, "desc_err", PgResult::builder(ResultStatus::TuplesOk).field("id", INT4).build()).unwrap();
        let err = get_desc(7, "desc_err", 1, [(DescItem::Data, HostValue::Int(Slot::Array(&mut n)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::NOT_FOUND);
        assert_eq!(sqlca::get().sqlstate_str(), "02000");

        let err = get_desc(8, "desc_missing", 1, std::iter::empty()).unwrap_err();
        assert_eq!(err.sqlcode(), code::UNKNOWN_DESCRIPTOR);

        deallocate_desc(9, "desc_err").unwrap();
    }

    #[test]
    fn test_set_desc() {
        allocate_desc(1, "desc_set").unwrap();
        set_desc_header(2, "desc_set", 0).unwrap();

        let id = [42i32];
        let text = "it's";
        set_desc(3, "desc_set", 2, [(DescItem::Data, HostValue::Char(Chars::input_str(text)))]).unwrap();
        set_desc(
            4,
            "desc_set",
            1,
            [(DescItem::Data, HostValue::Int(Slot::Input(&id))), (DescItem::Type, HostValue::Int(Slot::Input(&[4])))],
        )
        .unwrap();
        set_desc(5, "desc_set", 2, [(DescItem::Indicator, HostValue::Short(Slot::Input(&[-1])))]).unwrap();

        let (count, items) = input_items(6, "desc_set").unwrap();
        assert_eq!(count, 2);
        assert_eq!(items[0].num, 1);
        assert_eq!(items[0].data.as_deref(), Some("42"));
        assert_eq!(items[0].ty, 4);
        assert_eq!(items[1].data.as_deref(), Some("it's"));
        assert_eq!(items[1].indicator, -1);

        let bytes = [Varchar::from_bytes(b"\x01\x02")];
        set_desc(7, "desc_set", 3, [(DescItem::Data, HostValue::Bytea(Slot::Input(&bytes)))]).unwrap();
        let (count, items) = input_items(8, "desc_set").unwrap();
        assert_eq!(count, 3);
        assert!(items[2].is_binary);
        assert_eq!(items[2].data_len, 2);

        let err = set_desc(9, "desc_set", 1, [(DescItem::Name, HostValue::Int(Slot::Input(&id)))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::UNKNOWN_DESCRIPTOR_ITEM);

        let err = set_desc(10, "desc_set", 1, [(DescItem::Scale, HostValue::Char(Chars::input_str("x")))]).unwrap_err();
        assert_eq!(err.sqlcode(), code::VAR_NOT_NUMERIC);

        deallocate_desc(11, "desc_set").unwrap();
    }
}
