//! Host variables.
//!
//! A [`Variable`] describes application storage used as a statement input or
//! as an output target, together with its optional [`Indicator`].
use crate::{
    sqlda::Sqlda,
    types::{Date, Decimal, Interval, Numeric, Timestamp},
};

/// Host variable type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Type {
    Char = 1,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Bool,
    Float,
    Double,
    Varchar,
    Varchar2,
    Numeric,
    Decimal,
    Date,
    Timestamp,
    Interval,
    Array,
    Struct,
    Union,
    Descriptor,
    CharVariable,
    Const,
    EndOfInput,
    EndOfResult,
    NoIndicator,
    String,
    Sqlda,
    Bytea,
}

impl Type {
    /// C spelling of the type, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Char | Self::String => "char",
            Self::UnsignedChar => "unsigned char",
            Self::Short => "short",
            Self::UnsignedShort => "unsigned short",
            Self::Int => "int",
            Self::UnsignedInt => "unsigned int",
            Self::Long => "long",
            Self::UnsignedLong => "unsigned long",
            Self::LongLong => "long long",
            Self::UnsignedLongLong => "unsigned long long",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Double => "double",
            Self::Varchar | Self::Varchar2 => "varchar",
            Self::Numeric => "numeric",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Interval => "interval",
            Self::Const => "Const",
            Self::Bytea => "bytea",
            Self::Descriptor => "descriptor",
            Self::Sqlda => "sqlda",
            Self::CharVariable => "char_variable",
            Self::Array | Self::Struct | Self::Union => "aggregate",
            Self::EndOfInput | Self::EndOfResult | Self::NoIndicator => "",
        }
    }

    /// Numeric code of the type.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Type of a numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        use Type::*;
        const ALL: [Type; 32] = [
            Char, UnsignedChar, Short, UnsignedShort, Int, UnsignedInt, Long, UnsignedLong,
            LongLong, UnsignedLongLong, Bool, Float, Double, Varchar, Varchar2, Numeric,
            Decimal, Date, Timestamp, Interval, Array, Struct, Union, Descriptor,
            CharVariable, Const, EndOfInput, EndOfResult, NoIndicator, String, Sqlda, Bytea,
        ];
        let i = usize::try_from(code).ok()?.checked_sub(1)?;
        ALL.get(i).copied()
    }

    pub(crate) fn is_char(self) -> bool {
        matches!(self, Self::Char | Self::UnsignedChar | Self::String | Self::Varchar | Self::Varchar2)
    }
}

/// Compatibility mode of a statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compat {
    #[default]
    Pgsql,
    Informix,
    InformixSe,
    Oracle,
}

impl Compat {
    pub fn is_informix(self) -> bool {
        matches!(self, Self::Informix | Self::InformixSe)
    }

    pub fn is_oracle(self) -> bool {
        matches!(self, Self::Oracle)
    }
}

/// Storage of a host variable.
///
/// `Pointer` is storage the runtime may size itself, for outputs the vector
/// is resized to the number of returned rows.
#[derive(Debug)]
pub enum Slot<'a, T> {
    /// Read only storage, for inputs.
    Input(&'a [T]),
    /// Fixed size output storage.
    Array(&'a mut [T]),
    /// Storage allocated by the runtime.
    Pointer(&'a mut Vec<T>),
}

impl<'a, T> Slot<'a, T> {
    /// Declared element count, `0` for [`Slot::Pointer`].
    pub fn arrsize(&self) -> usize {
        match self {
            Self::Input(s) => s.len(),
            Self::Array(s) => s.len(),
            Self::Pointer(_) => 0,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Input(s) => s,
            Self::Array(s) => s,
            Self::Pointer(v) => v,
        }
    }

    /// Writable elements, empty for [`Slot::Input`].
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Input(_) => &mut [],
            Self::Array(s) => s,
            Self::Pointer(v) => v,
        }
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        self.as_slice().get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(i)
    }

    /// The vector behind a [`Slot::Pointer`].
    pub(crate) fn vec_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Self::Pointer(v) => Some(v),
            _ => None,
        }
    }
}

impl<'a, T> From<&'a [T]> for Slot<'a, T> {
    fn from(value: &'a [T]) -> Self {
        Self::Input(value)
    }
}

impl<'a, T> From<&'a mut [T]> for Slot<'a, T> {
    fn from(value: &'a mut [T]) -> Self {
        Self::Array(value)
    }
}

impl<'a, T> From<&'a mut Vec<T>> for Slot<'a, T> {
    fn from(value: &'a mut Vec<T>) -> Self {
        Self::Pointer(value)
    }
}

/// Fixed width character records.
///
/// `data` holds consecutive records of `size` bytes. A `size` of `0` on input
/// means a single nul terminated string. A [`Slot::Pointer`] output receives
/// every row as consecutive nul terminated strings.
#[derive(Debug)]
pub struct Chars<'a> {
    pub data: Slot<'a, u8>,
    pub size: usize,
}

impl<'a> Chars<'a> {
    pub fn input(data: &'a [u8]) -> Self {
        Self { data: Slot::Input(data), size: data.len() }
    }

    pub fn input_str(data: &'a str) -> Self {
        Self::input(data.as_bytes())
    }

    /// `count` records of `size` bytes in `data`.
    pub fn array(data: &'a mut [u8], size: usize) -> Self {
        Self { data: Slot::Array(data), size }
    }

    pub fn pointer(data: &'a mut Vec<u8>) -> Self {
        Self { data: Slot::Pointer(data), size: 0 }
    }

    /// Number of records.
    pub fn arrsize(&self) -> usize {
        match (&self.data, self.size) {
            (Slot::Pointer(_), _) => 0,
            (_, 0) => 1,
            (data, size) => (data.arrsize() / size).max(1),
        }
    }

    /// Record `i`, for a `Pointer` this is the `i`th nul terminated string.
    pub fn record(&self, i: usize) -> &[u8] {
        match (&self.data, self.size) {
            (Slot::Pointer(v), _) => v.split(|b| *b == 0).nth(i).unwrap_or_default(),
            (data, 0) => data.as_slice(),
            (data, size) => data.as_slice().get(i * size..(i + 1) * size).unwrap_or_default(),
        }
    }

    /// Record `i` up to its nul terminator.
    pub fn record_str(&self, i: usize) -> &[u8] {
        let record = self.record(i);
        let end = record.iter().position(|b| *b == 0).unwrap_or(record.len());
        &record[..end]
    }

    pub(crate) fn record_mut(&mut self, i: usize) -> &mut [u8] {
        let size = self.size;
        let data = self.data.as_mut_slice();
        if size == 0 {
            return if i == 0 { data } else { &mut [] };
        }
        match data.get_mut(i * size..(i + 1) * size) {
            Some(record) => record,
            None => &mut [],
        }
    }
}

/// A variable length character or binary buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Varchar {
    pub len: i32,
    pub arr: Box<[u8]>,
}

/// `bytea` host variable, same shape as [`Varchar`].
pub type Bytea = Varchar;

impl Varchar {
    /// Empty buffer with room for `size` bytes.
    pub fn new(size: usize) -> Self {
        Self { len: 0, arr: vec![0; size].into_boxed_slice() }
    }

    pub fn from_bytes(value: &[u8]) -> Self {
        Self { len: value.len() as i32, arr: value.into() }
    }

    /// Declared buffer size.
    pub fn size(&self) -> usize {
        self.arr.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        let len = (self.len.max(0) as usize).min(self.arr.len());
        &self.arr[..len]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

impl std::fmt::Debug for Varchar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Varchar({:?}, {})", String::from_utf8_lossy(self.as_bytes()), self.size())
    }
}

/// SQLDA host variable.
#[derive(Debug)]
pub enum SqldaSlot<'a> {
    Input(&'a Sqlda),
    /// Receives a chain of one block per row.
    Output(&'a mut Option<Box<Sqlda>>),
}

/// Value storage of a host variable.
#[derive(Debug)]
pub enum HostValue<'a> {
    Short(Slot<'a, i16>),
    UShort(Slot<'a, u16>),
    Int(Slot<'a, i32>),
    UInt(Slot<'a, u32>),
    Long(Slot<'a, i64>),
    ULong(Slot<'a, u64>),
    LongLong(Slot<'a, i64>),
    ULongLong(Slot<'a, u64>),
    Bool(Slot<'a, bool>),
    Float(Slot<'a, f32>),
    Double(Slot<'a, f64>),
    Char(Chars<'a>),
    UChar(Chars<'a>),
    /// Like `Char`, trailing spaces are trimmed on output.
    String(Chars<'a>),
    Varchar(Slot<'a, Varchar>),
    Bytea(Slot<'a, Bytea>),
    Numeric(Slot<'a, Numeric>),
    Decimal(Slot<'a, Decimal>),
    Date(Slot<'a, Date>),
    Timestamp(Slot<'a, Timestamp>),
    Interval(Slot<'a, Interval>),
    /// Text inlined into the statement, e.g. a dynamic cursor name.
    CharVariable(&'a str),
    /// Literal inlined into the statement.
    Const(&'a str),
    /// Named descriptor.
    Descriptor(&'a str),
    Sqlda(SqldaSlot<'a>),
}

impl HostValue<'_> {
    pub fn ty(&self) -> Type {
        match self {
            Self::Short(_) => Type::Short,
            Self::UShort(_) => Type::UnsignedShort,
            Self::Int(_) => Type::Int,
            Self::UInt(_) => Type::UnsignedInt,
            Self::Long(_) => Type::Long,
            Self::ULong(_) => Type::UnsignedLong,
            Self::LongLong(_) => Type::LongLong,
            Self::ULongLong(_) => Type::UnsignedLongLong,
            Self::Bool(_) => Type::Bool,
            Self::Float(_) => Type::Float,
            Self::Double(_) => Type::Double,
            Self::Char(_) => Type::Char,
            Self::UChar(_) => Type::UnsignedChar,
            Self::String(_) => Type::String,
            Self::Varchar(_) => Type::Varchar,
            Self::Bytea(_) => Type::Bytea,
            Self::Numeric(_) => Type::Numeric,
            Self::Decimal(_) => Type::Decimal,
            Self::Date(_) => Type::Date,
            Self::Timestamp(_) => Type::Timestamp,
            Self::Interval(_) => Type::Interval,
            Self::CharVariable(_) => Type::CharVariable,
            Self::Const(_) => Type::Const,
            Self::Descriptor(_) => Type::Descriptor,
            Self::Sqlda(_) => Type::Sqlda,
        }
    }

    /// Declared element count, `0` when the runtime may allocate.
    pub fn arrsize(&self) -> usize {
        match self {
            Self::Short(s) => s.arrsize(),
            Self::UShort(s) => s.arrsize(),
            Self::Int(s) => s.arrsize(),
            Self::UInt(s) => s.arrsize(),
            Self::Long(s) | Self::LongLong(s) => s.arrsize(),
            Self::ULong(s) | Self::ULongLong(s) => s.arrsize(),
            Self::Bool(s) => s.arrsize(),
            Self::Float(s) => s.arrsize(),
            Self::Double(s) => s.arrsize(),
            Self::Char(c) | Self::UChar(c) | Self::String(c) => c.arrsize(),
            Self::Varchar(s) | Self::Bytea(s) => s.arrsize(),
            Self::Numeric(s) => s.arrsize(),
            Self::Decimal(s) => s.arrsize(),
            Self::Date(s) => s.arrsize(),
            Self::Timestamp(s) => s.arrsize(),
            Self::Interval(s) => s.arrsize(),
            Self::CharVariable(_) | Self::Const(_) | Self::Descriptor(_) | Self::Sqlda(_) => 1,
        }
    }

    pub(crate) fn is_pointer(&self) -> bool {
        self.arrsize() == 0
    }
}

/// Indicator storage of a host variable.
#[derive(Debug, Default)]
pub enum Indicator<'a> {
    /// Nulls are encoded in the value itself.
    #[default]
    None,
    Short(Slot<'a, i16>),
    Int(Slot<'a, i32>),
    Long(Slot<'a, i64>),
    LongLong(Slot<'a, i64>),
}

impl Indicator<'_> {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn ty(&self) -> Type {
        match self {
            Self::None => Type::NoIndicator,
            Self::Short(_) => Type::Short,
            Self::Int(_) => Type::Int,
            Self::Long(_) => Type::Long,
            Self::LongLong(_) => Type::LongLong,
        }
    }

    /// Declared element count.
    pub fn arrsize(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Short(s) => s.arrsize(),
            Self::Int(s) => s.arrsize(),
            Self::Long(s) | Self::LongLong(s) => s.arrsize(),
        }
    }

    pub(crate) fn is_pointer(&self) -> bool {
        match self {
            Self::None => false,
            Self::Short(s) => s.is_pointer(),
            Self::Int(s) => s.is_pointer(),
            Self::Long(s) | Self::LongLong(s) => s.is_pointer(),
        }
    }

    /// Indicator value at `i`, `None` without indicator storage.
    pub fn get(&self, i: usize) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Short(s) => s.get(i).map(|v| *v as i64),
            Self::Int(s) => s.get(i).map(|v| *v as i64),
            Self::Long(s) | Self::LongLong(s) => s.get(i).copied(),
        }
    }

    /// Store `value` at `i`, out of range writes are ignored.
    pub fn set(&mut self, i: usize, value: i64) {
        match self {
            Self::None => { }
            Self::Short(s) => if let Some(v) = s.get_mut(i) { *v = value as i16 },
            Self::Int(s) => if let Some(v) = s.get_mut(i) { *v = value as i32 },
            Self::Long(s) | Self::LongLong(s) => if let Some(v) = s.get_mut(i) { *v = value },
        }
    }

    /// Resize a pointer indicator to `len` elements.
    pub(crate) fn resize(&mut self, len: usize, line: i32) -> crate::Result<usize> {
        use crate::memory::alloc_vec;
        let bytes = match self {
            Self::Short(s) => match s.vec_mut() {
                Some(v) => { alloc_vec(v, len, line)?; len * size_of::<i16>() }
                None => 0,
            },
            Self::Int(s) => match s.vec_mut() {
                Some(v) => { alloc_vec(v, len, line)?; len * size_of::<i32>() }
                None => 0,
            },
            Self::Long(s) | Self::LongLong(s) => match s.vec_mut() {
                Some(v) => { alloc_vec(v, len, line)?; len * size_of::<i64>() }
                None => 0,
            },
            Self::None => 0,
        };
        Ok(bytes)
    }
}

/// A host variable with its indicator.
#[derive(Debug)]
pub struct Variable<'a> {
    pub value: HostValue<'a>,
    pub indicator: Indicator<'a>,
}

impl<'a> Variable<'a> {
    pub fn new(value: HostValue<'a>) -> Self {
        Self { value, indicator: Indicator::None }
    }

    pub fn with_indicator(mut self, indicator: Indicator<'a>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn ty(&self) -> Type {
        self.value.ty()
    }
}

impl<'a> From<HostValue<'a>> for Variable<'a> {
    fn from(value: HostValue<'a>) -> Self {
        Self::new(value)
    }
}

/// Null encoding in the value itself, used when no indicator is given.
pub trait NoIndNull {
    fn is_noind_null(&self) -> bool;

    fn set_noind_null(&mut self);
}

macro_rules! noind_min {
    ($($ty:ty),*) => {$(
        impl NoIndNull for $ty {
            fn is_noind_null(&self) -> bool {
                *self == <$ty>::MIN
            }

            fn set_noind_null(&mut self) {
                *self = <$ty>::MIN;
            }
        }
    )*};
}

noind_min!(i16, i32, i64);

macro_rules! noind_never {
    ($($ty:ty),*) => {$(
        impl NoIndNull for $ty {
            fn is_noind_null(&self) -> bool {
                false
            }

            fn set_noind_null(&mut self) { }
        }
    )*};
}

noind_never!(u16, u32, u64, bool);

impl NoIndNull for f32 {
    fn is_noind_null(&self) -> bool {
        self.to_bits() == u32::MAX
    }

    fn set_noind_null(&mut self) {
        *self = f32::from_bits(u32::MAX);
    }
}

impl NoIndNull for f64 {
    fn is_noind_null(&self) -> bool {
        self.to_bits() == u64::MAX
    }

    fn set_noind_null(&mut self) {
        *self = f64::from_bits(u64::MAX);
    }
}

impl NoIndNull for Varchar {
    fn is_noind_null(&self) -> bool {
        self.len == 0 && self.arr.first().is_none_or(|b| *b == 0)
    }

    fn set_noind_null(&mut self) {
        self.len = 0;
        if let Some(b) = self.arr.first_mut() {
            *b = 0;
        }
    }
}

/// Null character record, its first byte is nul.
pub(crate) fn is_noind_null_chars(record: &[u8]) -> bool {
    record.first().is_none_or(|b| *b == 0)
}

pub(crate) fn set_noind_null_chars(record: &mut [u8]) {
    if let Some(b) = record.first_mut() {
        *b = 0;
    }
}
