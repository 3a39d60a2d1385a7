//! Postgres type identifiers and classification.
use lru::LruCache;

use crate::{
    Result,
    common::debug_log,
    value::{Compat, Type},
};

/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

macro_rules! oid {
    ($($name:ident = $oid:literal $(, $doc:literal)?;)*) => {
        $(
            $(#[doc = $doc])?
            pub const $name: Oid = $oid;
        )*
    };
}

oid! {
    BOOL = 16, "`bool` boolean, 'true'/'false'";
    BYTEA = 17, "`bytea` variable-length string, binary values escaped";
    CHAR = 18, "`char` single character";
    NAME = 19, "`name` 63-byte type for storing system identifiers";
    INT8 = 20, "`int8` ~18 digit integer, 8-byte storage";
    INT2 = 21, "`int2` -32 thousand to 32 thousand, 2-byte storage";
    INT2VECTOR = 22, "`int2vector` array of int2, used in system tables";
    INT4 = 23, "`int4` -2 billion to 2 billion integer, 4-byte storage";
    REGPROC = 24;
    TEXT = 25, "`text` variable-length string, no limit specified";
    OID = 26;
    TID = 27;
    XID = 28;
    CID = 29;
    OIDVECTOR = 30, "`oidvector` array of oids, used in system tables";
    POINT = 600, "`point` geometric point '(x, y)'";
    LSEG = 601;
    PATH = 602;
    BOX = 603;
    POLYGON = 604;
    LINE = 628;
    FLOAT4 = 700, "`float4` single-precision floating point number, 4-byte storage";
    FLOAT8 = 701, "`float8` double-precision floating point number, 8-byte storage";
    UNKNOWN = 705;
    CIRCLE = 718;
    MONEY = 790;
    INET = 869;
    CIDR = 650;
    BPCHAR = 1042, "`bpchar` char(length), blank-padded string, fixed storage length";
    VARCHAR = 1043, "`varchar` varchar(length), non-blank-padded string, variable storage length";
    DATE = 1082, "`date` date";
    TIME = 1083, "`time` time of day";
    TIMESTAMP = 1114, "`timestamp` date and time";
    TIMESTAMPTZ = 1184, "`timestamptz` date and time with timezone";
    INTERVAL = 1186, "`interval` time interval";
    TIMETZ = 1266;
    BIT = 1560;
    VARBIT = 1562;
    NUMERIC = 1700, "`numeric` exact numeric of selectable precision";
}

/// Fixed storage size of a type, `-1` for variable length.
pub fn type_size(oid: Oid) -> i32 {
    match oid {
        BOOL | CHAR => 1,
        INT2 => 2,
        INT4 | OID | XID | CID | REGPROC | FLOAT4 | DATE => 4,
        INT8 | FLOAT8 | TIME | TIMESTAMP | TIMESTAMPTZ | MONEY => 8,
        TIMETZ => 12,
        INTERVAL | POINT => 16,
        NAME => 64,
        _ => -1,
    }
}

/// How the text representation of a type is shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayKind {
    /// Plain scalar.
    None,
    /// `{a,b,c}` array.
    Array,
    /// Space separated vector such as `int2vector`.
    Vector,
}

impl ArrayKind {
    pub fn is_array(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Well-known types every classification cache starts with.
pub fn seed() -> impl Iterator<Item = (Oid, ArrayKind)> {
    const SCALAR: [Oid; 33] = [
        BOOL, BYTEA, CHAR, NAME, INT8, INT2, INT4, REGPROC, TEXT, OID, TID, XID, CID, PATH,
        POLYGON, FLOAT4, FLOAT8, UNKNOWN, CIRCLE, MONEY, INET, CIDR, BPCHAR, VARCHAR, DATE, TIME,
        TIMESTAMP, TIMESTAMPTZ, INTERVAL, TIMETZ, BIT, VARBIT, NUMERIC,
    ];
    const VECTOR: [Oid; 6] = [INT2VECTOR, OIDVECTOR, POINT, LSEG, BOX, LINE];

    SCALAR
        .into_iter()
        .map(|oid| (oid, ArrayKind::None))
        .chain(VECTOR.into_iter().map(|oid| (oid, ArrayKind::Vector)))
}

/// Per connection type classification cache.
pub struct TypeCache {
    map: LruCache<Oid, ArrayKind>,
    seeded: bool,
}

impl TypeCache {
    pub fn new() -> Self {
        Self { map: LruCache::unbounded(), seeded: false }
    }

    fn seed(&mut self) {
        if !self.seeded {
            for (oid, kind) in seed() {
                self.map.put(oid, kind);
            }
            self.seeded = true;
        }
    }

    pub fn get(&mut self, oid: Oid) -> Option<ArrayKind> {
        self.seed();
        self.map.get(&oid).copied()
    }

    pub fn insert(&mut self, oid: Oid, kind: ArrayKind) {
        self.seed();
        self.map.put(oid, kind);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCache").field("len", &self.map.len()).finish()
    }
}

/// Classify `oid`, asking the server on a cache miss.
///
/// `query` runs the catalog lookup and returns the `typlen` column if a row
/// was found.
pub(crate) fn classify(
    cache: &mut TypeCache,
    oid: Oid,
    var_type: Type,
    query: impl FnOnce(&str) -> Result<Option<i64>>,
) -> Result<ArrayKind> {
    if let Some(kind) = cache.get(oid) {
        return Ok(kind);
    }

    let sql = format!("select typlen from pg_type where oid={oid} and typelem<>0");
    let kind = match query(&sql)? {
        None => ArrayKind::None,
        Some(-1) => ArrayKind::Array,
        Some(_) => ArrayKind::Vector,
    };

    // arrays of character strings are not supported, the text is taken as is
    let character = matches!(sql3_type(oid), sql3::CHARACTER | sql3::CHARACTER_VARYING);
    let kind = match var_type {
        _ if character => ArrayKind::None,
        Type::Char | Type::UnsignedChar | Type::Varchar | Type::String => ArrayKind::None,
        _ => kind,
    };

    cache.insert(oid, kind);
    debug_log!("ecpg_is_type_an_array: type ({oid}); C ({var_type:?}); array ({})", if kind.is_array() { "yes" } else { "no" });

    Ok(kind)
}

/// SQL3 type codes reported by descriptors.
pub mod sql3 {
    pub const CHARACTER: i32 = 1;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const INTEGER: i32 = 4;
    pub const SMALLINT: i32 = 5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE_PRECISION: i32 = 8;
    pub const DATE_TIME_TIMESTAMP: i32 = 9;
    pub const INTERVAL: i32 = 10;
    pub const CHARACTER_VARYING: i32 = 12;
    pub const ENUMERATED: i32 = 13;
    pub const BIT: i32 = 14;
    pub const BIT_VARYING: i32 = 15;
    pub const BOOLEAN: i32 = 16;

    pub const DDT_DATE: i32 = 1;
    pub const DDT_TIME: i32 = 2;
    pub const DDT_TIMESTAMP: i32 = 3;
    pub const DDT_TIME_WITH_TIME_ZONE: i32 = 4;
    pub const DDT_TIMESTAMP_WITH_TIME_ZONE: i32 = 5;
    pub const DDT_ILLEGAL: i32 = -1;
}

/// SQL3 type of a server type, `0` when it has none.
pub fn sql3_type(oid: Oid) -> i32 {
    match oid {
        BOOL => sql3::BOOLEAN,
        INT2 => sql3::SMALLINT,
        INT4 => sql3::INTEGER,
        TEXT | BPCHAR => sql3::CHARACTER,
        FLOAT4 => sql3::REAL,
        FLOAT8 => sql3::DOUBLE_PRECISION,
        VARCHAR => sql3::CHARACTER_VARYING,
        DATE | TIME | TIMESTAMP => sql3::DATE_TIME_TIMESTAMP,
        NUMERIC => sql3::NUMERIC,
        _ => 0,
    }
}

/// SQL3 datetime interval code of a server type.
pub fn sql3_datetime_code(oid: Oid) -> i32 {
    match oid {
        DATE => sql3::DDT_DATE,
        TIME => sql3::DDT_TIME,
        TIMESTAMP => sql3::DDT_TIMESTAMP,
        TIMESTAMPTZ => sql3::DDT_TIMESTAMP_WITH_TIME_ZONE,
        TIMETZ => sql3::DDT_TIME_WITH_TIME_ZONE,
        _ => sql3::DDT_ILLEGAL,
    }
}

/// Host type an SQLDA column of a server type is converted to.
pub fn sqlda_type(oid: Oid, compat: Compat) -> Type {
    match oid {
        CHAR | VARCHAR | BPCHAR | TEXT => Type::Char,
        INT2 => Type::Short,
        INT4 => Type::Int,
        FLOAT8 => Type::Double,
        FLOAT4 => Type::Float,
        NUMERIC if compat.is_informix() => Type::Decimal,
        NUMERIC => Type::Numeric,
        DATE => Type::Date,
        TIMESTAMP | TIMESTAMPTZ => Type::Timestamp,
        INTERVAL => Type::Interval,
        INT8 => Type::LongLong,
        _ => Type::Char,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seed_classification() {
        let mut cache = TypeCache::new();
        assert_eq!(cache.get(INT4), Some(ArrayKind::None));
        assert_eq!(cache.get(POINT), Some(ArrayKind::Vector));
        assert_eq!(cache.get(INT2VECTOR), Some(ArrayKind::Vector));
        assert_eq!(cache.get(1007), None);
        assert_eq!(cache.len(), 39);
    }

    #[test]
    fn test_classify_miss() {
        let mut cache = TypeCache::new();

        let mut asked = None;
        let kind = classify(&mut cache, 1007, Type::Int, |sql| {
            asked = Some(sql.to_owned());
            Ok(Some(-1))
        })
        .unwrap();
        assert_eq!(kind, ArrayKind::Array);
        assert_eq!(asked.as_deref(), Some("select typlen from pg_type where oid=1007 and typelem<>0"));

        // cached afterwards
        let kind = classify(&mut cache, 1007, Type::Int, |_| panic!("cached")).unwrap();
        assert_eq!(kind, ArrayKind::Array);

        let kind = classify(&mut cache, 1015, Type::Char, |_| Ok(Some(-1))).unwrap();
        assert_eq!(kind, ArrayKind::None);

        let kind = classify(&mut cache, 99999, Type::Int, |_| Ok(None)).unwrap();
        assert_eq!(kind, ArrayKind::None);

        let kind = classify(&mut cache, 1017, Type::Int, |_| Ok(Some(16))).unwrap();
        assert_eq!(kind, ArrayKind::Vector);
    }

    #[test]
    fn test_sql3() {
        assert_eq!(sql3_type(BOOL), 16);
        assert_eq!(sql3_type(TEXT), 1);
        assert_eq!(sql3_type(VARCHAR), 12);
        assert_eq!(sql3_type(TIMESTAMP), 9);
        assert_eq!(sql3_datetime_code(DATE), 1);
        assert_eq!(sql3_datetime_code(TIMESTAMPTZ), 5);
        assert_eq!(sqlda_type(NUMERIC, Compat::Informix), Type::Decimal);
        assert_eq!(sqlda_type(NUMERIC, Compat::Pgsql), Type::Numeric);
        assert_eq!(sqlda_type(INT8, Compat::Pgsql), Type::LongLong);
    }
}
