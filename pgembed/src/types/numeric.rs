//! Arbitrary precision decimal digits.
use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{common::unit_error, value::NoIndNull};

pub const NUMERIC_POS: u16 = 0x0000;
pub const NUMERIC_NEG: u16 = 0x4000;
pub const NUMERIC_NAN: u16 = 0xC000;
/// Sign of a numeric holding a null.
pub const NUMERIC_NULL: u16 = 0xF000;

/// Digit capacity of [`Decimal`].
pub const DECSIZE: usize = 30;

const MAX_EXPONENT: i64 = i32::MAX as i64 / 2;

unit_error! {
    /// Text is not a valid numeric.
    pub struct BadNumeric("invalid input syntax for type numeric");
}

unit_error! {
    /// Numeric does not fit the target.
    pub struct NumericOverflow("numeric value out of range");
}

/// A decimal number stored as one digit per byte.
///
/// The value is `0.d1d2d3... * 10^(weight + 1)`, `dscale` digits are shown
/// after the decimal point.
#[derive(Clone)]
pub struct Numeric {
    pub ndigits: i32,
    pub weight: i32,
    pub rscale: i32,
    pub dscale: i32,
    pub sign: u16,
    /// Digit storage, `buf[0]` is a spare digit for rounding.
    buf: Vec<u8>,
    /// Offset of the first digit in `buf`.
    digits: usize,
}

impl Numeric {
    /// Zero with `ndigits` zeroed digits.
    fn alloc(ndigits: usize) -> Self {
        Self {
            ndigits: ndigits as i32,
            weight: 0,
            rscale: 0,
            dscale: 0,
            sign: NUMERIC_POS,
            buf: vec![0; ndigits + 1],
            digits: 1,
        }
    }

    pub fn new() -> Self {
        Self::alloc(0)
    }

    /// The significant digits.
    pub fn digits(&self) -> &[u8] {
        let end = (self.digits + self.ndigits.max(0) as usize).min(self.buf.len());
        &self.buf[self.digits.min(end)..end]
    }

    pub fn is_nan(&self) -> bool {
        self.sign == NUMERIC_NAN
    }

    /// Digit storage and the offset of the first digit in it.
    pub(crate) fn raw_parts(&self) -> (&[u8], usize) {
        let end = (self.digits + self.ndigits.max(0) as usize).min(self.buf.len());
        (&self.buf[..end], self.digits)
    }

    /// Reassemble a value from its header fields and digit storage.
    pub(crate) fn from_raw_parts(
        ndigits: i32,
        weight: i32,
        rscale: i32,
        dscale: i32,
        sign: u16,
        buf: Vec<u8>,
        digits: usize,
    ) -> Self {
        let digits = digits.min(buf.len());
        let ndigits = ndigits.clamp(0, (buf.len() - digits) as i32);
        Self { ndigits, weight, rscale, dscale, sign, buf, digits }
    }

    /// Parse a numeric from text.
    ///
    /// Accepts leading and trailing whitespace, a sign, a decimal point, an
    /// exponent and `NaN`.
    pub fn from_asc(text: &str) -> Result<Self, BadNumeric> {
        let bytes = text.as_bytes();
        let mut i = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();

        let only_spaces = |from: usize| bytes[from..].iter().all(u8::is_ascii_whitespace);

        if bytes.len() >= i + 3 && bytes[i..i + 3].eq_ignore_ascii_case(b"NaN") {
            if !only_spaces(i + 3) {
                return Err(BadNumeric);
            }
            let mut nan = Self::new();
            nan.sign = NUMERIC_NAN;
            return Ok(nan);
        }

        let mut me = Self::alloc(bytes.len() - i);
        me.weight = -1;

        match bytes.get(i) {
            Some(b'+') => i += 1,
            Some(b'-') => {
                me.sign = NUMERIC_NEG;
                i += 1;
            }
            _ => { }
        }

        let mut have_dp = false;
        if bytes.get(i) == Some(&b'.') {
            have_dp = true;
            i += 1;
        }

        if !bytes.get(i).is_some_and(u8::is_ascii_digit) {
            return Err(BadNumeric);
        }

        let mut n = 0;
        while let Some(&b) = bytes.get(i) {
            if b.is_ascii_digit() {
                me.buf[me.digits + n] = b - b'0';
                n += 1;
                if have_dp {
                    me.dscale += 1;
                } else {
                    me.weight += 1;
                }
            } else if b == b'.' {
                if have_dp {
                    return Err(BadNumeric);
                }
                have_dp = true;
            } else {
                break;
            }
            i += 1;
        }
        me.ndigits = n as i32;

        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            let start = i;
            if matches!(bytes.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                return Err(BadNumeric);
            }
            i += digits;
            let exponent = text[start..i].parse::<i64>().map_err(|_| BadNumeric)?;
            if exponent >= MAX_EXPONENT || exponent <= -MAX_EXPONENT {
                return Err(BadNumeric);
            }
            me.weight += exponent as i32;
            me.dscale = (me.dscale - exponent as i32).max(0);
        }

        if !only_spaces(i) {
            return Err(BadNumeric);
        }

        while me.ndigits > 0 && me.buf[me.digits] == 0 {
            me.digits += 1;
            me.weight -= 1;
            me.ndigits -= 1;
        }
        if me.ndigits == 0 {
            me.weight = 0;
        }

        me.rscale = me.dscale;
        Ok(me)
    }

    /// Format with `dscale` digits after the decimal point, rounding half up.
    ///
    /// A negative `dscale` uses the display scale of the value.
    pub fn to_asc(&self, dscale: i32) -> String {
        if self.sign == NUMERIC_NAN {
            return "NaN".to_owned();
        }

        let dscale = if dscale < 0 { self.dscale } else { dscale };

        // spare leading digit receives the rounding carry
        let mut digits = Vec::with_capacity(self.digits().len() + 1);
        digits.push(0u8);
        digits.extend_from_slice(self.digits());
        let mut first = 1usize;
        let mut ndigits = self.ndigits;
        let mut weight = self.weight;

        let mut i = dscale + weight + 1;
        if i >= 0 && ndigits > i {
            let mut carry = u8::from(digits[first + i as usize] > 4);
            ndigits = i;

            while carry > 0 {
                i -= 1;
                let at = (first as i32 + i) as usize;
                carry += digits[at];
                digits[at] = carry % 10;
                carry /= 10;
            }

            if i < 0 {
                first -= 1;
                ndigits += 1;
                weight += 1;
            }
        } else {
            ndigits = ndigits.min(i).max(0);
        }

        let digits = &digits[first..first + ndigits as usize];
        let mut out = String::with_capacity(dscale.max(0) as usize + weight.max(0) as usize + 4);

        if self.sign == NUMERIC_NEG {
            out.push('-');
        }

        let mut d = 0;
        let mut next = |i: i32, out: &mut String| {
            if i <= weight && d < digits.len() {
                out.push((b'0' + digits[d]) as char);
                d += 1;
            } else {
                out.push('0');
            }
        };

        let mut i = weight.max(0);
        while i >= 0 {
            next(i, &mut out);
            i -= 1;
        }

        if dscale > 0 {
            out.push('.');
            while i >= -dscale {
                next(i, &mut out);
                i -= 1;
            }
        }

        out
    }

    /// Exact conversion of an integer, with one digit after the point.
    pub fn from_i64(value: i64) -> Self {
        let text = format!("{value}.0");
        let mut me = Self::from_asc(&text).unwrap_or_default();
        me.dscale = 1;
        me.rscale = 1;
        me
    }

    /// Conversion through fifteen significant digits.
    pub fn from_f64(value: f64) -> Result<Self, BadNumeric> {
        Self::from_asc(&super::format_g(value, 15))
    }

    pub fn to_f64(&self) -> Result<f64, BadNumeric> {
        if self.is_nan() {
            return Ok(f64::NAN);
        }
        self.to_asc(self.dscale).parse().map_err(|_| BadNumeric)
    }

    /// Round to an integer.
    pub fn to_i64(&self) -> Result<i64, NumericOverflow> {
        if self.is_nan() {
            return Err(NumericOverflow);
        }
        self.to_asc(0).parse().map_err(|_| NumericOverflow)
    }

    pub fn to_i32(&self) -> Result<i32, NumericOverflow> {
        let value = self.to_i64()?;
        if value < -(i32::MAX as i64) || value > i32::MAX as i64 {
            return Err(NumericOverflow);
        }
        Ok(value as i32)
    }

    pub fn to_decimal(&self) -> Result<Decimal, NumericOverflow> {
        let digits = self.digits();
        if digits.len() > DECSIZE {
            return Err(NumericOverflow);
        }
        let mut dec = Decimal {
            ndigits: self.ndigits,
            weight: self.weight,
            rscale: self.rscale,
            dscale: self.dscale,
            sign: self.sign,
            digits: [0; DECSIZE],
        };
        dec.digits[..digits.len()].copy_from_slice(digits);
        Ok(dec)
    }

    pub fn from_decimal(dec: &Decimal) -> Self {
        let ndigits = (dec.ndigits.max(0) as usize).min(DECSIZE);
        let mut me = Self::alloc(ndigits);
        me.weight = dec.weight;
        me.rscale = dec.rscale;
        me.dscale = dec.dscale;
        me.sign = dec.sign;
        me.buf[1..].copy_from_slice(&dec.digits[..ndigits]);
        me
    }

    fn cmp_abs(&self, other: &Self) -> Ordering {
        let (a, b) = (self.digits(), other.digits());
        let (mut wa, mut wb) = (self.weight, other.weight);
        let (mut ia, mut ib) = (0, 0);

        // skip leading zeros
        while ia < a.len() && a[ia] == 0 {
            ia += 1;
            wa -= 1;
        }
        while ib < b.len() && b[ib] == 0 {
            ib += 1;
            wb -= 1;
        }

        if ia == a.len() || ib == b.len() {
            return (a.len() - ia).min(1).cmp(&(b.len() - ib).min(1));
        }

        match wa.cmp(&wb) {
            Ordering::Equal => { }
            ord => return ord,
        }

        while ia < a.len() && ib < b.len() {
            match a[ia].cmp(&b[ib]) {
                Ordering::Equal => { }
                ord => return ord,
            }
            ia += 1;
            ib += 1;
        }

        let rest = |d: &[u8]| d.iter().any(|d| *d != 0);
        match (rest(&a[ia..]), rest(&b[ib..])) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        }
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.sign == other.sign
            && self.dscale == other.dscale
            && (self.is_nan() || self.sign == NUMERIC_NULL || self.partial_cmp(other) == Some(Ordering::Equal))
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let zero = |n: &Numeric| n.digits().iter().all(|d| *d == 0);
        match (self.sign, other.sign) {
            (NUMERIC_POS, NUMERIC_POS) => Some(self.cmp_abs(other)),
            (NUMERIC_NEG, NUMERIC_NEG) => Some(other.cmp_abs(self)),
            (NUMERIC_POS, NUMERIC_NEG) if zero(self) && zero(other) => Some(Ordering::Equal),
            (NUMERIC_NEG, NUMERIC_POS) if zero(self) && zero(other) => Some(Ordering::Equal),
            (NUMERIC_POS, NUMERIC_NEG) => Some(Ordering::Greater),
            (NUMERIC_NEG, NUMERIC_POS) => Some(Ordering::Less),
            _ => None,
        }
    }
}

impl FromStr for Numeric {
    type Err = BadNumeric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_asc(s)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_asc(-1))
    }
}

impl fmt::Debug for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign == NUMERIC_NULL {
            return f.write_str("Numeric(NULL)");
        }
        write!(f, "Numeric({})", self.to_asc(-1))
    }
}

impl NoIndNull for Numeric {
    fn is_noind_null(&self) -> bool {
        self.sign == NUMERIC_NULL
    }

    fn set_noind_null(&mut self) {
        *self = Self::new();
        self.sign = NUMERIC_NULL;
    }
}

/// Fixed capacity [`Numeric`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub ndigits: i32,
    pub weight: i32,
    pub rscale: i32,
    pub dscale: i32,
    pub sign: u16,
    pub digits: [u8; DECSIZE],
}

impl Decimal {
    pub fn new() -> Self {
        Self { ndigits: 0, weight: 0, rscale: 0, dscale: 0, sign: NUMERIC_POS, digits: [0; DECSIZE] }
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign == NUMERIC_NULL {
            return f.write_str("Decimal(NULL)");
        }
        write!(f, "Decimal({})", Numeric::from_decimal(self).to_asc(-1))
    }
}

impl NoIndNull for Decimal {
    fn is_noind_null(&self) -> bool {
        self.sign == NUMERIC_NULL
    }

    fn set_noind_null(&mut self) {
        *self = Self::new();
        self.sign = NUMERIC_NULL;
    }
}
