//! Host types without a native Rust counterpart.
//!
//! - [`Numeric`] and [`Decimal`], arbitrary and fixed precision decimals
//! - [`Date`], [`Timestamp`] and [`Interval`], backed by the [`time`][::time] crate
mod numeric;
mod time;

pub use numeric::{
    BadNumeric, DECSIZE, Decimal, NUMERIC_NAN, NUMERIC_NEG, NUMERIC_NULL, NUMERIC_POS, Numeric,
    NumericOverflow,
};
pub use time::{BadDateTime, Date, Interval, Timestamp};

/// Format like C `%.<precision>g`.
pub(crate) fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-Infinity" } else { "Infinity" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp = exp.parse::<i32>().unwrap_or_default();

    if exp < -4 || exp >= precision as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let fixed = format!("{:.*}", (precision as i32 - 1 - exp) as usize, value);
        trim_fraction(&fixed).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    match s.contains('.') {
        true => s.trim_end_matches('0').trim_end_matches('.'),
        false => s,
    }
}

#[cfg(test)]
mod test {
    use super::format_g;

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(1.5, 15), "1.5");
        assert_eq!(format_g(0.1, 15), "0.1");
        assert_eq!(format_g(100.0, 15), "100");
        assert_eq!(format_g(-2.25, 15), "-2.25");
        assert_eq!(format_g(1e20, 15), "1e+20");
        assert_eq!(format_g(1.5e-7, 15), "1.5e-07");
        assert_eq!(format_g(123456789012345678.0, 15), "1.23456789012346e+17");
        assert_eq!(format_g(0.1f32 as f64, 15), "0.100000001490116");
        assert_eq!(format_g(f64::INFINITY, 15), "Infinity");
        assert_eq!(format_g(f64::NAN, 15), "NaN");
    }
}
