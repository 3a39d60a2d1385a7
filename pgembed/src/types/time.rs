use std::fmt;
use time::{
    Duration, PrimitiveDateTime,
    format_description::{BorrowedFormatItem as I, Component as C, modifier},
};

use crate::{common::unit_error, value::NoIndNull};

unit_error! {
    /// Text is not a valid date, timestamp or interval.
    pub struct BadDateTime("invalid input syntax for date or time");
}

const USECS_PER_SEC: i64 = 1_000_000;
const USECS_PER_MINUTE: i64 = 60 * USECS_PER_SEC;
const USECS_PER_HOUR: i64 = 60 * USECS_PER_MINUTE;
const USECS_PER_DAY: i64 = 24 * USECS_PER_HOUR;

const PG_EPOCH_JULIAN: i32 = 2_451_545;

const PG_EPOCH: PrimitiveDateTime = {
    // source: `from_julian_day` docs
    let date = match time::Date::from_julian_day(PG_EPOCH_JULIAN) {
        Ok(ok) => ok,
        Err(_) => panic!("postgres epoch is a valid julian day"),
    };
    PrimitiveDateTime::new(date, time::Time::MIDNIGHT)
};

const DATE: &[I<'_>] = &[
    I::Component(C::Year(modifier::Year::default())),
    I::Literal(b"-"),
    I::Component(C::Month(modifier::Month::default())),
    I::Literal(b"-"),
    I::Component(C::Day(modifier::Day::default())),
];

const DATE_TIME: &[I<'_>] = &[
    I::Compound(DATE),
    I::Literal(b" "),
    I::Component(C::Hour(modifier::Hour::default())),
    I::Literal(b":"),
    I::Component(C::Minute(modifier::Minute::default())),
    I::Literal(b":"),
    I::Component(C::Second(modifier::Second::default())),
];

const SUBSECOND: &I<'_> = &I::Compound(&[
    I::Literal(b"."),
    I::Component(C::Subsecond(modifier::Subsecond::default())),
]);

const DATE_TIME_INPUT: &[I<'_>] = &[
    I::Compound(DATE_TIME),
    I::Optional(SUBSECOND),
];

/// Days since 2000-01-01.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date(pub i32);

impl Date {
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, BadDateTime> {
        let month = time::Month::try_from(month).map_err(|_| BadDateTime)?;
        let date = time::Date::from_calendar_date(year, month, day).map_err(|_| BadDateTime)?;
        Ok(Self(date.to_julian_day() - PG_EPOCH_JULIAN))
    }

    /// Parse `YYYY-MM-DD`, an ISO timestamp is accepted and truncated.
    pub fn from_asc(text: &str) -> Result<Self, BadDateTime> {
        let text = text.trim();
        let date_part = text.split([' ', 'T']).next().unwrap_or_default();
        let date = time::Date::parse(date_part, DATE).map_err(|_| BadDateTime)?;
        Ok(Self(date.to_julian_day() - PG_EPOCH_JULIAN))
    }

    pub fn to_asc(&self) -> Result<String, BadDateTime> {
        let date = self.to_date()?;
        date.format(DATE).map_err(|_| BadDateTime)
    }

    pub fn to_date(&self) -> Result<time::Date, BadDateTime> {
        let julian = PG_EPOCH_JULIAN.checked_add(self.0).ok_or(BadDateTime)?;
        time::Date::from_julian_day(julian).map_err(|_| BadDateTime)
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_asc() {
            Ok(ok) => write!(f, "Date({ok})"),
            Err(_) => write!(f, "Date({})", self.0),
        }
    }
}

impl NoIndNull for Date {
    fn is_noind_null(&self) -> bool {
        self.0 == i32::MIN
    }

    fn set_noind_null(&mut self) {
        self.0 = i32::MIN;
    }
}

/// Microseconds since 2000-01-01 00:00:00.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Parse `YYYY-MM-DD HH:MM:SS[.ffffff]`.
    ///
    /// A date alone is midnight, a trailing zone offset is ignored.
    pub fn from_asc(text: &str) -> Result<Self, BadDateTime> {
        let text = strip_zone(text.trim()).replacen('T', " ", 1);

        let datetime = match PrimitiveDateTime::parse(&text, DATE_TIME_INPUT) {
            Ok(ok) => ok,
            Err(_) => {
                let date = time::Date::parse(&text, DATE).map_err(|_| BadDateTime)?;
                PrimitiveDateTime::new(date, time::Time::MIDNIGHT)
            }
        };

        let micros = (datetime - PG_EPOCH).whole_microseconds();
        i64::try_from(micros).map(Self).map_err(|_| BadDateTime)
    }

    pub fn to_asc(&self) -> Result<String, BadDateTime> {
        let datetime = self.to_primitive()?;
        let mut out = datetime.format(DATE_TIME).map_err(|_| BadDateTime)?;

        let fraction = self.0.rem_euclid(USECS_PER_SEC);
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }

        Ok(out)
    }

    pub fn to_primitive(&self) -> Result<PrimitiveDateTime, BadDateTime> {
        PG_EPOCH.checked_add(Duration::microseconds(self.0)).ok_or(BadDateTime)
    }
}

/// Remove a trailing `+HH[:MM[:SS]]` or `-HH...` zone suffix after the time.
fn strip_zone(text: &str) -> &str {
    let Some(colon) = text.find(':') else {
        return text;
    };
    match text[colon..].rfind(['+', '-']) {
        Some(at) => text[..colon + at].trim_end(),
        None => text,
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_asc() {
            Ok(ok) => write!(f, "Timestamp({ok})"),
            Err(_) => write!(f, "Timestamp({})", self.0),
        }
    }
}

impl NoIndNull for Timestamp {
    fn is_noind_null(&self) -> bool {
        self.0 == -1
    }

    fn set_noind_null(&mut self) {
        self.0 = -1;
    }
}

/// Time span of months and microseconds.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    /// All fields below a month, in microseconds.
    pub time: i64,
    pub month: i32,
}

impl Interval {
    /// Parse `@ 1 year 2 mons 3 days 4 hours 5 mins 6 secs [ago]` or the
    /// postgres style `1 year 2 mons 3 days 04:05:06`.
    pub fn from_asc(text: &str) -> Result<Self, BadDateTime> {
        let mut month = 0i64;
        let mut time = 0i64;
        let mut ago = false;

        let mut tokens = text.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return Err(BadDateTime);
        }

        while let Some(token) = tokens.next() {
            if token == "@" {
                continue;
            }
            if token.eq_ignore_ascii_case("ago") {
                ago = true;
                continue;
            }
            if token.contains(':') {
                time += parse_clock(token)?;
                continue;
            }

            // number with the unit either attached or as the next token
            let split = token
                .char_indices()
                .find(|(i, c)| c.is_ascii_alphabetic() && *i > 0)
                .map(|(i, _)| i)
                .unwrap_or(token.len());
            let (number, unit) = token.split_at(split);
            let unit = match unit.is_empty() {
                true => tokens.next().ok_or(BadDateTime)?,
                false => unit,
            };

            let value = number.parse::<f64>().map_err(|_| BadDateTime)?;
            if !value.is_finite() {
                return Err(BadDateTime);
            }

            let unit = unit.to_ascii_lowercase();
            match unit.trim_end_matches('s') {
                "y" | "yr" | "year" => month += (value * 12.0) as i64,
                "decade" => month += (value * 120.0) as i64,
                "century" | "centurie" => month += (value * 1200.0) as i64,
                "mon" | "month" => month += value as i64,
                "w" | "week" => time += (value * 7.0 * USECS_PER_DAY as f64) as i64,
                "d" | "day" => time += (value * USECS_PER_DAY as f64) as i64,
                "h" | "hour" | "hr" => time += (value * USECS_PER_HOUR as f64) as i64,
                "m" | "min" | "minute" => time += (value * USECS_PER_MINUTE as f64) as i64,
                "" | "sec" | "second" => time += (value * USECS_PER_SEC as f64).round() as i64,
                _ => return Err(BadDateTime),
            }
        }

        if ago {
            month = -month;
            time = -time;
        }

        let month = i32::try_from(month).map_err(|_| BadDateTime)?;
        Ok(Self { time, month })
    }

    /// Format in the `postgres_verbose` style.
    pub fn to_asc(&self) -> String {
        let mut out = String::from("@");
        let mut is_zero = true;
        let mut is_before = false;

        let years = self.month / 12;
        let mons = self.month % 12;
        let days = self.time / USECS_PER_DAY;
        let mut rest = self.time % USECS_PER_DAY;
        let hours = rest / USECS_PER_HOUR;
        rest %= USECS_PER_HOUR;
        let mins = rest / USECS_PER_MINUTE;
        rest %= USECS_PER_MINUTE;
        let secs = rest / USECS_PER_SEC;
        let fsec = rest % USECS_PER_SEC;

        let mut part = |value: i64, unit: &str, out: &mut String| {
            if value == 0 {
                return;
            }
            let mut value = value;
            if is_zero {
                is_before = value < 0;
                value = value.abs();
            } else if is_before {
                value = -value;
            }
            is_zero = false;
            let plural = if value == 1 { "" } else { "s" };
            out.push_str(&format!(" {value} {unit}{plural}"));
        };

        part(years as i64, "year", &mut out);
        part(mons as i64, "mon", &mut out);
        part(days, "day", &mut out);
        part(hours, "hour", &mut out);
        part(mins, "min", &mut out);

        if secs != 0 || fsec != 0 {
            let negative = secs < 0 || fsec < 0;
            let show_minus = if is_zero {
                is_before = negative;
                false
            } else {
                negative != is_before
            };
            is_zero = false;

            out.push(' ');
            if show_minus {
                out.push('-');
            }
            out.push_str(itoa::Buffer::new().format(secs.abs()));
            if fsec != 0 {
                let digits = format!("{:06}", fsec.abs());
                out.push('.');
                out.push_str(digits.trim_end_matches('0'));
            }
            let plural = if secs.abs() != 1 || fsec != 0 { "s" } else { "" };
            out.push_str(" sec");
            out.push_str(plural);
        }

        if is_zero {
            out.push_str(" 0");
        }
        if is_before {
            out.push_str(" ago");
        }

        out
    }
}

/// Parse `[-]HH:MM[:SS[.ffffff]]` into microseconds.
fn parse_clock(token: &str) -> Result<i64, BadDateTime> {
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let mut parts = token.split(':');
    let hours = parts.next().ok_or(BadDateTime)?.parse::<i64>().map_err(|_| BadDateTime)?;
    let mins = parts.next().ok_or(BadDateTime)?.parse::<i64>().map_err(|_| BadDateTime)?;
    let secs = match parts.next() {
        Some(secs) => secs.parse::<f64>().map_err(|_| BadDateTime)?,
        None => 0.0,
    };
    if parts.next().is_some() || !(0..60).contains(&mins) || !(0.0..60.0).contains(&secs) {
        return Err(BadDateTime);
    }

    let micros = hours * USECS_PER_HOUR + mins * USECS_PER_MINUTE + (secs * USECS_PER_SEC as f64).round() as i64;
    Ok(if negative { -micros } else { micros })
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval({})", self.to_asc())
    }
}

impl NoIndNull for Interval {
    fn is_noind_null(&self) -> bool {
        self.time == -1 && self.month == -1
    }

    fn set_noind_null(&mut self) {
        self.time = -1;
        self.month = -1;
    }
}
