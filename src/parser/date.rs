//! RFC 5322 date-time (§3.3), with the obsolete forms of §4.3.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use regex::bytes::Regex;

use super::engine::{first_of, parse_all, re, Cursor, NoMatch, Parse};
use super::lexical::{cfws, fws};

static DAY: LazyLock<Regex> = LazyLock::new(|| re(r"^[0-9]{1,2}"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| re(r"^[0-9]{2,}"));
static TWO_DIGITS: LazyLock<Regex> = LazyLock::new(|| re(r"^[0-9]{2}"));
static NUMERIC_ZONE: LazyLock<Regex> = LazyLock::new(|| re(r"^([+\-])([0-9]{2})([0-9]{2})"));
static ALPHA_ZONE: LazyLock<Regex> = LazyLock::new(|| re(r"^[A-Za-z]+"));
static NAME3: LazyLock<Regex> = LazyLock::new(|| re(r"^[A-Za-z]{3}"));

const DAYS: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a `Date` field value. Returns `None` when it does not parse.
pub fn parse_date(value: &[u8]) -> Option<DateTime<Utc>> {
    parse_all(value, date_time)
}

/// `[day-of-week ","] day month year hour ":" minute [":" second] zone`.
///
/// Two-digit years below 50 are in the 2000s, other two-digit years in the
/// 1900s. Out-of-range day or time values roll over into the next unit.
pub fn date_time(c: &mut Cursor<'_>) -> Parse<DateTime<Utc>> {
    c.optional(|c| {
        day_of_week(c)?;
        c.literal(b",")
    });
    let day = day(c)?;
    let month = month(c)?;
    let year = year(c)?;
    let hour = two_digit(c)?;
    c.literal(b":")?;
    let minute = two_digit(c)?;
    let second = c
        .optional(|c| {
            c.literal(b":")?;
            two_digit(c)
        })
        .unwrap_or(0);
    let offset_minutes = zone(c)?;
    c.optional(cfws);

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(NoMatch)?;
    let utc = first
        .and_hms_opt(0, 0, 0)
        .ok_or(NoMatch)?
        .checked_add_signed(TimeDelta::days(i64::from(day) - 1))
        .and_then(|t| t.checked_add_signed(TimeDelta::hours(i64::from(hour))))
        .and_then(|t| t.checked_add_signed(TimeDelta::minutes(i64::from(minute) - offset_minutes)))
        .and_then(|t| t.checked_add_signed(TimeDelta::seconds(i64::from(second))))
        .ok_or(NoMatch)?;
    Ok(utc.and_utc())
}

fn number(c: &mut Cursor<'_>, re: &Regex) -> Parse<u32> {
    let digits = c.regex(re)?;
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(NoMatch)
}

/// Match one of `names` (three letters, case-insensitive) and return its
/// position.
fn name_index(c: &mut Cursor<'_>, names: &[&str]) -> Parse<usize> {
    let word = c.regex(&NAME3)?.to_ascii_lowercase();
    names
        .iter()
        .position(|n| n.as_bytes() == word.as_slice())
        .ok_or(NoMatch)
}

fn day_of_week(c: &mut Cursor<'_>) -> Parse<usize> {
    c.optional(cfws);
    let ret = name_index(c, &DAYS)?;
    c.optional(cfws);
    Ok(ret)
}

fn day(c: &mut Cursor<'_>) -> Parse<u32> {
    c.optional(cfws);
    let ret = number(c, &DAY)?;
    c.optional(cfws);
    Ok(ret)
}

/// Month number, 1-based.
fn month(c: &mut Cursor<'_>) -> Parse<u32> {
    let index = name_index(c, &MONTHS)?;
    u32::try_from(index + 1).map_err(|_| NoMatch)
}

fn year(c: &mut Cursor<'_>) -> Parse<i32> {
    c.optional(cfws);
    let n = number(c, &YEAR)?;
    c.optional(cfws);
    let n = i32::try_from(n).map_err(|_| NoMatch)?;
    Ok(match n {
        0..=49 => n + 2000,
        50..=99 => n + 1900,
        _ => n,
    })
}

fn two_digit(c: &mut Cursor<'_>) -> Parse<u32> {
    c.optional(cfws);
    let ret = number(c, &TWO_DIGITS)?;
    c.optional(cfws);
    Ok(ret)
}

/// Zone offset east of UTC, in minutes.
///
/// Numeric offsets, `UT`/`GMT`, the US zone names, and the military
/// single letters are understood. Any other alphabetic zone of three to
/// five letters counts as UTC.
fn zone(c: &mut Cursor<'_>) -> Parse<i64> {
    c.optional(fws);
    first_of!(c;
        |c| {
            let caps = c.regex_match(&NUMERIC_ZONE)?;
            let field = |i: usize| -> Parse<i64> {
                let m = caps.get(i).ok_or(NoMatch)?;
                std::str::from_utf8(m.as_bytes())
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(NoMatch)
            };
            let sign = if caps.get(1).map(|m| m.as_bytes()) == Some(b"-") { -1 } else { 1 };
            Ok(sign * (field(2)? * 60 + field(3)?))
        },
        |c| {
            let name = c.regex(&ALPHA_ZONE)?.to_ascii_uppercase();
            named_zone(&name).ok_or(NoMatch).map(|h| h * 60)
        },
    )
}

fn named_zone(name: &[u8]) -> Option<i64> {
    let hours = match name {
        b"UT" | b"GMT" => 0,
        b"EDT" => -4,
        b"EST" | b"CDT" => -5,
        b"CST" | b"MDT" => -6,
        b"MST" | b"PDT" => -7,
        b"PST" => -8,
        [letter] => return military_zone(*letter),
        _ if (3..=5).contains(&name.len()) => 0,
        _ => return None,
    };
    Some(hours)
}

fn military_zone(letter: u8) -> Option<i64> {
    match letter {
        b'A'..=b'I' => Some(i64::from(letter - b'A') + 1),
        b'K'..=b'M' => Some(i64::from(letter - b'K') + 10),
        b'N'..=b'Y' => Some(-(i64::from(letter - b'N') + 1)),
        b'Z' => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> Option<DateTime<Utc>> {
        parse_date(s.as_bytes())
    }

    #[test]
    fn test_full_date() {
        let d = date("Tue, 15 Nov 1994 08:12:31 -0500").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(1994, 11, 15, 13, 12, 31).unwrap());
    }

    #[test]
    fn test_without_weekday_and_seconds() {
        let d = date("1 Jan 2024 00:30 +0100").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap());
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(date("1 Jan 49 00:00 GMT").unwrap().format("%Y").to_string(), "2049");
        assert_eq!(date("1 Jan 50 00:00 GMT").unwrap().format("%Y").to_string(), "1950");
    }

    #[test]
    fn test_named_zones() {
        let pst = date("1 Jun 2020 10:00:00 PST").unwrap();
        assert_eq!(pst, Utc.with_ymd_and_hms(2020, 6, 1, 18, 0, 0).unwrap());
        let utc = date("1 Jun 2020 10:00:00 UTC").unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap());
        let jst = date("1 Jun 2020 10:00:00 JST").unwrap();
        assert_eq!(jst, utc);
    }

    #[test]
    fn test_military_zones() {
        let a = date("1 Jun 2020 10:00 A").unwrap();
        assert_eq!(a, Utc.with_ymd_and_hms(2020, 6, 1, 9, 0, 0).unwrap());
        let y = date("1 Jun 2020 10:00 Y").unwrap();
        assert_eq!(y, Utc.with_ymd_and_hms(2020, 6, 1, 22, 0, 0).unwrap());
        assert!(date("1 Jun 2020 10:00 J").is_none());
    }

    #[test]
    fn test_comments_and_rollover() {
        let d = date("Mon (day) , 31 Apr 2023 23:59:60 +0000 (UTC)").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2023, 5, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage() {
        assert!(date("yesterday").is_none());
        assert!(date("").is_none());
    }
}
